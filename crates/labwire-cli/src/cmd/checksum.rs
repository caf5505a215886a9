use labwire_core::constants::{ETX, RECORD_SEPARATOR};
use labwire_protocol::{FrameBuilder, checksum, hex_dump};

use super::ChecksumArgs;

/// Turn the two-character sequence `\r` typed on a shell into CR.
fn unescape(payload: &str) -> String {
    payload.replace("\\r", &RECORD_SEPARATOR.to_string())
}

/// Checksum of the frame body, sequence digit included when given.
fn frame_checksum(args: &ChecksumArgs) -> (String, Option<Vec<u8>>) {
    let mut builder = FrameBuilder::new(unescape(&args.payload));
    if let Some(seq) = args.sequence {
        builder = builder.sequence(seq);
    }
    let checksum = checksum::checksum(builder.body().as_bytes(), ETX);
    let frame = args.sequence.map(|_| builder.build());
    (checksum, frame)
}

pub fn run(args: &ChecksumArgs) -> anyhow::Result<()> {
    let (checksum, frame) = frame_checksum(args);
    println!("{checksum}");
    if let Some(frame) = frame {
        println!("{}", hex_dump(&frame));
    }
    Ok(())
}
