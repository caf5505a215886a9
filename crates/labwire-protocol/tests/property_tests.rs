//! Property-based tests for framing and session invariants.

mod common;

use labwire_core::constants::ETX;
use labwire_protocol::{AssemblerEvent, FrameAssembler, FrameBuilder, RawFrame, Session, checksum};
use proptest::prelude::*;

/// Strategy for record text as an analyzer would send it: printable ASCII
/// without framing bytes.
fn record_text() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]\\|[0-9]\\|[ -~]{0,40}")
        .expect("Failed to create record regex strategy")
}

/// Strategy for a numeric result value.
fn result_value() -> impl Strategy<Value = String> {
    (0u32..2000u32).prop_map(|v| format!("{}.{}", v / 10, v % 10))
}

proptest! {
    /// Property: the checksum the builder writes always validates.
    #[test]
    fn prop_built_frame_validates(payload in record_text()) {
        let wire = FrameBuilder::new(payload.as_str()).build();
        let raw = RawFrame::from_line(wire.trim_ascii_end()).unwrap();
        prop_assert!(raw.is_valid());
    }

    /// Property: changing any single payload byte breaks the checksum.
    #[test]
    fn prop_single_byte_change_detected(
        payload in record_text(),
        idx in any::<prop::sample::Index>(),
        delta in 1u8..=255u8,
    ) {
        let mut bytes = payload.into_bytes();
        let good = checksum::checksum(&bytes, ETX);

        let i = idx.index(bytes.len());
        bytes[i] = bytes[i].wrapping_add(delta);
        prop_assert!(!checksum::verify(&bytes, ETX, good.as_bytes()));
    }

    /// Property: how a line is split across reads does not matter.
    #[test]
    fn prop_assembler_chunking_invariance(
        payload in record_text(),
        chunk_size in 1usize..16,
    ) {
        let wire = FrameBuilder::new(payload.as_str()).sequence(1).build();

        let mut whole = FrameAssembler::new();
        whole.feed(&wire);
        let expected: Vec<AssemblerEvent> = whole.drain_events().collect();

        let mut chunked = FrameAssembler::new();
        for chunk in wire.chunks(chunk_size) {
            chunked.feed(chunk);
        }
        let actual: Vec<AssemblerEvent> = chunked.drain_events().collect();

        prop_assert_eq!(actual, expected);
    }

    /// Property: a whole session yields the same result for any read size.
    #[test]
    fn prop_session_chunking_invariance(
        na in result_value(),
        k in result_value(),
        cl in result_value(),
        chunk_size in 1usize..64,
    ) {
        let wire = common::electrolyte_panel("S100", &na, &k, &cl).build();

        let mut reference = Session::new();
        let expected = reference.feed(&wire);

        let mut session = Session::new();
        let actual = common::feed_chunked(&mut session, &wire, chunk_size);

        prop_assert_eq!(common::replies(&actual), common::replies(&expected));
        prop_assert_eq!(
            common::without_timestamps(common::completed(&actual)),
            common::without_timestamps(common::completed(&expected))
        );
        prop_assert_eq!(session.stats(), reference.stats());
    }
}
