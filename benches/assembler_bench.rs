//! Throughput benchmarks for the frame assembler and session.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench assembler_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use labwire_protocol::{AstmCodec, FrameAssembler, FrameBuilder, Session, TransmissionBuilder};
use std::hint::black_box;
use tokio_util::codec::Decoder;

/// A full electrolyte panel transmission.
fn panel_transmission() -> Vec<u8> {
    TransmissionBuilder::new()
        .record("H|\\^&|||EC90^1.0|||||||P|1")
        .record("P|1|S100||DOE^JANE")
        .record("O|1|S100||^^^Na\\^^^K\\^^^Cl")
        .record("R|1|^^^Na|140|mmol/L")
        .record("R|2|^^^K|4.0|mmol/L")
        .record("R|3|^^^Cl|102|mmol/L")
        .record("L|1|N")
        .build()
}

/// Benchmark assembling a single frame delivered in one read.
fn bench_assemble_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_frame");
    group.throughput(Throughput::Elements(1));

    let wire = FrameBuilder::new("R|1|^^^Na|140|mmol/L").sequence(1).build();

    group.bench_function("single_read", |b| {
        b.iter(|| {
            let mut assembler = FrameAssembler::new();
            assembler.feed(black_box(&wire));
            black_box(assembler.drain_events().count());
        });
    });

    group.finish();
}

/// Benchmark a whole transmission fed with different read sizes.
fn bench_session_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_chunked");
    let wire = panel_transmission();
    group.throughput(Throughput::Bytes(wire.len() as u64));

    for chunk_size in [1usize, 16, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &size| {
                b.iter(|| {
                    let mut session = Session::new();
                    let mut events = 0;
                    for chunk in wire.chunks(size) {
                        events += session.feed(black_box(chunk)).len();
                    }
                    black_box(events);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark decoding a transmission through the codec.
fn bench_codec_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_decode");
    group.throughput(Throughput::Elements(1));

    let wire = panel_transmission();

    group.bench_function("panel", |b| {
        b.iter(|| {
            let mut codec = AstmCodec::new();
            let mut buffer = BytesMut::from(&wire[..]);
            let mut events = 0;
            while let Ok(Some(event)) = codec.decode(&mut buffer) {
                black_box(event);
                events += 1;
            }
            black_box(events);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_assemble_frame,
    bench_session_chunked,
    bench_codec_decode
);
criterion_main!(benches);
