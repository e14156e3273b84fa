//! Criterion benchmarks for per-frame dithering cost.
//!
//! Run: cargo bench -p eink-dither --bench dither
//!
//! Frames are 1872×1404, the native size of the 10.3" IT8951 panel, so the
//! numbers read directly as achievable frames per second:
//!   dither/<strategy>  : one 4-bit dither pass over a full frame
//!   pack/<depth>       : in-place packing of an already dithered frame

#![allow(
    clippy::unwrap_used,               // benchmark helpers use unwrap for brevity
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,  // ramp values are reduced mod 256 first
    missing_docs,                      // criterion_group! macro generates undocumented items
)]

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eink_dither::{
    pack_in_place, BlueNoiseTexture, Dither, DitherKind, DitherStrategy, Palette, Region,
    SampleOrder, TransportDepth, TEXTURE_BYTES,
};

const WIDTH: usize = 1872;
const HEIGHT: usize = 1404;

fn frame() -> Vec<u8> {
    (0..WIDTH * HEIGHT)
        .map(|i| ((i % WIDTH + i / WIDTH) % 256) as u8)
        .collect()
}

fn bench_strategies(c: &mut Criterion) {
    let palette = Palette::new(4).unwrap();
    let region = Region::packed(WIDTH, HEIGHT);
    let texture = Arc::new(
        BlueNoiseTexture::from_bytes((0..TEXTURE_BYTES).map(|i| (i * 73 % 256) as u8).collect())
            .unwrap(),
    );
    let source = frame();

    let mut group = c.benchmark_group("dither");
    group.sample_size(10);
    group.throughput(Throughput::Elements((WIDTH * HEIGHT) as u64));
    for kind in DitherKind::ALL {
        let mut dither = Dither::from_kind(kind, Some(Arc::clone(&texture))).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, _| {
            b.iter_batched_ref(
                || source.clone(),
                |buf| dither.apply(buf, region, &palette).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_packing(c: &mut Criterion) {
    let region = Region::packed(WIDTH, HEIGHT);
    let source = frame();

    let mut group = c.benchmark_group("pack");
    for depth in [TransportDepth::Two, TransportDepth::Four, TransportDepth::Eight] {
        group.bench_with_input(BenchmarkId::from_parameter(depth.bits()), &depth, |b, &depth| {
            b.iter_batched_ref(
                || source.clone(),
                |buf| pack_in_place(buf, region, depth, SampleOrder::MsbFirst).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_strategies, bench_packing);
criterion_main!(benches);
