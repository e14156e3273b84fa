//! Property-based tests for the dithering pipeline.
//! Invariants must hold for every depth, strategy and frame shape.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]

use std::sync::Arc;

use eink_dither::{
    pack, unpack_levels, BlueNoiseTexture, Dither, DitherKind, DitherStrategy, Palette, Region,
    SampleOrder, TransportDepth, TEXTURE_BYTES,
};
use proptest::prelude::*;

fn texture() -> Arc<BlueNoiseTexture> {
    let bytes = (0..TEXTURE_BYTES).map(|i| (i * 37 % 256) as u8).collect();
    Arc::new(BlueNoiseTexture::from_bytes(bytes).unwrap())
}

fn kind() -> impl Strategy<Value = DitherKind> {
    proptest::sample::select(DitherKind::ALL.to_vec())
}

/// Frame shape plus matching random contents.
fn frame() -> impl Strategy<Value = (Region, Vec<u8>)> {
    (1usize..48, 1usize..24, 0usize..5).prop_flat_map(|(w, h, pad)| {
        let region = Region::new(w, h, w + pad);
        proptest::collection::vec(any::<u8>(), region.stride * h).prop_map(move |buf| (region, buf))
    })
}

/// The `pick`-th transport depth wide enough for a `bits`-deep palette.
fn transport_for(bits: u8, pick: usize) -> TransportDepth {
    let options: Vec<TransportDepth> = [TransportDepth::Two, TransportDepth::Four, TransportDepth::Eight]
        .into_iter()
        .filter(|t| t.bits() >= bits)
        .collect();
    options[pick % options.len()]
}

proptest! {
    /// Palette levels are multiples of mul (or 255) and clip = 255 - bias.
    #[test]
    fn palette_constants_are_consistent(bits in 1u8..=8) {
        let p = Palette::new(bits).unwrap();
        prop_assert_eq!(p.bias(), p.mul() / 2);
        prop_assert_eq!(p.clip(), 255 - p.bias());
        for s in 0..=255u8 {
            let q = p.quantize(s);
            prop_assert!(p.contains(q.value));
            prop_assert!(q.error.unsigned_abs() <= p.bias().max(p.mul() - p.bias()));
        }
    }

    /// Every strategy leaves only palette levels inside the region and
    /// never touches stride padding.
    #[test]
    fn output_is_on_palette_and_padding_is_preserved(
        bits in 1u8..=8,
        kind in kind(),
        (region, buf) in frame(),
    ) {
        let palette = Palette::new(bits).unwrap();
        let mut out = buf.clone();
        Dither::from_kind(kind, Some(texture())).unwrap()
            .apply(&mut out, region, &palette).unwrap();
        for y in 0..region.height {
            for x in 0..region.stride {
                let i = y * region.stride + x;
                if x < region.width {
                    prop_assert!(palette.contains(out[i]), "{} gave {} at ({}, {})", kind, out[i], x, y);
                } else {
                    prop_assert_eq!(out[i], buf[i]);
                }
            }
        }
    }

    /// Dithered levels survive packing at any transport depth >= display depth.
    #[test]
    fn packing_preserves_dithered_levels(
        bits in prop_oneof![Just(1u8), Just(2u8), Just(4u8), Just(8u8)],
        (region, buf) in frame(),
        order in prop_oneof![Just(SampleOrder::MsbFirst), Just(SampleOrder::LsbFirst)],
        pick in 0usize..3,
        seed in any::<u64>(),
    ) {
        let palette = Palette::new(bits).unwrap();
        let depth = transport_for(bits, pick);
        let mut frame = buf;
        eink_dither::WhiteNoise::seeded(seed).apply(&mut frame, region, &palette).unwrap();

        let packed = pack(&frame, region, depth, order).unwrap();
        let width = eink_dither::packed_width(region.width, depth);
        let levels = unpack_levels(&packed, width, region.height, depth, order).unwrap();
        for y in 0..region.height {
            for x in 0..width {
                prop_assert_eq!(levels[y * width + x], frame[y * region.stride + x]);
            }
        }
    }

    /// In-place packing produces the same bytes as the copying variant.
    #[test]
    fn in_place_and_copying_pack_agree(
        (region, buf) in frame(),
        depth in prop_oneof![Just(TransportDepth::Two), Just(TransportDepth::Four), Just(TransportDepth::Eight)],
    ) {
        let expected = pack(&buf, region, depth, SampleOrder::MsbFirst).unwrap();
        let mut work = buf;
        let len = eink_dither::pack_in_place(&mut work, region, depth, SampleOrder::MsbFirst).unwrap();
        prop_assert_eq!(&work[..len], expected.as_slice());
    }
}
