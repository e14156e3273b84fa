//! Property-based tests for frame placement.
//! Verifies invariants hold for ALL panel and frame sizes, not just fixed
//! examples.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use eink_dither::TransportDepth;
use proptest::prelude::*;
use vsmp::display::it8951::GeometryError;
use vsmp::placement;

fn depth() -> impl Strategy<Value = TransportDepth> {
    prop_oneof![
        Just(TransportDepth::Two),
        Just(TransportDepth::Four),
        Just(TransportDepth::Eight),
    ]
}

proptest! {
    /// A frame that fits is placed group-aligned, inside the panel, and as
    /// close to centred as the alignment allows.
    #[test]
    fn fitting_frames_are_aligned_and_centred(
        panel_w in 1u16..4000,
        panel_h in 1u16..4000,
        w_frac in 0.0f64..=1.0,
        h_frac in 0.0f64..=1.0,
        depth in depth(),
    ) {
        let w = (f64::from(panel_w) * w_frac) as usize;
        let h = (f64::from(panel_h) * h_frac) as usize;
        let p = placement(panel_w, panel_h, w, h, depth).unwrap();
        let group = depth.pixels_per_byte().max(2);
        let x = usize::from(p.x);
        let y = usize::from(p.y);

        prop_assert_eq!(x % group, 0);
        prop_assert!(x + w <= usize::from(panel_w));
        prop_assert!(y + h <= usize::from(panel_h));
        let centred = (usize::from(panel_w) - w) / 2;
        prop_assert!(x <= centred && centred - x < group);
        prop_assert_eq!(y, (usize::from(panel_h) - h) / 2);
    }

    /// For 4- and 8-bit transport the column is exactly `((W - w) >> 2) << 1`.
    #[test]
    fn wide_transport_matches_shift_formula(panel_w in 1u16..4000, w in 0usize..4000) {
        prop_assume!(w <= usize::from(panel_w));
        for depth in [TransportDepth::Four, TransportDepth::Eight] {
            let p = placement(panel_w, 10, w, 10, depth).unwrap();
            prop_assert_eq!(usize::from(p.x), ((usize::from(panel_w) - w) >> 2) << 1);
        }
    }

    /// Anything wider or taller than the panel is rejected.
    #[test]
    fn oversized_frames_are_rejected(panel_w in 1u16..2000, extra in 1usize..100, depth in depth()) {
        let w = usize::from(panel_w) + extra;
        let err = placement(panel_w, 100, w, 10, depth).unwrap_err();
        let is_too_large = matches!(err, GeometryError::TooLarge { .. });
        prop_assert!(is_too_large);
        prop_assert!(placement(panel_w, 100, 1, 101, depth).is_err());
    }
}
