// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

use keel_core::math::{atan2, cos, sin, Fx, HALF_PI, PI};

#[test]
fn fixed_point_round_trip_reference_values() {
    // to-fixed(3.5) = 229376; to-float(229376) = 3.5.
    let v = Fx::from_num(3.5);
    assert_eq!(v.raw(), 229376);
    assert_eq!(v.to_f64(), 3.5);

    // fpMul(to-fixed(2.5), to-fixed(4)) = to-fixed(10) = 655360.
    let product = Fx::from_num(2.5) * Fx::from_int(4);
    assert_eq!(product.raw(), 655360);
    assert_eq!(product, Fx::from_int(10));
}

#[test]
fn round_trip_is_within_one_ulp() {
    for raw in [-1_000_000, -65536, -1, 0, 1, 777, 65536, 123_456_789] {
        let v = Fx::from_raw(raw);
        let back = Fx::from_num(v.to_f64());
        assert!((back.raw() - raw).abs() <= 1, "raw {raw} -> {}", back.raw());
    }
}

#[test]
fn multiplication_is_reproducible() {
    // Bit-identical across runs given identical inputs; two independent
    // evaluations must agree exactly.
    let a = Fx::from_num(123.456);
    let b = Fx::from_num(-0.789);
    assert_eq!((a * b).raw(), (a * b).raw());
    assert_eq!((a * b).raw(), -6_383_663);
}

#[test]
fn sqrt_of_squares_is_exact_for_small_integers() {
    for n in 0..=180 {
        let fx_n = Fx::from_int(n);
        assert_eq!((fx_n * fx_n).sqrt(), fx_n, "sqrt({n}²)");
    }
}

#[test]
fn pythagorean_identity_within_tolerance() {
    let tol = Fx::from_num(0.02);
    for i in 0..360 {
        let angle = Fx::from_raw(i * 1144); // ~0.017 rad steps over a turn
        let s = sin(angle);
        let c = cos(angle);
        assert!(
            ((s * s + c * c) - Fx::ONE).abs() < tol,
            "angle index {i}"
        );
    }
}

#[test]
fn sin_of_pi_is_within_tolerance_of_zero() {
    assert!(sin(PI).abs() < Fx::from_num(0.01));
}

#[test]
fn division_by_zero_saturates_instead_of_trapping() {
    assert_eq!((Fx::from_int(5) / Fx::ZERO).raw(), 0x7FFF_FFFF);
    assert_eq!((Fx::from_int(-5) / Fx::ZERO).raw(), -0x7FFF_FFFF);
}

#[test]
fn atan2_octants_agree_with_sin_cos() {
    let tol = Fx::from_num(0.02);
    for i in -7..=7 {
        let angle = Fx::from_raw(i * 25735); // ~π/8 steps across (-π, π)
        let r = atan2(sin(angle), cos(angle));
        assert!((r - angle).abs() < tol, "angle index {i}: {r} vs {angle}");
    }
}

#[test]
fn quarter_turn_rotation_is_consistent() {
    let s = sin(HALF_PI);
    let c = cos(HALF_PI);
    assert_eq!(s, Fx::ONE);
    assert!(c.abs() < Fx::from_num(0.01));
}
