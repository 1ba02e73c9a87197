// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Stateful xoroshiro128+ pseudo-random number generator for deterministic
//! simulation timelines.
//!
//! * Not cryptographically secure; use only for gameplay/state simulation.
//! * Matching seeds yield identical sequences across supported platforms as
//!   long as each participant consumes random numbers in the same order.
//! * The two-word state rides in every snapshot via [`Prng::save`] /
//!   [`Prng::load`]; callers never observe it any other way.

use super::fixed::Fx;

/// Wang-style avalanche constant used by the seed expansion.
const SEED_MIX: u32 = 0x045D_9F3B;

/// Guard word substituted when a load/seed would produce the all-zero state.
const ZERO_GUARD: u64 = 0x9E37_79B9_7F4A_7C15;

/// One round of the xor-multiply mix.
fn mix32(value: u32) -> u32 {
    let x = (value ^ (value >> 16)).wrapping_mul(SEED_MIX);
    let x = (x ^ (x >> 16)).wrapping_mul(SEED_MIX);
    x ^ (x >> 16)
}

/// Deterministic simulation PRNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prng {
    state: [u64; 2],
}

impl Prng {
    /// Constructs a PRNG from a 32-bit seed.
    ///
    /// A zero seed is coerced to 1, then each 32-bit half of the two state
    /// words is produced by chaining the xor-multiply mix.
    #[must_use]
    pub fn from_seed(seed: u32) -> Self {
        let seed = if seed == 0 { 1 } else { seed };
        let a = mix32(seed);
        let b = mix32(a);
        let c = mix32(b);
        let d = mix32(c);
        let mut state = [
            (u64::from(a) << 32) | u64::from(b),
            (u64::from(c) << 32) | u64::from(d),
        ];
        if state[0] == 0 && state[1] == 0 {
            state[0] = ZERO_GUARD;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(55) ^ s1 ^ (s1 << 14);
        self.state[1] = s1.rotate_left(36);

        result
    }

    /// Returns the next raw 32-bit word. This is the simulation-facing
    /// output; everything in kernel state derives from it.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Returns the next value in `[0, 1)` as a binary64 float.
    ///
    /// The mapping divides the raw 32-bit word by 2³² and is for
    /// non-simulation consumers only (render jitter, UI); simulation code
    /// reads [`Prng::next_u32`] or [`Prng::next_fx`].
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / (f64::from(u32::MAX) + 1.0)
    }

    /// Returns the next fixed-point value in `[0, 1)`.
    pub fn next_fx(&mut self) -> Fx {
        Fx::from_raw((self.next_u32() >> 16) as i32)
    }

    /// Returns the next integer in the inclusive range `[min, max]`.
    ///
    /// Uses rejection sampling to avoid modulo bias, ensuring every value in
    /// the range is produced with equal probability.
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max, "invalid range: {min}..={max}");
        if min >= max {
            return min;
        }
        let span = (i64::from(max) - i64::from(min)) as u64 + 1;

        let value = if span.is_power_of_two() {
            self.next_u64() & (span - 1)
        } else {
            let bound = u64::MAX - u64::MAX % span;
            loop {
                let candidate = self.next_u64();
                if candidate < bound {
                    break candidate % span;
                }
            }
        };

        (value as i64 + i64::from(min)) as i32
    }

    /// Returns the two-word state for snapshot inclusion.
    #[must_use]
    pub fn save(&self) -> [u64; 2] {
        self.state
    }

    /// Restores a state previously produced by [`Prng::save`].
    ///
    /// The all-zero state (a xoroshiro fixed point) is coerced to the guard
    /// word so a corrupt snapshot cannot freeze the generator.
    pub fn load(&mut self, state: [u64; 2]) {
        self.state = if state[0] == 0 && state[1] == 0 {
            [ZERO_GUARD, 0]
        } else {
            state
        };
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn zero_seed_is_coerced() {
        let mut a = Prng::from_seed(0);
        let mut b = Prng::from_seed(1);
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn identical_seeds_produce_identical_sequences() {
        let mut a = Prng::from_seed(0xDEAD_BEEF);
        let mut b = Prng::from_seed(0xDEAD_BEEF);
        for _ in 0..64 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn save_load_replays_the_tail() {
        let mut a = Prng::from_seed(42);
        for _ in 0..10 {
            a.next_u32();
        }
        let mark = a.save();
        let tail: Vec<u32> = (0..16).map(|_| a.next_u32()).collect();

        let mut b = Prng::from_seed(7);
        b.load(mark);
        let replay: Vec<u32> = (0..16).map(|_| b.next_u32()).collect();
        assert_eq!(tail, replay);
    }

    #[test]
    fn next_int_returns_single_value_for_equal_bounds() {
        let mut prng = Prng::from_seed(42);
        assert_eq!(prng.next_int(7, 7), 7);
    }

    #[test]
    fn next_int_stays_in_range() {
        let mut prng = Prng::from_seed(99);
        for _ in 0..256 {
            let v = prng.next_int(-10, -3);
            assert!((-10..=-3).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn next_f64_stays_in_unit_interval() {
        let mut prng = Prng::from_seed(1234);
        for _ in 0..256 {
            let v = prng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn next_fx_stays_in_unit_interval() {
        let mut prng = Prng::from_seed(5678);
        for _ in 0..256 {
            let v = prng.next_fx();
            assert!(v >= Fx::ZERO && v < Fx::ONE);
        }
    }
}
