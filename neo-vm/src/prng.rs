//! Tausworthe combined-LFSR PRNG, plus an unrelated CSPRNG-backed secure
//! seed.
//!
//! Grounded on `prng_state_t`/`prng_init_seed`/`prng_from_seed`/
//! `prng_next_i64`/`prng_next_f64` in the original's `neo_vm.c`: four
//! 64-bit generator words, combined each step through four fixed
//! `(index, k, q, v)` tuples — L'Ecuyer's maximally-equidistributed
//! combined LFSR generator, period 2^223. Not cryptographically secure;
//! that's what [`secure_seed`] is for.

use std::cell::Cell;
use std::hash::{Hash, Hasher};

const GEN: [(usize, u32, u32, u32); 4] = [
    (0, 63, 31, 18),
    (1, 58, 19, 28),
    (2, 55, 24, 7),
    (3, 47, 21, 8),
];

/// `prng_init_seed`'s precomputed constants for the `noise == 0` case.
const NOISE_CONSTANTS: [u64; 4] = [
    0xa0d2_7757_0a34_5b8c,
    0x764a_296c_5d4a_a64f,
    0x5122_0704_070a_deaa,
    0x2a27_17b5_a7b7_b927,
];

const DEFAULT_SEED: f64 = 5.249_176_108_649e-01;

/// Tausworthe combined-LFSR generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrngState {
    s: [u64; 4],
}

impl PrngState {
    /// Seeds from a raw 64-bit noise word, matching `prng_init_seed`. A
    /// noise of `0` falls back to a thread-local entropy source, same as
    /// the original mixing in the OS thread id in that case.
    pub fn seed_from_noise(noise: u64) -> Self {
        let noise = if noise != 0 { noise } else { thread_local_noise() };
        let mut s = [0u64; 4];
        for (word, constant) in s.iter_mut().zip(NOISE_CONSTANTS) {
            *word = constant ^ noise;
        }
        PrngState { s }
    }

    /// Seeds from a floating-point seed, matching `prng_from_seed`: four
    /// rounds of a linear-congruential mix, each word nudged up if it
    /// undershoots a per-round mask, followed by a warm-up of discarded
    /// draws. The original sources its warm-up count from `rand() % 49 +
    /// 16`; lacking an ambient `rand()`, this derives the same count from
    /// the freshly seeded state instead, keeping the function pure.
    pub fn seed_from_f64(seed: f64) -> Self {
        let mut seed = if seed != 0.0 { seed } else { DEFAULT_SEED };
        let mut r: u32 = 0x1109_0601;
        let mut s = [0u64; 4];
        for word in s.iter_mut() {
            // `1u32 << (r & 255)` in the original is a 32-bit shift by an
            // amount that can exceed 31; on the x86 targets it was written
            // for, the hardware masks the shift count to 5 bits, so the
            // effective amount is `r & 31`.
            let mask = (1u32 << (r & 31)) as u64;
            r >>= 8;
            seed = seed * std::f64::consts::PI + std::f64::consts::E;
            let mut bits = seed.to_bits();
            if bits < mask {
                bits += mask;
            }
            *word = bits;
        }
        let mut prng = PrngState { s };
        let warmup = 16 + prng.s.iter().fold(0u64, |acc, &w| acc ^ w) % 49;
        for _ in 0..warmup {
            prng.next_i64();
        }
        prng
    }

    /// One combined-LFSR step, advancing all four generator words and
    /// returning their XOR-combined 64-bit output.
    fn step(&mut self) -> u64 {
        let mut r = 0u64;
        for &(i, k, q, v) in &GEN {
            let mut z = self.s[i];
            z = (((z << q) ^ z) >> (k - v)) ^ ((z & (u64::MAX << (64 - k))) << v);
            r ^= z;
            self.s[i] = z;
        }
        r
    }

    /// Next signed 64-bit random integer.
    pub fn next_i64(&mut self) -> i64 {
        self.step() as i64
    }

    /// Next random float in `[0.0, 1.0)`.
    pub fn next_f64(&mut self) -> f64 {
        let r = self.step();
        let bits = (r & 0x000f_ffff_ffff_ffff) | 0x3ff0_0000_0000_0000;
        f64::from_bits(bits) - 1.0
    }
}

thread_local! {
    static NOISE_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn thread_local_noise() -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    NOISE_COUNTER.with(|counter| {
        let next = counter.get().wrapping_add(1);
        counter.set(next);
        next.hash(&mut hasher);
    });
    hasher.finish()
}

/// A cryptographically secure 64-bit seed from the OS CSPRNG, unrelated to
/// the deterministic generator above — the full extent of the "secure
/// random" collaborator the spec defers to `int.randomSecure()`/
/// `float.randomSecure()` callers.
pub fn secure_seed() -> u64 {
    let mut buf = [0u8; 8];
    getrandom::getrandom(&mut buf).expect("OS CSPRNG unavailable");
    u64::from_ne_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_noise_seed_reproduces_the_same_stream() {
        let mut a = PrngState::seed_from_noise(42);
        let mut b = PrngState::seed_from_noise(42);
        for _ in 0..8 {
            assert_eq!(a.next_i64(), b.next_i64());
        }
    }

    #[test]
    fn different_noise_seeds_diverge() {
        let mut a = PrngState::seed_from_noise(1);
        let mut b = PrngState::seed_from_noise(2);
        assert_ne!(a.next_i64(), b.next_i64());
    }

    #[test]
    fn same_f64_seed_reproduces_the_same_stream() {
        let mut a = PrngState::seed_from_f64(3.14);
        let mut b = PrngState::seed_from_f64(3.14);
        for _ in 0..8 {
            assert_eq!(a.next_i64(), b.next_i64());
        }
    }

    #[test]
    fn zero_seed_falls_back_to_the_default() {
        let mut a = PrngState::seed_from_f64(0.0);
        let mut b = PrngState::seed_from_f64(DEFAULT_SEED);
        assert_eq!(a.next_i64(), b.next_i64());
    }

    #[test]
    fn next_f64_stays_within_the_unit_interval() {
        let mut prng = PrngState::seed_from_noise(7);
        for _ in 0..256 {
            let v = prng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn secure_seed_is_callable_and_returns_distinct_draws() {
        let a = secure_seed();
        let b = secure_seed();
        assert_ne!(a, b, "two draws of an 8-byte CSPRNG output colliding is astronomically unlikely");
    }
}
