//! Random Sources
//!
//! Round generation never touches an implicit global generator. Every
//! session owns a [`RandomSource`], which defaults to the seeded
//! Xorshift128+ [`DeterministicRng`] so a session can be replayed from its seed.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};
use uuid::Uuid;

/// Source of uniform randomness consumed by the round generator.
///
/// Only `next_u64` is required; the float and index helpers are derived
/// from it. Implementations must be `Send` so a session can move its source
/// behind the gate.
pub trait RandomSource: Send {
    /// Next uniformly distributed 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Uniform float in `[0, 1)` built from the top 53 bits.
    #[inline]
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform float in `[min, max)`. Returns `min` for an empty range.
    #[inline]
    fn next_f64_range(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        min + (max - min) * self.next_f64()
    }

    /// Uniform index in `[0, bound)`. Returns 0 when `bound` is 0.
    #[inline]
    fn next_index(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        // Simple modulo - bias is negligible for grid-sized bounds
        (self.next_u64() % bound as u64) as usize
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Seeded Xorshift128+ generator, the session's default [`RandomSource`].
///
/// ```
/// use shade_spotter::core::rng::{DeterministicRng, RandomSource};
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    s: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Generator whose whole sequence is fixed by `seed`.
    ///
    /// The two state words are expanded from the seed with SplitMix64, so
    /// nearby seeds still start far apart.
    pub fn new(seed: u64) -> Self {
        let mut seeder = SplitMix64(seed);
        let s = [seeder.next_word(), seeder.next_word()];

        // All-zero state is a fixed point of xorshift
        if s == [0, 0] {
            return Self { s: [1, 1] };
        }
        Self { s }
    }

    /// Internal state, enough to resume the sequence later.
    pub fn checkpoint(&self) -> [u64; 2] {
        self.s
    }

    /// Resume from a [`checkpoint`](Self::checkpoint).
    pub fn restore(&mut self, checkpoint: [u64; 2]) {
        self.s = checkpoint;
    }
}

impl RandomSource for DeterministicRng {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        let [a, b] = self.s;
        let out = a.wrapping_add(b);

        let x = a ^ b;
        self.s = [a.rotate_left(24) ^ x ^ (x << 16), x.rotate_left(37)];
        out
    }
}

/// Seed expander.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_word(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// Derive a session seed from the session id and caller-supplied entropy.
///
/// The same `(session_id, entropy)` pair always yields the same seed, so a
/// logged session can be regenerated round for round.
pub fn derive_session_seed(session_id: &Uuid, entropy: u64) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"SHADE_SPOTTER_SEED_V1");
    hasher.update(session_id.as_bytes());
    hasher.update(entropy.to_le_bytes());

    let digest = hasher.finalize();
    digest[..8]
        .iter()
        .rev()
        .fold(0u64, |seed, byte| (seed << 8) | u64::from(*byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let a: Vec<u64> = {
            let mut rng = DeterministicRng::new(31);
            (0..500).map(|_| rng.next_u64()).collect()
        };
        let mut rng = DeterministicRng::new(31);
        assert!(a.iter().all(|v| *v == rng.next_u64()));

        let mut other = DeterministicRng::new(32);
        assert_ne!(a[0], other.next_u64());
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = DeterministicRng::new(0);
        let first = rng.next_u64();
        assert_ne!(first, rng.next_u64());
    }

    #[test]
    fn test_next_f64_unit_interval() {
        let mut rng = DeterministicRng::new(9999);

        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!((0.0..1.0).contains(&val));
        }
    }

    #[test]
    fn test_next_f64_range() {
        let mut rng = DeterministicRng::new(4242);

        for _ in 0..1000 {
            let val = rng.next_f64_range(40.0, 70.0);
            assert!((40.0..70.0).contains(&val));
        }

        // Empty range collapses to min
        assert_eq!(rng.next_f64_range(5.0, 5.0), 5.0);
    }

    #[test]
    fn test_next_index() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_index(64) < 64);
        }

        assert_eq!(rng.next_index(0), 0);
        assert_eq!(rng.next_index(1), 0);
    }

    #[test]
    fn test_boxed_source_forwards() {
        let mut plain = DeterministicRng::new(77);
        let mut boxed: Box<dyn RandomSource> = Box::new(DeterministicRng::new(77));

        for _ in 0..10 {
            assert_eq!(plain.next_u64(), boxed.next_u64());
        }
    }

    #[test]
    fn test_derive_session_seed() {
        let id = Uuid::from_bytes([1u8; 16]);

        let seed1 = derive_session_seed(&id, 7);
        let seed2 = derive_session_seed(&id, 7);
        assert_eq!(seed1, seed2);

        assert_ne!(seed1, derive_session_seed(&id, 8));
        assert_ne!(seed1, derive_session_seed(&Uuid::from_bytes([2u8; 16]), 7));
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut rng = DeterministicRng::new(5555);
        (0..50).for_each(|_| {
            rng.next_u64();
        });

        let saved = rng.checkpoint();
        let ahead: Vec<u64> = (0..10).map(|_| rng.next_u64()).collect();

        rng.restore(saved);
        let replayed: Vec<u64> = (0..10).map(|_| rng.next_u64()).collect();
        assert_eq!(ahead, replayed);
    }
}
