// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic hash primitives.
//!
//! Two digests are used across the engine:
//!
//! - a 64-bit FNV-1a-style hash over `(internal_key, value_bits)` pairs,
//!   used for per-group change hashes and the termination policy
//!   fingerprint;
//! - a 128-bit double-word digest over a canonical byte stream, used for
//!   anchor transition and resolution hashes.
//!
//! Determinism contract
//! - Both digests are pure functions of their serialized inputs.
//! - Input order is canonicalized by the callers (ascending internal key
//!   within a group, ascending slot across transitions), so replays feed
//!   identical byte streams and land on identical digests.
//! - All multi-byte words are folded little-endian. Changing the
//!   constants, the lane mixing, or the endianness invalidates every
//!   recorded anchor and must be treated as a breaking change.

/// Seed for the 64-bit change hash.
pub const CHANGE_HASH_SEED: u64 = 0x517c_c1b7_2722_0a95;

/// FNV-style multiplier shared by both digest widths.
pub const HASH_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Seed for the high lane of the 128-bit digest.
const HI_LANE_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Folds one 64-bit word into a running 64-bit hash.
#[inline]
#[must_use]
pub const fn fold64(hash: u64, word: u64) -> u64 {
    (hash ^ word).wrapping_mul(HASH_PRIME)
}

/// Computes the 64-bit change hash over `(internal_key, value_bits)` pairs.
///
/// Callers must present the pairs in canonical order (ascending internal
/// key); the hash is order-sensitive by design so that replay divergence
/// is observable.
#[must_use]
pub fn hash64_changes<I>(pairs: I) -> u64
where
    I: IntoIterator<Item = (u64, u64)>,
{
    let mut hash = CHANGE_HASH_SEED;
    for (key, bits) in pairs {
        hash = fold64(hash, key);
        hash = fold64(hash, bits);
    }
    hash
}

/// A 16-byte digest: two little-endian 64-bit lanes.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hash128(pub [u8; 16]);

impl Hash128 {
    /// The all-zero digest; used by the genesis anchor.
    pub const ZERO: Self = Self([0; 16]);

    /// Returns the canonical byte representation.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Incremental builder for [`Hash128`].
///
/// Two 64-bit lanes absorb the input stream with a cross-mix after every
/// byte, so the halves never degenerate into two independent 64-bit
/// hashes of the same stream.
#[derive(Clone, Copy, Debug)]
pub struct Hash128Builder {
    lo: u64,
    hi: u64,
}

impl Default for Hash128Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Hash128Builder {
    /// Starts a fresh digest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lo: CHANGE_HASH_SEED,
            hi: HI_LANE_SEED,
        }
    }

    /// Absorbs a single byte.
    #[inline]
    pub const fn write_u8(&mut self, byte: u8) {
        self.lo ^= byte as u64;
        self.lo = self.lo.wrapping_mul(HASH_PRIME);
        self.hi ^= self.lo.rotate_left(29);
        self.hi = self.hi.wrapping_mul(HASH_PRIME);
        self.lo ^= self.hi.rotate_left(32);
    }

    /// Absorbs a byte slice.
    pub fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_u8(byte);
        }
    }

    /// Absorbs a 64-bit word, little-endian.
    pub fn write_u64(&mut self, word: u64) {
        self.write(&word.to_le_bytes());
    }

    /// Absorbs a 32-bit word, little-endian.
    pub fn write_u32(&mut self, word: u32) {
        self.write(&word.to_le_bytes());
    }

    /// Finishes the digest.
    #[must_use]
    pub fn finish(self) -> Hash128 {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.lo.to_le_bytes());
        out[8..].copy_from_slice(&self.hi.to_le_bytes());
        Hash128(out)
    }
}
