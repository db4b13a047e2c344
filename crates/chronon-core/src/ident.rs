// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scalar identifier kinds and the state key/value pair.

/// Discrete slot on the time axis. Monotonic, starts at 0 (genesis).
pub type SlotIndex = u64;

/// Conflict-group identifier. Monotonic per axis; never reused after the
/// group is destroyed.
pub type ConflictGroupId = u32;

/// Request identifier, assigned at submission in strictly increasing order.
pub type RequestId = u64;

/// Sentinel for "no slot".
pub const SLOT_INVALID: SlotIndex = SlotIndex::MAX;

/// Sentinel for "no conflict group".
pub const GROUP_INVALID: ConflictGroupId = ConflictGroupId::MAX;

/// Sentinel for "no request".
pub const REQUEST_ID_INVALID: RequestId = RequestId::MAX;

/// Multiplier used to fold the secondary key component into the internal
/// key (the 64-bit golden-ratio constant).
const KEY_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Identifies what a request mutates: a `(primary, secondary)` pair, for
/// example an entity id and a field id.
///
/// The engine never interprets the two components; it folds them into a
/// single internal 64-bit key via [`StateKey::internal`], and that folded
/// key is what conflict detection, commits, and hashing operate on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateKey {
    /// Primary key component.
    pub primary: u64,
    /// Secondary key component.
    pub secondary: u64,
}

impl StateKey {
    /// Builds a key from its two components.
    #[must_use]
    pub const fn new(primary: u64, secondary: u64) -> Self {
        Self { primary, secondary }
    }

    /// Folds both components into the internal 64-bit key.
    ///
    /// `primary XOR (secondary · KEY_MIX)`. This mapping is part of the
    /// determinism contract: change hashes are computed over internal
    /// keys, so altering it invalidates every recorded hash.
    #[must_use]
    pub const fn internal(&self) -> u64 {
        self.primary ^ self.secondary.wrapping_mul(KEY_MIX)
    }
}

/// A 64-bit state payload.
///
/// The engine stores and hashes the raw bit pattern only; the accessors
/// reinterpret it as signed, floating-point, or an opaque handle. Values
/// wider than 64 bits are modelled as handles whose lifetime belongs to
/// the caller.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateValue(u64);

impl StateValue {
    /// The all-zero bit pattern.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw bit pattern.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Interprets a signed integer as a value.
    #[must_use]
    pub const fn from_i64(v: i64) -> Self {
        Self(v as u64)
    }

    /// Reads the bits back as a signed integer.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Stores an IEEE-754 double by bit pattern.
    #[must_use]
    pub const fn from_f64(v: f64) -> Self {
        Self(v.to_bits())
    }

    /// Reads the bits back as an IEEE-754 double.
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Stores an opaque caller-managed handle.
    #[must_use]
    pub const fn from_handle(handle: u64) -> Self {
        Self(handle)
    }

    /// Reads the bits back as an opaque handle.
    #[must_use]
    pub const fn as_handle(self) -> u64 {
        self.0
    }
}
