// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Result taxonomy for the time axis.
//!
//! Error codes are part of the embedding contract: hosts that consume the
//! engine through `chronon-ffi` see these as stable integers. The numeric
//! mapping in [`AxisError::code`] must never be reordered.

use thiserror::Error;

/// Errors surfaced by time-axis operations.
///
/// Variants fall into four kinds:
/// - input errors (`InvalidParameter`, `SlotInPast`, `InvalidPolicy`,
///   `NotFound`): returned to the caller, no state change;
/// - capacity errors (`ConflictGroupFull`, `RequestQueueFull`,
///   `OutOfMemory`): returned to the caller, admission is atomic;
/// - lifecycle errors (`NotInitialized`, `AlreadyInitialized`,
///   `Terminated`, `PolicyLocked`): hard gates;
/// - reconstruction errors (`AnchorNotFound`, `ReconstructionFailed`,
///   `PolicyMismatch`): read-only queries that could not be answered.
///
/// Group-level resolution failures are deliberately *not* represented
/// here: a tick that loses a group still commits the groups that
/// resolved, and the shortfall is visible as `resolved_groups <
/// total_groups` in the termination context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AxisError {
    /// A caller-supplied argument was malformed or out of range.
    #[error("invalid parameter")]
    InvalidParameter,
    /// An internal allocation was refused.
    #[error("out of memory")]
    OutOfMemory,
    /// The handle does not refer to a live axis.
    #[error("axis not initialized")]
    NotInitialized,
    /// The handle already refers to a live axis.
    #[error("axis already initialized")]
    AlreadyInitialized,
    /// The request targeted a slot at or before the current slot.
    #[error("target slot is in the past")]
    SlotInPast,
    /// The conflict-group table is at capacity.
    #[error("conflict group table full")]
    ConflictGroupFull,
    /// The pending-request queue is at capacity.
    #[error("request queue full")]
    RequestQueueFull,
    /// No anchor covers the requested slot.
    #[error("anchor not found")]
    AnchorNotFound,
    /// Replay from the covering anchor could not reproduce the slot.
    #[error("reconstruction failed")]
    ReconstructionFailed,
    /// The policy argument is not valid for this operation.
    #[error("invalid policy")]
    InvalidPolicy,
    /// Worker threads could not be spawned at axis creation.
    #[error("thread pool failed")]
    ThreadPoolFailed,
    /// The named entity does not exist.
    #[error("not found")]
    NotFound,
    /// The anchor was produced under a different termination policy.
    #[error("termination policy hash mismatch")]
    PolicyMismatch,
    /// The termination policy is immutable after axis creation.
    #[error("termination policy is locked")]
    PolicyLocked,
    /// The axis has terminated; time cannot be restarted.
    #[error("axis terminated")]
    Terminated,
}

impl AxisError {
    /// Stable numeric code for host interop. `0` is reserved for success.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidParameter => 1,
            Self::OutOfMemory => 2,
            Self::NotInitialized => 3,
            Self::AlreadyInitialized => 4,
            Self::SlotInPast => 5,
            Self::ConflictGroupFull => 6,
            Self::RequestQueueFull => 7,
            Self::AnchorNotFound => 8,
            Self::ReconstructionFailed => 9,
            Self::InvalidPolicy => 10,
            Self::ThreadPoolFailed => 11,
            Self::NotFound => 12,
            Self::PolicyMismatch => 13,
            Self::PolicyLocked => 14,
            Self::Terminated => 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AxisError::InvalidParameter.code(), 1);
        assert_eq!(AxisError::ThreadPoolFailed.code(), 11);
        assert_eq!(AxisError::PolicyMismatch.code(), 13);
        assert_eq!(AxisError::PolicyLocked.code(), 14);
        assert_eq!(AxisError::Terminated.code(), 15);
    }
}
