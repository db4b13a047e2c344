// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Request descriptions and the pending-request queue.
//!
//! Submitters describe a future state change with [`StateChangeDesc`];
//! the axis stamps it with a [`RequestId`](crate::RequestId) and parks it
//! in the queue until the target slot is ticked. Cancellation is a
//! tombstone: the record stays queued until the next collect phase
//! physically removes it, so cancellation never reorders survivors.

use crate::error::AxisError;
use crate::ident::{ConflictGroupId, RequestId, SlotIndex, StateKey, StateValue};

/// How a winning request mutates its key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mutation {
    /// Overwrite the key with the carried value.
    Set,
    /// Wrapping-add the carried value to the current value (missing key
    /// reads as zero).
    Add,
    /// Wrapping-multiply the current value by the carried value (missing
    /// key reads as zero).
    Multiply,
    /// Remove the key.
    Delete,
    /// Overwrite with caller-interpreted bits; the engine treats this
    /// exactly like `Set` and never inspects the payload.
    Custom,
}

impl Mutation {
    /// Stable wire code for serialization into transition hashes and the
    /// embedding ABI.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Set => 0,
            Self::Add => 1,
            Self::Multiply => 2,
            Self::Delete => 3,
            Self::Custom => 4,
        }
    }
}

/// A single requested state change, targeted at a future slot.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateChangeDesc {
    /// Slot at which the change should take effect. Must be strictly
    /// greater than the current slot at submission time.
    pub target_slot: SlotIndex,
    /// Conflict group the change belongs to.
    pub conflict_group: ConflictGroupId,
    /// Priority, consulted only by the `Priority` policy.
    pub priority: i32,
    /// What is being changed.
    pub key: StateKey,
    /// How it is changed.
    pub mutation: Mutation,
    /// Operand carried by the mutation.
    pub value: StateValue,
}

/// A queued request: description plus submission identity.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingRequest {
    /// Identifier assigned at submission.
    pub id: RequestId,
    /// The requested change.
    pub desc: StateChangeDesc,
    pub(crate) cancelled: bool,
}

/// Bounded submission queue. Callers hold the queue lock; this type is
/// single-threaded by construction.
#[derive(Debug)]
pub(crate) struct RequestQueue {
    entries: Vec<PendingRequest>,
    capacity: usize,
}

impl RequestQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Admits one request. Capacity is checked before the push so a full
    /// queue is left untouched.
    pub(crate) fn push(&mut self, id: RequestId, desc: StateChangeDesc) -> Result<(), AxisError> {
        if self.entries.len() >= self.capacity {
            return Err(AxisError::RequestQueueFull);
        }
        self.entries.push(PendingRequest {
            id,
            desc,
            cancelled: false,
        });
        Ok(())
    }

    /// Checks that `count` additional requests fit. Used by batch
    /// submission to make admission all-or-nothing.
    pub(crate) fn ensure_room(&self, count: usize) -> Result<(), AxisError> {
        if self.entries.len() + count > self.capacity {
            return Err(AxisError::RequestQueueFull);
        }
        Ok(())
    }

    /// Tombstones the request with `id`. The record is removed at the
    /// next collect phase.
    pub(crate) fn cancel(&mut self, id: RequestId) -> Result<(), AxisError> {
        for entry in &mut self.entries {
            if entry.id == id && !entry.cancelled {
                entry.cancelled = true;
                return Ok(());
            }
        }
        Err(AxisError::NotFound)
    }

    /// Removes tombstoned records and extracts the live requests whose
    /// target is exactly `slot`, preserving submission order. Requests
    /// for other slots stay queued.
    pub(crate) fn collect_for_slot(&mut self, slot: SlotIndex) -> Vec<PendingRequest> {
        let mut collected = Vec::new();
        self.entries.retain(|entry| {
            if entry.cancelled {
                return false;
            }
            if entry.desc.target_slot == slot {
                collected.push(entry.clone());
                return false;
            }
            true
        });
        collected
    }

    /// Queue length including tombstoned records not yet collected.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Live requests targeting `slot`.
    pub(crate) fn count_for_slot(&self, slot: SlotIndex) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.cancelled && entry.desc.target_slot == slot)
            .count()
    }
}
