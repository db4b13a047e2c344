// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Anchors, transitions, and deterministic replay.
//!
//! Anchors are the only persistent state: a bounded FIFO ring of
//! checkpoints, each holding a deep state snapshot, the transition
//! records it absorbed since the previous anchor, and digests over both.
//! No per-slot storage exists; any slot between the oldest anchor and
//! the current slot is reconstructed by replaying resolved changes on
//! top of the nearest anchor at or below it.
//!
//! Determinism contract
//! - Transition serialization order is canonical: transitions ascend by
//!   slot, requests keep submission order, and every field is folded
//!   little-endian, so replays hash identical byte streams.
//! - An anchor's 128-bit `resolution_hash` is a fold of the per-slot
//!   64-bit resolution hashes in slot order.
//! - Commit and replay share [`apply_change`], so a reconstructed slot
//!   reproduces the committed state bit-for-bit.

use std::collections::{BTreeMap, VecDeque};

use crate::error::AxisError;
use crate::hash::{Hash128, Hash128Builder};
use crate::ident::{ConflictGroupId, SlotIndex, StateKey, StateValue};
use crate::request::{Mutation, PendingRequest};
use crate::resolver::ResolvedChange;

/// One entry of the working state: the committed value plus enough
/// attribution to answer key-for-key enumeration and group filters.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateCell {
    /// The caller-visible key.
    pub key: StateKey,
    /// The committed value.
    pub value: StateValue,
    /// Group whose resolution last wrote this key.
    pub group: ConflictGroupId,
}

/// Working-state map keyed by internal key.
pub type StateMap = BTreeMap<u64, StateCell>;

/// Record of one slot's committed changes.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotTransition {
    /// The slot these changes were committed at.
    pub slot_index: SlotIndex,
    /// The requests collected for the slot, in submission order.
    pub requests: Vec<PendingRequest>,
    /// The winning changes, in commit order.
    pub resolved_changes: Vec<ResolvedChange>,
    /// XOR of the per-group change hashes for the slot.
    pub resolution_hash: u64,
}

/// A checkpoint on the time axis.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnchorData {
    /// Monotonic anchor identifier.
    pub anchor_id: u64,
    /// Slot the snapshot was taken at.
    pub slot_index: SlotIndex,
    /// Deep copy of the working state at `slot_index`.
    pub state_snapshot: StateMap,
    /// The applied transitions absorbed from the pending buffer, in slot
    /// order; they cover `(previous_anchor.slot_index, slot_index]`.
    pub transition_log: Vec<SlotTransition>,
    /// Digest of the absorbed transitions' canonical serialization.
    pub transition_hash: Hash128,
    /// Fold of the absorbed per-slot resolution hashes.
    pub resolution_hash: Hash128,
    /// The owning axis's immutable policy fingerprint.
    pub termination_policy_hash: u64,
}

/// Compact pointer into the anchor store: how to reconstruct a slot, not
/// the state itself. A key alone restores nothing; it names the anchor
/// to start from, the slot to reach, and the digests that let the holder
/// verify the replay path was deterministic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconstructionKey {
    /// Anchor to start replay from.
    pub anchor_id: u64,
    /// Slot to reconstruct.
    pub target_slot: SlotIndex,
    /// Witness for the replay path.
    pub transition_hash: Hash128,
    /// Witness for conflict-resolution determinism.
    pub resolution_hash: Hash128,
}

/// Applies one resolved change to a state map.
///
/// Shared by the commit phase and replay. `Add` and `Multiply` are
/// read-modify-write against the current value, with a missing key
/// reading as zero; `Custom` stores its operand bits verbatim.
pub(crate) fn apply_change(state: &mut StateMap, change: &ResolvedChange) {
    let internal = change.key.internal();
    let bits = match change.mutation {
        Mutation::Delete => {
            state.remove(&internal);
            return;
        }
        Mutation::Set | Mutation::Custom => change.value.bits(),
        Mutation::Add => {
            let current = state.get(&internal).map_or(0, |cell| cell.value.bits());
            current.wrapping_add(change.value.bits())
        }
        Mutation::Multiply => {
            let current = state.get(&internal).map_or(0, |cell| cell.value.bits());
            current.wrapping_mul(change.value.bits())
        }
    };
    state.insert(
        internal,
        StateCell {
            key: change.key,
            value: StateValue::from_bits(bits),
            group: change.group,
        },
    );
}

fn transition_digest(transitions: &[SlotTransition]) -> Hash128 {
    let mut digest = Hash128Builder::new();
    for transition in transitions {
        digest.write_u64(transition.slot_index);
        digest.write_u64(transition.requests.len() as u64);
        for request in &transition.requests {
            digest.write_u64(request.id);
            digest.write_u64(request.desc.target_slot);
            digest.write_u32(request.desc.conflict_group);
            digest.write_u32(request.desc.priority as u32);
            digest.write_u64(request.desc.key.primary);
            digest.write_u64(request.desc.key.secondary);
            digest.write_u8(request.desc.mutation.code());
            digest.write_u64(request.desc.value.bits());
        }
    }
    digest.finish()
}

fn resolution_digest(transitions: &[SlotTransition]) -> Hash128 {
    let mut digest = Hash128Builder::new();
    for transition in transitions {
        digest.write_u64(transition.slot_index);
        digest.write_u64(transition.resolution_hash);
    }
    digest.finish()
}

/// The anchor ring plus the pending-transition buffer. Callers hold the
/// anchor lock.
#[derive(Debug)]
pub(crate) struct AnchorStore {
    anchors: VecDeque<AnchorData>,
    pending: Vec<SlotTransition>,
    last_anchor_slot: SlotIndex,
    interval: u64,
    max_anchors: usize,
    policy_hash: u64,
}

impl AnchorStore {
    /// Builds the store and installs the genesis anchor at slot 0 with
    /// an empty snapshot and zero digests.
    pub(crate) fn new(
        interval: u64,
        max_anchors: usize,
        policy_hash: u64,
        genesis_anchor_id: u64,
    ) -> Self {
        let mut anchors = VecDeque::with_capacity(max_anchors.min(64));
        anchors.push_back(AnchorData {
            anchor_id: genesis_anchor_id,
            slot_index: 0,
            state_snapshot: StateMap::new(),
            transition_log: Vec::new(),
            transition_hash: Hash128::ZERO,
            resolution_hash: Hash128::ZERO,
            termination_policy_hash: policy_hash,
        });
        Self {
            anchors,
            pending: Vec::new(),
            last_anchor_slot: 0,
            interval,
            max_anchors,
            policy_hash,
        }
    }

    pub(crate) fn record_transition(&mut self, transition: SlotTransition) {
        self.pending.push(transition);
    }

    pub(crate) fn should_anchor(&self, target_slot: SlotIndex) -> bool {
        target_slot - self.last_anchor_slot >= self.interval
    }

    pub(crate) fn set_interval(&mut self, interval: u64) {
        self.interval = interval;
    }

    /// Creates an anchor at `slot`, absorbing the pending transitions
    /// into its log, then prunes the ring FIFO past `max_anchors`.
    pub(crate) fn create_anchor(&mut self, anchor_id: u64, slot: SlotIndex, snapshot: StateMap) {
        let transition_log = std::mem::take(&mut self.pending);
        let anchor = AnchorData {
            anchor_id,
            slot_index: slot,
            state_snapshot: snapshot,
            transition_hash: transition_digest(&transition_log),
            resolution_hash: resolution_digest(&transition_log),
            transition_log,
            termination_policy_hash: self.policy_hash,
        };
        self.anchors.push_back(anchor);
        self.last_anchor_slot = slot;
        while self.anchors.len() > self.max_anchors {
            self.anchors.pop_front();
        }
    }

    /// Oldest slot still covered by an anchor.
    pub(crate) fn oldest_slot(&self) -> SlotIndex {
        self.anchors.front().map_or(0, |anchor| anchor.slot_index)
    }

    pub(crate) fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn anchor_index_at_or_before(&self, slot: SlotIndex) -> Option<usize> {
        self.anchors
            .iter()
            .rposition(|anchor| anchor.slot_index <= slot)
    }

    /// Builds the reconstruction key for `slot`.
    pub(crate) fn reconstruction_key(
        &self,
        slot: SlotIndex,
        current_slot: SlotIndex,
    ) -> Result<ReconstructionKey, AxisError> {
        if slot < self.oldest_slot() {
            return Err(AxisError::SlotInPast);
        }
        if slot > current_slot {
            return Err(AxisError::InvalidParameter);
        }
        let anchor = self
            .anchor_index_at_or_before(slot)
            .and_then(|index| self.anchors.get(index))
            .ok_or(AxisError::AnchorNotFound)?;
        Ok(ReconstructionKey {
            anchor_id: anchor.anchor_id,
            target_slot: slot,
            transition_hash: anchor.transition_hash,
            resolution_hash: anchor.resolution_hash,
        })
    }

    /// Reconstructs the full state at `target`.
    ///
    /// Starts from the nearest anchor at or below `target` and replays
    /// resolved changes in slot order. Transitions past the last anchor
    /// come from the pending buffer; transitions between two anchors come
    /// from the successor anchor's absorbed log.
    pub(crate) fn reconstruct(
        &self,
        target: SlotIndex,
        current_slot: SlotIndex,
        axis_policy_hash: u64,
    ) -> Result<StateMap, AxisError> {
        if target < self.oldest_slot() {
            return Err(AxisError::SlotInPast);
        }
        if target > current_slot {
            return Err(AxisError::InvalidParameter);
        }
        let index = self
            .anchor_index_at_or_before(target)
            .ok_or(AxisError::AnchorNotFound)?;
        let anchor = self.anchors.get(index).ok_or(AxisError::AnchorNotFound)?;
        if anchor.termination_policy_hash != axis_policy_hash {
            return Err(AxisError::PolicyMismatch);
        }

        let mut state = anchor.state_snapshot.clone();
        let replay_source: &[SlotTransition] = match self.anchors.get(index + 1) {
            Some(successor) => &successor.transition_log,
            None => &self.pending,
        };
        for transition in replay_source {
            if transition.slot_index <= anchor.slot_index {
                return Err(AxisError::ReconstructionFailed);
            }
            if transition.slot_index > target {
                break;
            }
            for change in &transition.resolved_changes {
                apply_change(&mut state, change);
            }
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::StateChangeDesc;

    fn change(primary: u64, mutation: Mutation, bits: u64) -> ResolvedChange {
        ResolvedChange {
            key: StateKey::new(primary, 0),
            group: 0,
            mutation,
            value: StateValue::from_bits(bits),
        }
    }

    fn transition(slot: SlotIndex, changes: Vec<ResolvedChange>) -> SlotTransition {
        SlotTransition {
            slot_index: slot,
            requests: Vec::new(),
            resolved_changes: changes,
            resolution_hash: slot ^ 0xabcd,
        }
    }

    #[test]
    fn apply_change_read_modify_write_semantics() {
        let mut state = StateMap::new();
        apply_change(&mut state, &change(1, Mutation::Add, 5));
        apply_change(&mut state, &change(1, Mutation::Add, 3));
        apply_change(&mut state, &change(1, Mutation::Multiply, 4));
        let internal = StateKey::new(1, 0).internal();
        assert_eq!(state[&internal].value.bits(), 32);
        apply_change(&mut state, &change(1, Mutation::Delete, 0));
        assert!(!state.contains_key(&internal));
        // Multiply against a missing key reads zero.
        apply_change(&mut state, &change(1, Mutation::Multiply, 9));
        assert_eq!(state[&internal].value.bits(), 0);
    }

    #[test]
    fn genesis_anchor_exists_at_slot_zero() {
        let store = AnchorStore::new(1024, 64, 7, 0);
        assert_eq!(store.oldest_slot(), 0);
        assert_eq!(store.anchor_count(), 1);
        let state = match store.reconstruct(0, 0, 7) {
            Ok(state) => state,
            Err(err) => panic!("genesis reconstruct failed: {err}"),
        };
        assert!(state.is_empty());
    }

    #[test]
    fn replay_from_pending_buffer() {
        let mut store = AnchorStore::new(1024, 64, 7, 0);
        store.record_transition(transition(1, vec![change(1, Mutation::Set, 10)]));
        store.record_transition(transition(2, vec![change(1, Mutation::Add, 5)]));
        store.record_transition(transition(3, vec![change(2, Mutation::Set, 99)]));
        let internal = StateKey::new(1, 0).internal();

        let at_two = match store.reconstruct(2, 3, 7) {
            Ok(state) => state,
            Err(err) => panic!("reconstruct(2) failed: {err}"),
        };
        assert_eq!(at_two[&internal].value.bits(), 15);
        assert_eq!(at_two.len(), 1);

        let at_three = match store.reconstruct(3, 3, 7) {
            Ok(state) => state,
            Err(err) => panic!("reconstruct(3) failed: {err}"),
        };
        assert_eq!(at_three.len(), 2);
    }

    #[test]
    fn replay_between_anchors_uses_the_successor_log() {
        let mut store = AnchorStore::new(1024, 64, 7, 0);
        let mut live = StateMap::new();
        for slot in 1..=4u64 {
            let delta = change(1, Mutation::Add, slot);
            apply_change(&mut live, &delta);
            store.record_transition(transition(slot, vec![delta]));
        }
        store.create_anchor(1, 4, live.clone());
        store.record_transition(transition(5, vec![change(1, Mutation::Add, 100)]));

        let internal = StateKey::new(1, 0).internal();
        // Slot 2 sits between the genesis anchor and the anchor at 4.
        let at_two = match store.reconstruct(2, 5, 7) {
            Ok(state) => state,
            Err(err) => panic!("reconstruct(2) failed: {err}"),
        };
        assert_eq!(at_two[&internal].value.bits(), 3);
        let at_five = match store.reconstruct(5, 5, 7) {
            Ok(state) => state,
            Err(err) => panic!("reconstruct(5) failed: {err}"),
        };
        assert_eq!(at_five[&internal].value.bits(), 110);
    }

    #[test]
    fn ring_prunes_fifo_and_bounds_reconstruction() {
        let mut store = AnchorStore::new(1, 2, 7, 0);
        store.record_transition(transition(1, vec![change(1, Mutation::Set, 1)]));
        store.create_anchor(1, 1, StateMap::new());
        store.record_transition(transition(2, vec![change(1, Mutation::Set, 2)]));
        store.create_anchor(2, 2, StateMap::new());
        assert_eq!(store.anchor_count(), 2);
        assert_eq!(store.oldest_slot(), 1);
        assert_eq!(store.reconstruct(0, 2, 7), Err(AxisError::SlotInPast));
    }

    #[test]
    fn policy_mismatch_is_rejected() {
        let store = AnchorStore::new(1024, 64, 7, 0);
        assert_eq!(store.reconstruct(0, 0, 8), Err(AxisError::PolicyMismatch));
    }

    #[test]
    fn future_slot_is_an_invalid_parameter() {
        let store = AnchorStore::new(1024, 64, 7, 0);
        assert_eq!(store.reconstruct(5, 3, 7), Err(AxisError::InvalidParameter));
    }

    #[test]
    fn reconstruction_key_carries_anchor_digests() {
        let mut store = AnchorStore::new(1024, 64, 7, 0);
        let req = PendingRequest {
            id: 1,
            desc: StateChangeDesc {
                target_slot: 1,
                conflict_group: 0,
                priority: 0,
                key: StateKey::new(1, 0),
                mutation: Mutation::Set,
                value: StateValue::from_bits(10),
            },
            cancelled: false,
        };
        store.record_transition(SlotTransition {
            slot_index: 1,
            requests: vec![req],
            resolved_changes: vec![change(1, Mutation::Set, 10)],
            resolution_hash: 42,
        });
        store.create_anchor(1, 1, StateMap::new());
        let key = match store.reconstruction_key(1, 1) {
            Ok(key) => key,
            Err(err) => panic!("key generation failed: {err}"),
        };
        assert_eq!(key.anchor_id, 1);
        assert_eq!(key.target_slot, 1);
        assert_ne!(key.transition_hash, Hash128::ZERO);
        assert_ne!(key.resolution_hash, Hash128::ZERO);
    }
}
