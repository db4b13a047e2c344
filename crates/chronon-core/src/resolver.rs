// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-group conflict resolution.
//!
//! For one slot and one group, requests are bucketed by internal state
//! key, each bucket is sorted ascending by request id, and the group's
//! policy picks exactly one winner per bucket. The output order is
//! canonical (ascending internal key), which makes the per-group change
//! hash reproducible regardless of worker scheduling.

use std::collections::BTreeMap;

use crate::group::{ConflictGroup, ConflictPolicy};
use crate::hash::hash64_changes;
use crate::ident::{ConflictGroupId, StateKey, StateValue};
use crate::request::{Mutation, PendingRequest, StateChangeDesc};

/// One winning change, ready to commit or replay.
///
/// `Delete` winners are carried here too (commit needs them to remove
/// the key) but they contribute nothing to the change hash.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedChange {
    /// Key being mutated.
    pub key: StateKey,
    /// Group that decided this change; recorded so reconstruction can
    /// filter state by originating group.
    pub group: ConflictGroupId,
    /// Winning mutation kind.
    pub mutation: Mutation,
    /// Winning operand.
    pub value: StateValue,
}

/// Outcome of resolving one group for one slot.
#[derive(Clone, Debug)]
pub struct GroupResolutionResult {
    /// The group that was resolved.
    pub group_id: ConflictGroupId,
    /// Winning changes in canonical (ascending internal key) order.
    pub changes: Vec<ResolvedChange>,
    /// 64-bit change hash over the non-delete changes, in order.
    pub change_hash: u64,
}

/// Resolves all of `requests` under `group`'s policy.
///
/// Infallible: the custom policy's failure modes (error return,
/// out-of-range winner) degrade to first-writer rather than failing the
/// group, so a misbehaving callback cannot stall the axis.
pub(crate) fn resolve_group(
    group: &ConflictGroup,
    requests: &[PendingRequest],
) -> GroupResolutionResult {
    let mut result = GroupResolutionResult {
        group_id: group.id,
        changes: Vec::new(),
        change_hash: 0,
    };

    if requests.is_empty() {
        result.change_hash = hash64_changes(std::iter::empty());
        return result;
    }

    // Bucket by internal key. BTreeMap gives the canonical ascending
    // iteration order the change hash depends on.
    let mut by_key: BTreeMap<u64, Vec<&PendingRequest>> = BTreeMap::new();
    for request in requests {
        by_key
            .entry(request.desc.key.internal())
            .or_default()
            .push(request);
    }

    for bucket in by_key.values_mut() {
        bucket.sort_by_key(|request| request.id);
        let winner = select_winner(group, bucket);
        result.changes.push(ResolvedChange {
            key: winner.desc.key,
            group: group.id,
            mutation: winner.desc.mutation,
            value: winner.desc.value,
        });
    }

    result.change_hash = hash64_changes(
        result
            .changes
            .iter()
            .filter(|change| change.mutation != Mutation::Delete)
            .map(|change| (change.key.internal(), change.value.bits())),
    );

    result
}

/// Picks the winning request from a bucket already sorted ascending by
/// request id. The bucket is never empty.
fn select_winner<'a>(group: &ConflictGroup, bucket: &[&'a PendingRequest]) -> &'a PendingRequest {
    if bucket.len() == 1 {
        return bucket[0];
    }
    match &group.policy {
        // Sorted ascending by id, so a strictly-greater comparison keeps
        // the lowest id on priority ties.
        ConflictPolicy::Priority => {
            let mut winner = bucket[0];
            for request in &bucket[1..] {
                if request.desc.priority > winner.desc.priority {
                    winner = request;
                }
            }
            winner
        }
        ConflictPolicy::LastWriter => bucket[bucket.len() - 1],
        ConflictPolicy::FirstWriter => bucket[0],
        ConflictPolicy::Custom(select) => {
            let descs: Vec<StateChangeDesc> =
                bucket.iter().map(|request| request.desc).collect();
            match select(group.id, &descs) {
                Some(index) if index < bucket.len() => bucket[index],
                _ => bucket[0],
            }
        }
    }
}
