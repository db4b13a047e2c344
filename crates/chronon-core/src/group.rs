// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Conflict groups: isolation boundaries for parallel resolution.
//!
//! Requests in different groups never conflict and resolve in parallel;
//! requests in the same group, same slot, and same key are decided by the
//! group's policy. Destroyed groups are marked inactive but keep their
//! table entry, so identifiers are never recycled.

use std::fmt;
use std::sync::Arc;

use crate::error::AxisError;
use crate::ident::ConflictGroupId;
use crate::request::StateChangeDesc;

/// Upper bound on conflict-group table entries per axis.
pub const MAX_CONFLICT_GROUPS: usize = 256;

/// Deterministic, thread-safe winner selector for custom resolution.
///
/// Receives the group id and the conflicting descriptions sorted
/// ascending by request id; returns the index of the winner. `None` or
/// an out-of-range index falls back to first-writer.
///
/// Implementations must be pure over their inputs: the callback runs on
/// worker threads and participates in replay, so the same input slice
/// must always select the same winner.
pub type CustomPolicyFn =
    dyn Fn(ConflictGroupId, &[StateChangeDesc]) -> Option<usize> + Send + Sync;

/// Winner-selection policy for a conflict group.
#[derive(Clone)]
pub enum ConflictPolicy {
    /// Highest priority wins; ties go to the lowest request id.
    Priority,
    /// Highest request id wins.
    LastWriter,
    /// Lowest request id wins.
    FirstWriter,
    /// User-supplied selector with first-writer fallback.
    Custom(Arc<CustomPolicyFn>),
}

impl fmt::Debug for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Priority => f.write_str("Priority"),
            Self::LastWriter => f.write_str("LastWriter"),
            Self::FirstWriter => f.write_str("FirstWriter"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One conflict-group table entry.
#[derive(Clone, Debug)]
pub(crate) struct ConflictGroup {
    pub(crate) id: ConflictGroupId,
    pub(crate) policy: ConflictPolicy,
    pub(crate) active: bool,
}

impl ConflictGroup {
    /// Stand-in entry used when a request names a group that was never
    /// created or has been destroyed: first-writer, as if freshly made.
    pub(crate) fn fallback(id: ConflictGroupId) -> Self {
        Self {
            id,
            policy: ConflictPolicy::FirstWriter,
            active: true,
        }
    }
}

/// The axis's group table. Callers hold the table lock.
#[derive(Debug, Default)]
pub(crate) struct GroupTable {
    groups: Vec<ConflictGroup>,
}

impl GroupTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            groups: Vec::with_capacity(capacity.min(MAX_CONFLICT_GROUPS)),
        }
    }

    /// Appends a group. The table bound counts every entry ever created,
    /// active or not, because identifiers are never reused.
    pub(crate) fn create(
        &mut self,
        id: ConflictGroupId,
        policy: ConflictPolicy,
    ) -> Result<(), AxisError> {
        if self.groups.len() >= MAX_CONFLICT_GROUPS {
            return Err(AxisError::ConflictGroupFull);
        }
        self.groups.push(ConflictGroup {
            id,
            policy,
            active: true,
        });
        Ok(())
    }

    /// Marks a group inactive. The entry (and its id) stays occupied.
    pub(crate) fn destroy(&mut self, id: ConflictGroupId) -> Result<(), AxisError> {
        for group in &mut self.groups {
            if group.id == id {
                group.active = false;
                return Ok(());
            }
        }
        Err(AxisError::NotFound)
    }

    /// Whether another group can be created without hitting the bound.
    pub(crate) fn has_room(&self) -> bool {
        self.groups.len() < MAX_CONFLICT_GROUPS
    }

    /// Immutable copy handed to worker tasks at the start of a resolve
    /// phase, so resolution never races group creation or destruction.
    pub(crate) fn snapshot(&self) -> Vec<ConflictGroup> {
        self.groups.clone()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.groups.iter().filter(|g| g.active).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }
}

/// Looks up an active group in a resolve-phase snapshot.
pub(crate) fn find_active(
    snapshot: &[ConflictGroup],
    id: ConflictGroupId,
) -> Option<&ConflictGroup> {
    snapshot.iter().find(|g| g.id == id && g.active)
}
