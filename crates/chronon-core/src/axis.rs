// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The time axis: lifecycle, tick pipeline, and the embedding surface.
//!
//! A [`TimeAxis`] owns everything: the request queue, the group table,
//! the anchor ring, the working state, the worker pool, the termination
//! policy, and the lifecycle flag. Many threads may submit concurrently;
//! exactly one thread ticks.
//!
//! A successful tick runs a fixed pipeline: lifecycle gate, collect,
//! partition, parallel resolve, ordered commit, transition record,
//! statistics, anchor maintenance, slot advance, commit callback,
//! termination evaluation. Each step observes only completed
//! predecessors, and `elapsed_steps` is incremented exactly once, in the
//! evaluation step.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, trace};

use crate::anchor::{
    AnchorStore, ReconstructionKey, SlotTransition, StateCell, StateMap, apply_change,
};
use crate::error::AxisError;
use crate::group::{ConflictGroup, ConflictPolicy, GroupTable, find_active};
use crate::ident::{
    ConflictGroupId, REQUEST_ID_INVALID, RequestId, SlotIndex, StateKey, StateValue,
};
use crate::pool::WorkerPool;
use crate::request::{PendingRequest, RequestQueue, StateChangeDesc};
use crate::resolver::{GroupResolutionResult, ResolvedChange, resolve_group};
use crate::termination::{
    TerminationConfig, TerminationContext, TerminationPolicy, TerminationReason,
};

/// Default interval between automatic anchors, in slots.
pub const DEFAULT_ANCHOR_INTERVAL: u32 = 1024;

/// Default bound on retained anchors.
pub const DEFAULT_MAX_ANCHORS: u32 = 64;

/// Default bound on queued requests.
pub const DEFAULT_MAX_PENDING_REQUESTS: u32 = 65_536;

/// Worker-thread fallback when host parallelism cannot be determined.
const FALLBACK_WORKER_THREADS: u32 = 4;

/// Construction parameters for a [`TimeAxis`].
///
/// The termination configuration becomes immutable the moment the axis
/// is created; its hash is computed once and defines the axis's
/// semantic identity.
#[derive(Clone, Debug)]
pub struct AxisConfig {
    /// Worker threads for parallel resolution (`0` = host CPU count,
    /// falling back to 4).
    pub worker_threads: u32,
    /// Bound on queued requests.
    pub max_pending_requests: u32,
    /// Slots between automatic anchors (`0` = default).
    pub anchor_interval: u32,
    /// Anchors retained before FIFO pruning (`0` = default).
    pub max_anchors: u32,
    /// Initial conflict-group table capacity.
    pub initial_conflict_group_capacity: u32,
    /// Stop criteria, locked at creation.
    pub termination: TerminationConfig,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
            anchor_interval: DEFAULT_ANCHOR_INTERVAL,
            max_anchors: DEFAULT_MAX_ANCHORS,
            initial_conflict_group_capacity: 32,
            termination: TerminationConfig::default(),
        }
    }
}

/// Point-in-time counters for observability.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisStats {
    /// Current slot index.
    pub current_slot: SlotIndex,
    /// Oldest slot still reconstructible.
    pub oldest_reconstructible: SlotIndex,
    /// Requests collected across all ticks.
    pub total_requests_processed: u64,
    /// Requests that lost a same-key conflict across all ticks.
    pub total_conflicts_resolved: u64,
    /// Conflict groups currently active.
    pub active_conflict_groups: u32,
    /// Anchors currently retained.
    pub current_anchor_count: u32,
    /// Rough accounting of owned container memory.
    pub memory_usage_bytes: usize,
}

/// Debug callback invoked after each commit with the committed slot and
/// its change count. Must not call back into the axis.
pub type CommitHook = Box<dyn Fn(SlotIndex, usize) + Send + Sync>;

struct TerminationState {
    policy: TerminationPolicy,
    context: TerminationContext,
    last_reason: Option<TerminationReason>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single logical time axis.
///
/// Shared freely across submitter threads; tick-side operations
/// (`tick`, `tick_multiple`, `create_anchor_now`, `set_anchor_interval`,
/// `set_commit_hook`) belong to the one tick thread.
pub struct TimeAxis {
    current_slot: AtomicU64,
    next_request_id: AtomicU64,
    next_group_id: AtomicU32,
    next_anchor_id: AtomicU64,
    external_flags: AtomicU32,
    terminated: AtomicBool,
    /// Immutable semantic fingerprint, computed once at creation and
    /// stored beside the lifecycle flag.
    policy_hash: u64,
    queue: Mutex<RequestQueue>,
    groups: Mutex<GroupTable>,
    state: Mutex<StateMap>,
    anchors: Mutex<AnchorStore>,
    termination: Mutex<TerminationState>,
    commit_hook: Mutex<Option<CommitHook>>,
    total_requests_processed: AtomicU64,
    total_conflicts_resolved: AtomicU64,
    pool: WorkerPool,
}

impl TimeAxis {
    /// Creates an axis at the genesis slot.
    ///
    /// Zero-valued anchor settings are normalized to their defaults, the
    /// termination policy is hashed and locked, and a genesis anchor
    /// with an empty snapshot is installed at slot 0.
    ///
    /// # Errors
    ///
    /// Returns [`AxisError::ThreadPoolFailed`] when worker threads
    /// cannot be spawned.
    pub fn new(config: AxisConfig) -> Result<Self, AxisError> {
        let anchor_interval = if config.anchor_interval == 0 {
            DEFAULT_ANCHOR_INTERVAL
        } else {
            config.anchor_interval
        };
        let max_anchors = if config.max_anchors == 0 {
            DEFAULT_MAX_ANCHORS
        } else {
            config.max_anchors
        };
        let worker_threads = if config.worker_threads == 0 {
            std::thread::available_parallelism()
                .map_or(FALLBACK_WORKER_THREADS, |n| n.get() as u32)
        } else {
            config.worker_threads
        };

        let pool = WorkerPool::new(worker_threads).map_err(|err| {
            debug!("worker pool construction failed: {err}");
            AxisError::ThreadPoolFailed
        })?;

        let policy = TerminationPolicy::new(config.termination);
        let policy_hash = policy.hash();

        let next_anchor_id = AtomicU64::new(0);
        let genesis_id = next_anchor_id.fetch_add(1, Ordering::Relaxed);
        let anchors = AnchorStore::new(
            u64::from(anchor_interval),
            max_anchors as usize,
            policy_hash,
            genesis_id,
        );

        Ok(Self {
            current_slot: AtomicU64::new(0),
            next_request_id: AtomicU64::new(1),
            next_group_id: AtomicU32::new(0),
            next_anchor_id,
            external_flags: AtomicU32::new(0),
            terminated: AtomicBool::new(false),
            policy_hash,
            queue: Mutex::new(RequestQueue::new(config.max_pending_requests as usize)),
            groups: Mutex::new(GroupTable::with_capacity(
                config.initial_conflict_group_capacity as usize,
            )),
            state: Mutex::new(StateMap::new()),
            anchors: Mutex::new(anchors),
            termination: Mutex::new(TerminationState {
                policy,
                context: TerminationContext::default(),
                last_reason: None,
            }),
            commit_hook: Mutex::new(None),
            total_requests_processed: AtomicU64::new(0),
            total_conflicts_resolved: AtomicU64::new(0),
            pool,
        })
    }

    // =========================================================================
    // Time progression
    // =========================================================================

    /// Advances the axis by one slot.
    ///
    /// # Errors
    ///
    /// Returns [`AxisError::Terminated`] once the axis has terminated;
    /// the call has no other failure mode. Group-level resolution
    /// failures are absorbed: successful groups commit and the shortfall
    /// shows up as `resolved_groups < total_groups`.
    #[instrument(level = "trace", skip(self))]
    pub fn tick(&self) -> Result<(), AxisError> {
        // Lifecycle gate: once time decides to stop, it stays stopped.
        if self.terminated.load(Ordering::Acquire) {
            return Err(AxisError::Terminated);
        }
        let target_slot = self.current_slot.load(Ordering::Acquire) + 1;

        // Collect. Tombstones are removed here; submissions that land
        // after this lock release target a later slot.
        let slot_requests = lock(&self.queue).collect_for_slot(target_slot);

        // Partition by group. BTreeMap fixes the ascending-group commit
        // order before resolution starts: each bucket's index is its
        // pre-assigned slot in the result array.
        let mut buckets: BTreeMap<ConflictGroupId, Vec<PendingRequest>> = BTreeMap::new();
        for request in &slot_requests {
            buckets
                .entry(request.desc.conflict_group)
                .or_default()
                .push(request.clone());
        }
        let total_groups = buckets.len() as u32;

        // Resolve in parallel against an immutable group-table snapshot.
        let group_snapshot = Arc::new(lock(&self.groups).snapshot());
        let result_slots: Vec<Option<GroupResolutionResult>> =
            buckets.iter().map(|_| None).collect();
        let results = Arc::new(Mutex::new(result_slots));
        let resolved_counter = Arc::new(AtomicU32::new(0));
        for (index, (group_id, requests)) in buckets.into_iter().enumerate() {
            let group_snapshot = Arc::clone(&group_snapshot);
            let results = Arc::clone(&results);
            let resolved_counter = Arc::clone(&resolved_counter);
            self.pool.submit(Box::new(move || {
                let group = find_active(&group_snapshot, group_id)
                    .cloned()
                    .unwrap_or_else(|| ConflictGroup::fallback(group_id));
                let result = resolve_group(&group, &requests);
                lock(&results)[index] = Some(result);
                resolved_counter.fetch_add(1, Ordering::AcqRel);
            }));
        }
        self.pool.wait_all();
        let resolved_groups = resolved_counter.load(Ordering::Acquire);

        // Commit surviving results in ascending group order. A failed
        // group leaves a hole; the survivors keep their relative order.
        let group_results: Vec<GroupResolutionResult> = {
            let mut slots = lock(&results);
            slots.drain(..).flatten().collect()
        };
        let mut combined_hash = 0u64;
        let mut aggregated: Vec<ResolvedChange> = Vec::new();
        {
            let mut state = lock(&self.state);
            for result in &group_results {
                for change in &result.changes {
                    apply_change(&mut state, change);
                    aggregated.push(*change);
                }
                combined_hash ^= result.change_hash;
            }
        }
        let total_changes = aggregated.len();

        // Record the transition for reconstruction.
        lock(&self.anchors).record_transition(SlotTransition {
            slot_index: target_slot,
            requests: slot_requests.clone(),
            resolved_changes: aggregated,
            resolution_hash: combined_hash,
        });

        // Statistics.
        self.total_requests_processed
            .fetch_add(slot_requests.len() as u64, Ordering::Relaxed);
        self.total_conflicts_resolved.fetch_add(
            slot_requests.len().saturating_sub(total_changes) as u64,
            Ordering::Relaxed,
        );

        // Anchor maintenance.
        {
            let mut anchors = lock(&self.anchors);
            if anchors.should_anchor(target_slot) {
                let snapshot = lock(&self.state).clone();
                let anchor_id = self.next_anchor_id.fetch_add(1, Ordering::Relaxed);
                anchors.create_anchor(anchor_id, target_slot, snapshot);
                debug!(slot = target_slot, anchor_id, "anchor created");
            }
        }

        // Advance the slot.
        self.current_slot.store(target_slot, Ordering::Release);

        // Commit callback.
        if let Some(hook) = lock(&self.commit_hook).as_ref() {
            hook(target_slot, total_changes);
        }

        // Evaluate termination. The single elapsed_steps increment per
        // tick lives here and nowhere else.
        let reason = {
            let mut termination = lock(&self.termination);
            termination.context.elapsed_steps += 1;
            termination.context.pending_requests = lock(&self.queue).len() as u32;
            termination.context.resolved_groups = resolved_groups;
            termination.context.total_groups = total_groups;
            termination.context.external_flags = self.external_flags.load(Ordering::Acquire);
            termination.context.causality_summary = None;
            let reason = termination.policy.evaluate(&termination.context);
            termination.last_reason = reason;
            reason
        };
        if let Some(reason) = reason {
            self.terminated.store(true, Ordering::Release);
            debug!(?reason, slot = target_slot, "axis terminated");
        }
        trace!(
            slot = target_slot,
            groups = total_groups,
            changes = total_changes,
            "tick committed"
        );
        Ok(())
    }

    /// Ticks up to `count` times, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Propagates the first non-OK tick result unchanged.
    pub fn tick_multiple(&self, count: u32) -> Result<(), AxisError> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }

    /// The current slot index.
    #[must_use]
    pub fn current_slot(&self) -> SlotIndex {
        self.current_slot.load(Ordering::Acquire)
    }

    /// Whether the lifecycle has transitioned to terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    // =========================================================================
    // Conflict groups
    // =========================================================================

    /// Creates a conflict group with a built-in policy.
    ///
    /// # Errors
    ///
    /// [`AxisError::InvalidPolicy`] for the `Custom` arm (use
    /// [`TimeAxis::create_conflict_group_custom`]);
    /// [`AxisError::ConflictGroupFull`] when the table is at capacity.
    pub fn create_conflict_group(
        &self,
        policy: ConflictPolicy,
    ) -> Result<ConflictGroupId, AxisError> {
        if matches!(policy, ConflictPolicy::Custom(_)) {
            return Err(AxisError::InvalidPolicy);
        }
        self.create_group_entry(policy)
    }

    /// Creates a conflict group resolved by a custom selector.
    ///
    /// The selector must be deterministic and thread-safe; see
    /// [`crate::CustomPolicyFn`].
    ///
    /// # Errors
    ///
    /// [`AxisError::ConflictGroupFull`] when the table is at capacity.
    pub fn create_conflict_group_custom<F>(&self, select: F) -> Result<ConflictGroupId, AxisError>
    where
        F: Fn(ConflictGroupId, &[StateChangeDesc]) -> Option<usize> + Send + Sync + 'static,
    {
        self.create_group_entry(ConflictPolicy::Custom(Arc::new(select)))
    }

    fn create_group_entry(&self, policy: ConflictPolicy) -> Result<ConflictGroupId, AxisError> {
        let mut groups = lock(&self.groups);
        if !groups.has_room() {
            return Err(AxisError::ConflictGroupFull);
        }
        let id = self.next_group_id.fetch_add(1, Ordering::Relaxed);
        groups.create(id, policy)?;
        Ok(id)
    }

    /// Destroys a conflict group. The id is retired, never reused;
    /// later requests naming it resolve under the first-writer fallback.
    ///
    /// # Errors
    ///
    /// [`AxisError::NotFound`] when no such group was ever created.
    pub fn destroy_conflict_group(&self, id: ConflictGroupId) -> Result<(), AxisError> {
        lock(&self.groups).destroy(id)
    }

    // =========================================================================
    // Request intake
    // =========================================================================

    /// Submits one state-change request.
    ///
    /// # Errors
    ///
    /// [`AxisError::SlotInPast`] when the target slot is not in the
    /// future; [`AxisError::RequestQueueFull`] at capacity. A rejected
    /// submission leaves the queue untouched.
    pub fn submit(&self, desc: StateChangeDesc) -> Result<RequestId, AxisError> {
        if desc.target_slot <= self.current_slot.load(Ordering::Acquire) {
            return Err(AxisError::SlotInPast);
        }
        let mut queue = lock(&self.queue);
        queue.ensure_room(1)?;
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        queue.push(id, desc)?;
        Ok(id)
    }

    /// Submits a batch atomically: either every request is admitted or
    /// none is.
    ///
    /// # Errors
    ///
    /// [`AxisError::InvalidParameter`] for an empty batch;
    /// [`AxisError::SlotInPast`] when any target slot is not in the
    /// future; [`AxisError::RequestQueueFull`] when the batch does not
    /// fit. On any error the queue is unchanged.
    pub fn submit_batch(&self, descs: &[StateChangeDesc]) -> Result<Vec<RequestId>, AxisError> {
        if descs.is_empty() {
            return Err(AxisError::InvalidParameter);
        }
        let current = self.current_slot.load(Ordering::Acquire);
        if descs.iter().any(|desc| desc.target_slot <= current) {
            return Err(AxisError::SlotInPast);
        }
        let mut queue = lock(&self.queue);
        queue.ensure_room(descs.len())?;
        let mut ids = Vec::with_capacity(descs.len());
        for desc in descs {
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            queue.push(id, *desc)?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Cancels a pending request. The record is tombstoned and removed
    /// at the next collect phase.
    ///
    /// # Errors
    ///
    /// [`AxisError::InvalidParameter`] for the invalid-id sentinel;
    /// [`AxisError::NotFound`] when no live request carries the id.
    pub fn cancel(&self, id: RequestId) -> Result<(), AxisError> {
        if id == REQUEST_ID_INVALID {
            return Err(AxisError::InvalidParameter);
        }
        lock(&self.queue).cancel(id)
    }

    /// Live requests targeting `slot`. Past and current slots answer 0.
    #[must_use]
    pub fn pending_request_count(&self, slot: SlotIndex) -> usize {
        if slot <= self.current_slot.load(Ordering::Acquire) {
            return 0;
        }
        lock(&self.queue).count_for_slot(slot)
    }

    // =========================================================================
    // Anchors and reconstruction
    // =========================================================================

    /// Oldest slot that can still be reconstructed.
    #[must_use]
    pub fn oldest_reconstructible_slot(&self) -> SlotIndex {
        lock(&self.anchors).oldest_slot()
    }

    /// Builds the reconstruction key for `slot`: which anchor to start
    /// from and the digests that witness the replay path.
    ///
    /// # Errors
    ///
    /// [`AxisError::SlotInPast`] below the oldest anchor;
    /// [`AxisError::InvalidParameter`] beyond the current slot.
    pub fn reconstruction_key(&self, slot: SlotIndex) -> Result<ReconstructionKey, AxisError> {
        let current = self.current_slot.load(Ordering::Acquire);
        lock(&self.anchors).reconstruction_key(slot, current)
    }

    /// Creates an anchor at the current slot, absorbing the pending
    /// transitions accumulated since the previous anchor.
    pub fn create_anchor_now(&self) {
        let current = self.current_slot.load(Ordering::Acquire);
        let mut anchors = lock(&self.anchors);
        let snapshot = lock(&self.state).clone();
        let anchor_id = self.next_anchor_id.fetch_add(1, Ordering::Relaxed);
        anchors.create_anchor(anchor_id, current, snapshot);
        debug!(slot = current, anchor_id, "manual anchor created");
    }

    /// Changes the automatic anchor interval.
    ///
    /// # Errors
    ///
    /// [`AxisError::InvalidParameter`] for a zero interval.
    pub fn set_anchor_interval(&self, interval: u32) -> Result<(), AxisError> {
        if interval == 0 {
            return Err(AxisError::InvalidParameter);
        }
        lock(&self.anchors).set_interval(u64::from(interval));
        Ok(())
    }

    /// Enumerates the reconstructed state at `slot`, optionally filtered
    /// to keys last written by one conflict group.
    ///
    /// `visit` receives each key and value; returning `false` stops the
    /// enumeration early. When `slot` is the current slot the working
    /// state is enumerated directly, without replay.
    ///
    /// # Errors
    ///
    /// [`AxisError::SlotInPast`] below the oldest anchor;
    /// [`AxisError::InvalidParameter`] beyond the current slot;
    /// [`AxisError::PolicyMismatch`] when the covering anchor carries a
    /// foreign policy hash.
    pub fn reconstruct_state<F>(
        &self,
        slot: SlotIndex,
        group: Option<ConflictGroupId>,
        mut visit: F,
    ) -> Result<(), AxisError>
    where
        F: FnMut(&StateKey, StateValue) -> bool,
    {
        let state = self.state_at(slot)?;
        for cell in state.values() {
            if group.is_some_and(|filter| cell.group != filter) {
                continue;
            }
            if !visit(&cell.key, cell.value) {
                break;
            }
        }
        Ok(())
    }

    /// Reads a single key at `slot`.
    ///
    /// # Errors
    ///
    /// [`AxisError::NotFound`] when the key is absent at that slot, plus
    /// the reconstruction errors of [`TimeAxis::reconstruct_state`].
    pub fn query_state(&self, slot: SlotIndex, key: &StateKey) -> Result<StateValue, AxisError> {
        let state = self.state_at(slot)?;
        state
            .get(&key.internal())
            .map(|cell| cell.value)
            .ok_or(AxisError::NotFound)
    }

    fn state_at(&self, slot: SlotIndex) -> Result<StateMap, AxisError> {
        let current = self.current_slot.load(Ordering::Acquire);
        if slot == current {
            return Ok(lock(&self.state).clone());
        }
        lock(&self.anchors).reconstruct(slot, current, self.policy_hash)
    }

    // =========================================================================
    // Stats and debug
    // =========================================================================

    /// Snapshot of the axis's counters.
    #[must_use]
    pub fn stats(&self) -> AxisStats {
        let (active_conflict_groups, group_entries) = {
            let groups = lock(&self.groups);
            (groups.active_count() as u32, groups.len())
        };
        let (current_anchor_count, oldest_reconstructible, pending_transitions) = {
            let anchors = lock(&self.anchors);
            (
                anchors.anchor_count() as u32,
                anchors.oldest_slot(),
                anchors.pending_len(),
            )
        };
        let queue_len = lock(&self.queue).len();
        let state_len = lock(&self.state).len();
        let memory_usage_bytes = std::mem::size_of::<Self>()
            + queue_len * std::mem::size_of::<PendingRequest>()
            + group_entries * std::mem::size_of::<ConflictGroup>()
            + state_len * (std::mem::size_of::<u64>() + std::mem::size_of::<StateCell>())
            + current_anchor_count as usize * std::mem::size_of::<crate::anchor::AnchorData>()
            + pending_transitions * std::mem::size_of::<SlotTransition>();
        AxisStats {
            current_slot: self.current_slot.load(Ordering::Acquire),
            oldest_reconstructible,
            total_requests_processed: self.total_requests_processed.load(Ordering::Relaxed),
            total_conflicts_resolved: self.total_conflicts_resolved.load(Ordering::Relaxed),
            active_conflict_groups,
            current_anchor_count,
            memory_usage_bytes,
        }
    }

    /// Installs the commit callback, replacing any previous one.
    pub fn set_commit_hook<F>(&self, hook: F)
    where
        F: Fn(SlotIndex, usize) + Send + Sync + 'static,
    {
        *lock(&self.commit_hook) = Some(Box::new(hook));
    }

    /// Removes the commit callback.
    pub fn clear_commit_hook(&self) {
        *lock(&self.commit_hook) = None;
    }

    // =========================================================================
    // Termination policy surface
    // =========================================================================

    /// The stop criteria this axis was created with.
    #[must_use]
    pub fn termination_config(&self) -> TerminationConfig {
        lock(&self.termination).policy.config().clone()
    }

    /// Rejected: the termination policy is part of the axis definition
    /// and cannot change after creation. Create a new axis instead.
    ///
    /// # Errors
    ///
    /// Always [`AxisError::PolicyLocked`].
    pub fn set_termination_config(&self, _config: TerminationConfig) -> Result<(), AxisError> {
        Err(AxisError::PolicyLocked)
    }

    /// Raises external signal bits (atomic OR).
    pub fn set_external_signal(&self, flags: u32) {
        self.external_flags.fetch_or(flags, Ordering::AcqRel);
    }

    /// Clears external signal bits (atomic AND-NOT).
    pub fn clear_external_signal(&self, flags: u32) {
        self.external_flags.fetch_and(!flags, Ordering::AcqRel);
    }

    /// The termination context as of the last evaluation, with a fresh
    /// snapshot of the signal mask.
    #[must_use]
    pub fn termination_context(&self) -> TerminationContext {
        let mut context = lock(&self.termination).context;
        context.external_flags = self.external_flags.load(Ordering::Acquire);
        context
    }

    /// Why the axis terminated, or `None` while it is active.
    #[must_use]
    pub fn last_termination_reason(&self) -> Option<TerminationReason> {
        lock(&self.termination).last_reason
    }

    /// The immutable policy fingerprint computed at creation.
    #[must_use]
    pub fn termination_policy_hash(&self) -> u64 {
        self.policy_hash
    }

    /// Number of worker threads resolving groups in parallel.
    #[must_use]
    pub fn worker_thread_count(&self) -> usize {
        self.pool.thread_count()
    }
}
