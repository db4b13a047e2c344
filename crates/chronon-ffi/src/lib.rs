// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! C-compatible bindings for the chronon time axis.
//!
//! This crate exposes the full embedding surface over a plain C ABI so
//! higher-level hosts (C, C++, Lua, Python, …) can drive the engine
//! without knowing the internal Rust types. Every operation returns a
//! stable `i32` result code (`0` = OK, see `chronon_core::AxisError`
//! for the mapping); callbacks are raw function pointers paired with a
//! `user_data` context the engine never inspects.
//!
//! Nothing here panics across the boundary: null or malformed inputs
//! map to the `INVALID_PARAMETER` code.
#![deny(missing_docs)]
#![allow(non_camel_case_types)]

use std::os::raw::{c_int, c_void};
use std::ptr;
use std::sync::Arc;

use chronon_core::{
    AxisConfig, AxisError, ConflictPolicy, DEFAULT_ANCHOR_INTERVAL, DEFAULT_MAX_ANCHORS,
    DEFAULT_MAX_PENDING_REQUESTS, GROUP_INVALID, Mutation, REQUEST_ID_INVALID, SLOT_INVALID,
    StateChangeDesc, StateKey, StateValue, TerminationConfig, TerminationContext, TerminationFn,
    TimeAxis,
};

/// Success code; errors carry `chronon_core::AxisError::code` values.
pub const CHRONON_OK: i32 = 0;

// =============================================================================
// ABI mirror types
// =============================================================================

/// State key crossing the ABI: `(primary, secondary)` component pair.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_state_key {
    /// Primary key component.
    pub primary: u64,
    /// Secondary key component.
    pub secondary: u64,
}

/// 64-bit state payload crossing the ABI as its raw bit pattern.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_state_value {
    /// Raw bits; reinterpret on the host side as needed.
    pub bits: u64,
}

/// One requested state change.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_state_change_desc {
    /// Target slot; must be in the future at submission time.
    pub target_slot: u64,
    /// Conflict group the change belongs to.
    pub conflict_group: u32,
    /// Priority for the priority policy.
    pub priority: i32,
    /// What is being changed.
    pub key: chronon_state_key,
    /// Mutation kind: 0 Set, 1 Add, 2 Multiply, 3 Delete, 4 Custom.
    pub mutation_type: u32,
    /// Operand carried by the mutation.
    pub value: chronon_state_value,
}

/// Custom conflict-resolution callback.
///
/// Receives the conflicting descriptions sorted ascending by request id
/// and writes the winner index to `out_winner`. Return `0` on success;
/// any other value (or an out-of-range winner) falls back to
/// first-writer. Must be deterministic and thread-safe: it runs on
/// worker threads and participates in replay.
pub type chronon_custom_policy_fn = unsafe extern "C" fn(
    group_id: u32,
    requests: *const chronon_state_change_desc,
    request_count: usize,
    out_winner: *mut usize,
    user_data: *mut c_void,
) -> c_int;

/// Termination context crossing the ABI.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_termination_context {
    /// Cumulative ticks executed.
    pub elapsed_steps: u32,
    /// Snapshot of remaining queue size.
    pub pending_requests: u32,
    /// Groups that completed resolution this tick.
    pub resolved_groups: u32,
    /// Groups observed this tick.
    pub total_groups: u32,
    /// Runtime signal bitmask.
    pub external_flags: u32,
    /// Reserved causality extension point; always null.
    pub causality_summary: *const c_void,
}

/// Custom termination callback, evaluated last; non-zero terminates.
///
/// Must be deterministic over the context and must not mutate engine
/// state.
pub type chronon_termination_fn =
    unsafe extern "C" fn(context: *const chronon_termination_context, user_data: *mut c_void) -> c_int;

/// Commit callback invoked after each tick with the committed slot and
/// its change count.
pub type chronon_commit_fn =
    unsafe extern "C" fn(slot_index: u64, change_count: usize, user_data: *mut c_void);

/// State enumerator for reconstruction queries. Return `0` to continue,
/// non-zero to stop.
pub type chronon_state_enumerator = unsafe extern "C" fn(
    key: *const chronon_state_key,
    value: *const chronon_state_value,
    user_data: *mut c_void,
) -> c_int;

/// Termination policy configuration; immutable once an axis is created.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_termination_config {
    /// Step limit (`0` = disabled).
    pub step_limit: u32,
    /// Hard safety cap (`0` = disabled; not recommended).
    pub safety_cap: u32,
    /// Terminate when the queue drains (non-zero = enabled).
    pub terminate_on_request_drain: i32,
    /// Terminate when every observed group resolves (non-zero = enabled).
    pub terminate_on_group_resolution: i32,
    /// Required external signal mask (`0` = disabled).
    pub required_external_flags: u32,
    /// Custom termination callback (null = disabled).
    pub custom_callback: Option<chronon_termination_fn>,
    /// Context passed to the custom callback.
    pub custom_callback_user_data: *mut c_void,
}

/// Axis construction parameters.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_axis_config {
    /// Worker threads for parallel resolution (`0` = auto-detect).
    pub worker_thread_count: u32,
    /// Bound on queued requests.
    pub max_pending_requests: u32,
    /// Slots between automatic anchors.
    pub anchor_interval: u32,
    /// Anchors retained before FIFO pruning.
    pub max_anchors: u32,
    /// Initial conflict-group table capacity.
    pub initial_conflict_group_capacity: u32,
    /// Termination policy (null = default: safety cap 10 000).
    pub termination_config: *const chronon_termination_config,
}

/// Reconstruction key: how to rebuild a slot, not the state itself.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_reconstruction_key {
    /// Anchor to start replay from.
    pub anchor_id: u64,
    /// Slot to reconstruct.
    pub target_slot: u64,
    /// Witness for the replay path.
    pub transition_hash: [u8; 16],
    /// Witness for conflict-resolution determinism.
    pub resolution_hash: [u8; 16],
}

/// Point-in-time counters.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct chronon_stats {
    /// Current slot index.
    pub current_slot: u64,
    /// Oldest slot still reconstructible.
    pub oldest_reconstructible: u64,
    /// Requests collected across all ticks.
    pub total_requests_processed: u64,
    /// Requests that lost a same-key conflict.
    pub total_conflicts_resolved: u64,
    /// Conflict groups currently active.
    pub active_conflict_groups: u32,
    /// Anchors currently retained.
    pub current_anchor_count: u32,
    /// Rough accounting of owned container memory.
    pub memory_usage_bytes: usize,
}

/// Opaque axis handle exposed over the C ABI.
pub struct chronon_axis {
    inner: TimeAxis,
    /// The raw termination config captured at creation, echoed back by
    /// `chronon_axis_get_termination_config`.
    raw_termination: chronon_termination_config,
}

/// Caller-supplied callback context.
///
/// Safety: the embedding contract requires `user_data` to be usable
/// from worker threads for the lifetime of the axis; the engine never
/// dereferences it.
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

// =============================================================================
// Conversions
// =============================================================================

fn mutation_from_raw(raw: u32) -> Option<Mutation> {
    match raw {
        0 => Some(Mutation::Set),
        1 => Some(Mutation::Add),
        2 => Some(Mutation::Multiply),
        3 => Some(Mutation::Delete),
        4 => Some(Mutation::Custom),
        _ => None,
    }
}

fn desc_from_raw(raw: &chronon_state_change_desc) -> Option<StateChangeDesc> {
    Some(StateChangeDesc {
        target_slot: raw.target_slot,
        conflict_group: raw.conflict_group,
        priority: raw.priority,
        key: StateKey::new(raw.key.primary, raw.key.secondary),
        mutation: mutation_from_raw(raw.mutation_type)?,
        value: StateValue::from_bits(raw.value.bits),
    })
}

fn desc_to_raw(desc: &StateChangeDesc) -> chronon_state_change_desc {
    chronon_state_change_desc {
        target_slot: desc.target_slot,
        conflict_group: desc.conflict_group,
        priority: desc.priority,
        key: chronon_state_key {
            primary: desc.key.primary,
            secondary: desc.key.secondary,
        },
        mutation_type: u32::from(desc.mutation.code()),
        value: chronon_state_value {
            bits: desc.value.bits(),
        },
    }
}

fn context_to_raw(ctx: &TerminationContext) -> chronon_termination_context {
    chronon_termination_context {
        elapsed_steps: ctx.elapsed_steps,
        pending_requests: ctx.pending_requests,
        resolved_groups: ctx.resolved_groups,
        total_groups: ctx.total_groups,
        external_flags: ctx.external_flags,
        causality_summary: ptr::null(),
    }
}

fn termination_from_raw(raw: &chronon_termination_config) -> TerminationConfig {
    let custom = raw.custom_callback.map(|callback| {
        let user_data = UserData(raw.custom_callback_user_data);
        Arc::new(move |ctx: &TerminationContext| {
            let user_data = user_data;
            let raw_ctx = context_to_raw(ctx);
            unsafe { callback(&raw_ctx, user_data.0) != 0 }
        }) as Arc<TerminationFn>
    });
    TerminationConfig {
        step_limit: raw.step_limit,
        safety_cap: raw.safety_cap,
        terminate_on_request_drain: raw.terminate_on_request_drain != 0,
        terminate_on_group_resolution: raw.terminate_on_group_resolution != 0,
        required_external_flags: raw.required_external_flags,
        custom,
    }
}

fn result_code(result: Result<(), AxisError>) -> i32 {
    match result {
        Ok(()) => CHRONON_OK,
        Err(err) => err.code(),
    }
}

// =============================================================================
// Defaults
// =============================================================================

/// Returns the default termination configuration: safety cap of 10 000
/// steps, everything else disabled.
#[unsafe(no_mangle)]
pub extern "C" fn chronon_termination_default_config() -> chronon_termination_config {
    chronon_termination_config {
        step_limit: 0,
        safety_cap: 10_000,
        terminate_on_request_drain: 0,
        terminate_on_group_resolution: 0,
        required_external_flags: 0,
        custom_callback: None,
        custom_callback_user_data: ptr::null_mut(),
    }
}

/// Returns the default axis configuration.
#[unsafe(no_mangle)]
pub extern "C" fn chronon_axis_default_config() -> chronon_axis_config {
    chronon_axis_config {
        worker_thread_count: 0,
        max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
        anchor_interval: DEFAULT_ANCHOR_INTERVAL,
        max_anchors: DEFAULT_MAX_ANCHORS,
        initial_conflict_group_capacity: 32,
        termination_config: ptr::null(),
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Creates a time axis. A null `config` uses the defaults.
///
/// # Safety
/// `out_axis` must be a valid pointer. If `config` is non-null it (and
/// its `termination_config`, when non-null) must point to initialized
/// structures. The returned handle must be released with
/// [`chronon_axis_destroy`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_create(
    config: *const chronon_axis_config,
    out_axis: *mut *mut chronon_axis,
) -> i32 {
    if out_axis.is_null() {
        return AxisError::InvalidParameter.code();
    }
    unsafe {
        *out_axis = ptr::null_mut();
    }
    let raw = if config.is_null() {
        chronon_axis_default_config()
    } else {
        unsafe { *config }
    };
    let raw_termination = if raw.termination_config.is_null() {
        chronon_termination_default_config()
    } else {
        unsafe { *raw.termination_config }
    };
    let axis_config = AxisConfig {
        worker_threads: raw.worker_thread_count,
        max_pending_requests: raw.max_pending_requests,
        anchor_interval: raw.anchor_interval,
        max_anchors: raw.max_anchors,
        initial_conflict_group_capacity: raw.initial_conflict_group_capacity,
        termination: termination_from_raw(&raw_termination),
    };
    match TimeAxis::new(axis_config) {
        Ok(inner) => {
            let handle = Box::new(chronon_axis {
                inner,
                raw_termination,
            });
            unsafe {
                *out_axis = Box::into_raw(handle);
            }
            CHRONON_OK
        }
        Err(err) => err.code(),
    }
}

/// Releases an axis created by [`chronon_axis_create`]. Null is a no-op.
///
/// # Safety
/// `axis` must be a pointer previously returned by
/// [`chronon_axis_create`] that has not already been destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_destroy(axis: *mut chronon_axis) {
    if axis.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(axis));
    }
}

// =============================================================================
// Time progression
// =============================================================================

/// Advances the axis by one slot.
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_tick(axis: *mut chronon_axis) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => result_code(axis.inner.tick()),
        None => AxisError::InvalidParameter.code(),
    }
}

/// Ticks up to `count` times, stopping at the first failure.
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_tick_multiple(axis: *mut chronon_axis, count: u32) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => result_code(axis.inner.tick_multiple(count)),
        None => AxisError::InvalidParameter.code(),
    }
}

/// Returns the current slot, or the invalid-slot sentinel for a null
/// handle.
///
/// # Safety
/// `axis` must be a live handle or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_current_slot(axis: *const chronon_axis) -> u64 {
    match unsafe { axis.as_ref() } {
        Some(axis) => axis.inner.current_slot(),
        None => SLOT_INVALID,
    }
}

// =============================================================================
// Conflict groups
// =============================================================================

/// Creates a conflict group with a built-in policy: 0 Priority, 1
/// LastWriter, 2 FirstWriter. Custom policies use
/// [`chronon_axis_create_conflict_group_custom`].
///
/// # Safety
/// `axis` must be a live handle; `out_group` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_create_conflict_group(
    axis: *mut chronon_axis,
    policy: u32,
    out_group: *mut u32,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    if out_group.is_null() {
        return AxisError::InvalidParameter.code();
    }
    let policy = match policy {
        0 => ConflictPolicy::Priority,
        1 => ConflictPolicy::LastWriter,
        2 => ConflictPolicy::FirstWriter,
        3 => return AxisError::InvalidPolicy.code(),
        _ => return AxisError::InvalidParameter.code(),
    };
    match axis.inner.create_conflict_group(policy) {
        Ok(id) => {
            unsafe {
                *out_group = id;
            }
            CHRONON_OK
        }
        Err(err) => err.code(),
    }
}

/// Creates a conflict group resolved by a custom callback.
///
/// # Safety
/// `axis` must be a live handle; `out_group` must be valid. The
/// callback and `user_data` must stay valid and thread-safe for the
/// lifetime of the axis.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_create_conflict_group_custom(
    axis: *mut chronon_axis,
    policy_fn: Option<chronon_custom_policy_fn>,
    user_data: *mut c_void,
    out_group: *mut u32,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    let Some(policy_fn) = policy_fn else {
        return AxisError::InvalidParameter.code();
    };
    if out_group.is_null() {
        return AxisError::InvalidParameter.code();
    }
    let user_data = UserData(user_data);
    let select = move |group_id: u32, descs: &[StateChangeDesc]| -> Option<usize> {
        let user_data = user_data;
        let raw_descs: Vec<chronon_state_change_desc> = descs.iter().map(desc_to_raw).collect();
        let mut winner: usize = 0;
        let status = unsafe {
            policy_fn(
                group_id,
                raw_descs.as_ptr(),
                raw_descs.len(),
                &mut winner,
                user_data.0,
            )
        };
        (status == 0).then_some(winner)
    };
    match axis.inner.create_conflict_group_custom(select) {
        Ok(id) => {
            unsafe {
                *out_group = id;
            }
            CHRONON_OK
        }
        Err(err) => err.code(),
    }
}

/// Destroys a conflict group; its id is retired, never reused.
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_destroy_conflict_group(
    axis: *mut chronon_axis,
    group_id: u32,
) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => result_code(axis.inner.destroy_conflict_group(group_id)),
        None => AxisError::InvalidParameter.code(),
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Submits one state-change request; the assigned id is written to
/// `out_id` when it is non-null.
///
/// # Safety
/// `axis` must be a live handle; `desc` must be valid; `out_id` may be
/// null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_submit_request(
    axis: *mut chronon_axis,
    desc: *const chronon_state_change_desc,
    out_id: *mut u64,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    let Some(raw) = (unsafe { desc.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    let Some(desc) = desc_from_raw(raw) else {
        return AxisError::InvalidParameter.code();
    };
    match axis.inner.submit(desc) {
        Ok(id) => {
            if !out_id.is_null() {
                unsafe {
                    *out_id = id;
                }
            }
            CHRONON_OK
        }
        Err(err) => err.code(),
    }
}

/// Submits a batch atomically: either every request is admitted or none
/// is. Assigned ids are written to `out_ids` when it is non-null.
///
/// # Safety
/// `axis` must be a live handle; `descs` must point to `count`
/// initialized descriptions; `out_ids`, when non-null, must have room
/// for `count` ids.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_submit_request_batch(
    axis: *mut chronon_axis,
    descs: *const chronon_state_change_desc,
    count: usize,
    out_ids: *mut u64,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    if descs.is_null() || count == 0 {
        return AxisError::InvalidParameter.code();
    }
    let raw_descs = unsafe { std::slice::from_raw_parts(descs, count) };
    let mut converted = Vec::with_capacity(count);
    for raw in raw_descs {
        match desc_from_raw(raw) {
            Some(desc) => converted.push(desc),
            None => return AxisError::InvalidParameter.code(),
        }
    }
    match axis.inner.submit_batch(&converted) {
        Ok(ids) => {
            if !out_ids.is_null() {
                let out = unsafe { std::slice::from_raw_parts_mut(out_ids, count) };
                out.copy_from_slice(&ids);
            }
            CHRONON_OK
        }
        Err(err) => err.code(),
    }
}

/// Cancels a pending request.
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_cancel_request(
    axis: *mut chronon_axis,
    request_id: u64,
) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) if request_id != REQUEST_ID_INVALID => {
            result_code(axis.inner.cancel(request_id))
        }
        Some(_) => AxisError::InvalidParameter.code(),
        None => AxisError::InvalidParameter.code(),
    }
}

/// Returns the number of live requests targeting `slot_index`; past and
/// current slots (and a null handle) answer 0.
///
/// # Safety
/// `axis` must be a live handle or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_pending_request_count(
    axis: *const chronon_axis,
    slot_index: u64,
) -> usize {
    match unsafe { axis.as_ref() } {
        Some(axis) => axis.inner.pending_request_count(slot_index),
        None => 0,
    }
}

// =============================================================================
// Anchors and reconstruction
// =============================================================================

/// Returns the oldest reconstructible slot, or the invalid-slot
/// sentinel for a null handle.
///
/// # Safety
/// `axis` must be a live handle or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_oldest_reconstructible_slot(
    axis: *const chronon_axis,
) -> u64 {
    match unsafe { axis.as_ref() } {
        Some(axis) => axis.inner.oldest_reconstructible_slot(),
        None => SLOT_INVALID,
    }
}

/// Builds the reconstruction key for `slot_index`.
///
/// # Safety
/// `axis` must be a live handle; `out_key` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_reconstruction_key(
    axis: *const chronon_axis,
    slot_index: u64,
    out_key: *mut chronon_reconstruction_key,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    if out_key.is_null() {
        return AxisError::InvalidParameter.code();
    }
    match axis.inner.reconstruction_key(slot_index) {
        Ok(key) => {
            unsafe {
                *out_key = chronon_reconstruction_key {
                    anchor_id: key.anchor_id,
                    target_slot: key.target_slot,
                    transition_hash: key.transition_hash.0,
                    resolution_hash: key.resolution_hash.0,
                };
            }
            CHRONON_OK
        }
        Err(err) => err.code(),
    }
}

/// Creates an anchor at the current slot.
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_create_anchor_now(axis: *mut chronon_axis) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => {
            axis.inner.create_anchor_now();
            CHRONON_OK
        }
        None => AxisError::InvalidParameter.code(),
    }
}

/// Changes the automatic anchor interval (must be non-zero).
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_anchor_interval(
    axis: *mut chronon_axis,
    interval: u32,
) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => result_code(axis.inner.set_anchor_interval(interval)),
        None => AxisError::InvalidParameter.code(),
    }
}

/// Enumerates the reconstructed state at `slot_index` through
/// `enumerator`. Pass the invalid-group sentinel (`u32::MAX`) as
/// `group_id` to disable group filtering.
///
/// # Safety
/// `axis` must be a live handle; `enumerator` must be a valid callback
/// for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_reconstruct_state(
    axis: *const chronon_axis,
    slot_index: u64,
    group_id: u32,
    enumerator: Option<chronon_state_enumerator>,
    user_data: *mut c_void,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    let Some(enumerator) = enumerator else {
        return AxisError::InvalidParameter.code();
    };
    let filter = (group_id != GROUP_INVALID).then_some(group_id);
    let result = axis.inner.reconstruct_state(slot_index, filter, |key, value| {
        let raw_key = chronon_state_key {
            primary: key.primary,
            secondary: key.secondary,
        };
        let raw_value = chronon_state_value { bits: value.bits() };
        unsafe { enumerator(&raw_key, &raw_value, user_data) == 0 }
    });
    result_code(result)
}

/// Reads one key's value at `slot_index`.
///
/// # Safety
/// `axis` must be a live handle; `key` and `out_value` must be valid
/// pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_query_state(
    axis: *const chronon_axis,
    slot_index: u64,
    key: *const chronon_state_key,
    out_value: *mut chronon_state_value,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    let Some(raw_key) = (unsafe { key.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    if out_value.is_null() {
        return AxisError::InvalidParameter.code();
    }
    let state_key = StateKey::new(raw_key.primary, raw_key.secondary);
    match axis.inner.query_state(slot_index, &state_key) {
        Ok(value) => {
            unsafe {
                *out_value = chronon_state_value { bits: value.bits() };
            }
            CHRONON_OK
        }
        Err(err) => err.code(),
    }
}

// =============================================================================
// Stats and debug
// =============================================================================

/// Copies the axis's counters into `out_stats`.
///
/// # Safety
/// `axis` must be a live handle; `out_stats` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_stats(
    axis: *const chronon_axis,
    out_stats: *mut chronon_stats,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    if out_stats.is_null() {
        return AxisError::InvalidParameter.code();
    }
    let stats = axis.inner.stats();
    unsafe {
        *out_stats = chronon_stats {
            current_slot: stats.current_slot,
            oldest_reconstructible: stats.oldest_reconstructible,
            total_requests_processed: stats.total_requests_processed,
            total_conflicts_resolved: stats.total_conflicts_resolved,
            active_conflict_groups: stats.active_conflict_groups,
            current_anchor_count: stats.current_anchor_count,
            memory_usage_bytes: stats.memory_usage_bytes,
        };
    }
    CHRONON_OK
}

/// Installs (or, with a null callback, removes) the commit callback.
///
/// # Safety
/// `axis` must be a live handle. The callback and `user_data` must stay
/// valid until replaced or the axis is destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_commit_callback(
    axis: *mut chronon_axis,
    callback: Option<chronon_commit_fn>,
    user_data: *mut c_void,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    match callback {
        Some(callback) => {
            let user_data = UserData(user_data);
            axis.inner.set_commit_hook(move |slot, changes| unsafe {
                let user_data = user_data;
                callback(slot, changes, user_data.0);
            });
        }
        None => axis.inner.clear_commit_hook(),
    }
    CHRONON_OK
}

// =============================================================================
// Termination policy surface
// =============================================================================

/// Copies the termination configuration the axis was created with.
///
/// # Safety
/// `axis` must be a live handle; `out_config` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_termination_config(
    axis: *const chronon_axis,
    out_config: *mut chronon_termination_config,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    if out_config.is_null() {
        return AxisError::InvalidParameter.code();
    }
    unsafe {
        *out_config = axis.raw_termination;
    }
    CHRONON_OK
}

/// Rejected: the termination policy is immutable after creation.
///
/// # Safety
/// Callable with any arguments; never dereferences them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_termination_config(
    _axis: *mut chronon_axis,
    _config: *const chronon_termination_config,
) -> i32 {
    AxisError::PolicyLocked.code()
}

/// Rejected: the termination policy is immutable after creation.
///
/// # Safety
/// Callable with any arguments; never dereferences them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_termination_by_step_limit(
    _axis: *mut chronon_axis,
    _max_steps: u32,
) -> i32 {
    AxisError::PolicyLocked.code()
}

/// Rejected: the termination policy is immutable after creation.
///
/// # Safety
/// Callable with any arguments; never dereferences them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_termination_on_request_drain(
    _axis: *mut chronon_axis,
    _enabled: c_int,
) -> i32 {
    AxisError::PolicyLocked.code()
}

/// Rejected: the termination policy is immutable after creation.
///
/// # Safety
/// Callable with any arguments; never dereferences them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_termination_on_group_resolution(
    _axis: *mut chronon_axis,
    _enabled: c_int,
) -> i32 {
    AxisError::PolicyLocked.code()
}

/// Rejected: the termination policy is immutable after creation.
///
/// # Safety
/// Callable with any arguments; never dereferences them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_termination_on_external_signal(
    _axis: *mut chronon_axis,
    _required_flags_mask: u32,
) -> i32 {
    AxisError::PolicyLocked.code()
}

/// Rejected: the termination policy is immutable after creation.
///
/// # Safety
/// Callable with any arguments; never dereferences them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_termination_safety_cap(
    _axis: *mut chronon_axis,
    _max_steps_cap: u32,
) -> i32 {
    AxisError::PolicyLocked.code()
}

/// Rejected: the termination policy is immutable after creation.
///
/// # Safety
/// Callable with any arguments; never dereferences them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_custom_termination_callback(
    _axis: *mut chronon_axis,
    _callback: Option<chronon_termination_fn>,
    _user_data: *mut c_void,
) -> i32 {
    AxisError::PolicyLocked.code()
}

/// Raises external signal bits (atomic OR).
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_set_external_signal(
    axis: *mut chronon_axis,
    flag: u32,
) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => {
            axis.inner.set_external_signal(flag);
            CHRONON_OK
        }
        None => AxisError::InvalidParameter.code(),
    }
}

/// Clears external signal bits (atomic AND-NOT).
///
/// # Safety
/// `axis` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_clear_external_signal(
    axis: *mut chronon_axis,
    flag: u32,
) -> i32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => {
            axis.inner.clear_external_signal(flag);
            CHRONON_OK
        }
        None => AxisError::InvalidParameter.code(),
    }
}

/// Copies the termination context as of the last evaluation, with a
/// fresh snapshot of the signal mask.
///
/// # Safety
/// `axis` must be a live handle; `out_context` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_termination_context(
    axis: *const chronon_axis,
    out_context: *mut chronon_termination_context,
) -> i32 {
    let Some(axis) = (unsafe { axis.as_ref() }) else {
        return AxisError::InvalidParameter.code();
    };
    if out_context.is_null() {
        return AxisError::InvalidParameter.code();
    }
    let context = axis.inner.termination_context();
    unsafe {
        *out_context = context_to_raw(&context);
    }
    CHRONON_OK
}

/// Returns the last termination reason: 0 none, 1 safety cap, 2 step
/// limit, 3 request drain, 4 group resolution, 5 external signal, 6
/// custom callback.
///
/// # Safety
/// `axis` must be a live handle or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_last_termination_reason(
    axis: *const chronon_axis,
) -> u32 {
    match unsafe { axis.as_ref() } {
        Some(axis) => axis
            .inner
            .last_termination_reason()
            .map_or(0, chronon_core::TerminationReason::code),
        None => 0,
    }
}

/// Returns the immutable policy fingerprint, or 0 for a null handle.
///
/// # Safety
/// `axis` must be a live handle or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn chronon_axis_get_termination_policy_hash(
    axis: *const chronon_axis,
) -> u64 {
    match unsafe { axis.as_ref() } {
        Some(axis) => axis.inner.termination_policy_hash(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn make_axis(config: *const chronon_axis_config) -> *mut chronon_axis {
        let mut axis: *mut chronon_axis = ptr::null_mut();
        let status = unsafe { chronon_axis_create(config, &mut axis) };
        assert_eq!(status, CHRONON_OK);
        assert!(!axis.is_null());
        axis
    }

    fn set_desc(slot: u64, group: u32, primary: u64, bits: u64) -> chronon_state_change_desc {
        chronon_state_change_desc {
            target_slot: slot,
            conflict_group: group,
            priority: 0,
            key: chronon_state_key {
                primary,
                secondary: 0,
            },
            mutation_type: 0,
            value: chronon_state_value { bits },
        }
    }

    #[test]
    fn ffi_submit_tick_query_roundtrip() {
        unsafe {
            let axis = make_axis(ptr::null());
            let mut group = 0u32;
            assert_eq!(
                chronon_axis_create_conflict_group(axis, 2, &mut group),
                CHRONON_OK
            );
            let desc = set_desc(1, group, 7, 42);
            let mut id = 0u64;
            assert_eq!(chronon_axis_submit_request(axis, &desc, &mut id), CHRONON_OK);
            assert_eq!(chronon_axis_tick(axis), CHRONON_OK);
            assert_eq!(chronon_axis_get_current_slot(axis), 1);

            let key = chronon_state_key {
                primary: 7,
                secondary: 0,
            };
            let mut value = chronon_state_value { bits: 0 };
            assert_eq!(
                chronon_axis_query_state(axis, 1, &key, &mut value),
                CHRONON_OK
            );
            assert_eq!(value.bits, 42);

            let mut stats = chronon_stats {
                current_slot: 0,
                oldest_reconstructible: 0,
                total_requests_processed: 0,
                total_conflicts_resolved: 0,
                active_conflict_groups: 0,
                current_anchor_count: 0,
                memory_usage_bytes: 0,
            };
            assert_eq!(chronon_axis_get_stats(axis, &mut stats), CHRONON_OK);
            assert_eq!(stats.total_requests_processed, 1);
            chronon_axis_destroy(axis);
        }
    }

    #[test]
    fn ffi_policy_mutators_are_locked() {
        unsafe {
            let axis = make_axis(ptr::null());
            let locked = AxisError::PolicyLocked.code();
            assert_eq!(chronon_axis_set_termination_by_step_limit(axis, 5), locked);
            assert_eq!(
                chronon_axis_set_termination_on_request_drain(axis, 1),
                locked
            );
            assert_eq!(chronon_axis_set_termination_safety_cap(axis, 5), locked);
            assert_eq!(
                chronon_axis_set_termination_config(axis, ptr::null()),
                locked
            );
            chronon_axis_destroy(axis);
        }
    }

    #[test]
    fn ffi_two_axes_with_equal_configs_share_a_policy_hash() {
        unsafe {
            let mut termination = chronon_termination_default_config();
            termination.step_limit = 9;
            let mut config = chronon_axis_default_config();
            config.termination_config = &termination;

            let a = make_axis(&config);
            let b = make_axis(&config);
            assert_eq!(
                chronon_axis_get_termination_policy_hash(a),
                chronon_axis_get_termination_policy_hash(b)
            );
            chronon_axis_destroy(a);
            chronon_axis_destroy(b);
        }
    }

    #[test]
    fn ffi_step_limit_terminates() {
        unsafe {
            let mut termination = chronon_termination_default_config();
            termination.step_limit = 2;
            let mut config = chronon_axis_default_config();
            config.termination_config = &termination;

            let axis = make_axis(&config);
            assert_eq!(chronon_axis_tick(axis), CHRONON_OK);
            assert_eq!(chronon_axis_get_last_termination_reason(axis), 0);
            assert_eq!(chronon_axis_tick(axis), CHRONON_OK);
            assert_eq!(chronon_axis_get_last_termination_reason(axis), 2);
            assert_eq!(chronon_axis_tick(axis), AxisError::Terminated.code());
            chronon_axis_destroy(axis);
        }
    }

    #[test]
    fn ffi_bad_mutation_code_is_rejected() {
        unsafe {
            let axis = make_axis(ptr::null());
            let mut desc = set_desc(1, 0, 1, 1);
            desc.mutation_type = 99;
            assert_eq!(
                chronon_axis_submit_request(axis, &desc, ptr::null_mut()),
                AxisError::InvalidParameter.code()
            );
            chronon_axis_destroy(axis);
        }
    }
}
