// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Request intake tests: slot validation, batch atomicity, capacity,
//! cancellation, and the conflict-group table bound.

mod common;

use chronon_core::{
    AxisConfig, AxisError, ConflictPolicy, MAX_CONFLICT_GROUPS, REQUEST_ID_INVALID,
    TerminationConfig, TimeAxis,
};
use common::{key, quiet_axis, set_desc};

#[test]
fn past_and_current_slots_are_rejected() {
    let axis = quiet_axis();
    assert_eq!(
        axis.submit(set_desc(0, 0, key(1), 1)),
        Err(AxisError::SlotInPast)
    );
    axis.tick().expect("tick");
    assert_eq!(
        axis.submit(set_desc(1, 0, key(1), 1)),
        Err(AxisError::SlotInPast)
    );
    assert_eq!(axis.pending_request_count(2), 0);
}

#[test]
fn request_ids_are_monotonic() {
    let axis = quiet_axis();
    let a = axis.submit(set_desc(1, 0, key(1), 1)).expect("submit");
    let b = axis.submit(set_desc(1, 0, key(2), 2)).expect("submit");
    let c = axis.submit(set_desc(2, 0, key(3), 3)).expect("submit");
    assert!(a < b && b < c);
}

#[test]
fn queue_capacity_is_enforced() {
    let axis = TimeAxis::new(AxisConfig {
        worker_threads: 1,
        max_pending_requests: 2,
        termination: TerminationConfig {
            safety_cap: 1_000_000,
            ..TerminationConfig::default()
        },
        ..AxisConfig::default()
    })
    .expect("axis");
    axis.submit(set_desc(1, 0, key(1), 1)).expect("submit");
    axis.submit(set_desc(1, 0, key(2), 2)).expect("submit");
    assert_eq!(
        axis.submit(set_desc(1, 0, key(3), 3)),
        Err(AxisError::RequestQueueFull)
    );
    assert_eq!(axis.pending_request_count(1), 2);
}

#[test]
fn batch_admission_is_all_or_nothing() {
    let axis = TimeAxis::new(AxisConfig {
        worker_threads: 1,
        max_pending_requests: 3,
        termination: TerminationConfig {
            safety_cap: 1_000_000,
            ..TerminationConfig::default()
        },
        ..AxisConfig::default()
    })
    .expect("axis");
    axis.submit(set_desc(1, 0, key(9), 9)).expect("submit");

    // One bad slot poisons the whole batch.
    let mixed = [
        set_desc(1, 0, key(1), 1),
        set_desc(0, 0, key(2), 2),
    ];
    assert_eq!(axis.submit_batch(&mixed), Err(AxisError::SlotInPast));
    assert_eq!(axis.pending_request_count(1), 1);

    // A batch that does not fit is rejected whole.
    let oversized = [
        set_desc(1, 0, key(1), 1),
        set_desc(1, 0, key(2), 2),
        set_desc(1, 0, key(3), 3),
    ];
    assert_eq!(
        axis.submit_batch(&oversized),
        Err(AxisError::RequestQueueFull)
    );
    assert_eq!(axis.pending_request_count(1), 1);

    // A fitting batch is admitted in order.
    let fitting = [set_desc(1, 0, key(1), 1), set_desc(1, 0, key(2), 2)];
    let ids = axis.submit_batch(&fitting).expect("batch");
    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);
    assert_eq!(axis.pending_request_count(1), 3);
}

#[test]
fn empty_batch_is_invalid() {
    let axis = quiet_axis();
    assert_eq!(axis.submit_batch(&[]), Err(AxisError::InvalidParameter));
}

#[test]
fn cancelled_requests_do_not_commit() {
    let axis = quiet_axis();
    let group = axis
        .create_conflict_group(ConflictPolicy::FirstWriter)
        .expect("group");
    let doomed = axis.submit(set_desc(1, group, key(1), 111)).expect("submit");
    axis.submit(set_desc(1, group, key(2), 222)).expect("submit");
    axis.cancel(doomed).expect("cancel");
    assert_eq!(axis.pending_request_count(1), 1);
    axis.tick().expect("tick");
    assert_eq!(axis.query_state(1, &key(1)), Err(AxisError::NotFound));
    assert_eq!(axis.query_state(1, &key(2)).expect("query").bits(), 222);
}

#[test]
fn cancel_is_single_shot_and_validates_its_id() {
    let axis = quiet_axis();
    let id = axis.submit(set_desc(1, 0, key(1), 1)).expect("submit");
    assert_eq!(axis.cancel(REQUEST_ID_INVALID), Err(AxisError::InvalidParameter));
    axis.cancel(id).expect("cancel");
    assert_eq!(axis.cancel(id), Err(AxisError::NotFound));
    assert_eq!(axis.cancel(999_999), Err(AxisError::NotFound));
}

#[test]
fn group_ids_are_never_reused() {
    let axis = quiet_axis();
    let first = axis
        .create_conflict_group(ConflictPolicy::FirstWriter)
        .expect("group");
    axis.destroy_conflict_group(first).expect("destroy");
    let second = axis
        .create_conflict_group(ConflictPolicy::FirstWriter)
        .expect("group");
    assert_ne!(first, second);
    assert!(second > first);
}

#[test]
fn custom_policy_needs_the_custom_constructor() {
    let axis = quiet_axis();
    let result = axis.create_conflict_group(ConflictPolicy::Custom(std::sync::Arc::new(
        |_, _: &[chronon_core::StateChangeDesc]| Some(0),
    )));
    assert_eq!(result.map(|_| ()), Err(AxisError::InvalidPolicy));
}

#[test]
fn group_table_fills_at_the_bound() {
    let axis = quiet_axis();
    for _ in 0..MAX_CONFLICT_GROUPS {
        axis.create_conflict_group(ConflictPolicy::FirstWriter)
            .expect("group");
    }
    assert_eq!(
        axis.create_conflict_group(ConflictPolicy::FirstWriter)
            .map(|_| ()),
        Err(AxisError::ConflictGroupFull)
    );
    // Destroying does not free a table slot; ids are never recycled.
    axis.destroy_conflict_group(0).expect("destroy");
    assert_eq!(
        axis.create_conflict_group(ConflictPolicy::FirstWriter)
            .map(|_| ()),
        Err(AxisError::ConflictGroupFull)
    );
}

#[test]
fn destroying_an_unknown_group_is_not_found() {
    let axis = quiet_axis();
    assert_eq!(axis.destroy_conflict_group(42), Err(AxisError::NotFound));
}
