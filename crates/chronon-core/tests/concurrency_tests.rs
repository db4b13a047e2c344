// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Concurrency smoke tests: many submitter threads against one tick
//! thread, and signal updates racing termination evaluation.

mod common;

use std::sync::Arc;
use std::thread;

use chronon_core::{AxisError, ConflictPolicy, SIGNAL_USER_DEFINED_2};
use common::{key, quiet_axis, set_desc};

#[test]
fn concurrent_submitters_with_a_single_ticker() {
    let axis = Arc::new(quiet_axis());
    let group = axis
        .create_conflict_group(ConflictPolicy::LastWriter)
        .expect("group");

    let submitters: Vec<_> = (0..4u64)
        .map(|thread_index| {
            let axis = Arc::clone(&axis);
            thread::spawn(move || {
                let mut accepted = 0u64;
                for i in 0..200u64 {
                    // Far-future slots so the race with the ticker never
                    // invalidates the target.
                    let slot = 50 + (i % 10);
                    let desc = set_desc(slot, group, key(thread_index), i);
                    match axis.submit(desc) {
                        Ok(_) => accepted += 1,
                        Err(AxisError::SlotInPast) => {}
                        Err(err) => panic!("unexpected submit error: {err}"),
                    }
                }
                accepted
            })
        })
        .collect();

    let ticker = {
        let axis = Arc::clone(&axis);
        thread::spawn(move || {
            for _ in 0..20 {
                axis.tick().expect("tick");
            }
        })
    };

    let accepted: u64 = submitters
        .into_iter()
        .map(|handle| handle.join().expect("submitter"))
        .sum();
    ticker.join().expect("ticker");

    assert_eq!(accepted, 800);
    assert_eq!(axis.current_slot(), 20);

    // Drain the remaining slots; every accepted request either committed
    // or was collected on its slot.
    while axis.current_slot() < 60 {
        axis.tick().expect("tick");
    }
    assert_eq!(axis.stats().total_requests_processed, 800);
}

#[test]
fn signal_updates_race_cleanly_with_ticks() {
    let axis = Arc::new(quiet_axis());
    let signaller = {
        let axis = Arc::clone(&axis);
        thread::spawn(move || {
            for _ in 0..500 {
                axis.set_external_signal(SIGNAL_USER_DEFINED_2);
                axis.clear_external_signal(SIGNAL_USER_DEFINED_2);
            }
        })
    };
    for _ in 0..50 {
        axis.tick().expect("tick");
    }
    signaller.join().expect("signaller");
    // The policy requires no flags, so the axis never terminates from
    // the raced updates.
    assert!(!axis.is_terminated());
    assert_eq!(axis.current_slot(), 50);
}
