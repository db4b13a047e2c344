// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared helpers for chronon-core integration tests.
#![allow(dead_code)]

use chronon_core::{
    AxisConfig, Mutation, StateChangeDesc, StateKey, StateValue, TerminationConfig, TimeAxis,
};

/// Axis with a tiny worker pool and no surprise terminations.
pub fn quiet_axis() -> TimeAxis {
    axis_with(TerminationConfig {
        safety_cap: 1_000_000,
        ..TerminationConfig::default()
    })
}

pub fn axis_with(termination: TerminationConfig) -> TimeAxis {
    TimeAxis::new(AxisConfig {
        worker_threads: 2,
        termination,
        ..AxisConfig::default()
    })
    .expect("axis construction")
}

/// A `Set` request description.
pub fn set_desc(slot: u64, group: u32, key: StateKey, bits: u64) -> StateChangeDesc {
    StateChangeDesc {
        target_slot: slot,
        conflict_group: group,
        priority: 0,
        key,
        mutation: Mutation::Set,
        value: StateValue::from_bits(bits),
    }
}

pub fn key(primary: u64) -> StateKey {
    StateKey::new(primary, 0)
}
