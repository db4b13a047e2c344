// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tick throughput under a mixed conflict load.

use criterion::{Criterion, criterion_group, criterion_main};

use chronon_core::{
    AxisConfig, ConflictPolicy, Mutation, StateChangeDesc, StateKey, StateValue,
    TerminationConfig, TimeAxis,
};

fn load_axis(groups: u32, requests_per_group: u64) -> TimeAxis {
    let axis = TimeAxis::new(AxisConfig {
        termination: TerminationConfig {
            safety_cap: 0,
            ..TerminationConfig::default()
        },
        ..AxisConfig::default()
    })
    .expect("axis");
    let mut ids = Vec::new();
    for _ in 0..groups {
        ids.push(
            axis.create_conflict_group(ConflictPolicy::Priority)
                .expect("group"),
        );
    }
    let slot = axis.current_slot() + 1;
    for group in &ids {
        for i in 0..requests_per_group {
            axis.submit(StateChangeDesc {
                target_slot: slot,
                conflict_group: *group,
                priority: (i % 7) as i32,
                key: StateKey::new(i % 16, 0),
                mutation: Mutation::Set,
                value: StateValue::from_bits(i),
            })
            .expect("submit");
        }
    }
    axis
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_8_groups_64_requests", |b| {
        b.iter_batched(
            || load_axis(8, 64),
            |axis| axis.tick().expect("tick"),
            criterion::BatchSize::SmallInput,
        );
    });
    c.bench_function("tick_empty", |b| {
        b.iter_batched(
            || load_axis(0, 0),
            |axis| axis.tick().expect("tick"),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
