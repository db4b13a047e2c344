// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property tests for replay determinism: random request loads drive
//! two axes to identical state, and independent writes commit the same
//! result whatever order they were submitted in.

mod common;

use std::collections::{BTreeMap, BTreeSet};

use chronon_core::{
    ConflictPolicy, Mutation, StateChangeDesc, StateKey, StateValue, TimeAxis,
};
use common::quiet_axis;
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
struct Write {
    primary: u64,
    group: u32,
    priority: i32,
    bits: u64,
}

fn write_strategy() -> impl Strategy<Value = Write> {
    (0u64..8, 0u32..3, -5i32..5, any::<u64>()).prop_map(|(primary, group, priority, bits)| {
        Write {
            primary,
            group,
            priority,
            bits,
        }
    })
}

fn desc_of(write: Write, slot: u64) -> StateChangeDesc {
    StateChangeDesc {
        target_slot: slot,
        conflict_group: write.group,
        priority: write.priority,
        key: StateKey::new(write.primary, 0),
        mutation: Mutation::Set,
        value: StateValue::from_bits(write.bits),
    }
}

fn axis_with_groups() -> TimeAxis {
    let axis = quiet_axis();
    for policy in [
        ConflictPolicy::Priority,
        ConflictPolicy::LastWriter,
        ConflictPolicy::FirstWriter,
    ] {
        axis.create_conflict_group(policy).expect("group");
    }
    axis
}

fn committed_state(axis: &TimeAxis, slot: u64) -> BTreeMap<u64, u64> {
    let mut state = BTreeMap::new();
    axis.reconstruct_state(slot, None, |key, value| {
        state.insert(key.primary, value.bits());
        true
    })
    .expect("reconstruct");
    state
}

proptest! {
    #[test]
    fn identical_request_sequences_commit_identical_state(
        writes in proptest::collection::vec(write_strategy(), 1..40),
    ) {
        let a = axis_with_groups();
        let b = axis_with_groups();
        for write in &writes {
            a.submit(desc_of(*write, 1)).expect("submit a");
            b.submit(desc_of(*write, 1)).expect("submit b");
        }
        a.tick().expect("tick a");
        b.tick().expect("tick b");

        prop_assert_eq!(committed_state(&a, 1), committed_state(&b, 1));
        let rk_a = a.reconstruction_key(1).expect("key a");
        let rk_b = b.reconstruction_key(1).expect("key b");
        prop_assert_eq!(rk_a.transition_hash, rk_b.transition_hash);
        prop_assert_eq!(rk_a.resolution_hash, rk_b.resolution_hash);
    }

    #[test]
    fn independent_writes_commit_the_same_state_in_any_order(
        writes in proptest::collection::vec(write_strategy(), 1..20)
            .prop_map(|ws| {
                // Keep one write per key so no conflicts exist.
                let mut seen = BTreeSet::new();
                ws.into_iter()
                    .filter(|w| seen.insert(w.primary))
                    .collect::<Vec<_>>()
            }),
        seed in any::<u64>(),
    ) {
        let mut shuffled = writes.clone();
        // Deterministic Fisher-Yates driven by the seed.
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }

        let a = axis_with_groups();
        let b = axis_with_groups();
        for write in &writes {
            a.submit(desc_of(*write, 1)).expect("submit a");
        }
        for write in &shuffled {
            b.submit(desc_of(*write, 1)).expect("submit b");
        }
        a.tick().expect("tick a");
        b.tick().expect("tick b");

        prop_assert_eq!(committed_state(&a, 1), committed_state(&b, 1));
    }
}
