// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! chronon-core: deterministic slot-indexed state-transition engine.
//!
//! All state mutation flows through discrete slots on a single logical
//! time axis. Submitters target future slots with change requests; each
//! tick collects the next slot's requests, resolves same-key conflicts
//! per group (in parallel, under per-group policies), commits the
//! winners in a total order, and records just enough to reconstruct any
//! past slot from a bounded ring of anchors.
//!
//! # Determinism
//!
//! Two axes created with the same configuration and driven with the
//! same request sequence commit identical state and produce identical
//! digests, regardless of worker count or scheduling:
//!
//! - winners are chosen over buckets sorted by request id;
//! - commits apply in ascending conflict-group order;
//! - hash inputs are serialized in canonical order (see [`hash`]);
//! - the termination policy is immutable and evaluated in a fixed
//!   sequence, so the stopping slot is reproducible.
//!
//! The engine never reads wall time; slots are the only clock.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::module_name_repetitions
)]

/// Deterministic hash primitives (64-bit change hash, 128-bit digests).
pub mod hash;

mod anchor;
mod axis;
mod error;
mod group;
mod ident;
mod pool;
mod request;
mod resolver;
mod termination;

pub use anchor::{AnchorData, ReconstructionKey, SlotTransition, StateCell, StateMap};
pub use axis::{
    AxisConfig, AxisStats, CommitHook, DEFAULT_ANCHOR_INTERVAL, DEFAULT_MAX_ANCHORS,
    DEFAULT_MAX_PENDING_REQUESTS, TimeAxis,
};
pub use error::AxisError;
pub use group::{ConflictPolicy, CustomPolicyFn, MAX_CONFLICT_GROUPS};
pub use hash::{Hash128, Hash128Builder};
pub use ident::{
    ConflictGroupId, GROUP_INVALID, REQUEST_ID_INVALID, RequestId, SLOT_INVALID, SlotIndex,
    StateKey, StateValue,
};
pub use request::{Mutation, PendingRequest, StateChangeDesc};
pub use resolver::{GroupResolutionResult, ResolvedChange};
pub use termination::{
    CausalitySummary, SIGNAL_FORCE_COMMIT, SIGNAL_NETWORK_SYNC, SIGNAL_PAUSE_REQUEST,
    SIGNAL_SCENE_TRANSITION, SIGNAL_SERVER_AUTHORITY, SIGNAL_USER_DEFINED_1,
    SIGNAL_USER_DEFINED_2, SIGNAL_USER_DEFINED_3, SIGNAL_USER_DEFINED_4, TerminationConfig,
    TerminationContext, TerminationFn, TerminationReason, policy_hash,
};
