// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Termination policy: the immutable stop criteria of a time axis.
//!
//! The policy is fixed at axis creation and hashed once; that hash is
//! the axis's semantic fingerprint. Anchors record it, reconstruction
//! verifies it, and every mutator on the policy answers `PolicyLocked`.
//!
//! Evaluation order is a deterministic contract; replay depends on it:
//! 1. safety cap, 2. step limit, 3. request drain, 4. group resolution,
//! 5. external signal, 6. custom callback. First match wins.

use std::fmt;
use std::sync::Arc;

use crate::hash::fold64;

/// Network frame synchronization signal (engine-reserved bit 0).
pub const SIGNAL_NETWORK_SYNC: u32 = 1 << 0;
/// Server authority signal (engine-reserved bit 1).
pub const SIGNAL_SERVER_AUTHORITY: u32 = 1 << 1;
/// Scene or level transition signal (engine-reserved bit 2).
pub const SIGNAL_SCENE_TRANSITION: u32 = 1 << 2;
/// Pause request signal (engine-reserved bit 3).
pub const SIGNAL_PAUSE_REQUEST: u32 = 1 << 3;
/// Force-commit signal (engine-reserved bit 4).
pub const SIGNAL_FORCE_COMMIT: u32 = 1 << 4;
/// First user-reserved signal bit.
pub const SIGNAL_USER_DEFINED_1: u32 = 1 << 16;
/// Second user-reserved signal bit.
pub const SIGNAL_USER_DEFINED_2: u32 = 1 << 17;
/// Third user-reserved signal bit.
pub const SIGNAL_USER_DEFINED_3: u32 = 1 << 18;
/// Fourth user-reserved signal bit.
pub const SIGNAL_USER_DEFINED_4: u32 = 1 << 19;

/// Sentinel folded into the policy hash when a custom callback is
/// present. The callback itself is never hashed (addresses are not
/// stable across runs); only its presence is.
const CUSTOM_CALLBACK_SENTINEL: u64 = 0xdead_beef_cafe_babe;

/// Seed for the policy hash fold.
const POLICY_HASH_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Custom termination predicate, evaluated last.
///
/// Must be deterministic over the context and must not touch engine
/// state; it observes meta-state only.
pub type TerminationFn = dyn Fn(&TerminationContext) -> bool + Send + Sync;

/// Reserved causal-dependency metrics.
///
/// Always absent in the current scope; carried so the context shape is
/// forward-compatible. Never participates in the policy hash.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CausalitySummary {
    /// Causal events processed.
    pub causal_event_count: u64,
    /// Unresolved causal dependencies.
    pub unresolved_dependencies: u64,
    /// Committed state mutations.
    pub committed_mutations: u64,
}

/// Meta-observations the policy is evaluated against after each tick.
///
/// Field semantics are load-bearing and must not drift:
/// - `elapsed_steps`: cumulative completed ticks, incremented exactly
///   once per tick, never reset;
/// - `pending_requests`: queue size after this tick's removals;
/// - `resolved_groups`: groups that completed resolution this tick;
/// - `total_groups`: groups observed (had requests) this tick;
/// - `external_flags`: single atomic snapshot of the signal mask;
/// - `causality_summary`: reserved, always `None`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerminationContext {
    /// Cumulative ticks executed.
    pub elapsed_steps: u32,
    /// Snapshot of remaining queue size.
    pub pending_requests: u32,
    /// Groups that completed resolution this tick.
    pub resolved_groups: u32,
    /// Groups observed this tick.
    pub total_groups: u32,
    /// Runtime signal bitmask at evaluation time.
    pub external_flags: u32,
    /// Reserved for causality metrics; always `None`.
    pub causality_summary: Option<CausalitySummary>,
}

/// Why the axis terminated.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// The hard safety cap on elapsed steps was reached.
    SafetyCap,
    /// The configured step limit was reached.
    StepLimit,
    /// The pending-request queue drained.
    RequestDrain,
    /// Every observed group resolved.
    GroupResolution,
    /// A required external signal was raised.
    ExternalSignal,
    /// The custom callback decided to stop.
    CustomCallback,
}

impl TerminationReason {
    /// Stable wire code: `0` is reserved for "not terminated".
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::SafetyCap => 1,
            Self::StepLimit => 2,
            Self::RequestDrain => 3,
            Self::GroupResolution => 4,
            Self::ExternalSignal => 5,
            Self::CustomCallback => 6,
        }
    }
}

/// Stop-criteria bundle, immutable once the axis is created.
#[derive(Clone)]
pub struct TerminationConfig {
    /// Terminate once this many ticks have elapsed (`0` = disabled).
    pub step_limit: u32,
    /// Hard upper bound on elapsed ticks (`0` = disabled; not
    /// recommended).
    pub safety_cap: u32,
    /// Terminate when the pending queue is empty after a tick.
    pub terminate_on_request_drain: bool,
    /// Terminate when every observed group resolved this tick.
    pub terminate_on_group_resolution: bool,
    /// Terminate when any of these signal bits is raised (`0` =
    /// disabled).
    pub required_external_flags: u32,
    /// Custom predicate, evaluated last.
    pub custom: Option<Arc<TerminationFn>>,
}

impl Default for TerminationConfig {
    /// Safety cap of 10 000 steps; every other criterion disabled.
    fn default() -> Self {
        Self {
            step_limit: 0,
            safety_cap: 10_000,
            terminate_on_request_drain: false,
            terminate_on_group_resolution: false,
            required_external_flags: 0,
            custom: None,
        }
    }
}

impl fmt::Debug for TerminationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminationConfig")
            .field("step_limit", &self.step_limit)
            .field("safety_cap", &self.safety_cap)
            .field("terminate_on_request_drain", &self.terminate_on_request_drain)
            .field(
                "terminate_on_group_resolution",
                &self.terminate_on_group_resolution,
            )
            .field("required_external_flags", &self.required_external_flags)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Computes the 64-bit semantic fingerprint of a configuration.
///
/// Every field is folded deterministically; a sentinel word records
/// custom-callback presence without hashing the callback itself.
#[must_use]
pub fn policy_hash(config: &TerminationConfig) -> u64 {
    let mut hash = POLICY_HASH_SEED;
    hash = fold64(hash, u64::from(config.step_limit));
    hash = fold64(hash, u64::from(config.safety_cap));
    hash = fold64(hash, u64::from(config.terminate_on_request_drain));
    hash = fold64(hash, u64::from(config.terminate_on_group_resolution));
    hash = fold64(hash, u64::from(config.required_external_flags));
    if config.custom.is_some() {
        hash ^= CUSTOM_CALLBACK_SENTINEL;
    }
    hash
}

/// The locked policy: configuration plus its creation-time hash.
pub(crate) struct TerminationPolicy {
    config: TerminationConfig,
    hash: u64,
}

impl TerminationPolicy {
    pub(crate) fn new(config: TerminationConfig) -> Self {
        let hash = policy_hash(&config);
        Self { config, hash }
    }

    pub(crate) fn config(&self) -> &TerminationConfig {
        &self.config
    }

    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    /// Evaluates the stop criteria in the fixed order; first match wins.
    pub(crate) fn evaluate(&self, ctx: &TerminationContext) -> Option<TerminationReason> {
        let config = &self.config;

        if config.safety_cap > 0 && ctx.elapsed_steps >= config.safety_cap {
            return Some(TerminationReason::SafetyCap);
        }
        if config.step_limit > 0 && ctx.elapsed_steps >= config.step_limit {
            return Some(TerminationReason::StepLimit);
        }
        if config.terminate_on_request_drain && ctx.pending_requests == 0 {
            return Some(TerminationReason::RequestDrain);
        }
        if config.terminate_on_group_resolution
            && ctx.total_groups > 0
            && ctx.resolved_groups >= ctx.total_groups
        {
            return Some(TerminationReason::GroupResolution);
        }
        if config.required_external_flags != 0
            && (ctx.external_flags & config.required_external_flags) != 0
        {
            return Some(TerminationReason::ExternalSignal);
        }
        if let Some(custom) = &config.custom {
            if custom(ctx) {
                return Some(TerminationReason::CustomCallback);
            }
        }
        None
    }
}
