//! `MessageSystem` construction options (spec.md §6's recognized
//! top-level configuration), collapsed into one top-level struct since
//! this runtime has a single coordinator, not a chain of independently
//! configured subsystems.

use std::collections::HashMap;

use conclave_identity::{PermissionLevel, SecurityProfile};
use conclave_queue::{OverflowPolicy, SelectionStrategy};
use conclave_scheduler::SchedulingStrategy;
use serde::Deserialize;

/// `scheduler.*` options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub tick_budget_ms: u64,
    pub strategy: SchedulingStrategy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_budget_ms: 20, strategy: SchedulingStrategy::RoundRobin }
    }
}

/// `queue.*` options, applied to every subsystem's bounded queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
    pub selection: SelectionStrategy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 1024, overflow: OverflowPolicy::Reject, selection: SelectionStrategy::Fifo }
    }
}

/// `response.*` options, consulted by `request`/`request_protected` when
/// a message doesn't carry its own `responseTimeoutMs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseConfig {
    pub default_timeout_ms: u64,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self { default_timeout_ms: conclave_kernel::DEFAULT_RESPONSE_TIMEOUT_MS }
    }
}

/// `pool.*` options, sizing the system-wide [`conclave_message::MessagePool`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { capacity: 2048 }
    }
}

/// Top-level options recognized at `MessageSystem` construction
/// (spec.md §6).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Enables warnings for stripped caller fields, late responses, and
    /// unmatched events (spec.md §6).
    pub debug: bool,
    pub scheduler: SchedulerConfig,
    pub queue: QueueConfig,
    pub response: ResponseConfig,
    pub pool: PoolConfig,
    /// Role name → scope → permission level, applied by
    /// `MessageSystem::initialize_profiles` before bootstrap traffic.
    pub profiles: HashMap<String, HashMap<String, PermissionLevel>>,
}

impl Config {
    pub fn profiles_as_security_profiles(&self) -> Vec<SecurityProfile> {
        self.profiles
            .iter()
            .map(|(role, scopes)| {
                let mut profile = SecurityProfile::new(role.clone());
                for (scope, level) in scopes {
                    profile = profile.with_scope(scope.clone(), *level);
                }
                profile
            })
            .collect()
    }
}
