//! Supervisor-facing process descriptors.
//!
//! Field names follow the process-compose document format so the serialised
//! graph can be handed to the supervisor unchanged.

use std::collections::BTreeMap;

use pgdev_config::{DependencyEdge, ProbeConfig};
use serde::{Deserialize, Serialize};

/// One supervised process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// Shell command line launched by the supervisor.
    pub command: String,
    /// Processes that must reach a condition before this one starts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependencyEdge>,
    /// Health check gating the `process_healthy` condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<ReadinessProbe>,
    /// Restart policy.
    pub availability: Availability,
    /// How the supervisor stops the process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<Shutdown>,
    /// Grouping label; the instance name.
    pub namespace: String,
}

/// Periodic readiness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessProbe {
    /// Command whose zero exit status means ready.
    pub exec: ExecProbe,
    /// Seconds before the first probe.
    pub initial_delay_seconds: u32,
    /// Seconds between probes.
    pub period_seconds: u32,
    /// Seconds before a probe is abandoned.
    pub timeout_seconds: u32,
    /// Consecutive successes required to become healthy.
    pub success_threshold: u32,
    /// Consecutive failures before becoming unhealthy.
    pub failure_threshold: u32,
}

impl ReadinessProbe {
    /// Probe running `command` with timings from `probe`.
    #[must_use]
    pub const fn exec(command: String, probe: &ProbeConfig) -> Self {
        Self {
            exec: ExecProbe { command },
            initial_delay_seconds: probe.initial_delay_seconds,
            period_seconds: probe.period_seconds,
            timeout_seconds: probe.timeout_seconds,
            success_threshold: probe.success_threshold,
            failure_threshold: probe.failure_threshold,
        }
    }
}

/// Command-based probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecProbe {
    /// Shell command line.
    pub command: String,
}

/// When the supervisor restarts a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Never restart.
    No,
    /// Restart after a non-zero exit.
    OnFailure,
    /// Restart after every exit.
    Always,
    /// Stop the whole graph after a non-zero exit.
    ExitOnFailure,
}

/// Restart policy and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Restart policy.
    pub restart: RestartPolicy,
    /// Restart budget, when bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_restarts: Option<u32>,
}

impl Availability {
    /// Run once, never restart.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            restart: RestartPolicy::No,
            max_restarts: None,
        }
    }

    /// Restart on failure up to `max_restarts` times.
    #[must_use]
    pub const fn on_failure(max_restarts: u32) -> Self {
        Self {
            restart: RestartPolicy::OnFailure,
            max_restarts: Some(max_restarts),
        }
    }
}

/// Shutdown behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shutdown {
    /// Signal number sent to the process.
    pub signal: i32,
}
