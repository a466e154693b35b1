//! Per-service drift detection and update construction.
//!
//! The decision for one service runs in a fixed order:
//!
//! 1. read the current restart and update delays (`0` when unset),
//! 2. stop if both already equal the desired values,
//! 3. report any delay that another actor set to a different non-zero value,
//! 4. build the full [`UpdateIntent`] for the registry to apply.
//!
//! Nothing here performs I/O; the control loop owns logging and application.

use crate::policy::{format_ns, DesiredPolicy, SpecDefaults, SPEC_DEFAULTS};
use crate::types::{
    RestartPolicy, RestartPolicySpec, ServiceSnapshot, UpdateConfig, UpdateConfigSpec,
    UpdateIntent,
};
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// DriftWarning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayField {
    RestartDelay,
    UpdateDelay,
}

impl DelayField {
    pub fn as_str(self) -> &'static str {
        match self {
            DelayField::RestartDelay => "restart delay",
            DelayField::UpdateDelay => "update delay",
        }
    }
}

/// A delay that was explicitly set to something other than the desired value.
///
/// Advisory only: the update still forces the desired value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftWarning {
    pub field: DelayField,
    pub observed_ns: u64,
    pub desired_ns: u64,
}

impl fmt::Display for DriftWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is already set to unexpected value {}, overriding with {}",
            self.field.as_str(),
            format_ns(self.observed_ns),
            format_ns(self.desired_ns)
        )
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    AlreadyCorrect,
    Update {
        intent: UpdateIntent,
        drift: Vec<DriftWarning>,
    },
}

impl Decision {
    pub fn is_update(&self) -> bool {
        matches!(self, Decision::Update { .. })
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// `(restart_delay_ns, update_delay_ns)`, with `0` standing in for "unset".
pub fn extract_current_delays(snapshot: &ServiceSnapshot) -> (u64, u64) {
    let restart = snapshot
        .restart_policy
        .as_ref()
        .and_then(|p| p.delay_ns)
        .unwrap_or(0);
    let update = snapshot
        .update_config
        .as_ref()
        .and_then(|c| c.delay_ns)
        .unwrap_or(0);
    (restart, update)
}

pub fn needs_update(restart_delay_ns: u64, update_delay_ns: u64, desired: &DesiredPolicy) -> bool {
    restart_delay_ns != desired.restart_delay_ns || update_delay_ns != desired.update_delay_ns
}

pub fn classify_drift(
    restart_delay_ns: u64,
    update_delay_ns: u64,
    desired: &DesiredPolicy,
) -> Vec<DriftWarning> {
    [
        (
            DelayField::RestartDelay,
            restart_delay_ns,
            desired.restart_delay_ns,
        ),
        (
            DelayField::UpdateDelay,
            update_delay_ns,
            desired.update_delay_ns,
        ),
    ]
    .into_iter()
    .filter(|&(_, observed, wanted)| observed != 0 && observed != wanted)
    .map(|(field, observed_ns, desired_ns)| DriftWarning {
        field,
        observed_ns,
        desired_ns,
    })
    .collect()
}

pub fn build_intent(snapshot: &ServiceSnapshot, desired: &DesiredPolicy) -> UpdateIntent {
    build_intent_with(snapshot, desired, &SPEC_DEFAULTS)
}

/// Like [`build_intent`] but with an explicit default table.
pub fn build_intent_with(
    snapshot: &ServiceSnapshot,
    desired: &DesiredPolicy,
    defaults: &SpecDefaults,
) -> UpdateIntent {
    let rp = snapshot.restart_policy.clone().unwrap_or_default();
    let uc = snapshot.update_config.clone().unwrap_or_default();
    UpdateIntent {
        restart_policy: resolve_restart_policy(rp, desired.restart_delay_ns, defaults),
        update_config: resolve_update_config(uc, desired.update_delay_ns, defaults),
    }
}

fn resolve_restart_policy(
    observed: RestartPolicySpec,
    delay_ns: u64,
    defaults: &SpecDefaults,
) -> RestartPolicy {
    RestartPolicy {
        condition: observed.condition.unwrap_or(defaults.condition),
        delay_ns,
        max_attempts: observed.max_attempts.unwrap_or(defaults.max_attempts),
        window_ns: observed.window_ns.unwrap_or(defaults.window_ns),
    }
}

fn resolve_update_config(
    observed: UpdateConfigSpec,
    delay_ns: u64,
    defaults: &SpecDefaults,
) -> UpdateConfig {
    UpdateConfig {
        parallelism: observed.parallelism.unwrap_or(defaults.parallelism),
        delay_ns,
        order: observed.order.unwrap_or(defaults.order),
        failure_action: observed.failure_action.unwrap_or(defaults.failure_action),
        monitor_ns: observed.monitor_ns.unwrap_or(defaults.monitor_ns),
        max_failure_ratio: observed
            .max_failure_ratio
            .unwrap_or(defaults.max_failure_ratio),
    }
}

/// Run the full decision procedure for one service.
pub fn decide(snapshot: &ServiceSnapshot, desired: &DesiredPolicy) -> Decision {
    let (restart, update) = extract_current_delays(snapshot);
    if !needs_update(restart, update, desired) {
        return Decision::AlreadyCorrect;
    }
    Decision::Update {
        drift: classify_drift(restart, update, desired),
        intent: build_intent(snapshot, desired),
    }
}
