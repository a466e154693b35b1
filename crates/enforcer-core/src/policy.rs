//! Desired delays and the per-field defaults used when filling an update.

use crate::types::{FailureAction, RestartCondition, UpdateOrder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 10 seconds, in nanoseconds.
pub const DEFAULT_RESTART_DELAY_NS: u64 = 10_000_000_000;
/// 10 seconds, in nanoseconds.
pub const DEFAULT_UPDATE_DELAY_NS: u64 = 10_000_000_000;

// ---------------------------------------------------------------------------
// DesiredPolicy
// ---------------------------------------------------------------------------

/// The delays every service must end up with. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPolicy {
    pub restart_delay_ns: u64,
    pub update_delay_ns: u64,
}

impl Default for DesiredPolicy {
    fn default() -> Self {
        Self {
            restart_delay_ns: DEFAULT_RESTART_DELAY_NS,
            update_delay_ns: DEFAULT_UPDATE_DELAY_NS,
        }
    }
}

// ---------------------------------------------------------------------------
// SpecDefaults
// ---------------------------------------------------------------------------

/// Values substituted for fields a service never configured.
///
/// Only consulted when a field is absent from the live spec; a present
/// value, including zero, is always carried over as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpecDefaults {
    pub condition: RestartCondition,
    pub max_attempts: u64,
    pub window_ns: u64,
    pub parallelism: u64,
    pub order: UpdateOrder,
    pub failure_action: FailureAction,
    pub monitor_ns: u64,
    pub max_failure_ratio: f64,
}

pub const SPEC_DEFAULTS: SpecDefaults = SpecDefaults {
    condition: RestartCondition::Any,
    max_attempts: 0,
    window_ns: 10_000_000_000,
    parallelism: 1,
    order: UpdateOrder::StopFirst,
    failure_action: FailureAction::Pause,
    monitor_ns: 5_000_000_000,
    max_failure_ratio: 0.0,
};

impl Default for SpecDefaults {
    fn default() -> Self {
        SPEC_DEFAULTS
    }
}

impl SpecDefaults {
    /// `(field path, default)` pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("RestartPolicy.Condition", self.condition.to_string()),
            ("RestartPolicy.MaxAttempts", self.max_attempts.to_string()),
            ("RestartPolicy.Window", format_ns(self.window_ns)),
            ("UpdateConfig.Parallelism", self.parallelism.to_string()),
            ("UpdateConfig.Order", self.order.to_string()),
            ("UpdateConfig.FailureAction", self.failure_action.to_string()),
            ("UpdateConfig.Monitor", format_ns(self.monitor_ns)),
            ("UpdateConfig.MaxFailureRatio", self.max_failure_ratio.to_string()),
        ]
    }
}

/// Render a nanosecond count the way operators read it, e.g. `10s (10000000000ns)`.
pub fn format_ns(ns: u64) -> String {
    format!("{:?} ({ns}ns)", Duration::from_nanos(ns))
}
