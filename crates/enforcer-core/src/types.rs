use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RestartCondition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartCondition {
    Any,
    OnFailure,
    None,
}

impl RestartCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            RestartCondition::Any => "any",
            RestartCondition::OnFailure => "on-failure",
            RestartCondition::None => "none",
        }
    }
}

impl fmt::Display for RestartCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UpdateOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateOrder {
    StopFirst,
    StartFirst,
}

impl UpdateOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOrder::StopFirst => "stop-first",
            UpdateOrder::StartFirst => "start-first",
        }
    }
}

impl fmt::Display for UpdateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FailureAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureAction {
    Pause,
    Continue,
    Rollback,
}

impl FailureAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureAction::Pause => "pause",
            FailureAction::Continue => "continue",
            FailureAction::Rollback => "rollback",
        }
    }
}

impl fmt::Display for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Observed specs (every field may be absent)
// ---------------------------------------------------------------------------

/// Restart policy as reported by the orchestrator.
///
/// `None` means the field was never configured, which is not the same as
/// zero. Field names match the engine's `TaskTemplate.RestartPolicy` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestartPolicySpec {
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<RestartCondition>,
    #[serde(rename = "Delay", default, skip_serializing_if = "Option::is_none")]
    pub delay_ns: Option<u64>,
    #[serde(rename = "MaxAttempts", default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u64>,
    #[serde(rename = "Window", default, skip_serializing_if = "Option::is_none")]
    pub window_ns: Option<u64>,
}

/// Rolling-update settings as reported by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfigSpec {
    #[serde(rename = "Parallelism", default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u64>,
    #[serde(rename = "Delay", default, skip_serializing_if = "Option::is_none")]
    pub delay_ns: Option<u64>,
    #[serde(rename = "Order", default, skip_serializing_if = "Option::is_none")]
    pub order: Option<UpdateOrder>,
    #[serde(rename = "FailureAction", default, skip_serializing_if = "Option::is_none")]
    pub failure_action: Option<FailureAction>,
    #[serde(rename = "Monitor", default, skip_serializing_if = "Option::is_none")]
    pub monitor_ns: Option<u64>,
    #[serde(rename = "MaxFailureRatio", default, skip_serializing_if = "Option::is_none")]
    pub max_failure_ratio: Option<f64>,
}

// ---------------------------------------------------------------------------
// Resolved specs (every field present)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartPolicy {
    #[serde(rename = "Condition")]
    pub condition: RestartCondition,
    #[serde(rename = "Delay")]
    pub delay_ns: u64,
    #[serde(rename = "MaxAttempts")]
    pub max_attempts: u64,
    #[serde(rename = "Window")]
    pub window_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(rename = "Parallelism")]
    pub parallelism: u64,
    #[serde(rename = "Delay")]
    pub delay_ns: u64,
    #[serde(rename = "Order")]
    pub order: UpdateOrder,
    #[serde(rename = "FailureAction")]
    pub failure_action: FailureAction,
    #[serde(rename = "Monitor")]
    pub monitor_ns: u64,
    #[serde(rename = "MaxFailureRatio")]
    pub max_failure_ratio: f64,
}

impl From<RestartPolicy> for RestartPolicySpec {
    fn from(p: RestartPolicy) -> Self {
        Self {
            condition: Some(p.condition),
            delay_ns: Some(p.delay_ns),
            max_attempts: Some(p.max_attempts),
            window_ns: Some(p.window_ns),
        }
    }
}

impl From<UpdateConfig> for UpdateConfigSpec {
    fn from(c: UpdateConfig) -> Self {
        Self {
            parallelism: Some(c.parallelism),
            delay_ns: Some(c.delay_ns),
            order: Some(c.order),
            failure_action: Some(c.failure_action),
            monitor_ns: Some(c.monitor_ns),
            max_failure_ratio: Some(c.max_failure_ratio),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceSnapshot / UpdateIntent
// ---------------------------------------------------------------------------

/// Read-only view of one service at the moment it was listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub id: String,
    pub name: String,
    /// Swarm object version index, used for optimistic-concurrency updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_config: Option<UpdateConfigSpec>,
}

impl ServiceSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: None,
            restart_policy: None,
            update_config: None,
        }
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicySpec) -> Self {
        self.restart_policy = Some(policy);
        self
    }

    pub fn with_update_config(mut self, config: UpdateConfigSpec) -> Self {
        self.update_config = Some(config);
        self
    }

    /// The snapshot the orchestrator reports once `intent` has been applied.
    pub fn with_intent(&self, intent: &UpdateIntent) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            version: self.version.map(|v| v + 1),
            restart_policy: Some(intent.restart_policy.clone().into()),
            update_config: Some(intent.update_config.clone().into()),
        }
    }
}

/// The complete restart policy and update config to submit for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateIntent {
    pub restart_policy: RestartPolicy,
    pub update_config: UpdateConfig,
}
