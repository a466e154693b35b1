use crate::controller::LoopSettings;
use crate::error::{EnforcerError, Result};
use crate::policy::{DesiredPolicy, DEFAULT_RESTART_DELAY_NS, DEFAULT_UPDATE_DELAY_NS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

impl ConfigWarning {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == WarnLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// OnEmpty
// ---------------------------------------------------------------------------

/// What a pass that finds zero services means for the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnEmpty {
    /// Nothing to reconcile: stop the loop with a clean exit.
    #[default]
    Stop,
    /// Treat the empty pass as completed and poll again after the interval.
    Wait,
}

impl OnEmpty {
    pub fn as_str(self) -> &'static str {
        match self {
            OnEmpty::Stop => "stop",
            OnEmpty::Wait => "wait",
        }
    }
}

impl fmt::Display for OnEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnEmpty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stop" => Ok(OnEmpty::Stop),
            "wait" => Ok(OnEmpty::Wait),
            other => Err(format!("unknown on_empty policy '{other}' (expected stop or wait)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Tunables for one enforcer process. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_restart_delay_ns")]
    pub restart_delay_ns: u64,
    #[serde(default = "default_update_delay_ns")]
    pub update_delay_ns: u64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default)]
    pub on_empty: OnEmpty,
    #[serde(default = "default_docker_host")]
    pub docker_host: String,
    /// Engine API version prefix such as `v1.43`; unversioned paths when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

fn default_restart_delay_ns() -> u64 {
    DEFAULT_RESTART_DELAY_NS
}

fn default_update_delay_ns() -> u64 {
    DEFAULT_UPDATE_DELAY_NS
}

fn default_check_interval_secs() -> u64 {
    60
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_docker_host() -> String {
    "unix:///var/run/docker.sock".to_string()
}

fn default_api_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            restart_delay_ns: default_restart_delay_ns(),
            update_delay_ns: default_update_delay_ns(),
            check_interval_secs: default_check_interval_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
            on_empty: OnEmpty::default(),
            docker_host: default_docker_host(),
            api_version: None,
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EnforcerError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(&data)?;
        Ok(settings)
    }

    pub fn desired_policy(&self) -> DesiredPolicy {
        DesiredPolicy {
            restart_delay_ns: self.restart_delay_ns,
            update_delay_ns: self.update_delay_ns,
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            desired: self.desired_policy(),
            check_interval: self.check_interval(),
            max_consecutive_failures: self.max_consecutive_failures,
            on_empty: self.on_empty,
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // Zero reads as "unset", so a zero desired delay never converges.
        if self.restart_delay_ns == 0 {
            warnings.push(ConfigWarning::error("restart_delay_ns must be greater than 0"));
        }
        if self.update_delay_ns == 0 {
            warnings.push(ConfigWarning::error("update_delay_ns must be greater than 0"));
        }
        if self.check_interval_secs == 0 {
            warnings.push(ConfigWarning::error("check_interval_secs must be greater than 0"));
        }
        if self.max_consecutive_failures == 0 {
            warnings.push(ConfigWarning::error(
                "max_consecutive_failures must be at least 1",
            ));
        }
        if self.api_timeout_secs == 0 {
            warnings.push(ConfigWarning::error("api_timeout_secs must be greater than 0"));
        }

        let host = self.docker_host.trim();
        if host.is_empty() {
            warnings.push(ConfigWarning::error("docker_host is empty"));
        } else if host.starts_with("npipe://") {
            warnings.push(ConfigWarning::error(format!(
                "docker_host '{host}' is a named pipe; use unix://, tcp:// or http(s)://"
            )));
        } else if host == "unix://" {
            warnings.push(ConfigWarning::error("docker_host 'unix://' has no socket path"));
        } else if !["unix://", "tcp://", "http://", "https://"]
            .iter()
            .any(|scheme| host.starts_with(scheme))
        {
            warnings.push(ConfigWarning::error(format!(
                "docker_host '{host}' has an unsupported scheme"
            )));
        }

        let interval_ns = u128::from(self.check_interval_secs) * 1_000_000_000;
        let longest_delay = u128::from(self.restart_delay_ns.max(self.update_delay_ns));
        if self.check_interval_secs > 0 && interval_ns < longest_delay {
            warnings.push(ConfigWarning::warning(format!(
                "check_interval_secs={} is shorter than the desired delays",
                self.check_interval_secs
            )));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
