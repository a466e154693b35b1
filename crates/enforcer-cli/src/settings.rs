use anyhow::{bail, Context, Result};
use clap::Args;
use enforcer_core::{OnEmpty, Settings};
use std::path::PathBuf;

/// Tunables shared by every subcommand. Flags win over the config file.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// YAML config file; every key is optional
    #[arg(long, global = true, env = "ENFORCER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Desired restart delay in nanoseconds
    #[arg(long, global = true, env = "ENFORCER_RESTART_DELAY_NS")]
    pub restart_delay_ns: Option<u64>,

    /// Desired update delay in nanoseconds
    #[arg(long, global = true, env = "ENFORCER_UPDATE_DELAY_NS")]
    pub update_delay_ns: Option<u64>,

    /// Seconds to wait between passes
    #[arg(long, global = true, env = "ENFORCER_CHECK_INTERVAL_SECS")]
    pub check_interval_secs: Option<u64>,

    /// Stop after this many passes in a row fail to list services
    #[arg(long, global = true, env = "ENFORCER_MAX_CONSECUTIVE_FAILURES")]
    pub max_consecutive_failures: Option<u32>,

    /// What to do when the cluster has no services: stop or wait
    #[arg(long, global = true, env = "ENFORCER_ON_EMPTY")]
    pub on_empty: Option<OnEmpty>,

    /// Docker Engine endpoint (unix://, tcp://, http:// or https://)
    #[arg(long, global = true, env = "DOCKER_HOST")]
    pub docker_host: Option<String>,

    /// Engine API version prefix, e.g. 1.43
    #[arg(long, global = true, env = "DOCKER_API_VERSION")]
    pub api_version: Option<String>,

    /// Per-request timeout for engine API calls, in seconds
    #[arg(long, global = true, env = "ENFORCER_API_TIMEOUT_SECS")]
    pub api_timeout_secs: Option<u64>,
}

impl SettingsArgs {
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(v) = self.restart_delay_ns {
            settings.restart_delay_ns = v;
        }
        if let Some(v) = self.update_delay_ns {
            settings.update_delay_ns = v;
        }
        if let Some(v) = self.check_interval_secs {
            settings.check_interval_secs = v;
        }
        if let Some(v) = self.max_consecutive_failures {
            settings.max_consecutive_failures = v;
        }
        if let Some(v) = self.on_empty {
            settings.on_empty = v;
        }
        if let Some(v) = &self.docker_host {
            settings.docker_host = v.clone();
        }
        if let Some(v) = &self.api_version {
            settings.api_version = Some(v.clone());
        }
        if let Some(v) = self.api_timeout_secs {
            settings.api_timeout_secs = v;
        }
        Ok(settings)
    }
}

/// Log every validation finding; refuse to continue on any error-level one.
pub fn ensure_valid(settings: &Settings) -> Result<()> {
    let findings = settings.validate();
    for w in findings.iter().filter(|w| !w.is_error()) {
        tracing::warn!("config: {}", w.message);
    }
    let errors: Vec<&str> = findings
        .iter()
        .filter(|w| w.is_error())
        .map(|w| w.message.as_str())
        .collect();
    if !errors.is_empty() {
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}
