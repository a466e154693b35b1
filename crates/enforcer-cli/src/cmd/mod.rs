pub mod check;
pub mod config;
pub mod run;

use anyhow::Context;
use enforcer_core::Settings;
use swarm_api::SwarmClient;

fn connect(settings: &Settings) -> anyhow::Result<SwarmClient> {
    SwarmClient::new(
        &settings.docker_host,
        settings.api_version.as_deref(),
        settings.api_timeout(),
    )
    .with_context(|| format!("invalid docker host {}", settings.docker_host))
}
