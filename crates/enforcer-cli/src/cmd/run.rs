use crate::shutdown;
use anyhow::bail;
use enforcer_core::{LoopExit, PassOutcome, ReconciliationLoop, Settings};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Reconcile until cancelled, out of services, or the failure breaker trips.
pub fn run(settings: &Settings) -> anyhow::Result<()> {
    let client = super::connect(settings)?;
    let rt = tokio::runtime::Runtime::new()?;

    let exit = rt.block_on(async move {
        let cancel = CancellationToken::new();
        let listener = shutdown::spawn_signal_listener(cancel.clone());

        info!(
            docker_host = %client.endpoint(),
            restart_delay_ns = settings.restart_delay_ns,
            update_delay_ns = settings.update_delay_ns,
            check_interval_secs = settings.check_interval_secs,
            "starting swarm settings enforcer"
        );
        let mut enforcer = ReconciliationLoop::new(client, settings.loop_settings(), cancel);
        let exit = enforcer.run().await;
        listener.abort();
        info!(passes = enforcer.state().passes, "enforcer stopped");
        exit
    });

    match exit {
        LoopExit::Cancelled | LoopExit::NoServices => Ok(()),
        LoopExit::FailureThreshold { failures } => {
            bail!("giving up after {failures} consecutive failed passes")
        }
    }
}

/// A single pass; fails only when the service list cannot be read.
pub fn once(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let client = super::connect(settings)?;
    let rt = tokio::runtime::Runtime::new()?;

    let outcome = rt.block_on(async move {
        let mut enforcer =
            ReconciliationLoop::new(client, settings.loop_settings(), CancellationToken::new());
        enforcer.run_pass().await
    });

    match outcome {
        PassOutcome::Completed(report) => {
            if json {
                crate::output::print_json(&report)?;
            } else {
                println!(
                    "inspected {}, already correct {}, updated {}, failed {}",
                    report.inspected, report.already_correct, report.updated, report.failed
                );
            }
            Ok(())
        }
        PassOutcome::NoServices => {
            if json {
                crate::output::print_json(&enforcer_core::PassReport::default())?;
            } else {
                println!("no services found");
            }
            Ok(())
        }
        PassOutcome::EnumerationFailed(e) => bail!("failed to list services: {e}"),
    }
}
