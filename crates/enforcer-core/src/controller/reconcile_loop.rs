//! The reconciliation control loop.
//!
//! States: `Running` (a pass is in progress), `WaitingInterval` (sleeping
//! until the next pass) and `Terminated`. Cancellation is cooperative: it is
//! observed before each pass, after each pass and during the wait, so an
//! in-flight service update always completes first.

use crate::config::OnEmpty;
use crate::policy::{format_ns, DesiredPolicy};
use crate::reconciler::{self, Decision};
use crate::registry::ServiceRegistry;
use crate::types::ServiceSnapshot;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::report::{PassOutcome, PassReport};

// ---------------------------------------------------------------------------
// LoopSettings / LoopState / LoopExit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    pub desired: DesiredPolicy,
    pub check_interval: Duration,
    /// The breaker trips once this many passes in a row fail to enumerate.
    pub max_consecutive_failures: u32,
    pub on_empty: OnEmpty,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            desired: DesiredPolicy::default(),
            check_interval: Duration::from_secs(60),
            max_consecutive_failures: 3,
            on_empty: OnEmpty::default(),
        }
    }
}

/// Mutable bookkeeping owned by one loop instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    pub consecutive_failures: u32,
    pub passes: u64,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Cancelled,
    NoServices,
    FailureThreshold { failures: u32 },
}

impl LoopExit {
    pub fn exit_code(self) -> i32 {
        match self {
            LoopExit::Cancelled | LoopExit::NoServices => 0,
            LoopExit::FailureThreshold { .. } => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// ReconciliationLoop
// ---------------------------------------------------------------------------

pub struct ReconciliationLoop<R> {
    registry: R,
    settings: LoopSettings,
    cancel: CancellationToken,
    state: LoopState,
}

impl<R: ServiceRegistry> ReconciliationLoop<R> {
    pub fn new(registry: R, settings: LoopSettings, cancel: CancellationToken) -> Self {
        Self {
            registry,
            settings,
            cancel,
            state: LoopState::default(),
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Run passes until cancelled, out of services, or the breaker trips.
    pub async fn run(&mut self) -> LoopExit {
        loop {
            if self.cancel.is_cancelled() {
                info!("cancellation requested, stopping before next pass");
                return LoopExit::Cancelled;
            }

            let outcome = self.run_pass().await;
            if let Some(exit) = self.record(&outcome) {
                return exit;
            }

            if self.cancel.is_cancelled() {
                info!("cancellation requested during pass, stopping");
                return LoopExit::Cancelled;
            }

            info!(
                "waiting {}s before next check",
                self.settings.check_interval.as_secs()
            );
            if !self.wait_interval().await {
                info!("cancellation requested during wait, stopping");
                return LoopExit::Cancelled;
            }
        }
    }

    /// One pass over every service. Never fails; the outcome says what happened.
    pub async fn run_pass(&mut self) -> PassOutcome {
        self.state.passes += 1;
        info!(pass = self.state.passes, "checking swarm services");

        let services = match self.registry.list_services().await {
            Ok(services) => services,
            Err(e) => {
                error!(error = %e, "failed to list services");
                return PassOutcome::EnumerationFailed(e);
            }
        };

        if services.is_empty() {
            warn!("no services found");
            return PassOutcome::NoServices;
        }

        let mut report = PassReport::default();
        for service in &services {
            self.reconcile_service(service, &mut report).await;
        }

        info!(
            inspected = report.inspected,
            already_correct = report.already_correct,
            updated = report.updated,
            failed = report.failed,
            "pass complete"
        );
        PassOutcome::Completed(report)
    }

    async fn reconcile_service(&self, service: &ServiceSnapshot, report: &mut PassReport) {
        report.inspected += 1;
        let name = service.name.as_str();

        let (intent, drift) = match reconciler::decide(service, &self.settings.desired) {
            Decision::AlreadyCorrect => {
                info!(service = %name, "already set correctly, skipping");
                report.already_correct += 1;
                return;
            }
            Decision::Update { intent, drift } => (intent, drift),
        };

        for warning in &drift {
            warn!(service = %name, "{warning}");
        }
        report.drift_warnings += drift.len();

        info!(
            service = %name,
            restart_delay = %format_ns(intent.restart_policy.delay_ns),
            update_delay = %format_ns(intent.update_config.delay_ns),
            "updating"
        );
        match self
            .registry
            .update_service(&service.id, service.version, &intent)
            .await
        {
            Ok(()) => {
                info!(service = %name, "updated successfully");
                report.updated += 1;
            }
            Err(e) => {
                error!(service = %name, error = %e, "failed to update");
                report.failed += 1;
            }
        }
    }

    /// Apply a pass outcome to the loop state; `Some` means terminate.
    fn record(&mut self, outcome: &PassOutcome) -> Option<LoopExit> {
        match outcome {
            PassOutcome::Completed(_) => {
                self.state.consecutive_failures = 0;
                None
            }
            PassOutcome::NoServices => match self.settings.on_empty {
                OnEmpty::Stop => {
                    info!("nothing to reconcile, stopping");
                    Some(LoopExit::NoServices)
                }
                OnEmpty::Wait => {
                    self.state.consecutive_failures = 0;
                    None
                }
            },
            PassOutcome::EnumerationFailed(_) => {
                self.state.consecutive_failures += 1;
                let failures = self.state.consecutive_failures;
                let max = self.settings.max_consecutive_failures;
                if failures >= max {
                    error!(
                        failures,
                        "{failures} consecutive failed passes (limit {max}), giving up"
                    );
                    Some(LoopExit::FailureThreshold { failures })
                } else {
                    warn!(failures, max, "pass failed");
                    None
                }
            }
        }
    }

    /// Sleep for the check interval; `false` when cancelled first.
    async fn wait_interval(&self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.settings.check_interval) => true,
        }
    }
}
