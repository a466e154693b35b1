use crate::policy::DesiredPolicy;
use crate::reconciler::{self, Decision};
use crate::registry::{RegistryError, ServiceRegistry};
use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// PassReport / PassOutcome
// ---------------------------------------------------------------------------

/// Tally of one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub inspected: usize,
    pub already_correct: usize,
    pub updated: usize,
    pub failed: usize,
    pub drift_warnings: usize,
}

#[derive(Debug)]
pub enum PassOutcome {
    /// Every service was visited; individual update failures are in the report.
    Completed(PassReport),
    /// Enumeration succeeded but the cluster has no services.
    NoServices,
    /// The service list could not be read; nothing was visited.
    EnumerationFailed(RegistryError),
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// What a pass would do to one service.
#[derive(Debug, Clone, Serialize)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    pub restart_delay_ns: u64,
    pub update_delay_ns: u64,
    pub decision: Decision,
    pub checked_at: DateTime<Utc>,
}

/// Enumerate services and decide each one without submitting any update.
pub async fn plan_pass<R>(
    registry: &R,
    desired: &DesiredPolicy,
) -> Result<Vec<ServicePlan>, RegistryError>
where
    R: ServiceRegistry + ?Sized,
{
    let services = registry.list_services().await?;
    let checked_at = Utc::now();
    Ok(services
        .into_iter()
        .map(|service| {
            let (restart_delay_ns, update_delay_ns) =
                reconciler::extract_current_delays(&service);
            let decision = reconciler::decide(&service, desired);
            ServicePlan {
                id: service.id,
                name: service.name,
                restart_delay_ns,
                update_delay_ns,
                decision,
                checked_at,
            }
        })
        .collect())
}
