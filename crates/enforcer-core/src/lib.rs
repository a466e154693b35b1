//! Desired-state reconciliation for swarm service restart and update delays.
//!
//! ```text
//! ReconciliationLoop ──list──▶ ServiceRegistry
//!        │                          ▲
//!        ▼ per service              │ update (full RestartPolicy + UpdateConfig)
//! reconciler::decide ──UpdateIntent─┘
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod policy;
pub mod reconciler;
pub mod registry;
pub mod types;

pub use config::{ConfigWarning, OnEmpty, Settings, WarnLevel};
pub use controller::{
    plan_pass, LoopExit, LoopSettings, LoopState, PassOutcome, PassReport, ReconciliationLoop,
    ServicePlan,
};
pub use error::{EnforcerError, Result};
pub use policy::{DesiredPolicy, SpecDefaults, SPEC_DEFAULTS};
pub use reconciler::{Decision, DriftWarning};
pub use registry::{RegistryError, ServiceRegistry};
pub use types::{ServiceSnapshot, UpdateIntent};
