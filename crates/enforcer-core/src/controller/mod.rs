//! Scheduled reconciliation.
//!
//! `ReconciliationLoop` drives passes over every service on a fixed interval,
//! counts whole-pass failures toward a breaker, and stops promptly when its
//! `CancellationToken` fires. `plan_pass` computes the same per-service
//! decisions without applying anything.

pub mod reconcile_loop;
pub mod report;

pub use reconcile_loop::{LoopExit, LoopSettings, LoopState, ReconciliationLoop};
pub use report::{plan_pass, PassOutcome, PassReport, ServicePlan};
