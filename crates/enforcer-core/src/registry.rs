//! The cluster API seam.
//!
//! The control loop only needs to list services and submit one update at a
//! time; everything else about the orchestrator stays behind this trait.

use crate::types::{ServiceSnapshot, UpdateIntent};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cluster API unreachable: {0}")]
    Unreachable(String),

    #[error("cluster API call timed out after {0:?}")]
    Timeout(Duration),

    #[error("cluster API rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected cluster API response: {0}")]
    Decode(String),

    #[error("service not found: {0}")]
    NotFound(String),

    #[error("service {id} changed since it was listed (version {listed}, now {current})")]
    Conflict { id: String, listed: u64, current: u64 },
}

#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Every service currently known to the cluster, in the order returned.
    async fn list_services(&self) -> Result<Vec<ServiceSnapshot>, RegistryError>;

    /// Replace the service's restart policy and update config with `intent`,
    /// leaving the rest of its spec untouched.
    ///
    /// `version` is the index the intent was computed from. When given, the
    /// update is applied at exactly that version and fails with
    /// [`RegistryError::Conflict`] if the service has moved on since.
    async fn update_service(
        &self,
        id: &str,
        version: Option<u64>,
        intent: &UpdateIntent,
    ) -> Result<(), RegistryError>;
}

#[async_trait]
impl<T: ServiceRegistry + ?Sized> ServiceRegistry for Arc<T> {
    async fn list_services(&self) -> Result<Vec<ServiceSnapshot>, RegistryError> {
        (**self).list_services().await
    }

    async fn update_service(
        &self,
        id: &str,
        version: Option<u64>,
        intent: &UpdateIntent,
    ) -> Result<(), RegistryError> {
        (**self).update_service(id, version, intent).await
    }
}
