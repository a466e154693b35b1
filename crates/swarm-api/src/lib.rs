//! `swarm-api`: Docker Engine client for swarm services.
//!
//! Implements [`enforcer_core::ServiceRegistry`] over the engine's HTTP API:
//!
//! ```text
//! list_services   GET  /services
//! update_service  GET  /services/{id}             (current version + raw spec)
//!                 POST /services/{id}/update?version=N   (raw spec, patched)
//! ```
//!
//! The engine is reached over its local `unix://` socket or over TCP
//! (`tcp://`, `http://`, `https://`). Every call is bounded by the client
//! timeout.

pub mod client;
pub mod error;
mod transport;
pub mod wire;

pub use client::SwarmClient;
pub use error::SwarmApiError;
pub use wire::apply_intent;
