//! Transport backends for the vehicle service
//!
//! This module hides the two incompatible service generations behind one
//! backend trait:
//! - Modern backend: batched get/set with per-item correlation ids
//! - Legacy backend: one request per call, correlated by call lifetime
//! - Mock wire for testing
//!
//! # Example
//!
//! ```ignore
//! use vhal_client::transport::select_backend;
//! use vhal_client::pending::PendingRequests;
//!
//! let pending = Arc::new(PendingRequests::new());
//! let backend = select_backend(&locator, pending)?;
//! backend.request_get(request_id, &request).await?;
//! ```

mod error;
pub mod legacy;
pub mod mock;
pub mod modern;
pub mod paging;
pub mod wire;

pub use error::TransportError;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use vhal_core::{PropertyConfig, PropertyValue, SubscribeOptions};

use crate::pending::PendingRequests;
use crate::subscription::VehicleEventListener;
use wire::{DeathRecipient, VehicleServiceLocator};

/// Which service generation a backend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendGeneration {
    Modern,
    Legacy,
}

impl std::fmt::Display for BackendGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendGeneration::Modern => write!(f, "modern"),
            BackendGeneration::Legacy => write!(f, "legacy"),
        }
    }
}

/// Generation-agnostic interface over a vehicle service handle.
///
/// `request_get`/`request_set` only dispatch; the matching result is
/// delivered asynchronously into the shared pending tables by the
/// backend's wire callback. Every operation fails fast with
/// [`TransportError::ConnectionClosed`] once `is_valid` turns false.
#[async_trait]
pub trait VehicleTransport: Send + Sync {
    fn generation(&self) -> BackendGeneration;

    /// Whether the underlying handle is still usable
    fn is_valid(&self) -> bool;

    /// Dispatch a correlated get; the result arrives via the pending table
    async fn request_get(
        &self,
        request_id: u64,
        request: &PropertyValue,
    ) -> Result<(), TransportError>;

    /// Dispatch a correlated set; the result arrives via the pending table
    async fn request_set(
        &self,
        request_id: u64,
        request: &PropertyValue,
    ) -> Result<(), TransportError>;

    async fn get_all_configs(&self) -> Result<Vec<PropertyConfig>, TransportError>;

    async fn get_configs(&self, prop_ids: &[i32]) -> Result<Vec<PropertyConfig>, TransportError>;

    /// Register a fresh event callback for one subscription client
    fn new_subscription(
        &self,
        listener: Arc<dyn VehicleEventListener>,
    ) -> Result<Arc<dyn SubscriptionTransport>, TransportError>;

    /// Raw debug dump passthrough
    async fn dump(&self, args: &[String]) -> Result<String, TransportError>;

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), TransportError>;

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> Result<(), TransportError>;
}

/// Per-client subscription handle bound to one event callback registration.
///
/// Subscribe/unsubscribe are fire-and-forget against the wire and surface
/// only immediate synchronous failures; they never touch the correlation
/// tables.
#[async_trait]
pub trait SubscriptionTransport: Send + Sync {
    async fn subscribe(&self, options: &[SubscribeOptions]) -> Result<(), TransportError>;

    async fn unsubscribe(&self, prop_ids: &[i32]) -> Result<(), TransportError>;
}

/// Bind to a vehicle service: modern generation if present, legacy as the
/// fallback. The choice is made exactly once; there is no degraded mode
/// and no re-detection on later calls.
pub fn select_backend(
    locator: &dyn VehicleServiceLocator,
    pending: Arc<PendingRequests>,
) -> Result<Arc<dyn VehicleTransport>, TransportError> {
    if let Some(raw) = locator.locate_modern() {
        info!(generation = %BackendGeneration::Modern, "vehicle service located");
        return Ok(Arc::new(modern::ModernBackend::new(raw, pending)));
    }
    if let Some(raw) = locator.locate_legacy() {
        info!(generation = %BackendGeneration::Legacy, "vehicle service located");
        return Ok(Arc::new(legacy::LegacyBackend::new(raw, pending)));
    }
    Err(TransportError::ServiceNotFound(
        "no vehicle service handle for either generation".to_string(),
    ))
}
