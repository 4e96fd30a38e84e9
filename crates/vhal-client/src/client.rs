//! Vehicle client façade
//!
//! Binds to one transport generation at construction and exposes the
//! unified contract: correlated get/set with a bounded wait, config
//! enumeration, subscription clients, death notification and a debug
//! dump. Callers never see which generation is active except through the
//! explicit [`generation`](VehicleClient::generation) query.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;
use vhal_core::{ClientResult, PropertyConfig, PropertyValue};

use crate::config::ClientConfig;
use crate::correlation::CorrelationEngine;
use crate::pending::PendingRequests;
use crate::subscription::{SubscriptionClient, VehicleEventListener};
use crate::transport::wire::{DeathRecipient, VehicleServiceLocator};
use crate::transport::{self, paging, BackendGeneration, VehicleTransport};

/// Transport-agnostic client for the vehicle properties service.
pub struct VehicleClient {
    backend: Arc<dyn VehicleTransport>,
    engine: CorrelationEngine,
}

impl std::fmt::Debug for VehicleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleClient")
            .field("generation", &self.backend.generation())
            .finish_non_exhaustive()
    }
}

impl VehicleClient {
    /// Bind to a vehicle service: modern generation preferred, legacy as
    /// the fallback, failure when neither is registered. The selection is
    /// made exactly once and never revisited. Requires a running Tokio
    /// runtime.
    pub fn connect(
        locator: &dyn VehicleServiceLocator,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        let pending = Arc::new(PendingRequests::new());
        let backend = transport::select_backend(locator, pending.clone())?;
        let engine = CorrelationEngine::new(pending, &config);
        Ok(Self { backend, engine })
    }

    /// Bind with default configuration.
    pub fn connect_default(locator: &dyn VehicleServiceLocator) -> ClientResult<Self> {
        Self::connect(locator, ClientConfig::default())
    }

    /// Which transport generation this client is bound to.
    pub fn generation(&self) -> BackendGeneration {
        self.backend.generation()
    }

    /// Whether the transport handle is still usable.
    pub fn is_valid(&self) -> bool {
        self.backend.is_valid()
    }

    /// Read one property. `Ok(None)` means the service answered OK but the
    /// property currently has no value.
    pub async fn get(&self, request: &PropertyValue) -> ClientResult<Option<PropertyValue>> {
        paging::check_request_payload(request)?;
        debug!(prop_id = request.prop_id, area_id = request.area_id, "get");
        self.engine.get(self.backend.as_ref(), request).await
    }

    /// Write one property.
    pub async fn set(&self, request: &PropertyValue) -> ClientResult<()> {
        paging::check_request_payload(request)?;
        debug!(prop_id = request.prop_id, area_id = request.area_id, "set");
        self.engine.set(self.backend.as_ref(), request).await
    }

    /// Enumerate every property configuration the service knows.
    pub async fn get_all_configs(&self) -> ClientResult<Vec<PropertyConfig>> {
        Ok(self.backend.get_all_configs().await?)
    }

    /// Enumerate configurations for specific properties.
    pub async fn get_configs(&self, prop_ids: &[i32]) -> ClientResult<Vec<PropertyConfig>> {
        Ok(self.backend.get_configs(prop_ids).await?)
    }

    /// Create a subscription client delivering events to `listener`.
    pub fn new_subscription_client(
        &self,
        listener: Arc<dyn VehicleEventListener>,
    ) -> ClientResult<SubscriptionClient> {
        let transport = self.backend.new_subscription(listener)?;
        Ok(SubscriptionClient::new(transport))
    }

    /// Register a one-shot notification for transport death.
    pub fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> ClientResult<()> {
        Ok(self.backend.link_to_death(recipient)?)
    }

    /// Cancel a previously registered death notification.
    pub fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> ClientResult<()> {
        Ok(self.backend.unlink_to_death(recipient)?)
    }

    /// Debug dump: client state header plus the raw transport dump.
    pub async fn dump(&self, args: &[String]) -> ClientResult<String> {
        let mut out = String::new();
        let _ = writeln!(out, "VehicleClient dump ({})", Utc::now().to_rfc3339());
        let _ = writeln!(out, "  generation: {}", self.backend.generation());
        let _ = writeln!(out, "  valid: {}", self.backend.is_valid());
        let _ = writeln!(out, "  pending requests: {}", self.engine.pending_count());
        let _ = writeln!(
            out,
            "  response timeout: {} ms",
            self.engine.response_timeout().as_millis()
        );
        out.push_str(&self.backend.dump(args).await?);
        Ok(out)
    }

    /// Current bounded wait for get/set results.
    pub fn response_timeout(&self) -> Duration {
        self.engine.response_timeout()
    }

    /// Override the bounded wait for this instance (test hook).
    pub fn set_response_timeout(&self, timeout: Duration) {
        self.engine.set_response_timeout(timeout);
    }

    /// Number of requests currently awaiting a result.
    pub fn pending_request_count(&self) -> usize {
        self.engine.pending_count()
    }
}
