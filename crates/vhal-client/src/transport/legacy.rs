//! Legacy backend: one request per wire call, implicit correlation
//!
//! The legacy wire has no request ids. Each dispatch spawns a task that
//! drives the single-shot call and resolves the caller's pending slot
//! with a result synthesized under the locally allocated id; the call's
//! lifetime is the correlation scope. Wire failures degrade to an
//! internal-error status so the caller-facing shape matches the modern
//! backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use vhal_core::{
    GetValueResult, PropertyConfig, PropertySetError, PropertyValue, SetValueResult, StatusCode,
    SubscribeOptions,
};

use super::wire::{DeathRecipient, LegacyVehicle, LegacyVehicleCallback};
use super::{BackendGeneration, SubscriptionTransport, TransportError, VehicleTransport};
use crate::pending::PendingRequests;
use crate::subscription::VehicleEventListener;

struct DeathWatch {
    alive: Arc<AtomicBool>,
}

impl DeathRecipient for DeathWatch {
    fn on_death(&self) {
        warn!("legacy vehicle service died");
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Backend over the legacy vehicle service handle.
pub struct LegacyBackend {
    raw: Arc<dyn LegacyVehicle>,
    pending: Arc<PendingRequests>,
    alive: Arc<AtomicBool>,
}

impl LegacyBackend {
    pub fn new(raw: Arc<dyn LegacyVehicle>, pending: Arc<PendingRequests>) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let watch: Arc<dyn DeathRecipient> = Arc::new(DeathWatch {
            alive: alive.clone(),
        });
        if let Err(e) = raw.link_to_death(watch) {
            warn!(%e, "could not watch legacy transport liveness");
        }
        Self {
            raw,
            pending,
            alive,
        }
    }

    fn ensure_valid(&self) -> Result<(), TransportError> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::ConnectionClosed)
        }
    }
}

#[async_trait]
impl VehicleTransport for LegacyBackend {
    fn generation(&self) -> BackendGeneration {
        BackendGeneration::Legacy
    }

    fn is_valid(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn request_get(
        &self,
        request_id: u64,
        request: &PropertyValue,
    ) -> Result<(), TransportError> {
        self.ensure_valid()?;
        let raw = self.raw.clone();
        let pending = self.pending.clone();
        let request = request.clone();
        tokio::spawn(async move {
            let result = match raw.get(request).await {
                Ok((status, value)) => GetValueResult {
                    request_id,
                    status,
                    value,
                },
                Err(e) => {
                    warn!(request_id, %e, "legacy get failed on the wire");
                    GetValueResult::error(request_id, StatusCode::InternalError)
                }
            };
            pending.gets.resolve(request_id, result);
        });
        Ok(())
    }

    async fn request_set(
        &self,
        request_id: u64,
        request: &PropertyValue,
    ) -> Result<(), TransportError> {
        self.ensure_valid()?;
        let raw = self.raw.clone();
        let pending = self.pending.clone();
        let request = request.clone();
        tokio::spawn(async move {
            let status = match raw.set(request).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(request_id, %e, "legacy set failed on the wire");
                    StatusCode::InternalError
                }
            };
            pending.sets.resolve(request_id, SetValueResult { request_id, status });
        });
        Ok(())
    }

    async fn get_all_configs(&self) -> Result<Vec<PropertyConfig>, TransportError> {
        self.ensure_valid()?;
        self.raw.get_all_prop_configs().await
    }

    async fn get_configs(&self, prop_ids: &[i32]) -> Result<Vec<PropertyConfig>, TransportError> {
        // the legacy wire only enumerates as a whole; filter client-side
        self.ensure_valid()?;
        let configs = self.raw.get_all_prop_configs().await?;
        Ok(configs
            .into_iter()
            .filter(|c| prop_ids.contains(&c.prop_id))
            .collect())
    }

    fn new_subscription(
        &self,
        listener: Arc<dyn VehicleEventListener>,
    ) -> Result<Arc<dyn SubscriptionTransport>, TransportError> {
        self.ensure_valid()?;
        Ok(Arc::new(LegacySubscription {
            raw: self.raw.clone(),
            events: Arc::new(LegacyEventRouter { listener }),
        }))
    }

    async fn dump(&self, args: &[String]) -> Result<String, TransportError> {
        self.ensure_valid()?;
        self.raw.dump(args).await
    }

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.raw.link_to_death(recipient)
    }

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.raw.unlink_to_death(recipient)
    }
}

/// Forwards subscription traffic from the shared legacy callback to one
/// client's listener. The set completion echo is received here because the
/// legacy wire multiplexes it onto the same interface, but it is neither a
/// change event nor a correlated result, so it is ignored.
struct LegacyEventRouter {
    listener: Arc<dyn VehicleEventListener>,
}

impl LegacyVehicleCallback for LegacyEventRouter {
    fn on_property_event(&self, values: Vec<PropertyValue>) {
        self.listener.on_property_changed(values);
    }

    fn on_property_set(&self, value: PropertyValue) {
        debug!(prop_id = value.prop_id, "ignoring set completion echo");
    }

    fn on_property_set_error(&self, errors: Vec<PropertySetError>) {
        self.listener.on_set_error(errors);
    }
}

/// Per-client subscription registration against the legacy wire.
struct LegacySubscription {
    raw: Arc<dyn LegacyVehicle>,
    events: Arc<LegacyEventRouter>,
}

#[async_trait]
impl SubscriptionTransport for LegacySubscription {
    async fn subscribe(&self, options: &[SubscribeOptions]) -> Result<(), TransportError> {
        let callback: Arc<dyn LegacyVehicleCallback> = self.events.clone();
        self.raw.subscribe(callback, options.to_vec()).await
    }

    async fn unsubscribe(&self, prop_ids: &[i32]) -> Result<(), TransportError> {
        let callback: Arc<dyn LegacyVehicleCallback> = self.events.clone();
        self.raw.unsubscribe(callback, prop_ids).await
    }
}
