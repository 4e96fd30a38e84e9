//! Modern backend: batch-capable wire with per-item correlation ids
//!
//! The public contract is single-item, so every get/set wraps one request
//! into a one-element batch on the way out and the result router unwraps
//! per-item results on the way back. Keeping the batch shape here means
//! the correlation engine is identical for both generations, and a future
//! multi-request submission only touches this adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use vhal_core::{
    GetValueRequest, GetValueResults, PropertyConfig, PropertyValue, SetValueRequest,
    SetValueResults,
};

use super::paging;
use super::wire::{
    DeathRecipient, ModernEventCallback, ModernResultCallback, ModernVehicle,
};
use super::{BackendGeneration, SubscriptionTransport, TransportError, VehicleTransport};
use crate::pending::PendingRequests;
use crate::subscription::VehicleEventListener;

/// Routes correlated result batches into the shared pending tables.
///
/// Runs on the wire's callback context; it only removes the matching
/// entry and fulfills its slot, never blocking on a caller. Results with
/// no matching entry raced a timeout eviction and are dropped.
struct ModernResultRouter {
    pending: Arc<PendingRequests>,
}

impl ModernResultCallback for ModernResultRouter {
    fn on_get_values(&self, results: GetValueResults) {
        for result in paging::unbox_get_results(results) {
            self.pending.gets.resolve(result.request_id, result);
        }
    }

    fn on_set_values(&self, results: SetValueResults) {
        for result in paging::unbox_set_results(results) {
            self.pending.sets.resolve(result.request_id, result);
        }
    }
}

/// Flips the backend invalid when the remote side disappears. Outstanding
/// requests are not cancelled; they run into their own timeout.
struct DeathWatch {
    alive: Arc<AtomicBool>,
}

impl DeathRecipient for DeathWatch {
    fn on_death(&self) {
        warn!("modern vehicle service died");
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Backend over the modern vehicle service handle.
pub struct ModernBackend {
    raw: Arc<dyn ModernVehicle>,
    results: Arc<ModernResultRouter>,
    alive: Arc<AtomicBool>,
}

impl ModernBackend {
    pub fn new(raw: Arc<dyn ModernVehicle>, pending: Arc<PendingRequests>) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let watch: Arc<dyn DeathRecipient> = Arc::new(DeathWatch {
            alive: alive.clone(),
        });
        if let Err(e) = raw.link_to_death(watch) {
            warn!(%e, "could not watch modern transport liveness");
        }
        Self {
            raw,
            results: Arc::new(ModernResultRouter { pending }),
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
impl VehicleTransport for ModernBackend {
    fn generation(&self) -> BackendGeneration {
        BackendGeneration::Modern
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
        let batch = paging::prepare_get_requests(vec![GetValueRequest {
            request_id,
            value: request.clone(),
        }]);
        self.raw.get_values(self.results.clone(), batch).await
    }

    async fn request_set(
        &self,
        request_id: u64,
        request: &PropertyValue,
    ) -> Result<(), TransportError> {
        self.ensure_valid()?;
        let batch = paging::prepare_set_requests(vec![SetValueRequest {
            request_id,
            value: request.clone(),
        }]);
        self.raw.set_values(self.results.clone(), batch).await
    }

    async fn get_all_configs(&self) -> Result<Vec<PropertyConfig>, TransportError> {
        self.ensure_valid()?;
        self.raw.get_all_prop_configs().await
    }

    async fn get_configs(&self, prop_ids: &[i32]) -> Result<Vec<PropertyConfig>, TransportError> {
        self.ensure_valid()?;
        self.raw.get_prop_configs(prop_ids).await
    }

    fn new_subscription(
        &self,
        listener: Arc<dyn VehicleEventListener>,
    ) -> Result<Arc<dyn SubscriptionTransport>, TransportError> {
        self.ensure_valid()?;
        Ok(Arc::new(ModernSubscription {
            raw: self.raw.clone(),
            events: Arc::new(ModernEventRouter { listener }),
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

/// Forwards subscription traffic to one client's listener. This is the
/// only bridge between the modern event callback and callers; result
/// batches cannot reach it.
struct ModernEventRouter {
    listener: Arc<dyn VehicleEventListener>,
}

impl ModernEventCallback for ModernEventRouter {
    fn on_property_events(&self, values: Vec<PropertyValue>) {
        self.listener.on_property_changed(values);
    }

    fn on_property_set_errors(&self, errors: Vec<vhal_core::PropertySetError>) {
        self.listener.on_set_error(errors);
    }
}

/// Per-client subscription registration against the modern wire.
struct ModernSubscription {
    raw: Arc<dyn ModernVehicle>,
    events: Arc<ModernEventRouter>,
}

#[async_trait]
impl SubscriptionTransport for ModernSubscription {
    async fn subscribe(&self, options: &[vhal_core::SubscribeOptions]) -> Result<(), TransportError> {
        let callback: Arc<dyn ModernEventCallback> = self.events.clone();
        self.raw.subscribe(callback, options.to_vec()).await
    }

    async fn unsubscribe(&self, prop_ids: &[i32]) -> Result<(), TransportError> {
        let callback: Arc<dyn ModernEventCallback> = self.events.clone();
        self.raw.unsubscribe(callback, prop_ids).await
    }
}
