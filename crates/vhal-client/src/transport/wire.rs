//! Raw wire handles for the two vehicle service generations
//!
//! These traits are the opaque IPC endpoints the client binds to. The
//! platform's service manager hands out implementations in production;
//! tests use [`crate::transport::mock::MockVehicle`]. Marshalling is the
//! wire's concern; everything here is already structured.
//!
//! The modern generation takes batched requests with per-item correlation
//! ids and keeps its result and event callbacks as separate registrations.
//! The legacy generation takes one request per call, correlated by the
//! call's own lifetime, and shares a single callback interface between
//! change events and set completion echoes.

use std::sync::Arc;

use async_trait::async_trait;
use vhal_core::{
    GetValueRequests, GetValueResults, PropertyConfig, PropertySetError, PropertyValue,
    SetValueRequests, SetValueResults, StatusCode, SubscribeOptions,
};

use super::TransportError;

/// Locates a live transport handle for either generation, or fails.
///
/// Discovery itself (service manager, driver registry, ...) is out of
/// process and out of scope; a `None` simply means "no such service".
pub trait VehicleServiceLocator: Send + Sync {
    fn locate_modern(&self) -> Option<Arc<dyn ModernVehicle>>;
    fn locate_legacy(&self) -> Option<Arc<dyn LegacyVehicle>>;
}

/// One-shot notification that the remote side of the transport is gone.
pub trait DeathRecipient: Send + Sync {
    fn on_death(&self);
}

/// Receiver for correlated get/set result batches on the modern wire.
///
/// Deliberately a different trait from [`ModernEventCallback`]: a result
/// batch can never be handed to a subscription listener because no type
/// unifies the two registrations.
pub trait ModernResultCallback: Send + Sync {
    fn on_get_values(&self, results: GetValueResults);
    fn on_set_values(&self, results: SetValueResults);
}

/// Receiver for subscription traffic on the modern wire.
pub trait ModernEventCallback: Send + Sync {
    fn on_property_events(&self, values: Vec<PropertyValue>);
    fn on_property_set_errors(&self, errors: Vec<PropertySetError>);
}

/// Modern vehicle service handle: batch-capable, asynchronous results.
///
/// `get_values`/`set_values` return as soon as the batch is accepted;
/// results arrive later on the given callback, on an arbitrary worker
/// context, carrying the per-item request ids.
#[async_trait]
pub trait ModernVehicle: Send + Sync {
    async fn get_values(
        &self,
        callback: Arc<dyn ModernResultCallback>,
        requests: GetValueRequests,
    ) -> Result<(), TransportError>;

    async fn set_values(
        &self,
        callback: Arc<dyn ModernResultCallback>,
        requests: SetValueRequests,
    ) -> Result<(), TransportError>;

    async fn get_all_prop_configs(&self) -> Result<Vec<PropertyConfig>, TransportError>;

    async fn get_prop_configs(&self, prop_ids: &[i32])
        -> Result<Vec<PropertyConfig>, TransportError>;

    async fn subscribe(
        &self,
        callback: Arc<dyn ModernEventCallback>,
        options: Vec<SubscribeOptions>,
    ) -> Result<(), TransportError>;

    async fn unsubscribe(
        &self,
        callback: Arc<dyn ModernEventCallback>,
        prop_ids: &[i32],
    ) -> Result<(), TransportError>;

    async fn dump(&self, args: &[String]) -> Result<String, TransportError>;

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), TransportError>;

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> Result<(), TransportError>;
}

/// Combined callback interface of the legacy wire.
///
/// One registration carries change events, the set completion echo, and
/// asynchronous set errors. Correlated get/set results never travel here;
/// they are the return value of the originating call.
pub trait LegacyVehicleCallback: Send + Sync {
    fn on_property_event(&self, values: Vec<PropertyValue>);
    fn on_property_set(&self, value: PropertyValue);
    fn on_property_set_error(&self, errors: Vec<PropertySetError>);
}

/// Legacy vehicle service handle: one in-flight get or set per call.
///
/// The call's own lifetime is the correlation; no request id crosses the
/// wire. A get may legitimately complete with `Ok` and no value.
#[async_trait]
pub trait LegacyVehicle: Send + Sync {
    async fn get(
        &self,
        request: PropertyValue,
    ) -> Result<(StatusCode, Option<PropertyValue>), TransportError>;

    async fn set(&self, request: PropertyValue) -> Result<StatusCode, TransportError>;

    async fn get_all_prop_configs(&self) -> Result<Vec<PropertyConfig>, TransportError>;

    async fn subscribe(
        &self,
        callback: Arc<dyn LegacyVehicleCallback>,
        options: Vec<SubscribeOptions>,
    ) -> Result<(), TransportError>;

    async fn unsubscribe(
        &self,
        callback: Arc<dyn LegacyVehicleCallback>,
        prop_ids: &[i32],
    ) -> Result<(), TransportError>;

    async fn dump(&self, args: &[String]) -> Result<String, TransportError>;

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), TransportError>;

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> Result<(), TransportError>;
}
