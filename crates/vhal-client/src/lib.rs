//! vhal-client - Dual-generation client for the vehicle properties service
//!
//! This crate binds to whichever vehicle service generation is registered
//! and presents one transport-agnostic contract: get a property, set a
//! property, enumerate configurations, subscribe to change events. The
//! wire delivers get/set results through out-of-band callbacks that may
//! arrive late or never; the correlation engine converts that push-style
//! delivery into bounded blocking calls.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       VehicleClient                          │
//! │                                                              │
//! │  ┌────────────────┐  ┌─────────────────┐  ┌──────────────┐  │
//! │  │CorrelationEngine│ │SubscriptionClient│ │ ClientConfig │  │
//! │  │ (id + timeout)  │ │ (listener fanout)│ │ (timeouts)   │  │
//! │  └───────┬────────┘  └────────┬────────┘  └──────────────┘  │
//! │          │                    │                              │
//! │   ┌──────┴─────────┐          │                              │
//! │   │PendingRequests │◄─────────┼── result callbacks           │
//! │   │ (id → slot)    │          │                              │
//! │   └──────┬─────────┘          │                              │
//! │          │                    │                              │
//! │   ┌──────┴────────────────────┴──────┐                       │
//! │   │        VehicleTransport          │                       │
//! │   │  (ModernBackend | LegacyBackend) │                       │
//! │   └──────────────────┬───────────────┘                       │
//! │                      │                                       │
//! │          ┌───────────┴────────────┐                          │
//! │          │ ModernVehicle /        │                          │
//! │          │ LegacyVehicle (wire)   │                          │
//! │          └────────────────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod correlation;
pub mod pending;
pub mod subscription;
pub mod transport;

pub use client::VehicleClient;
pub use config::ClientConfig;
pub use correlation::CorrelationEngine;
pub use pending::{PendingRequestTable, PendingRequests, RequestIdAllocator};
pub use subscription::{SubscriptionClient, VehicleEventListener};
pub use transport::mock::{MockVehicle, StaticServiceLocator};
pub use transport::wire::{
    DeathRecipient, LegacyVehicle, LegacyVehicleCallback, ModernEventCallback,
    ModernResultCallback, ModernVehicle, VehicleServiceLocator,
};
pub use transport::{
    select_backend, BackendGeneration, SubscriptionTransport, TransportError, VehicleTransport,
};

// Re-export for convenience
pub use vhal_core::{
    AreaConfig, ChangeMode, ClientError, ClientResult, GetValueRequest, GetValueResult,
    PropertyAccess, PropertyConfig, PropertyPayload, PropertySetError, PropertyStatus,
    PropertyValue, SetValueRequest, SetValueResult, StatusCode, SubscribeOptions,
};
