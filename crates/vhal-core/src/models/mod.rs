//! Data model for vehicle properties
//!
//! All types here are plain immutable snapshots: once constructed they are
//! never mutated, only cloned or moved between the client and the wire.

pub mod config;
pub mod request;
pub mod subscribe;
pub mod value;

pub use config::{AreaConfig, ChangeMode, PropertyAccess, PropertyConfig};
pub use request::{
    GetValueRequest, GetValueRequests, GetValueResult, GetValueResults, SetValueRequest,
    SetValueRequests, SetValueResult, SetValueResults,
};
pub use subscribe::{PropertySetError, SubscribeOptions};
pub use value::{PropertyPayload, PropertyStatus, PropertyValue, StatusCode};
