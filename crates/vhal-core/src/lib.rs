//! vhal-core - Core types for the vehicle HAL client
//!
//! This crate provides the transport-neutral data model shared by both
//! vehicle transport generations: property values and configurations, the
//! wire request/result envelopes, subscription options, and the
//! caller-facing error taxonomy. It carries no transport or correlation
//! state of its own.

pub mod error;
pub mod models;

pub use error::{ClientError, ClientResult};
pub use models::*;
