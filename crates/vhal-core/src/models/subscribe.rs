//! Subscription options and asynchronous set-error events

use serde::{Deserialize, Serialize};

use super::value::StatusCode;

/// Interest in change events for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    pub prop_id: i32,
    /// Areas to watch; empty means all areas of the property
    #[serde(default)]
    pub area_ids: Vec<i32>,
    /// Sampling rate for continuous properties; ignored for on-change ones
    #[serde(default)]
    pub sample_rate_hz: f32,
}

impl SubscribeOptions {
    pub fn on_change(prop_id: i32) -> Self {
        Self {
            prop_id,
            area_ids: Vec::new(),
            sample_rate_hz: 0.0,
        }
    }

    pub fn sampled(prop_id: i32, sample_rate_hz: f32) -> Self {
        Self {
            prop_id,
            area_ids: Vec::new(),
            sample_rate_hz,
        }
    }
}

/// Asynchronous failure of a previously accepted set, delivered through the
/// subscription channel rather than the correlated result path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertySetError {
    pub prop_id: i32,
    pub area_id: i32,
    pub status: StatusCode,
}
