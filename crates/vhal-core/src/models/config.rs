//! Static property configuration
//!
//! Configurations are snapshots enumerated from the vehicle service. They
//! are never mutated after creation; a fresh enumeration produces fresh
//! snapshots.

use serde::{Deserialize, Serialize};

/// Who may read or write a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAccess {
    Read,
    Write,
    ReadWrite,
}

impl PropertyAccess {
    pub fn readable(&self) -> bool {
        matches!(self, PropertyAccess::Read | PropertyAccess::ReadWrite)
    }

    pub fn writable(&self) -> bool {
        matches!(self, PropertyAccess::Write | PropertyAccess::ReadWrite)
    }
}

/// How a property's value evolves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMode {
    /// Never changes after boot
    Static,
    /// Changes sporadically, events fire on change
    OnChange,
    /// Changes continuously, sampled at a subscription rate
    Continuous,
}

/// Per-area limits for a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub area_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_int32: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_int32: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_int64: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_int64: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_float: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_float: Option<f32>,
}

/// Static configuration of a single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub prop_id: i32,
    pub access: PropertyAccess,
    pub change_mode: ChangeMode,
    /// Per-area limits; empty for global-only properties
    #[serde(default)]
    pub area_configs: Vec<AreaConfig>,
    /// Backend-specific configuration words
    #[serde(default)]
    pub config_array: Vec<i32>,
    /// Valid subscription rate range for continuous properties
    #[serde(default)]
    pub min_sample_rate_hz: f32,
    #[serde(default)]
    pub max_sample_rate_hz: f32,
}

impl PropertyConfig {
    pub fn area_config(&self, area_id: i32) -> Option<&AreaConfig> {
        self.area_configs.iter().find(|a| a.area_id == area_id)
    }
}
