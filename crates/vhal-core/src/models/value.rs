//! Property values and status codes

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Availability of a single property value as reported by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    /// Value is valid and current
    Available,
    /// Property exists but has no usable value right now
    Unavailable,
    /// The vehicle reported an error state for this property
    Error,
}

impl Default for PropertyStatus {
    fn default() -> Self {
        Self::Available
    }
}

/// Status of a remote get/set call, as reported by the vehicle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok = 0,
    /// Transient failure, the caller may retry
    TryAgain = 1,
    InvalidArg = 2,
    NotAvailable = 3,
    AccessDenied = 4,
    InternalError = 5,
}

impl StatusCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl TryFrom<i32> for StatusCode {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, i32> {
        match raw {
            0 => Ok(StatusCode::Ok),
            1 => Ok(StatusCode::TryAgain),
            2 => Ok(StatusCode::InvalidArg),
            3 => Ok(StatusCode::NotAvailable),
            4 => Ok(StatusCode::AccessDenied),
            5 => Ok(StatusCode::InternalError),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::TryAgain => "TRY_AGAIN",
            StatusCode::InvalidArg => "INVALID_ARG",
            StatusCode::NotAvailable => "NOT_AVAILABLE",
            StatusCode::AccessDenied => "ACCESS_DENIED",
            StatusCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{} ({})", name, *self as i32)
    }
}

/// Typed payload of a property value.
///
/// `Empty` is used for request-only values (a get request identifies the
/// property but carries no data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyPayload {
    Empty,
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Bytes(Bytes),
    String(String),
}

impl PropertyPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyPayload::Empty => true,
            PropertyPayload::Int32(v) => v.is_empty(),
            PropertyPayload::Int64(v) => v.is_empty(),
            PropertyPayload::Float(v) => v.is_empty(),
            PropertyPayload::Bytes(b) => b.is_empty(),
            PropertyPayload::String(s) => s.is_empty(),
        }
    }

    /// Estimated marshalled size in bytes, used to decide whether a batch
    /// fits a single transport call or must be paged out-of-band.
    pub fn wire_size(&self) -> usize {
        match self {
            PropertyPayload::Empty => 0,
            PropertyPayload::Int32(v) => v.len() * 4,
            PropertyPayload::Int64(v) => v.len() * 8,
            PropertyPayload::Float(v) => v.len() * 4,
            PropertyPayload::Bytes(b) => b.len(),
            PropertyPayload::String(s) => s.len(),
        }
    }
}

impl Default for PropertyPayload {
    fn default() -> Self {
        Self::Empty
    }
}

/// A single property value: identity, timestamp and typed payload.
///
/// Area id 0 conventionally means "global" (the whole vehicle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub prop_id: i32,
    pub area_id: i32,
    /// Event time in nanoseconds on the vehicle's monotonic clock
    pub timestamp_ns: i64,
    pub status: PropertyStatus,
    pub payload: PropertyPayload,
}

impl PropertyValue {
    pub fn new(prop_id: i32, area_id: i32, payload: PropertyPayload) -> Self {
        Self {
            prop_id,
            area_id,
            timestamp_ns: 0,
            status: PropertyStatus::Available,
            payload,
        }
    }

    /// A request-only value: identifies the property, carries no data.
    pub fn request(prop_id: i32, area_id: i32) -> Self {
        Self::new(prop_id, area_id, PropertyPayload::Empty)
    }

    pub fn with_status(mut self, status: PropertyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_timestamp(mut self, timestamp_ns: i64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Property/area pair identifying the value
    pub fn key(&self) -> (i32, i32) {
        (self.prop_id, self.area_id)
    }

    pub fn wire_size(&self) -> usize {
        // fixed header fields plus the typed payload
        16 + self.payload.wire_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, StatusCode::Ok)]
    #[case(1, StatusCode::TryAgain)]
    #[case(2, StatusCode::InvalidArg)]
    #[case(3, StatusCode::NotAvailable)]
    #[case(4, StatusCode::AccessDenied)]
    #[case(5, StatusCode::InternalError)]
    fn status_code_round_trips_through_raw(#[case] raw: i32, #[case] expected: StatusCode) {
        assert_eq!(StatusCode::try_from(raw), Ok(expected));
        assert_eq!(expected as i32, raw);
    }

    #[test]
    fn unknown_status_code_is_rejected() {
        assert_eq!(StatusCode::try_from(42), Err(42));
    }

    #[test]
    fn request_value_has_empty_payload() {
        let value = PropertyValue::request(1001, 0);
        assert!(value.payload.is_empty());
        assert_eq!(value.key(), (1001, 0));
        assert_eq!(value.status, PropertyStatus::Available);
    }

    #[test]
    fn wire_size_tracks_payload() {
        let value = PropertyValue::new(1, 0, PropertyPayload::Int32(vec![1, 2, 3]));
        assert_eq!(value.payload.wire_size(), 12);
        assert_eq!(value.wire_size(), 28);
    }
}
