//! Wire envelopes for correlated get/set traffic
//!
//! Requests carry the correlation id assigned by the client; results echo
//! it back so the asynchronous delivery can be matched to its originating
//! call. Batch envelopes additionally carry a `boxed` marker for payloads
//! that were moved out-of-band because they exceed the transport's
//! single-call limit.

use serde::{Deserialize, Serialize};

use super::value::{PropertyValue, StatusCode};

/// A single correlated get request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetValueRequest {
    pub request_id: u64,
    pub value: PropertyValue,
}

/// A single correlated set request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetValueRequest {
    pub request_id: u64,
    pub value: PropertyValue,
}

/// Result of one get request. `value` is absent when the remote status is
/// not OK, and may also legitimately be absent on OK when the property
/// currently has no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetValueResult {
    pub request_id: u64,
    pub status: StatusCode,
    pub value: Option<PropertyValue>,
}

impl GetValueResult {
    pub fn ok(request_id: u64, value: PropertyValue) -> Self {
        Self {
            request_id,
            status: StatusCode::Ok,
            value: Some(value),
        }
    }

    pub fn error(request_id: u64, status: StatusCode) -> Self {
        Self {
            request_id,
            status,
            value: None,
        }
    }
}

/// Result of one set request; carries a status only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetValueResult {
    pub request_id: u64,
    pub status: StatusCode,
}

macro_rules! batch_envelope {
    ($name:ident, $item:ty, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub payloads: Vec<$item>,
            /// True when the payloads were handed over out-of-band rather
            /// than inline in the call
            #[serde(default)]
            pub boxed: bool,
        }

        impl $name {
            pub fn inline(payloads: Vec<$item>) -> Self {
                Self {
                    payloads,
                    boxed: false,
                }
            }

            /// Fallback used when a boxed batch cannot be recovered.
            pub fn empty() -> Self {
                Self::default()
            }

            pub fn len(&self) -> usize {
                self.payloads.len()
            }

            pub fn is_empty(&self) -> bool {
                self.payloads.is_empty()
            }
        }
    };
}

batch_envelope!(GetValueRequests, GetValueRequest, "Batch of get requests.");
batch_envelope!(SetValueRequests, SetValueRequest, "Batch of set requests.");
batch_envelope!(GetValueResults, GetValueResult, "Batch of get results.");
batch_envelope!(SetValueResults, SetValueResult, "Batch of set results.");
