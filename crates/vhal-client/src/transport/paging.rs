//! Batch payload paging
//!
//! A single transport call carries at most [`MAX_INLINE_PAYLOAD_BYTES`] of
//! marshalled payload. Larger batches are marked `boxed` and handed over
//! out-of-band by the wire layer; how the page travels is the transport's
//! concern. Result batches coming back may equally be boxed, and a page
//! that cannot be recovered degrades to an empty result batch rather than
//! an error on the callback path.

use tracing::{debug, error};
use vhal_core::{
    GetValueRequest, GetValueRequests, GetValueResult, GetValueResults, PropertyValue,
    SetValueRequest, SetValueRequests, SetValueResult, SetValueResults,
};

use super::TransportError;

/// Inline payload ceiling for one transport call.
pub const MAX_INLINE_PAYLOAD_BYTES: usize = 16 * 1024;

/// Absolute payload ceiling; values above this cannot be paged either.
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024;

/// Argument check applied before any request id is allocated.
pub fn check_request_payload(value: &PropertyValue) -> Result<(), TransportError> {
    let size = value.wire_size();
    if size > MAX_PAYLOAD_BYTES {
        return Err(TransportError::InvalidArg(format!(
            "payload of {} bytes for property {} exceeds the {} byte transport ceiling",
            size, value.prop_id, MAX_PAYLOAD_BYTES
        )));
    }
    Ok(())
}

fn batch_size<'a>(values: impl Iterator<Item = &'a PropertyValue>) -> usize {
    values.map(PropertyValue::wire_size).sum()
}

/// Wrap get requests for submission, boxing the batch when it is too large
/// to travel inline.
pub fn prepare_get_requests(requests: Vec<GetValueRequest>) -> GetValueRequests {
    let size = batch_size(requests.iter().map(|r| &r.value));
    if size > MAX_INLINE_PAYLOAD_BYTES {
        debug!(size, count = requests.len(), "boxing get request batch");
        return GetValueRequests {
            payloads: requests,
            boxed: true,
        };
    }
    GetValueRequests::inline(requests)
}

/// Wrap set requests for submission, boxing the batch when it is too large
/// to travel inline.
pub fn prepare_set_requests(requests: Vec<SetValueRequest>) -> SetValueRequests {
    let size = batch_size(requests.iter().map(|r| &r.value));
    if size > MAX_INLINE_PAYLOAD_BYTES {
        debug!(size, count = requests.len(), "boxing set request batch");
        return SetValueRequests {
            payloads: requests,
            boxed: true,
        };
    }
    SetValueRequests::inline(requests)
}

/// Unwrap a possibly boxed get result batch. A boxed batch whose page was
/// lost yields the empty fallback; the affected requests time out on the
/// caller side instead of crashing the callback worker.
pub fn unbox_get_results(results: GetValueResults) -> Vec<GetValueResult> {
    if results.boxed && results.payloads.is_empty() {
        error!("boxed get result batch could not be recovered, substituting empty results");
        return GetValueResults::empty().payloads;
    }
    results.payloads
}

/// Unwrap a possibly boxed set result batch, with the same fallback.
pub fn unbox_set_results(results: SetValueResults) -> Vec<SetValueResult> {
    if results.boxed && results.payloads.is_empty() {
        error!("boxed set result batch could not be recovered, substituting empty results");
        return SetValueResults::empty().payloads;
    }
    results.payloads
}
