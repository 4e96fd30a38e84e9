//! Per-caller subscription handles
//!
//! A subscription client owns one event-callback registration on the
//! active backend and forwards notifications to its caller-supplied
//! listener. It carries no correlation state: subscribe and unsubscribe
//! are fire-and-forget against the wire and surface only immediate
//! synchronous failures.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use vhal_core::{ClientError, ClientResult, PropertySetError, PropertyValue, SubscribeOptions};

use crate::transport::SubscriptionTransport;

/// Caller-supplied receiver for asynchronous vehicle notifications.
///
/// Invoked from the transport's callback context; implementations must not
/// block.
pub trait VehicleEventListener: Send + Sync {
    /// Batch of changed property values
    fn on_property_changed(&self, values: Vec<PropertyValue>);

    /// Batch of asynchronous set failures
    fn on_set_error(&self, errors: Vec<PropertySetError>);
}

/// Handle for one caller's property subscriptions.
///
/// Multiple clients may exist concurrently on the same stub, each with its
/// own listener; their property sets may overlap freely.
pub struct SubscriptionClient {
    id: Uuid,
    transport: Arc<dyn SubscriptionTransport>,
}

impl SubscriptionClient {
    pub(crate) fn new(transport: Arc<dyn SubscriptionTransport>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Register interest in a set of (property, sample-rate) pairs.
    pub async fn subscribe(&self, options: &[SubscribeOptions]) -> ClientResult<()> {
        validate_options(options)?;
        self.transport.subscribe(options).await?;
        info!(
            client_id = %self.id,
            props = ?options.iter().map(|o| o.prop_id).collect::<Vec<_>>(),
            "subscribed"
        );
        Ok(())
    }

    /// Drop interest in one property.
    pub async fn unsubscribe(&self, prop_id: i32) -> ClientResult<()> {
        self.transport.unsubscribe(&[prop_id]).await?;
        info!(client_id = %self.id, prop_id, "unsubscribed");
        Ok(())
    }
}

impl std::fmt::Debug for SubscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionClient")
            .field("id", &self.id)
            .finish()
    }
}

fn validate_options(options: &[SubscribeOptions]) -> ClientResult<()> {
    if options.is_empty() {
        return Err(ClientError::InvalidRequest(
            "no subscribe options given".to_string(),
        ));
    }
    for option in options {
        if !option.sample_rate_hz.is_finite() || option.sample_rate_hz < 0.0 {
            return Err(ClientError::InvalidRequest(format!(
                "bad sample rate {} for property {}",
                option.sample_rate_hz, option.prop_id
            )));
        }
    }
    Ok(())
}
