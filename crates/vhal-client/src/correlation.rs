//! Request/response correlation engine
//!
//! Converts the wire's push-style result delivery into bounded blocking
//! calls. Per request: allocate an id, park a single-assignment slot in
//! the pending table, dispatch through the backend, then race the
//! caller-side timeout against the asynchronous callback. Both terminal
//! states (resolved, timed out) remove the table entry; the race loser
//! tolerates the missing entry silently. No cancellation is ever sent to
//! the transport; a timed-out request is abandoned and its late result,
//! if any, is dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vhal_core::{ClientError, ClientResult, GetValueResult, PropertyValue, SetValueResult};

use crate::config::ClientConfig;
use crate::pending::PendingRequests;
use crate::transport::VehicleTransport;

/// Drives the correlated get/set lifecycle over a shared pending table.
///
/// The response timeout is owned per engine instance (and therefore per
/// client façade), not process-wide, so independent clients in one process
/// do not interfere. A background sweeper evicts entries whose caller
/// abandoned the wait without running the timeout path (dropped future);
/// it is a backstop, not the timeout mechanism.
pub struct CorrelationEngine {
    pending: Arc<PendingRequests>,
    timeout: Arc<RwLock<Duration>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CorrelationEngine {
    /// Create the engine and start its sweeper. Requires a running Tokio
    /// runtime.
    pub fn new(pending: Arc<PendingRequests>, config: &ClientConfig) -> Self {
        let timeout = Arc::new(RwLock::new(config.response_timeout()));
        let sweeper = Self::start_sweeper(
            pending.clone(),
            timeout.clone(),
            Duration::from_millis(config.sweep_interval_ms),
        );
        Self {
            pending,
            timeout,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    fn start_sweeper(
        pending: Arc<PendingRequests>,
        timeout: Arc<RwLock<Duration>>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await; // skip first
            loop {
                timer.tick().await;
                let max_age = *timeout.read() * 2;
                let evicted = pending.purge_stale(max_age);
                if evicted > 0 {
                    warn!(evicted, "evicted abandoned pending requests");
                }
            }
        })
    }

    pub fn response_timeout(&self) -> Duration {
        *self.timeout.read()
    }

    pub fn set_response_timeout(&self, timeout: Duration) {
        *self.timeout.write() = timeout;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.total_pending()
    }

    /// Correlated get. `Ok(None)` means the remote answered OK with no
    /// payload, i.e. the property currently has no value.
    pub async fn get(
        &self,
        backend: &dyn VehicleTransport,
        request: &PropertyValue,
    ) -> ClientResult<Option<PropertyValue>> {
        let request_id = self.pending.allocate_id();
        let rx = self.pending.gets.register(request_id);

        if let Err(e) = backend.request_get(request_id, request).await {
            self.pending.gets.evict(request_id);
            return Err(e.into());
        }

        let wait = self.response_timeout();
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(result)) => Self::unpack_get(result),
            Ok(Err(_)) => {
                // slot closed without a result: swept or shut down
                self.pending.gets.evict(request_id);
                Err(ClientError::Interrupted)
            }
            Err(_) => {
                // eviction may find nothing when the callback won the race
                // a moment ago; the timeout outcome stands either way
                self.pending.gets.evict(request_id);
                debug!(
                    request_id,
                    prop_id = request.prop_id,
                    timeout_ms = wait.as_millis() as u64,
                    "get timed out"
                );
                Err(ClientError::Timeout)
            }
        }
    }

    /// Correlated set; the result carries only a status.
    pub async fn set(
        &self,
        backend: &dyn VehicleTransport,
        request: &PropertyValue,
    ) -> ClientResult<()> {
        let request_id = self.pending.allocate_id();
        let rx = self.pending.sets.register(request_id);

        if let Err(e) = backend.request_set(request_id, request).await {
            self.pending.sets.evict(request_id);
            return Err(e.into());
        }

        let wait = self.response_timeout();
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(result)) => Self::unpack_set(result),
            Ok(Err(_)) => {
                self.pending.sets.evict(request_id);
                Err(ClientError::Interrupted)
            }
            Err(_) => {
                self.pending.sets.evict(request_id);
                debug!(
                    request_id,
                    prop_id = request.prop_id,
                    timeout_ms = wait.as_millis() as u64,
                    "set timed out"
                );
                Err(ClientError::Timeout)
            }
        }
    }

    fn unpack_get(result: GetValueResult) -> ClientResult<Option<PropertyValue>> {
        if !result.status.is_ok() {
            return Err(ClientError::RemoteStatus(result.status));
        }
        Ok(result.value)
    }

    fn unpack_set(result: SetValueResult) -> ClientResult<()> {
        if !result.status.is_ok() {
            return Err(ClientError::RemoteStatus(result.status));
        }
        Ok(())
    }
}

impl Drop for CorrelationEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}
