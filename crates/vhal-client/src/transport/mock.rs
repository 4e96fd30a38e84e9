//! Mock vehicle wire for testing
//!
//! One in-memory service implementing both generations' raw handles, so
//! the same fixture exercises the modern and the legacy backend. Set
//! stores, get echoes. Knobs cover the interesting transport behaviors:
//! artificial latency, per-property forced statuses, held responses (for
//! timeout-versus-late-callback races), event injection and death.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::debug;
use vhal_core::{
    GetValueRequests, GetValueResult, GetValueResults, PropertyConfig, PropertyPayload,
    PropertySetError, PropertyValue, SetValueRequests, SetValueResult, SetValueResults,
    StatusCode, SubscribeOptions,
};

use super::wire::{
    DeathRecipient, LegacyVehicle, LegacyVehicleCallback, ModernEventCallback,
    ModernResultCallback, ModernVehicle, VehicleServiceLocator,
};
use super::TransportError;

/// A reply withheld while `hold_responses` is active.
enum HeldReply {
    Get {
        callback: Arc<dyn ModernResultCallback>,
        results: GetValueResults,
    },
    Set {
        callback: Arc<dyn ModernResultCallback>,
        results: SetValueResults,
    },
    /// Gate an in-flight legacy call is parked on
    Legacy(Arc<Notify>),
}

/// In-memory vehicle service implementing both wire generations.
pub struct MockVehicle {
    props: RwLock<HashMap<(i32, i32), PropertyValue>>,
    configs: RwLock<Vec<PropertyConfig>>,
    forced_status: RwLock<HashMap<i32, StatusCode>>,
    latency: RwLock<Duration>,
    hold_responses: AtomicBool,
    held: Mutex<Vec<HeldReply>>,
    /// Serializes legacy traffic: that wire takes one in-flight call at a time
    legacy_gate: tokio::sync::Mutex<()>,
    modern_subs: RwLock<Vec<(Arc<dyn ModernEventCallback>, HashSet<i32>)>>,
    legacy_subs: RwLock<Vec<(Arc<dyn LegacyVehicleCallback>, HashSet<i32>)>>,
    death_recipients: Mutex<Vec<Arc<dyn DeathRecipient>>>,
    died: AtomicBool,
}

impl MockVehicle {
    pub fn new() -> Self {
        Self {
            props: RwLock::new(HashMap::new()),
            configs: RwLock::new(Vec::new()),
            forced_status: RwLock::new(HashMap::new()),
            latency: RwLock::new(Duration::ZERO),
            hold_responses: AtomicBool::new(false),
            held: Mutex::new(Vec::new()),
            legacy_gate: tokio::sync::Mutex::new(()),
            modern_subs: RwLock::new(Vec::new()),
            legacy_subs: RwLock::new(Vec::new()),
            death_recipients: Mutex::new(Vec::new()),
            died: AtomicBool::new(false),
        }
    }

    /// Seed a stored property value.
    pub fn store_value(&self, value: PropertyValue) {
        self.props.write().insert(value.key(), value);
    }

    pub fn set_configs(&self, configs: Vec<PropertyConfig>) {
        *self.configs.write() = configs;
    }

    /// Every get/set on `prop_id` answers with `status` instead of data.
    pub fn force_status(&self, prop_id: i32, status: StatusCode) {
        self.forced_status.write().insert(prop_id, status);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// While active, results are parked instead of delivered; release them
    /// later with [`release_held`](Self::release_held).
    pub fn hold_responses(&self, hold: bool) {
        self.hold_responses.store(hold, Ordering::SeqCst);
    }

    /// Deliver every parked reply now.
    pub fn release_held(&self) {
        let held: Vec<HeldReply> = std::mem::take(&mut *self.held.lock());
        for reply in held {
            match reply {
                HeldReply::Get { callback, results } => callback.on_get_values(results),
                HeldReply::Set { callback, results } => callback.on_set_values(results),
                HeldReply::Legacy(gate) => gate.notify_one(),
            }
        }
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Fan a change event out to every subscriber of the affected
    /// properties, on both generations.
    pub fn inject_property_events(&self, values: Vec<PropertyValue>) {
        let modern: Vec<_> = self
            .modern_subs
            .read()
            .iter()
            .map(|(cb, props)| (cb.clone(), filter_values(&values, props)))
            .collect();
        for (cb, filtered) in modern {
            if !filtered.is_empty() {
                cb.on_property_events(filtered);
            }
        }

        let legacy: Vec<_> = self
            .legacy_subs
            .read()
            .iter()
            .map(|(cb, props)| (cb.clone(), filter_values(&values, props)))
            .collect();
        for (cb, filtered) in legacy {
            if !filtered.is_empty() {
                cb.on_property_event(filtered);
            }
        }
    }

    /// Fan asynchronous set errors out to subscribers.
    pub fn inject_set_errors(&self, errors: Vec<PropertySetError>) {
        let modern: Vec<_> = self
            .modern_subs
            .read()
            .iter()
            .map(|(cb, props)| (cb.clone(), filter_errors(&errors, props)))
            .collect();
        for (cb, filtered) in modern {
            if !filtered.is_empty() {
                cb.on_property_set_errors(filtered);
            }
        }

        let legacy: Vec<_> = self
            .legacy_subs
            .read()
            .iter()
            .map(|(cb, props)| (cb.clone(), filter_errors(&errors, props)))
            .collect();
        for (cb, filtered) in legacy {
            if !filtered.is_empty() {
                cb.on_property_set_error(filtered);
            }
        }
    }

    /// Simulate the remote side disappearing: linked recipients fire once,
    /// every further call fails with `ConnectionClosed`.
    pub fn trigger_death(&self) {
        self.died.store(true, Ordering::SeqCst);
        let recipients: Vec<_> = std::mem::take(&mut *self.death_recipients.lock());
        for recipient in recipients {
            recipient.on_death();
        }
    }

    fn ensure_alive(&self) -> Result<(), TransportError> {
        if self.died.load(Ordering::SeqCst) {
            Err(TransportError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn lookup(&self, request: &PropertyValue) -> (StatusCode, Option<PropertyValue>) {
        if let Some(status) = self.forced_status.read().get(&request.prop_id) {
            return (*status, None);
        }
        (StatusCode::Ok, self.props.read().get(&request.key()).cloned())
    }

    fn store(&self, value: &PropertyValue) -> StatusCode {
        if let Some(status) = self.forced_status.read().get(&value.prop_id) {
            return *status;
        }
        self.props.write().insert(value.key(), value.clone());
        StatusCode::Ok
    }

    fn link_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.ensure_alive()?;
        self.death_recipients.lock().push(recipient);
        Ok(())
    }

    fn unlink_death(&self, recipient: &Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.death_recipients
            .lock()
            .retain(|r| !Arc::ptr_eq(r, recipient));
        Ok(())
    }

    fn dump_state(&self, args: &[String]) -> String {
        let props = self.props.read();
        let mut out = format!(
            "MockVehicle: {} stored properties, args {:?}\n",
            props.len(),
            args
        );
        let mut values: Vec<&PropertyValue> = props.values().collect();
        values.sort_by_key(|v| v.key());
        for value in values {
            let rendered = match &value.payload {
                PropertyPayload::Bytes(bytes) => hex::encode(bytes),
                other => serde_json::to_string(other).unwrap_or_else(|_| "<opaque>".to_string()),
            };
            out.push_str(&format!(
                "  prop {:#x} area {}: {}\n",
                value.prop_id, value.area_id, rendered
            ));
        }
        out
    }
}

impl Default for MockVehicle {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_values(values: &[PropertyValue], props: &HashSet<i32>) -> Vec<PropertyValue> {
    values
        .iter()
        .filter(|v| props.contains(&v.prop_id))
        .cloned()
        .collect()
}

fn filter_errors(errors: &[PropertySetError], props: &HashSet<i32>) -> Vec<PropertySetError> {
    errors
        .iter()
        .filter(|e| props.contains(&e.prop_id))
        .copied()
        .collect()
}

#[async_trait]
impl ModernVehicle for MockVehicle {
    async fn get_values(
        &self,
        callback: Arc<dyn ModernResultCallback>,
        requests: GetValueRequests,
    ) -> Result<(), TransportError> {
        self.ensure_alive()?;
        let results: Vec<GetValueResult> = requests
            .payloads
            .iter()
            .map(|r| {
                let (status, value) = self.lookup(&r.value);
                GetValueResult {
                    request_id: r.request_id,
                    status,
                    value,
                }
            })
            .collect();
        let results = GetValueResults::inline(results);

        if self.hold_responses.load(Ordering::SeqCst) {
            self.held.lock().push(HeldReply::Get { callback, results });
            return Ok(());
        }

        let latency = *self.latency.read();
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            callback.on_get_values(results);
        });
        Ok(())
    }

    async fn set_values(
        &self,
        callback: Arc<dyn ModernResultCallback>,
        requests: SetValueRequests,
    ) -> Result<(), TransportError> {
        self.ensure_alive()?;
        let results: Vec<SetValueResult> = requests
            .payloads
            .iter()
            .map(|r| SetValueResult {
                request_id: r.request_id,
                status: self.store(&r.value),
            })
            .collect();
        let results = SetValueResults::inline(results);

        if self.hold_responses.load(Ordering::SeqCst) {
            self.held.lock().push(HeldReply::Set { callback, results });
            return Ok(());
        }

        let latency = *self.latency.read();
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            callback.on_set_values(results);
        });
        Ok(())
    }

    async fn get_all_prop_configs(&self) -> Result<Vec<PropertyConfig>, TransportError> {
        self.ensure_alive()?;
        Ok(self.configs.read().clone())
    }

    async fn get_prop_configs(
        &self,
        prop_ids: &[i32],
    ) -> Result<Vec<PropertyConfig>, TransportError> {
        self.ensure_alive()?;
        Ok(self
            .configs
            .read()
            .iter()
            .filter(|c| prop_ids.contains(&c.prop_id))
            .cloned()
            .collect())
    }

    async fn subscribe(
        &self,
        callback: Arc<dyn ModernEventCallback>,
        options: Vec<SubscribeOptions>,
    ) -> Result<(), TransportError> {
        self.ensure_alive()?;
        let props: HashSet<i32> = options.iter().map(|o| o.prop_id).collect();
        let mut subs = self.modern_subs.write();
        if let Some((_, existing)) = subs.iter_mut().find(|(cb, _)| Arc::ptr_eq(cb, &callback)) {
            existing.extend(props);
        } else {
            subs.push((callback, props));
        }
        Ok(())
    }

    async fn unsubscribe(
        &self,
        callback: Arc<dyn ModernEventCallback>,
        prop_ids: &[i32],
    ) -> Result<(), TransportError> {
        self.ensure_alive()?;
        let mut subs = self.modern_subs.write();
        if let Some((_, existing)) = subs.iter_mut().find(|(cb, _)| Arc::ptr_eq(cb, &callback)) {
            for prop_id in prop_ids {
                existing.remove(prop_id);
            }
        }
        subs.retain(|(_, props)| !props.is_empty());
        Ok(())
    }

    async fn dump(&self, args: &[String]) -> Result<String, TransportError> {
        self.ensure_alive()?;
        Ok(self.dump_state(args))
    }

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.link_death(recipient)
    }

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.unlink_death(recipient)
    }
}

#[async_trait]
impl LegacyVehicle for MockVehicle {
    async fn get(
        &self,
        request: PropertyValue,
    ) -> Result<(StatusCode, Option<PropertyValue>), TransportError> {
        self.ensure_alive()?;
        let _in_flight = self.legacy_gate.lock().await;

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.hold_responses.load(Ordering::SeqCst) {
            let gate = Arc::new(Notify::new());
            self.held.lock().push(HeldReply::Legacy(gate.clone()));
            gate.notified().await;
        }

        Ok(self.lookup(&request))
    }

    async fn set(&self, request: PropertyValue) -> Result<StatusCode, TransportError> {
        self.ensure_alive()?;
        let _in_flight = self.legacy_gate.lock().await;

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.hold_responses.load(Ordering::SeqCst) {
            let gate = Arc::new(Notify::new());
            self.held.lock().push(HeldReply::Legacy(gate.clone()));
            gate.notified().await;
        }

        let status = self.store(&request);
        if status == StatusCode::Ok {
            // the legacy wire multiplexes a set completion echo onto the
            // shared subscription callback
            let subs: Vec<_> = self
                .legacy_subs
                .read()
                .iter()
                .filter(|(_, props)| props.contains(&request.prop_id))
                .map(|(cb, _)| cb.clone())
                .collect();
            for cb in subs {
                cb.on_property_set(request.clone());
            }
        }
        Ok(status)
    }

    async fn get_all_prop_configs(&self) -> Result<Vec<PropertyConfig>, TransportError> {
        self.ensure_alive()?;
        Ok(self.configs.read().clone())
    }

    async fn subscribe(
        &self,
        callback: Arc<dyn LegacyVehicleCallback>,
        options: Vec<SubscribeOptions>,
    ) -> Result<(), TransportError> {
        self.ensure_alive()?;
        let props: HashSet<i32> = options.iter().map(|o| o.prop_id).collect();
        let mut subs = self.legacy_subs.write();
        if let Some((_, existing)) = subs.iter_mut().find(|(cb, _)| Arc::ptr_eq(cb, &callback)) {
            existing.extend(props);
        } else {
            subs.push((callback, props));
        }
        Ok(())
    }

    async fn unsubscribe(
        &self,
        callback: Arc<dyn LegacyVehicleCallback>,
        prop_ids: &[i32],
    ) -> Result<(), TransportError> {
        self.ensure_alive()?;
        let mut subs = self.legacy_subs.write();
        if let Some((_, existing)) = subs.iter_mut().find(|(cb, _)| Arc::ptr_eq(cb, &callback)) {
            for prop_id in prop_ids {
                existing.remove(prop_id);
            }
        }
        subs.retain(|(_, props)| !props.is_empty());
        Ok(())
    }

    async fn dump(&self, args: &[String]) -> Result<String, TransportError> {
        self.ensure_alive()?;
        Ok(self.dump_state(args))
    }

    fn link_to_death(&self, recipient: Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.link_death(recipient)
    }

    fn unlink_to_death(&self, recipient: &Arc<dyn DeathRecipient>) -> Result<(), TransportError> {
        self.unlink_death(recipient)
    }
}

/// Fixed locator handing out preconfigured handles, for selection tests.
pub struct StaticServiceLocator {
    modern: Option<Arc<dyn ModernVehicle>>,
    legacy: Option<Arc<dyn LegacyVehicle>>,
}

impl StaticServiceLocator {
    pub fn new(
        modern: Option<Arc<dyn ModernVehicle>>,
        legacy: Option<Arc<dyn LegacyVehicle>>,
    ) -> Self {
        Self { modern, legacy }
    }

    pub fn modern_only(vehicle: Arc<MockVehicle>) -> Self {
        Self::new(Some(vehicle), None)
    }

    pub fn legacy_only(vehicle: Arc<MockVehicle>) -> Self {
        Self::new(None, Some(vehicle))
    }

    /// No service registered for either generation.
    pub fn unavailable() -> Self {
        Self::new(None, None)
    }
}

impl VehicleServiceLocator for StaticServiceLocator {
    fn locate_modern(&self) -> Option<Arc<dyn ModernVehicle>> {
        self.modern.clone()
    }

    fn locate_legacy(&self) -> Option<Arc<dyn LegacyVehicle>> {
        debug!("modern vehicle service missing, probing legacy");
        self.legacy.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_echoes_through_the_store() {
        let mock = MockVehicle::new();
        let value = PropertyValue::new(1001, 0, PropertyPayload::Int32(vec![42]));
        assert_eq!(mock.store(&value), StatusCode::Ok);

        let (status, stored) = mock.lookup(&PropertyValue::request(1001, 0));
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(stored.unwrap(), value);
    }

    #[test]
    fn forced_status_overrides_lookup_and_store() {
        let mock = MockVehicle::new();
        mock.force_status(2001, StatusCode::InvalidArg);

        let value = PropertyValue::new(2001, 0, PropertyPayload::Int32(vec![1]));
        assert_eq!(mock.store(&value), StatusCode::InvalidArg);
        let (status, stored) = mock.lookup(&PropertyValue::request(2001, 0));
        assert_eq!(status, StatusCode::InvalidArg);
        assert!(stored.is_none());
    }

    #[test]
    fn death_fires_recipients_once() {
        use std::sync::atomic::AtomicUsize;

        struct Counter(AtomicUsize);
        impl DeathRecipient for Counter {
            fn on_death(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mock = MockVehicle::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        mock.link_death(counter.clone()).unwrap();

        mock.trigger_death();
        mock.trigger_death();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(mock.ensure_alive().is_err());
    }

    #[test]
    fn dump_renders_byte_payloads_as_hex() {
        let mock = MockVehicle::new();
        mock.store_value(PropertyValue::new(
            0x42,
            0,
            PropertyPayload::Bytes(vec![0xde, 0xad].into()),
        ));
        let dump = mock.dump_state(&[]);
        assert!(dump.contains("dead"));
    }
}
