//! Integration tests for vhal-client
//!
//! These drive the full client stack against the in-memory mock wire, on
//! both transport generations, with the correlation races exercised
//! explicitly (latency, held responses, death mid-flight).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use pretty_assertions::assert_eq;
use rstest::rstest;
use vhal_client::{
    BackendGeneration, ClientConfig, ClientError, DeathRecipient, MockVehicle, PropertyPayload,
    PropertySetError, PropertyValue, StaticServiceLocator, StatusCode, SubscribeOptions,
    VehicleClient, VehicleEventListener,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short bound so the timeout scenarios run in test time.
fn fast_config() -> ClientConfig {
    ClientConfig {
        response_timeout_ms: 200,
        sweep_interval_ms: 60_000,
    }
}

fn modern_client(mock: &Arc<MockVehicle>, config: ClientConfig) -> VehicleClient {
    VehicleClient::connect(&StaticServiceLocator::modern_only(mock.clone()), config)
        .expect("modern client")
}

fn legacy_client(mock: &Arc<MockVehicle>, config: ClientConfig) -> VehicleClient {
    VehicleClient::connect(&StaticServiceLocator::legacy_only(mock.clone()), config)
        .expect("legacy client")
}

// =============================================================================
// Recording listener
// =============================================================================

#[derive(Default)]
struct RecordingListener {
    values: Mutex<Vec<PropertyValue>>,
    errors: Mutex<Vec<PropertySetError>>,
}

impl RecordingListener {
    fn value_props(&self) -> Vec<i32> {
        self.values.lock().unwrap().iter().map(|v| v.prop_id).collect()
    }
}

impl VehicleEventListener for RecordingListener {
    fn on_property_changed(&self, values: Vec<PropertyValue>) {
        self.values.lock().unwrap().extend(values);
    }

    fn on_set_error(&self, errors: Vec<PropertySetError>) {
        self.errors.lock().unwrap().extend(errors);
    }
}

// =============================================================================
// Get/set correlation
// =============================================================================

#[tokio::test]
async fn get_resolves_within_bound_despite_latency() {
    init_tracing();
    let mock = Arc::new(MockVehicle::new());
    let stored = PropertyValue::new(1001, 0, PropertyPayload::Int32(vec![42]));
    mock.store_value(stored.clone());
    mock.set_latency(Duration::from_millis(50));

    let client = modern_client(&mock, ClientConfig::default());
    let value = client
        .get(&PropertyValue::request(1001, 0))
        .await
        .expect("get")
        .expect("value present");

    assert_eq!(value, stored);
    assert_eq!(client.pending_request_count(), 0);
}

#[tokio::test]
async fn get_of_unset_property_is_no_value() {
    let mock = Arc::new(MockVehicle::new());
    let client = modern_client(&mock, ClientConfig::default());

    let value = client.get(&PropertyValue::request(77, 0)).await.expect("get");
    assert_eq!(value, None);
}

#[tokio::test]
async fn timeout_then_late_callback_is_dropped_modern() {
    init_tracing();
    let mock = Arc::new(MockVehicle::new());
    mock.hold_responses(true);

    let client = modern_client(&mock, fast_config());
    let err = client
        .get(&PropertyValue::request(1002, 0))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Timeout);
    assert_eq!(client.pending_request_count(), 0);
    assert_eq!(mock.held_count(), 1);

    // the late result targets an evicted id and must vanish silently
    mock.release_held();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.pending_request_count(), 0);

    // the client is still healthy afterwards
    mock.hold_responses(false);
    mock.store_value(PropertyValue::new(1002, 0, PropertyPayload::Int64(vec![7])));
    let value = client.get(&PropertyValue::request(1002, 0)).await.unwrap();
    assert!(value.is_some());
}

#[tokio::test]
async fn timeout_then_late_callback_is_dropped_legacy() {
    let mock = Arc::new(MockVehicle::new());
    mock.hold_responses(true);

    let client = legacy_client(&mock, fast_config());
    let err = client
        .get(&PropertyValue::request(1002, 0))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::Timeout);
    assert_eq!(client.pending_request_count(), 0);

    mock.hold_responses(false);
    mock.release_held();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.pending_request_count(), 0);
}

#[tokio::test]
async fn set_surfaces_remote_status_with_code() {
    let mock = Arc::new(MockVehicle::new());
    mock.force_status(2001, StatusCode::InvalidArg);

    let client = modern_client(&mock, ClientConfig::default());
    let request = PropertyValue::new(2001, 0, PropertyPayload::Int32(vec![1]));
    let err = client.set(&request).await.unwrap_err();

    assert_eq!(err, ClientError::RemoteStatus(StatusCode::InvalidArg));
    assert_eq!(err.status_code(), Some(StatusCode::InvalidArg));
    assert_eq!(client.pending_request_count(), 0);
}

#[tokio::test]
async fn get_surfaces_remote_status_legacy() {
    let mock = Arc::new(MockVehicle::new());
    mock.force_status(2002, StatusCode::AccessDenied);

    let client = legacy_client(&mock, ClientConfig::default());
    let err = client
        .get(&PropertyValue::request(2002, 0))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::RemoteStatus(StatusCode::AccessDenied));
}

#[rstest]
#[case::int32(PropertyPayload::Int32(vec![1, -2, 3]))]
#[case::int64(PropertyPayload::Int64(vec![i64::MIN, i64::MAX]))]
#[case::float(PropertyPayload::Float(vec![0.5, -3.25]))]
#[case::bytes(PropertyPayload::Bytes(bytes::Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef])))]
#[case::string(PropertyPayload::String("drive".to_string()))]
#[tokio::test]
async fn set_then_get_round_trips_on_both_generations(#[case] payload: PropertyPayload) {
    for generation in [BackendGeneration::Modern, BackendGeneration::Legacy] {
        let mock = Arc::new(MockVehicle::new());
        let client = match generation {
            BackendGeneration::Modern => modern_client(&mock, ClientConfig::default()),
            BackendGeneration::Legacy => legacy_client(&mock, ClientConfig::default()),
        };
        assert_eq!(client.generation(), generation);

        let written = PropertyValue::new(3001, 2, payload.clone()).with_timestamp(12_345);
        client.set(&written).await.expect("set");

        let read = client
            .get(&PropertyValue::request(3001, 2))
            .await
            .expect("get")
            .expect("value stored");
        assert_eq!(read, written);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_gets_resolve_to_their_own_callers() {
    init_tracing();
    let mock = Arc::new(MockVehicle::new());
    for i in 0..1000i32 {
        mock.store_value(PropertyValue::new(
            10_000 + i,
            0,
            PropertyPayload::Int32(vec![i]),
        ));
    }

    let client = Arc::new(modern_client(&mock, ClientConfig::default()));
    let calls = (0..1000i32).map(|i| {
        let client = client.clone();
        async move {
            let value = client
                .get(&PropertyValue::request(10_000 + i, 0))
                .await
                .expect("get")
                .expect("value present");
            (i, value)
        }
    });

    for (i, value) in join_all(calls).await {
        assert_eq!(value.prop_id, 10_000 + i);
        assert_eq!(value.payload, PropertyPayload::Int32(vec![i]));
    }
    assert_eq!(client.pending_request_count(), 0);
}

#[tokio::test]
async fn oversized_payload_rejected_before_dispatch() {
    let mock = Arc::new(MockVehicle::new());
    let client = modern_client(&mock, ClientConfig::default());

    let huge = PropertyValue::new(1, 0, PropertyPayload::Bytes(vec![0u8; 300 * 1024].into()));
    let err = client.set(&huge).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidRequest(_)));
    assert_eq!(client.pending_request_count(), 0);
}

#[tokio::test]
async fn response_timeout_is_overridable_per_instance() {
    let mock = Arc::new(MockVehicle::new());
    mock.hold_responses(true);

    let client = modern_client(&mock, ClientConfig::default());
    client.set_response_timeout(Duration::from_millis(50));
    assert_eq!(client.response_timeout(), Duration::from_millis(50));

    let start = Instant::now();
    let err = client.get(&PropertyValue::request(1, 0)).await.unwrap_err();
    assert_eq!(err, ClientError::Timeout);
    assert!(start.elapsed() < Duration::from_secs(2));
}

// =============================================================================
// Backend selection
// =============================================================================

#[tokio::test]
async fn selection_prefers_modern_when_both_exist() {
    let mock = Arc::new(MockVehicle::new());
    let locator = StaticServiceLocator::new(Some(mock.clone()), Some(mock.clone()));
    let client = VehicleClient::connect_default(&locator).unwrap();
    assert_eq!(client.generation(), BackendGeneration::Modern);
}

#[tokio::test]
async fn selection_falls_back_to_legacy() {
    let mock = Arc::new(MockVehicle::new());
    let client = VehicleClient::connect_default(&StaticServiceLocator::legacy_only(mock)).unwrap();
    assert_eq!(client.generation(), BackendGeneration::Legacy);
    assert!(client.is_valid());
}

#[tokio::test]
async fn selection_fails_fatally_without_any_service() {
    let err = VehicleClient::connect_default(&StaticServiceLocator::unavailable()).unwrap_err();
    assert_eq!(err, ClientError::NoTransport);
}

// =============================================================================
// Configs
// =============================================================================

fn sample_configs() -> Vec<vhal_client::PropertyConfig> {
    use vhal_client::{ChangeMode, PropertyAccess, PropertyConfig};
    vec![
        PropertyConfig {
            prop_id: 1001,
            access: PropertyAccess::ReadWrite,
            change_mode: ChangeMode::OnChange,
            area_configs: vec![],
            config_array: vec![],
            min_sample_rate_hz: 0.0,
            max_sample_rate_hz: 0.0,
        },
        PropertyConfig {
            prop_id: 1002,
            access: PropertyAccess::Read,
            change_mode: ChangeMode::Continuous,
            area_configs: vec![],
            config_array: vec![1, 2],
            min_sample_rate_hz: 1.0,
            max_sample_rate_hz: 100.0,
        },
    ]
}

#[tokio::test]
async fn config_enumeration_and_filtering() -> anyhow::Result<()> {
    let mock = Arc::new(MockVehicle::new());
    mock.set_configs(sample_configs());

    // the legacy wire enumerates only as a whole; filtering is client-side
    let client = legacy_client(&mock, ClientConfig::default());
    let all = client.get_all_configs().await?;
    assert_eq!(all.len(), 2);

    let filtered = client.get_configs(&[1002]).await?;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].prop_id, 1002);
    Ok(())
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn events_reach_only_subscribed_properties() {
    init_tracing();
    let mock = Arc::new(MockVehicle::new());
    let client = modern_client(&mock, ClientConfig::default());

    let listener = Arc::new(RecordingListener::default());
    let subscription = client.new_subscription_client(listener.clone()).unwrap();
    subscription
        .subscribe(&[SubscribeOptions::on_change(1001)])
        .await
        .unwrap();

    mock.inject_property_events(vec![
        PropertyValue::new(1001, 0, PropertyPayload::Int32(vec![5])),
        PropertyValue::new(1002, 0, PropertyPayload::Int32(vec![9])),
    ]);
    assert_eq!(listener.value_props(), vec![1001]);

    subscription.unsubscribe(1001).await.unwrap();
    mock.inject_property_events(vec![PropertyValue::new(
        1001,
        0,
        PropertyPayload::Int32(vec![6]),
    )]);
    assert_eq!(listener.value_props(), vec![1001]);
}

#[tokio::test]
async fn set_errors_reach_the_listener() {
    let mock = Arc::new(MockVehicle::new());
    let client = legacy_client(&mock, ClientConfig::default());

    let listener = Arc::new(RecordingListener::default());
    let subscription = client.new_subscription_client(listener.clone()).unwrap();
    subscription
        .subscribe(&[SubscribeOptions::sampled(4001, 10.0)])
        .await
        .unwrap();

    mock.inject_set_errors(vec![PropertySetError {
        prop_id: 4001,
        area_id: 0,
        status: StatusCode::NotAvailable,
    }]);

    let errors = listener.errors.lock().unwrap().clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status, StatusCode::NotAvailable);
}

#[tokio::test]
async fn legacy_set_echo_never_reaches_the_listener() {
    let mock = Arc::new(MockVehicle::new());
    let client = legacy_client(&mock, ClientConfig::default());

    let listener = Arc::new(RecordingListener::default());
    let subscription = client.new_subscription_client(listener.clone()).unwrap();
    subscription
        .subscribe(&[SubscribeOptions::on_change(3001)])
        .await
        .unwrap();

    // a correlated set on a subscribed property fires the wire's set echo
    let written = PropertyValue::new(3001, 0, PropertyPayload::Int32(vec![8]));
    client.set(&written).await.unwrap();

    assert!(listener.values.lock().unwrap().is_empty());
    assert!(listener.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_subscribe_options_fail_synchronously() {
    let mock = Arc::new(MockVehicle::new());
    let client = modern_client(&mock, ClientConfig::default());
    let subscription = client
        .new_subscription_client(Arc::new(RecordingListener::default()))
        .unwrap();

    let err = subscription.subscribe(&[]).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidRequest(_)));
}

// =============================================================================
// Death notification
// =============================================================================

struct DeathFlag(AtomicUsize);

impl DeathRecipient for DeathFlag {
    fn on_death(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn death_notifies_once_and_invalidates_the_backend() {
    let mock = Arc::new(MockVehicle::new());
    let client = modern_client(&mock, ClientConfig::default());

    let flag = Arc::new(DeathFlag(AtomicUsize::new(0)));
    client.link_to_death(flag.clone()).unwrap();

    mock.trigger_death();
    assert_eq!(flag.0.load(Ordering::SeqCst), 1);
    assert!(!client.is_valid());

    let err = client.get(&PropertyValue::request(1, 0)).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn in_flight_request_still_times_out_after_death() {
    let mock = Arc::new(MockVehicle::new());
    mock.hold_responses(true);

    let client = Arc::new(modern_client(&mock, fast_config()));
    let in_flight = {
        let client = client.clone();
        tokio::spawn(async move { client.get(&PropertyValue::request(5001, 0)).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    mock.trigger_death();

    // no cancellation is threaded into the correlation machinery; the
    // abandoned request runs into its own bound
    let outcome = in_flight.await.unwrap().unwrap_err();
    assert_eq!(outcome, ClientError::Timeout);
    assert_eq!(client.pending_request_count(), 0);
}

// =============================================================================
// Dump
// =============================================================================

#[tokio::test]
async fn dump_reports_client_and_wire_state() {
    let mock = Arc::new(MockVehicle::new());
    mock.store_value(PropertyValue::new(1001, 0, PropertyPayload::Int32(vec![42])));

    let client = modern_client(&mock, ClientConfig::default());
    let dump = client.dump(&["--brief".to_string()]).await.unwrap();

    assert!(dump.contains("generation: modern"));
    assert!(dump.contains("pending requests: 0"));
    assert!(dump.contains("MockVehicle"));
}
