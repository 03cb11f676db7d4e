use std::sync::{Arc, Mutex};
use std::time::Duration;

use domintell_domain::device::{DeviceKind, DeviceValue};
use domintell_domain::error::DomintellError;

use super::*;
use crate::event_bus::EventBus;
use crate::testing::{MemorySnapshot, MockConnector};

fn config() -> GatewayConfig {
    GatewayConfig {
        poll_interval_ms: 50,
        read_timeout_ms: 20,
        idle_sleep_ms: 1,
        ..GatewayConfig::default()
    }
}

type Events = Arc<Mutex<Vec<SensorEvent>>>;

fn recorder() -> (Events, impl EventListener + 'static) {
    let events: Events = Arc::default();
    let sink = Arc::clone(&events);
    let listener = move |event: &SensorEvent| sink.lock().unwrap().push(event.clone());
    (events, listener)
}

fn ids(events: &Events) -> Vec<String> {
    events
        .lock()
        .unwrap()
        .iter()
        .map(|event| event.device_id().to_string())
        .collect()
}

fn count(connector: &MockConnector, datagram: &str) -> usize {
    connector
        .sent()
        .iter()
        .filter(|sent| sent.as_str() == datagram)
        .count()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

async fn wait_ready<C: Connector>(handle: &GatewayHandle<C>) {
    let mut rx = handle.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(60),
        rx.wait_for(|state| *state == ConnectionState::Ready),
    )
    .await
    .expect("gateway never became ready")
    .unwrap();
}

async fn started(
    connector: &MockConnector,
    listener: impl EventListener + 'static,
) -> GatewayHandle<MockConnector> {
    let handle = Gateway::new(config(), connector.clone())
        .with_listener(listener)
        .start();
    wait_ready(&handle).await;
    handle
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn should_log_in_request_inventory_and_ping() {
    let connector = MockConnector::accepting_logins();
    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;

    wait_until(|| count(&connector, "PING") == 1).await;

    assert_eq!(connector.sent()[..3], ["LOGIN", "APPINFO", "PING"]);
    assert_eq!(handle.connection_state(), ConnectionState::Ready);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_send_keepalive_every_interval() {
    let connector = MockConnector::accepting_logins();
    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;
    wait_until(|| count(&connector, "PING") == 1).await;

    tokio::time::sleep(Duration::from_secs(61)).await;

    wait_until(|| count(&connector, "PING") == 2).await;
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_reply_ping_to_end_of_inventory() {
    let connector = MockConnector::accepting_logins();
    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;
    wait_until(|| count(&connector, "PING") == 1).await;

    connector.push_inbound("BIR000001-1Kitchen[Ground floor]\r\nEND APPINFO\r\n");

    wait_until(|| count(&connector, "PING") == 2).await;
    let device = handle.device(&DeviceId::from("BIR000001-1")).unwrap();
    assert_eq!(device.description, "Kitchen");
    assert_eq!(device.value, DeviceValue::Unset);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_reconnect_after_link_failure() {
    let connector = MockConnector::accepting_logins();
    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;

    connector.push_inbound_error(std::io::ErrorKind::ConnectionReset);

    wait_until(|| connector.connects() == 2 && handle.connection_state() == ConnectionState::Ready)
        .await;
    assert_eq!(count(&connector, "LOGIN"), 2);
    assert_eq!(count(&connector, "APPINFO"), 2);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_wait_backoff_between_failed_connects() {
    let connector = MockConnector::accepting_logins();
    connector.fail_next_connects(2);
    let begin = Instant::now();

    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;

    assert_eq!(connector.connects(), 3);
    assert!(begin.elapsed() >= Duration::from_secs(20));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_disconnect_on_stop() {
    let connector = MockConnector::accepting_logins();
    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;
    let rx = handle.subscribe_state();

    handle.stop().await;

    assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
}

// ── Decoding ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn should_decode_status_frames_and_alert_in_order() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;

    connector.push_inbound("IS4000001I5\r\n");

    wait_until(|| events.lock().unwrap().len() == 4).await;
    assert_eq!(
        ids(&events),
        ["IS4000001-1", "IS4000001-2", "IS4000001-3", "IS4000001-4"]
    );
    assert!(events.lock().unwrap().iter().all(|e| e.kind() == "sensor_update"));

    let first = handle.device(&DeviceId::from("IS4000001-1")).unwrap();
    assert_eq!(first.kind, DeviceKind::Input);
    assert_eq!(first.value, DeviceValue::Switch(true));
    let second = handle.device(&DeviceId::from("IS4000001-2")).unwrap();
    assert_eq!(second.value, DeviceValue::Switch(false));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_not_alert_twice_for_identical_frame() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;

    connector.push_inbound("DET000001I1\r\n");
    connector.push_inbound("DET000001I1\r\n");
    connector.push_inbound("DET000002I1\r\n");

    wait_until(|| events.lock().unwrap().len() == 2).await;
    assert_eq!(ids(&events), ["DET000001-1", "DET000002-1"]);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_drop_malformed_frame_and_continue() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;

    connector.push_inbound("DET000001IZZ\r\nDET000002I1\r\n");

    wait_until(|| events.lock().unwrap().len() == 1).await;
    assert_eq!(ids(&events), ["DET000002-1"]);
    assert!(handle.device(&DeviceId::from("DET000001-1")).is_none());
    assert_eq!(handle.connection_state(), ConnectionState::Ready);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_join_frame_split_across_reads() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;

    connector.push_inbound("PONG\r\nDET0000");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(events.lock().unwrap().is_empty());

    connector.push_inbound("01I1\r\n");

    wait_until(|| events.lock().unwrap().len() == 1).await;
    assert_eq!(ids(&events), ["DET000001-1"]);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_ignore_unknown_modules() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;

    connector.push_inbound("XYZ123456I01\r\nDET000001I1\r\n");

    wait_until(|| events.lock().unwrap().len() == 1).await;
    assert_eq!(handle.devices().len(), 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_only_describe_devices_seen_in_late_inventory() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;

    connector.push_inbound("BU4000012O1\r\n");
    wait_until(|| events.lock().unwrap().len() == 4).await;
    connector.push_inbound("BU4000012-5Night light\r\nEND APPINFO\r\n");
    wait_until(|| count(&connector, "PING") == 2).await;

    let device = handle.device(&DeviceId::from("BU4000012-5")).unwrap();
    assert_eq!(device.kind, DeviceKind::Output);
    assert_eq!(device.value, DeviceValue::Switch(true));
    assert_eq!(device.description, "Night light");
    assert_eq!(events.lock().unwrap().len(), 4);
    handle.stop().await;
}

// ── Listeners ───────────────────────────────────────────────────────

struct PanickingListener;

impl EventListener for PanickingListener {
    fn on_event(&self, _event: &SensorEvent) -> Result<(), DomintellError> {
        panic!("listener bug");
    }
}

struct FailingListener;

impl EventListener for FailingListener {
    fn on_event(&self, _event: &SensorEvent) -> Result<(), DomintellError> {
        let err = std::io::Error::other("listener failure");
        Err(DomintellError::Storage(Box::new(err)))
    }
}

#[tokio::test(start_paused = true)]
async fn should_isolate_failing_listeners() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = Gateway::new(config(), connector.clone())
        .with_listener(PanickingListener)
        .with_listener(FailingListener)
        .with_listener(listener)
        .start();
    wait_ready(&handle).await;

    connector.push_inbound("DET000001I1\r\nDET000002I1\r\n");

    wait_until(|| events.lock().unwrap().len() == 2).await;
    assert_eq!(handle.connection_state(), ConnectionState::Ready);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_publish_updates_on_event_bus() {
    let connector = MockConnector::accepting_logins();
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let handle = Gateway::new(config(), connector.clone())
        .with_listener(bus)
        .start();
    wait_ready(&handle).await;

    connector.push_inbound("12:30 01/02/23\r\n");

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.device_id(), &DeviceId::clock());
    let clock = handle.device(&DeviceId::clock()).unwrap();
    assert_eq!(clock.value, DeviceValue::from("12:30 01/02/23\r"));
    handle.stop().await;
}

// ── Persistence ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn should_persist_before_alerting() {
    let connector = MockConnector::accepting_logins();
    let snapshot = MemorySnapshot::default();
    let seen_by_listener = Arc::new(Mutex::new(Vec::new()));
    let probe = snapshot.clone();
    let sink = Arc::clone(&seen_by_listener);
    let handle = Gateway::new(config(), connector.clone())
        .with_snapshot(snapshot.clone())
        .with_listener(move |_: &SensorEvent| sink.lock().unwrap().push(probe.saves()))
        .start();
    wait_ready(&handle).await;

    connector.push_inbound("DET000001I1\r\n");
    wait_until(|| snapshot.saves() == 1).await;
    wait_until(|| seen_by_listener.lock().unwrap().len() == 1).await;

    assert_eq!(*seen_by_listener.lock().unwrap(), [1]);
    let persisted = snapshot.devices();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].value, DeviceValue::Switch(true));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_not_persist_without_change() {
    let connector = MockConnector::accepting_logins();
    let snapshot = MemorySnapshot::default();
    let (events, listener) = recorder();
    let handle = Gateway::new(config(), connector.clone())
        .with_snapshot(snapshot.clone())
        .with_listener(listener)
        .start();
    wait_ready(&handle).await;

    connector.push_inbound("DET000001I1\r\nDET000001I1\r\nDET000002I0\r\n");

    // unset to off is a change too
    wait_until(|| events.lock().unwrap().len() == 2).await;
    assert_eq!(ids(&events), ["DET000001-1", "DET000002-1"]);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(snapshot.saves(), 2);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_keep_decoding_when_persistence_fails() {
    let connector = MockConnector::accepting_logins();
    let snapshot = MemorySnapshot::default();
    snapshot.fail_saves(true);
    let (events, listener) = recorder();
    let handle = Gateway::new(config(), connector.clone())
        .with_snapshot(snapshot.clone())
        .with_listener(listener)
        .start();
    wait_ready(&handle).await;

    connector.push_inbound("DET000001I1\r\n");

    wait_until(|| events.lock().unwrap().len() == 1).await;
    assert!(handle.device(&DeviceId::from("DET000001-1")).is_some());
    assert_eq!(snapshot.saves(), 0);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_restore_devices_from_snapshot() {
    let mut relay = Device::new(DeviceId::from("BIR000001-1"), DeviceKind::Output, "Hall");
    relay.update_value(DeviceValue::Switch(true), chrono::Utc::now());
    let snapshot = MemorySnapshot::with_devices(vec![relay.clone()]);

    let handle = Gateway::new(config(), MockConnector::new())
        .with_snapshot(snapshot)
        .start();

    assert_eq!(handle.device(&relay.id), Some(relay));
    handle.stop().await;
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn should_reject_unknown_device() {
    let connector = MockConnector::accepting_logins();
    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;

    let err = handle
        .set_value(&DeviceId::from("BIR000009-1"), true)
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::UnknownDevice(_)));
    assert!(!connector.sent().iter().any(|sent| sent.contains('%')));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_reject_non_output_device() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;
    connector.push_inbound("DET000001I1\r\n");
    wait_until(|| events.lock().unwrap().len() == 1).await;

    let err = handle
        .set_value(&DeviceId::from("DET000001-1"), "on")
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::NotAnOutput { .. }));
    assert!(!connector.sent().iter().any(|sent| sent.contains('%')));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_send_command_without_touching_the_store() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;
    connector.push_inbound("BIR000001O00\r\n");
    wait_until(|| events.lock().unwrap().len() == 8).await;
    let id = DeviceId::from("BIR000001-1");

    let sent = handle.set_value(&id, true).await.unwrap();

    assert_eq!(sent, "BIR000001-1%I");
    assert_eq!(count(&connector, "BIR000001-1%I"), 1);
    assert_eq!(handle.device(&id).unwrap().value, DeviceValue::Switch(false));

    connector.push_inbound("BIR000001O01\r\n");
    wait_until(|| events.lock().unwrap().len() == 9).await;
    assert_eq!(handle.device(&id).unwrap().value, DeviceValue::Switch(true));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_address_push_button_outputs_by_relative_channel() {
    let connector = MockConnector::accepting_logins();
    let (events, listener) = recorder();
    let handle = started(&connector, listener).await;
    connector.push_inbound("BU4000012O0\r\n");
    wait_until(|| events.lock().unwrap().len() == 4).await;

    let sent = handle
        .set_value(&DeviceId::from("BU4000012-6"), false)
        .await
        .unwrap();

    assert_eq!(sent, "BU4000012-2%O");
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_fail_commands_while_disconnected() {
    let snapshot = MemorySnapshot::with_devices(vec![Device::new(
        DeviceId::from("BIR000001-1"),
        DeviceKind::Output,
        "",
    )]);
    let connector = MockConnector::new();
    let handle = Gateway::new(config(), connector)
        .with_snapshot(snapshot)
        .start();

    let err = handle
        .set_value(&DeviceId::from("BIR000001-1"), 1_u8)
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::NotConnected));
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_send_inventory_refresh_through_queue() {
    let connector = MockConnector::accepting_logins();
    let (_, listener) = recorder();
    let handle = started(&connector, listener).await;

    handle.refresh_inventory();

    wait_until(|| count(&connector, "APPINFO") == 2).await;
    handle.stop().await;
}
