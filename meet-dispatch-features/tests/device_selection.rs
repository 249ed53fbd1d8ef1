use std::sync::{Arc, Mutex};
use std::time::Duration;

use meet_dispatch::{MemoryBackend, Message, RuntimeConfig, Transport};
use meet_dispatch_features::device_selection::{DeviceSelectionPopup, DEVICES_BUS};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Conference window side answering device requests
fn conference_window(remote: &Transport, set_devices: Arc<Mutex<Vec<Value>>>) {
    remote
        .on_request("getAvailableDevices", |_| {
            Ok(json!({
                "audioInput": [{ "deviceId": "mic1", "label": "Mic", "kind": "audioinput" }],
                "videoInput": [{ "deviceId": "cam1", "label": "Cam", "kind": "videoinput" }]
            }))
        })
        .on_request("isDeviceListAvailable", |_| Ok(json!(true)))
        .on_request("isDeviceChangeAvailable", |message| {
            Ok(json!(message.param("deviceType") != Some(&json!("output"))))
        })
        .on_request("getCurrentDevices", |_| {
            Ok(json!({ "audioInput": { "deviceId": "mic1" }, "videoInput": { "deviceId": "cam1" } }))
        })
        .on_request("setDevice", move |message| {
            let mut set = set_devices.lock().unwrap();
            set.push(message.param("device").cloned().unwrap_or_default());
            Ok(json!(true))
        });
}

fn connected() -> (DeviceSelectionPopup, Transport, CancellationToken) {
    let ((popup_backend, popup_inbound), (remote_backend, remote_inbound)) = MemoryBackend::pair();
    let cancel = CancellationToken::new();
    let config = RuntimeConfig {
        request_timeout_ms: 200,
        ..RuntimeConfig::default()
    };

    let popup_transport = Transport::from_config(popup_backend, &config);
    popup_transport.attach(popup_inbound, cancel.clone());
    let remote = Transport::new(remote_backend);
    remote.attach(remote_inbound, cancel.clone());

    (DeviceSelectionPopup::new(popup_transport), remote, cancel)
}

#[tokio::test]
async fn test_init_reads_devices_and_capabilities() {
    let (popup, remote, cancel) = connected();
    conference_window(&remote, Arc::default());

    popup.init().await;
    let props = popup.props();

    assert_eq!(props.available_devices.audio_input.len(), 1);
    assert_eq!(props.available_devices.audio_input[0].device_id, "mic1");
    assert_eq!(props.current_audio_input_id.as_deref(), Some("mic1"));
    assert_eq!(props.current_video_input_id.as_deref(), Some("cam1"));
    assert_eq!(props.current_audio_output_id, None);
    assert!(!props.disable_device_change);
    assert!(props.hide_audio_output_select);
    // isMultipleAudioInputSupported is not answered
    assert!(props.disable_audio_input_change);

    cancel.cancel();
}

#[tokio::test]
async fn test_set_device_sends_id_and_kind() {
    let (popup, remote, cancel) = connected();
    let set_devices = Arc::new(Mutex::new(Vec::new()));
    conference_window(&remote, Arc::clone(&set_devices));

    assert!(popup.set_audio_output_device("speaker2").await);
    assert_eq!(
        *set_devices.lock().unwrap(),
        vec![json!({ "id": "speaker2", "kind": "audiooutput" })]
    );

    cancel.cancel();
}

#[tokio::test]
async fn test_device_list_change_refreshes_props() {
    let (popup, remote, cancel) = connected();
    let mut changes = popup.subscribe();
    conference_window(&remote, Arc::default());

    remote
        .send_event(Message::new(DEVICES_BUS, "deviceListChanged"))
        .unwrap();
    tokio::time::timeout(Duration::from_secs(1), changes.changed())
        .await
        .expect("device list refresh")
        .unwrap();

    assert_eq!(popup.props().available_devices.video_input[0].device_id, "cam1");
    cancel.cancel();
}

#[tokio::test]
async fn test_close_notifies_conference_window() {
    let (popup, remote, cancel) = connected();
    let closed = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&closed);
    remote.on("close", move |message| {
        *flag.lock().unwrap() = message.bus_type == "devices-dialog";
        true
    });

    popup.close().unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(*closed.lock().unwrap());
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_silent_window_degrades_after_configured_timeout() {
    // the conference window side is never attached, so nothing answers
    let ((popup_backend, popup_inbound), _window) = MemoryBackend::pair();
    let cancel = CancellationToken::new();
    let config = RuntimeConfig {
        request_timeout_ms: 200,
        ..RuntimeConfig::default()
    };
    let transport = Transport::from_config(popup_backend, &config);
    transport.attach(popup_inbound, cancel.clone());
    let popup = DeviceSelectionPopup::new(transport);

    let started = tokio::time::Instant::now();
    popup.init().await;

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(1));
    let props = popup.props();
    assert!(props.available_devices.audio_input.is_empty());
    assert!(props.disable_device_change);
    assert!(props.hide_audio_output_select);
    cancel.cancel();
}
