//! Device selection popup
//!
//! The popup is a detached surface: it asks the conference window about
//! devices over a [`Transport`] on the `devices` bus and renders whatever
//! [`DialogProps`] it ends up with. Every request has a default, so a
//! conference window that cannot answer just yields a dialog with the
//! controls disabled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use meet_dispatch::{Message, Transport, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;

/// Request/response bus
pub const DEVICES_BUS: &str = "devices";
/// One-way bus for dialog lifecycle events
pub const DIALOG_BUS: &str = "devices-dialog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    AudioInput,
    AudioOutput,
    VideoInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaDevice {
    pub device_id: String,
    pub label: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailableDevices {
    pub audio_input: Vec<MediaDevice>,
    pub audio_output: Vec<MediaDevice>,
    pub video_input: Vec<MediaDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentDevices {
    pub audio_input: Option<MediaDevice>,
    pub audio_output: Option<MediaDevice>,
    pub video_input: Option<MediaDevice>,
}

/// What the dialog renders
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DialogProps {
    pub available_devices: AvailableDevices,
    pub current_audio_input_id: Option<String>,
    pub current_audio_output_id: Option<String>,
    pub current_video_input_id: Option<String>,
    pub disable_audio_input_change: bool,
    pub disable_device_change: bool,
    pub hide_audio_output_select: bool,
}

struct PopupInner {
    transport: Transport,
    props: watch::Sender<DialogProps>,
    generation: AtomicU64,
}

/// Model behind the device selection popup. Cheap to clone.
#[derive(Clone)]
pub struct DeviceSelectionPopup {
    inner: Arc<PopupInner>,
}

impl std::fmt::Debug for DeviceSelectionPopup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSelectionPopup")
            .field("props", &*self.inner.props.borrow())
            .field("generation", &self.inner.generation.load(Ordering::Relaxed))
            .finish()
    }
}

fn request(name: &str) -> Message {
    Message::new(DEVICES_BUS, name)
}

impl DeviceSelectionPopup {
    /// Popup talking over `transport`; refreshes the device list whenever
    /// the other side reports `deviceListChanged`.
    pub fn new(transport: Transport) -> Self {
        let (props, _) = watch::channel(DialogProps::default());
        let inner = Arc::new(PopupInner {
            transport,
            props,
            generation: AtomicU64::new(0),
        });

        let weak: Weak<PopupInner> = Arc::downgrade(&inner);
        inner.transport.on("deviceListChanged", move |message| {
            if message.bus_type != DEVICES_BUS {
                return false;
            }
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let popup = DeviceSelectionPopup { inner };
                    handle.spawn(async move { popup.update_available_devices().await });
                }
                Err(_) => tracing::debug!("no runtime, device list refresh skipped"),
            }
            true
        });

        Self { inner }
    }

    /// Current props
    pub fn props(&self) -> DialogProps {
        self.inner.props.borrow().clone()
    }

    /// Receiver notified every time the props change
    pub fn subscribe(&self) -> watch::Receiver<DialogProps> {
        self.inner.props.subscribe()
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    /// Gather everything the dialog needs.
    pub async fn init(&self) {
        let generation = self.next_generation();
        let transport = &self.inner.transport;

        let (
            available,
            list_available,
            change_available,
            output_change_available,
            current,
            multiple_inputs,
        ) = tokio::join!(
            transport.request_or(request("getAvailableDevices"), AvailableDevices::default()),
            transport.request_or(request("isDeviceListAvailable"), false),
            transport.request_or(request("isDeviceChangeAvailable"), false),
            transport.request_or(
                request("isDeviceChangeAvailable").with("deviceType", "output"),
                false
            ),
            transport.request_or(request("getCurrentDevices"), CurrentDevices::default()),
            transport.request_or(request("isMultipleAudioInputSupported"), false),
        );

        let device_id = |device: Option<MediaDevice>| device.map(|d| d.device_id);
        let fresh = self.is_current(generation);
        self.inner.props.send_modify(|props| {
            if fresh {
                props.available_devices = available;
            }
            props.current_audio_input_id = device_id(current.audio_input);
            props.current_audio_output_id = device_id(current.audio_output);
            props.current_video_input_id = device_id(current.video_input);
            props.disable_audio_input_change = !multiple_inputs;
            props.disable_device_change = !list_available || !change_available;
            props.hide_audio_output_select = !output_change_available;
        });
    }

    /// Re-fetch the device list; a result overtaken by a newer refresh is
    /// dropped.
    pub async fn update_available_devices(&self) {
        let generation = self.next_generation();
        let devices = self
            .inner
            .transport
            .request_or(request("getAvailableDevices"), AvailableDevices::default())
            .await;
        if !self.is_current(generation) {
            tracing::debug!(generation, "stale device list dropped");
            return;
        }
        self.inner.props.send_if_modified(|props| {
            if props.available_devices == devices {
                return false;
            }
            props.available_devices = devices;
            true
        });
    }

    async fn set_device(&self, id: &str, kind: DeviceKind) -> bool {
        self.inner
            .transport
            .request_or(
                request("setDevice").with("device", json!({ "id": id, "kind": kind })),
                false,
            )
            .await
    }

    pub async fn set_audio_input_device(&self, id: &str) -> bool {
        self.set_device(id, DeviceKind::AudioInput).await
    }

    pub async fn set_audio_output_device(&self, id: &str) -> bool {
        self.set_device(id, DeviceKind::AudioOutput).await
    }

    pub async fn set_video_input_device(&self, id: &str) -> bool {
        self.set_device(id, DeviceKind::VideoInput).await
    }

    /// Tell the conference window the dialog is gone and stop talking.
    pub fn close(&self) -> Result<(), TransportError> {
        let sent = self
            .inner
            .transport
            .send_event(Message::new(DIALOG_BUS, "close"));
        self.inner.transport.dispose();
        sent
    }
}
