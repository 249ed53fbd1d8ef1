//! Session shell - meet-dispatch demo
//!
//! Replays one conference session through the shell store and prints what
//! the embedding app would receive:
//! 1. Location URL and room are set -> early `CONFERENCE_WILL_JOIN`
//! 2. The session joins, gets locked and unlocked
//! 3. The session leaves -> `CONFERENCE_LEFT`
//! 4. A device selection popup asks an in-process conference window for
//!    its devices over a transport using `--timeout-ms`
//!
//! # Usage
//!
//! ```sh
//! cargo run -p session-shell -- --room standup
//!
//! # With action logging
//! RUST_LOG=debug cargo run -p session-shell -- --debug --log-exclude 'SET_*'
//! ```

use std::error::Error;
use std::rc::Rc;

use clap::Parser;
use meet_dispatch::{
    DispatchRuntime, EventSink, ExternalEvent, ListenerRegistry, MemoryBackend, RuntimeConfig,
    Transport,
};
use meet_dispatch_features::conference::CONFERENCE;
use meet_dispatch_features::device_selection::DeviceSelectionPopup;
use meet_dispatch_features::prelude::*;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Replays a conference session and prints external API events
#[derive(Parser, Debug)]
#[command(name = "session-shell")]
struct Args {
    /// Room to join
    #[arg(long, short, default_value = "standup")]
    room: String,

    /// Deployment hosting the room
    #[arg(long, default_value = "https://meet.example")]
    domain: String,

    /// Password used to lock the room
    #[arg(long, default_value = "s3cret")]
    password: String,

    /// Log every dispatched action
    #[arg(long)]
    debug: bool,

    /// Only log actions matching these globs (comma separated)
    #[arg(long)]
    log_include: Option<String>,

    /// Never log actions matching these globs (comma separated)
    #[arg(long)]
    log_exclude: Option<String>,

    /// Transport request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,
}

fn split_patterns(patterns: Option<&str>) -> Vec<String> {
    patterns
        .map(|p| {
            p.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Opens a device popup against a conference window that only knows its
/// device list
async fn show_devices(config: &RuntimeConfig) {
    let ((popup_backend, popup_inbound), (window_backend, window_inbound)) =
        MemoryBackend::pair();
    let cancel = CancellationToken::new();

    let window = Transport::from_config(window_backend, config);
    window.on_request("getAvailableDevices", |_| {
        Ok(json!({
            "audioInput": [{ "deviceId": "default", "label": "Built-in microphone" }],
            "videoInput": [{ "deviceId": "facetime", "label": "Built-in camera" }]
        }))
    });
    window.attach(window_inbound, cancel.clone());

    let transport = Transport::from_config(popup_backend, config);
    transport.attach(popup_inbound, cancel.clone());
    let popup = DeviceSelectionPopup::new(transport);
    popup.init().await;
    tracing::info!(props = ?popup.props(), "device selection");

    if let Err(e) = popup.close() {
        tracing::warn!(error = %e, "device popup did not close cleanly");
    }
    cancel.cancel();
}

/// Prints each event as one JSON line
struct StdoutSink;

impl EventSink for StdoutSink {
    fn send_event(&self, event: &ExternalEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "event not printable"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = RuntimeConfig {
        request_timeout_ms: args.timeout_ms,
        log_include: split_patterns(args.log_include.as_deref()),
        log_exclude: split_patterns(args.log_exclude.as_deref()),
        ..RuntimeConfig::default()
    };

    let listeners: Rc<ListenerRegistry<dyn EventSink>> = Rc::new(ListenerRegistry::new());
    let sink: Rc<dyn EventSink> = Rc::new(StdoutSink);
    listeners.add("stdout", &sink);

    let builder = ShellBuilder::new(config.clone())
        .listeners(Rc::clone(&listeners))
        .log_actions(args.debug)
        .build()?;
    let mut runtime = DispatchRuntime::new(builder);

    let url = format!("{}/{}", args.domain.trim_end_matches('/'), args.room);
    let session = ConferenceHandle::new(url.as_str());

    let script: Vec<ShellAction> = vec![
        ConfigAction::OverrideConfig {
            overrides: json!({ "config": { "channelLastN": 5 } }),
        }
        .into(),
        ConnectionAction::SetLocationUrl {
            url: Some(url.clone()),
        }
        .into(),
        ConferenceAction::SetRoom {
            room: Some(args.room.clone()),
        }
        .into(),
        ConnectionAction::WillConnect.into(),
        ConnectionAction::Established.into(),
        ConferenceAction::WillJoin {
            conference: session.clone(),
        }
        .into(),
        ConferenceAction::Joined {
            conference: session.clone(),
        }
        .into(),
        ConferenceAction::SetPassword {
            conference: session.clone(),
            method: PasswordMethod::Lock,
            password: Some(args.password.clone()),
        }
        .into(),
        ConferenceAction::SetPassword {
            conference: session.clone(),
            method: PasswordMethod::Lock,
            password: None,
        }
        .into(),
        ConferenceAction::WillLeave {
            conference: session.clone(),
        }
        .into(),
        ConferenceAction::Left {
            conference: session,
        }
        .into(),
    ];

    for action in script {
        runtime.dispatch(action)?;
        runtime.drain();
    }

    let conference = runtime.store().get(&CONFERENCE);
    tracing::info!(
        joined = conference.as_ref().is_some_and(|c| c.conference.is_some()),
        locked = ?conference.as_ref().and_then(|c| c.locked),
        "session replay finished"
    );

    listeners.remove(&"stdout".into());

    show_devices(&config).await;
    Ok(())
}
