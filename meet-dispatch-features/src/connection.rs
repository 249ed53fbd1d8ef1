//! `base/connection`: signalling connection and location URL

use meet_dispatch::{Action, SliceKey, SliceUpdate};

use crate::action::ShellAction;
use crate::error::ConferenceError;
use crate::util::to_url_string;

pub const CONNECTION: SliceKey<ConnectionState> = SliceKey::new("features/base/connection");

#[derive(Action, Clone, Debug)]
#[action(feature = "base/connection", prefix = "CONNECTION", kinds = "kinds")]
pub enum ConnectionAction {
    /// The URL the app is navigating to
    #[action(kind = "SET_LOCATION_URL")]
    SetLocationUrl { url: Option<String> },
    WillConnect,
    Established,
    Failed { error: ConferenceError },
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionState {
    pub location_url: Option<String>,
    pub connecting: bool,
    pub connected: bool,
    pub error: Option<ConferenceError>,
}

pub fn reducer(state: &ConnectionState, action: &ShellAction) -> SliceUpdate<ConnectionState> {
    let ShellAction::Connection(action) = action else {
        return SliceUpdate::Unchanged;
    };
    let next = match action {
        ConnectionAction::SetLocationUrl { url } => ConnectionState {
            location_url: url.as_deref().map(to_url_string),
            ..state.clone()
        },
        ConnectionAction::WillConnect => ConnectionState {
            connecting: true,
            error: None,
            ..state.clone()
        },
        ConnectionAction::Established => ConnectionState {
            connecting: false,
            connected: true,
            error: None,
            ..state.clone()
        },
        ConnectionAction::Failed { error } => ConnectionState {
            connecting: false,
            connected: false,
            error: Some(error.clone()),
            ..state.clone()
        },
        ConnectionAction::Disconnected => ConnectionState {
            connecting: false,
            connected: false,
            ..state.clone()
        },
    };
    SliceUpdate::when_changed(state, next)
}
