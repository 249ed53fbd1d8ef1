//! `base/lib-engine`: lifecycle of the media engine library

use meet_dispatch::{Action, SliceKey, SliceUpdate};

use crate::action::ShellAction;

pub const LIB_ENGINE: SliceKey<LibEngineState> = SliceKey::new("features/base/lib-engine");

#[derive(Action, Clone, Debug)]
#[action(feature = "base/lib-engine", prefix = "LIB", kinds = "kinds")]
pub enum LibEngineAction {
    WillInit,
    DidInit,
    InitError { error: String },
    /// Initialization started and is still running
    InitPromiseCreated,
    WillDispose,
    DidDispose,
    #[action(kind = "SET_WEBRTC_READY")]
    SetWebrtcReady { ready: bool },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibEngineState {
    pub initialized: bool,
    pub init_error: Option<String>,
    pub init_pending: bool,
    pub webrtc_ready: Option<bool>,
}

pub fn reducer(state: &LibEngineState, action: &ShellAction) -> SliceUpdate<LibEngineState> {
    let ShellAction::LibEngine(action) = action else {
        return SliceUpdate::Unchanged;
    };
    let next = match action {
        LibEngineAction::DidDispose => LibEngineState::default(),
        LibEngineAction::DidInit => LibEngineState {
            init_error: None,
            initialized: true,
            ..state.clone()
        },
        LibEngineAction::InitError { error } => LibEngineState {
            init_error: Some(error.clone()),
            initialized: false,
            init_pending: false,
            ..state.clone()
        },
        LibEngineAction::InitPromiseCreated => LibEngineState {
            init_pending: true,
            ..state.clone()
        },
        LibEngineAction::SetWebrtcReady { ready } => LibEngineState {
            webrtc_ready: Some(*ready),
            ..state.clone()
        },
        LibEngineAction::WillInit | LibEngineAction::WillDispose => return SliceUpdate::Unchanged,
    };
    SliceUpdate::when_changed(state, next)
}
