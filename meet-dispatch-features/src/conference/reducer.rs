use meet_dispatch::SliceUpdate;

use super::actions::{ConferenceAction, PasswordMethod};
use super::handle::ConferenceHandle;
use super::state::{ConferenceState, LockState, StartMutedPolicy, VideoQuality};
use crate::action::ShellAction;
use crate::connection::ConnectionAction;
use crate::error::{names, ConferenceError};
use crate::util::is_room_valid;

/// Reducer of the `features/base/conference` slice
pub fn reducer(state: &ConferenceState, action: &ShellAction) -> SliceUpdate<ConferenceState> {
    let next = match action {
        ShellAction::Conference(action) => reduce(state, action),
        ShellAction::Connection(ConnectionAction::WillConnect) => Some(ConferenceState {
            auth_required: None,
            ..state.clone()
        }),
        _ => return SliceUpdate::Unchanged,
    };
    match next {
        Some(next) => SliceUpdate::when_changed(state, next),
        None => SliceUpdate::Unchanged,
    }
}

fn reduce(state: &ConferenceState, action: &ConferenceAction) -> Option<ConferenceState> {
    use ConferenceAction::*;

    match action {
        Failed { conference, error } => conference_failed(state, conference, error),
        Joined { conference } => Some(conference_joined(state, conference)),
        Left { conference } => Some(conference_left(state, conference)),
        WillJoin { conference } => Some(ConferenceState {
            error: None,
            joining: Some(conference.clone()),
            ..state.clone()
        }),
        WillLeave { conference } => conference_will_leave(state, conference),
        LockStateChanged { conference, locked } => lock_state_changed(state, conference, *locked),
        P2pStatusChanged { p2p } => Some(ConferenceState {
            p2p: Some(*p2p),
            ..state.clone()
        }),
        SetAudioOnly { audio_only } => Some(ConferenceState {
            audio_only: *audio_only,
            ..state.clone()
        }),
        SetDesktopSharingEnabled { enabled } => Some(ConferenceState {
            desktop_sharing_enabled: Some(*enabled),
            ..state.clone()
        }),
        SetFollowMe { enabled } => Some(ConferenceState {
            follow_me_enabled: *enabled,
            ..state.clone()
        }),
        SetPassword {
            conference,
            method,
            password,
        } => set_password(state, conference, *method, password.as_deref()),
        SetReceiveVideoQuality { quality } => Some(ConferenceState {
            receive_video_quality: Some(*quality),
            ..state.clone()
        }),
        SetRoom { room } => Some(ConferenceState {
            error: None,
            room: room.clone().filter(|room| is_room_valid(Some(room))),
            ..state.clone()
        }),
        SetSipGatewayEnabled { enabled } => Some(ConferenceState {
            sip_gateway_enabled: Some(*enabled),
            ..state.clone()
        }),
        SetStartMutedPolicy { audio, video } => Some(ConferenceState {
            start_muted_policy: Some(StartMutedPolicy {
                audio: *audio,
                video: *video,
            }),
            ..state.clone()
        }),
        KickedOut { .. } => None,
    }
}

fn conference_failed(
    state: &ConferenceState,
    conference: &ConferenceHandle,
    error: &ConferenceError,
) -> Option<ConferenceState> {
    // A failure of some earlier session must not tear down the current one
    if state.current().is_some_and(|current| current != conference) {
        return None;
    }

    let auth_required = error
        .is(names::AUTHENTICATION_REQUIRED)
        .then(|| conference.clone());
    let password_required = error.is(names::PASSWORD_REQUIRED).then(|| conference.clone());

    Some(ConferenceState {
        auth_required,
        conference: None,
        error: Some(error.clone()),
        joining: None,
        leaving: None,
        locked: password_required.as_ref().map(|_| LockState::LockedRemotely),
        password: None,
        password_required,
        ..state.clone()
    })
}

fn conference_joined(state: &ConferenceState, conference: &ConferenceHandle) -> ConferenceState {
    // The engine does not report the lock state of a room joined with a
    // password, so read it off the session.
    let locked = conference.room_locked().then_some(LockState::LockedRemotely);

    ConferenceState {
        auth_required: None,
        conference: Some(conference.clone()),
        joining: None,
        leaving: None,
        locked,
        password_required: None,
        receive_video_quality: Some(VideoQuality::High),
        ..state.clone()
    }
}

fn conference_left(state: &ConferenceState, conference: &ConferenceHandle) -> ConferenceState {
    let mut next = state.clone();

    if next.auth_required.as_ref() == Some(conference) {
        next.auth_required = None;
    }
    if next.conference.as_ref() == Some(conference) {
        next.conference = None;
        next.joining = None;
        next.leaving = None;
        next.locked = None;
        next.password = None;
    }
    if next.password_required.as_ref() == Some(conference) {
        next.locked = None;
        next.password = None;
        next.password_required = None;
    }
    next
}

fn conference_will_leave(
    state: &ConferenceState,
    conference: &ConferenceHandle,
) -> Option<ConferenceState> {
    if state.conference.as_ref() != Some(conference) {
        return None;
    }
    Some(ConferenceState {
        auth_required: None,
        joining: None,
        leaving: Some(conference.clone()),
        password_required: None,
        ..state.clone()
    })
}

fn lock_state_changed(
    state: &ConferenceState,
    conference: &ConferenceHandle,
    locked: bool,
) -> Option<ConferenceState> {
    if state.conference.as_ref() != Some(conference) {
        return None;
    }
    Some(ConferenceState {
        locked: locked.then(|| state.locked.unwrap_or(LockState::LockedRemotely)),
        password: if locked { state.password.clone() } else { None },
        ..state.clone()
    })
}

fn set_password(
    state: &ConferenceState,
    conference: &ConferenceHandle,
    method: PasswordMethod,
    password: Option<&str>,
) -> Option<ConferenceState> {
    match method {
        PasswordMethod::Join => {
            if state.password_required.as_ref() != Some(conference) {
                return None;
            }
            Some(ConferenceState {
                locked: Some(LockState::LockedRemotely),
                password: password.map(str::to_string),
                password_required: None,
                ..state.clone()
            })
        }
        PasswordMethod::Lock => {
            let password = password.filter(|p| !p.is_empty()).map(str::to_string);
            Some(ConferenceState {
                locked: password.as_ref().map(|_| LockState::LockedLocally),
                password,
                ..state.clone()
            })
        }
    }
}
