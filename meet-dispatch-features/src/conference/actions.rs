use meet_dispatch::Action;

use super::handle::ConferenceHandle;
use super::state::VideoQuality;
use crate::error::ConferenceError;

/// How a password in [`ConferenceAction::SetPassword`] is to be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMethod {
    /// Answer a password challenge while joining
    Join,
    /// Lock (or, with no password, unlock) the room
    Lock,
}

/// Actions of the `base/conference` feature.
#[derive(Action, Clone, Debug)]
#[action(feature = "base/conference", kinds = "kinds")]
pub enum ConferenceAction {
    #[action(kind = "CONFERENCE_WILL_JOIN")]
    WillJoin { conference: ConferenceHandle },

    #[action(kind = "CONFERENCE_JOINED")]
    Joined { conference: ConferenceHandle },

    #[action(kind = "CONFERENCE_WILL_LEAVE")]
    WillLeave { conference: ConferenceHandle },

    #[action(kind = "CONFERENCE_LEFT")]
    Left { conference: ConferenceHandle },

    #[action(kind = "CONFERENCE_FAILED")]
    Failed {
        conference: ConferenceHandle,
        error: ConferenceError,
    },

    /// The local participant was removed by a moderator
    KickedOut { conference: ConferenceHandle },

    LockStateChanged {
        conference: ConferenceHandle,
        locked: bool,
    },

    P2pStatusChanged { p2p: bool },

    SetAudioOnly { audio_only: bool },

    SetDesktopSharingEnabled { enabled: bool },

    SetFollowMe { enabled: bool },

    SetPassword {
        conference: ConferenceHandle,
        method: PasswordMethod,
        password: Option<String>,
    },

    SetReceiveVideoQuality { quality: VideoQuality },

    /// Room the app is about to join; emitted before any connection exists
    SetRoom { room: Option<String> },

    SetSipGatewayEnabled { enabled: bool },

    SetStartMutedPolicy { audio: bool, video: bool },
}

impl ConferenceAction {
    /// Session handle carried by the action, if any
    pub fn conference(&self) -> Option<&ConferenceHandle> {
        match self {
            Self::WillJoin { conference }
            | Self::Joined { conference }
            | Self::WillLeave { conference }
            | Self::Left { conference }
            | Self::Failed { conference, .. }
            | Self::KickedOut { conference }
            | Self::LockStateChanged { conference, .. }
            | Self::SetPassword { conference, .. } => Some(conference),
            _ => None,
        }
    }
}
