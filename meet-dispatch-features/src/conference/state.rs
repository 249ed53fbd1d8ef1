use meet_dispatch::SliceKey;

use super::handle::ConferenceHandle;
use crate::error::ConferenceError;

pub const CONFERENCE: SliceKey<ConferenceState> = SliceKey::new("features/base/conference");

/// How the room of the current conference is locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// The local participant set the password
    LockedLocally,
    /// Somebody else set it; we learned it by being challenged
    LockedRemotely,
}

/// Receive-video resolution restraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VideoQuality {
    Low,
    Standard,
    High,
}

impl VideoQuality {
    /// Frame height in pixels
    pub fn height(self) -> u32 {
        match self {
            Self::Low => 180,
            Self::Standard => 360,
            Self::High => 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartMutedPolicy {
    pub audio: bool,
    pub video: bool,
}

/// State of the `features/base/conference` slice.
///
/// At most one of `joining`, `conference` and `leaving` refers to the session
/// the app is working with; `locked` and `password` never outlive the
/// session they belong to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConferenceState {
    pub joining: Option<ConferenceHandle>,
    pub conference: Option<ConferenceHandle>,
    pub leaving: Option<ConferenceHandle>,
    pub auth_required: Option<ConferenceHandle>,
    pub password_required: Option<ConferenceHandle>,
    pub locked: Option<LockState>,
    pub password: Option<String>,
    pub room: Option<String>,
    pub error: Option<ConferenceError>,
    pub audio_only: bool,
    pub p2p: Option<bool>,
    pub follow_me_enabled: bool,
    pub desktop_sharing_enabled: Option<bool>,
    pub sip_gateway_enabled: Option<bool>,
    pub receive_video_quality: Option<VideoQuality>,
    pub start_muted_policy: Option<StartMutedPolicy>,
}

impl ConferenceState {
    /// The conference being joined or already joined
    pub fn current(&self) -> Option<&ConferenceHandle> {
        self.conference.as_ref().or(self.joining.as_ref())
    }

    /// Every session handle the slice still refers to
    pub fn handles(&self) -> impl Iterator<Item = &ConferenceHandle> {
        [
            &self.joining,
            &self.conference,
            &self.leaving,
            &self.auth_required,
            &self.password_required,
        ]
        .into_iter()
        .flatten()
    }

    /// Whether any handle in the slice was created for `url`
    pub fn tracks_url(&self, url: &str) -> bool {
        self.handles().any(|handle| handle.url() == url)
    }
}
