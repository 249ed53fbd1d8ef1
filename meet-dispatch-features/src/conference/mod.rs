//! `base/conference`: the lifecycle of a conference session
//!
//! ```text
//! SET_ROOM -> CONFERENCE_WILL_JOIN -> CONFERENCE_JOINED -> CONFERENCE_WILL_LEAVE -> CONFERENCE_LEFT
//!                                  \-> CONFERENCE_FAILED (password/auth challenge or terminal)
//! ```
//!
//! Reducers compare sessions by [`ConferenceHandle`] identity, so late
//! events for a session the app already moved on from are ignored.

mod actions;
mod handle;
mod reducer;
mod state;

pub use actions::{kinds, ConferenceAction, PasswordMethod};
pub use handle::ConferenceHandle;
pub use reducer::reducer;
pub use state::{ConferenceState, LockState, StartMutedPolicy, VideoQuality, CONFERENCE};
