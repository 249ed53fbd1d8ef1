use std::fmt;
use std::sync::Arc;

use crate::util::to_url_string;

struct Session {
    url: String,
    room_locked: bool,
}

/// Shared identity of one conference session.
///
/// Clones refer to the same session; equality is identity, never URL. The
/// same URL may be loaded several times over the app's lifetime, each load
/// getting its own handle.
#[derive(Clone)]
pub struct ConferenceHandle {
    session: Arc<Session>,
}

impl ConferenceHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self::build(url.into(), false)
    }

    /// Handle for a room that already had a password when joined
    pub fn with_locked_room(url: impl Into<String>) -> Self {
        Self::build(url.into(), true)
    }

    fn build(url: String, room_locked: bool) -> Self {
        Self {
            session: Arc::new(Session {
                url: to_url_string(&url),
                room_locked,
            }),
        }
    }

    /// Canonical URL the session was created for
    pub fn url(&self) -> &str {
        &self.session.url
    }

    pub fn room_locked(&self) -> bool {
        self.session.room_locked
    }
}

impl PartialEq for ConferenceHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.session, &other.session)
    }
}

impl Eq for ConferenceHandle {}

impl fmt::Debug for ConferenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConferenceHandle")
            .field(&self.session.url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_url() {
        let a = ConferenceHandle::new("https://meet.example/room1");
        let b = ConferenceHandle::new("https://meet.example/room1");

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.url(), b.url());
    }
}
