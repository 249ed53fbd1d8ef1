//! Session failures reported by the conferencing engine

use std::fmt;

/// Error names raised by the engine for conference and connection failures.
pub mod names {
    pub const AUTHENTICATION_REQUIRED: &str = "conference.authenticationRequired";
    pub const PASSWORD_REQUIRED: &str = "conference.passwordRequired";
    pub const KICKED: &str = "conference.kicked";
    pub const CONFERENCE_DESTROYED: &str = "conference.destroyed";
    pub const CONNECTION_DROPPED: &str = "connection.droppedError";
    pub const PASSWORD_REQUIRED_CONNECTION: &str = "connection.passwordRequired";
}

/// A conference or connection failure.
///
/// `recoverable` failures are handled inside the app (a password prompt, an
/// authentication round trip) and never reach external listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceError {
    pub name: String,
    pub message: String,
    pub recoverable: bool,
}

impl ConferenceError {
    /// Failure the app may still get past
    pub fn recoverable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: String::new(),
            recoverable: true,
        }
    }

    /// Failure that ends the session
    pub fn terminal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: String::new(),
            recoverable: false,
        }
    }

    /// Classify by name: credential challenges are recoverable, the rest are
    /// terminal.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            names::AUTHENTICATION_REQUIRED
            | names::PASSWORD_REQUIRED
            | names::PASSWORD_REQUIRED_CONNECTION => Self::recoverable(name),
            _ => Self::terminal(name),
        }
    }

    /// The local participant was removed from the conference
    pub fn kicked() -> Self {
        Self::terminal(names::KICKED)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

/// `name: message`, or just `name` when there is no message
impl fmt::Display for ConferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl std::error::Error for ConferenceError {}
