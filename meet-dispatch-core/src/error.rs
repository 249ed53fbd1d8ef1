//! Crate-level error types for registration, dispatch and transport.

use std::time::Duration;

/// Registering a second reducer under an already owned slice name.
///
/// This is a programming error surfaced at initialization time; the first
/// registration stays active.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("slice `{slice}` already has a registered reducer")]
pub struct DuplicateSliceError {
    /// The contested slice name.
    pub slice: &'static str,
}

/// A reducer refused to produce the next value of its slice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reducer for slice `{slice}` failed on {action}: {message}")]
pub struct ReducerError {
    /// Slice whose update was aborted.
    pub slice: &'static str,
    /// Name of the action being reduced.
    pub action: &'static str,
    /// Reducer-supplied reason.
    pub message: String,
}

impl ReducerError {
    /// Build an error from inside a reducer; the store fills in slice and action.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            slice: "",
            action: "",
            message: message.into(),
        }
    }

    pub(crate) fn located(mut self, slice: &'static str, action: &'static str) -> Self {
        self.slice = slice;
        self.action = action;
        self
    }
}

/// Error returned by [`Store::dispatch`](crate::Store::dispatch).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// A reducer failed; slices reduced before it keep their new values.
    #[error(transparent)]
    Reducer(#[from] ReducerError),

    /// A middleware failed; the rest of the chain was skipped.
    #[error("middleware `{middleware}` failed on {action}: {message}")]
    Middleware {
        /// Middleware name.
        middleware: &'static str,
        /// Name of the action in flight.
        action: &'static str,
        /// Failure reason.
        message: String,
    },

    /// Synchronous re-dispatch nested too deeply (usually a middleware
    /// dispatching the action it is processing).
    #[error("dispatch nested deeper than {limit} levels while handling {action}")]
    DepthExceeded {
        /// Configured maximum depth.
        limit: usize,
        /// Action that would have exceeded it.
        action: &'static str,
    },

    /// A follow-up task was started with no tokio runtime to run it.
    #[error("no tokio runtime to run task `{task}`")]
    NoRuntime {
        /// Key of the task.
        task: String,
    },
}

impl DispatchError {
    /// Convenience constructor for middleware implementations.
    pub fn middleware(
        middleware: &'static str,
        action: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Middleware {
            middleware,
            action,
            message: message.into(),
        }
    }
}

/// Failure of a request or event on a detached-surface transport.
///
/// Call sites are expected to degrade to a default value rather than
/// propagate these; see [`Transport::request_or`](crate::transport::Transport::request_or).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No correlated response arrived in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The other side answered with an error.
    #[error("remote error: {0}")]
    Remote(String),

    /// The other side did not handle the request.
    #[error("no handler for request `{0}`")]
    Unhandled(String),

    /// The underlying channel is gone.
    #[error("transport channel closed")]
    Closed,

    /// A message could not be (de)serialized.
    #[error("malformed message: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Invalid runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration document did not parse.
    #[error("invalid runtime config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
