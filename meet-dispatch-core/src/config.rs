//! Runtime knobs for the store, logger and transport

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logger::ActionLoggerConfig;

/// Default nesting limit for synchronous re-dispatch
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 16;

/// Default time a transport request may stay unanswered
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use meet_dispatch_core::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json_str(r#"{ "request_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(config.request_timeout().as_millis(), 250);
/// assert_eq!(config.max_dispatch_depth, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How deep synchronous dispatch may nest before it is refused
    pub max_dispatch_depth: usize,
    /// Transport request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Glob patterns of action names to log; empty means all
    pub log_include: Vec<String>,
    /// Glob patterns of action names never logged
    pub log_exclude: Vec<String>,
    /// Size of the in-memory action log
    pub log_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            log_include: Vec::new(),
            log_exclude: Vec::new(),
            log_capacity: 100,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dispatch_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_dispatch_depth",
                reason: "must allow at least one dispatch".into(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Transport request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Filter for the action logger
    pub fn action_logger(&self) -> ActionLoggerConfig {
        ActionLoggerConfig::with_patterns(self.log_include.clone(), self.log_exclude.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_rejects_zero_depth() {
        let err = RuntimeConfig::from_json_str(r#"{ "max_dispatch_depth": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_dispatch_depth",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = RuntimeConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_action_logger_patterns() {
        let config = RuntimeConfig {
            log_include: vec!["CONFERENCE_*".into()],
            log_exclude: vec!["*_WILL_*".into()],
            ..Default::default()
        };
        let filter = config.action_logger();
        assert!(filter.should_log("CONFERENCE_JOINED"));
        assert!(!filter.should_log("CONFERENCE_WILL_JOIN"));
        assert!(!filter.should_log("SET_ROOM"));
    }
}
