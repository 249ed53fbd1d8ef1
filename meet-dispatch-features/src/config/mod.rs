//! `base/config`: the live `config`, `interfaceConfig` and `loggingConfig`
//! objects and the whitelist-gated override surface
//!
//! Overrides arrive either as a JSON document
//! (`{ "config": {..}, "interfaceConfig": {..} }`) or through the hash of the
//! location URL. Objects are merged key by key, arrays are replaced whole, and
//! `config` keys outside [`whitelist::WHITELISTED_KEYS`] are dropped.

pub mod url_params;
pub mod whitelist;

use meet_dispatch::{Action, SliceKey, SliceUpdate};
use serde_json::{Map, Value};
use url::Url;

use crate::action::ShellAction;
use crate::connection::ConnectionAction;

pub use url_params::{nest_params, parse_url_params, ParamSource};

pub const CONFIG: SliceKey<ConfigState> = SliceKey::new("features/base/config");

#[derive(Action, Clone, Debug)]
#[action(feature = "base/config", kinds = "kinds")]
pub enum ConfigAction {
    /// Replace the live `config` object
    SetConfig { config: Map<String, Value> },
    /// Merge an override document into the live objects
    OverrideConfig { overrides: Value },
    /// Downloading the config for `location_url` failed
    LoadConfigError { error: String, location_url: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigState {
    pub config: Map<String, Value>,
    pub interface_config: Map<String, Value>,
    pub logging_config: Map<String, Value>,
    pub load_error: Option<String>,
}

impl ConfigState {
    fn section_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        match name {
            "config" => Some(&mut self.config),
            "interfaceConfig" => Some(&mut self.interface_config),
            "loggingConfig" => Some(&mut self.logging_config),
            _ => None,
        }
    }

    /// Merge `json` into the matching sections.
    ///
    /// Unknown sections and non-object section values are ignored.
    pub fn override_json(&mut self, json: &Value) {
        let Value::Object(sections) = json else {
            tracing::warn!("config override is not an object");
            return;
        };
        for (name, values) in sections {
            let Value::Object(values) = values else { continue };
            let Some(section) = self.section_mut(name) else {
                continue;
            };
            let allowed = whitelist::whitelisted(name, values);
            if allowed.is_empty() {
                continue;
            }
            let overrides = Value::Object(allowed.clone());
            tracing::info!(section = %name, %overrides, "extending config");
            merge(section, &allowed);
        }
    }

    /// Apply overrides from the hash of `location`.
    pub fn override_from_url(&mut self, location: &Url) {
        let params = parse_url_params(location, false, ParamSource::Hash);
        if params.is_empty() {
            return;
        }
        self.override_json(&Value::Object(nest_params(params)));
    }
}

/// Deep merge where arrays and scalars are replaced and objects recurse.
fn merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge(existing, incoming),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

pub fn reducer(state: &ConfigState, action: &ShellAction) -> SliceUpdate<ConfigState> {
    let next = match action {
        ShellAction::Config(ConfigAction::SetConfig { config }) => ConfigState {
            config: config.clone(),
            load_error: None,
            ..state.clone()
        },
        ShellAction::Config(ConfigAction::OverrideConfig { overrides }) => {
            let mut next = state.clone();
            next.override_json(overrides);
            next
        }
        ShellAction::Config(ConfigAction::LoadConfigError { error, .. }) => ConfigState {
            load_error: Some(error.clone()),
            ..state.clone()
        },
        ShellAction::Connection(ConnectionAction::SetLocationUrl { url: Some(url) }) => {
            let Ok(location) = Url::parse(url) else {
                return SliceUpdate::Unchanged;
            };
            let mut next = state.clone();
            next.override_from_url(&location);
            next
        }
        _ => return SliceUpdate::Unchanged,
    };
    SliceUpdate::when_changed(state, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_override_drops_non_whitelisted_keys() {
        let mut state = ConfigState {
            config: object(json!({ "channelLastN": -1 })),
            ..ConfigState::default()
        };
        state.override_json(&json!({ "config": { "channelLastN": 5, "notAllowedKey": true } }));

        assert_eq!(state.config.get("channelLastN"), Some(&json!(5)));
        assert!(!state.config.contains_key("notAllowedKey"));
    }

    #[test]
    fn test_arrays_are_replaced_objects_merged() {
        let mut state = ConfigState {
            config: object(json!({
                "hosts": { "domain": "meet.example", "muc": "conference.meet.example" },
                "desktopSharingSources": ["screen", "window"]
            })),
            ..ConfigState::default()
        };
        state.override_json(&json!({ "config": {
            "hosts": { "domain": "other.example" },
            "desktopSharingSources": ["tab"]
        }}));

        assert_eq!(
            Value::Object(state.config),
            json!({
                "hosts": { "domain": "other.example", "muc": "conference.meet.example" },
                "desktopSharingSources": ["tab"]
            })
        );
    }

    #[test]
    fn test_interface_config_is_not_filtered() {
        let mut state = ConfigState::default();
        state.override_json(&json!({
            "interfaceConfig": { "APP_NAME": "Meet" },
            "unknownConfig": { "x": 1 }
        }));
        assert_eq!(state.interface_config.get("APP_NAME"), Some(&json!("Meet")));
    }

    #[test]
    fn test_location_url_hash_overrides() {
        let update = reducer(
            &ConfigState::default(),
            &ShellAction::Connection(ConnectionAction::SetLocationUrl {
                url: Some(
                    "https://meet.example/room#config.p2p.enabled=false&config.evil=1".into(),
                ),
            }),
        );
        let SliceUpdate::Replace(state) = update else {
            panic!("expected the config to change");
        };
        assert_eq!(state.config.get("p2p"), Some(&json!({ "enabled": false })));
        assert!(!state.config.contains_key("evil"));
    }

    #[test]
    fn test_rejected_override_keeps_reference() {
        let update = reducer(
            &ConfigState::default(),
            &ShellAction::Config(ConfigAction::OverrideConfig {
                overrides: json!({ "config": { "notAllowedKey": true } }),
            }),
        );
        assert_eq!(update, SliceUpdate::Unchanged);
    }
}
