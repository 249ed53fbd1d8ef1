//! Config overrides carried in a location URL
//!
//! `https://meet.example/room#config.debug=true&interfaceConfig.APP_NAME="Meet"`

use serde_json::{Map, Value};
use url::Url;

/// Which part of the URL holds the parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamSource {
    #[default]
    Hash,
    Search,
}

/// Parse `key=value` pairs from the hash (or query) of `url`.
///
/// Values are percent-decoded and parsed as JSON unless `dont_parse` is set,
/// in which case they are kept as raw strings. Pairs whose value does not
/// parse are skipped. A lone hash starting with `/` belongs to a hash router
/// and yields nothing.
pub fn parse_url_params(url: &Url, dont_parse: bool, source: ParamSource) -> Map<String, Value> {
    let mut params = Map::new();
    let raw = match source {
        ParamSource::Hash => url.fragment(),
        ParamSource::Search => url.query(),
    };
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return params;
    };

    let parts: Vec<&str> = raw.split('&').collect();
    if source == ParamSource::Hash && parts.len() == 1 && parts[0].starts_with('/') {
        return params;
    }

    for part in parts {
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        if key.is_empty() {
            continue;
        }
        if dont_parse {
            params.insert(key.to_string(), Value::String(value.to_string()));
            continue;
        }
        match decode_value(value) {
            Some(value) => {
                params.insert(key.to_string(), value);
            }
            None => tracing::warn!(param = key, value, "failed to parse URL parameter value"),
        }
    }
    params
}

fn decode_value(value: &str) -> Option<Value> {
    let decoded = urlencoding::decode(value).ok()?;
    serde_json::from_str(&decoded.replacen("\\&", "&", 1)).ok()
}

/// Nest dotted parameter names: `config.p2p.enabled` becomes
/// `{ "config": { "p2p": { "enabled": .. } } }`.
pub fn nest_params(params: Map<String, Value>) -> Map<String, Value> {
    let mut root = Map::new();
    for (path, value) in params {
        let names: Vec<&str> = path.split('.').collect();
        insert_path(&mut root, &names, value);
    }
    root
}

fn insert_path(target: &mut Map<String, Value>, names: &[&str], value: Value) {
    match names {
        [] => {}
        [last] => {
            target.insert(last.to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = target
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_parse_hash_params() {
        let location = concat!(
            "https://meet.example/room",
            "#config.debug=true&config.channelLastN=-1&interfaceConfig.APP_NAME=%22Meet%22"
        );
        let params = parse_url_params(
            &url(location),
            false,
            ParamSource::Hash,
        );
        assert_eq!(params.get("config.debug"), Some(&json!(true)));
        assert_eq!(params.get("config.channelLastN"), Some(&json!(-1)));
        assert_eq!(params.get("interfaceConfig.APP_NAME"), Some(&json!("Meet")));
    }

    #[test]
    fn test_unparsable_value_is_skipped() {
        let params = parse_url_params(
            &url("https://meet.example/room#config.debug=yes&config.startBitrate=800"),
            false,
            ParamSource::Hash,
        );
        assert!(!params.contains_key("config.debug"));
        assert_eq!(params.get("config.startBitrate"), Some(&json!(800)));
    }

    #[test]
    fn test_hash_router_is_ignored() {
        let params =
            parse_url_params(&url("https://meet.example/#/welcome"), false, ParamSource::Hash);
        assert!(params.is_empty());
    }

    #[test]
    fn test_search_dont_parse() {
        let params = parse_url_params(
            &url("https://meet.example/popup?scope=abc&x=1"),
            true,
            ParamSource::Search,
        );
        assert_eq!(params.get("scope"), Some(&json!("abc")));
        assert_eq!(params.get("x"), Some(&json!("1")));
    }

    #[test]
    fn test_nest_params() {
        let mut params = Map::new();
        params.insert("config.p2p.enabled".into(), json!(false));
        params.insert("config.debug".into(), json!(true));

        assert_eq!(
            Value::Object(nest_params(params)),
            json!({ "config": { "p2p": { "enabled": false }, "debug": true } })
        );
    }
}
