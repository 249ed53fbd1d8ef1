//! URL helpers shared by the features

use url::Url;

/// Custom scheme the native apps register for meeting links
pub const APP_LINK_SCHEME: &str = "org.jitsi.meet:";

/// Canonical string form of a URL; unparsable input is returned as is.
pub fn to_url_string(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    }
}

/// Parse a meeting link, mapping the app scheme onto https.
pub fn parse_uri_string(uri: &str) -> Option<Url> {
    let uri = uri.trim();
    match uri.strip_prefix(APP_LINK_SCHEME) {
        Some(rest) => Url::parse(&format!("https:{rest}")).ok(),
        None => Url::parse(uri).ok(),
    }
}

/// Whether `room` names a room that can be joined
pub fn is_room_valid(room: Option<&str>) -> bool {
    room.is_some_and(|room| !room.is_empty())
}
