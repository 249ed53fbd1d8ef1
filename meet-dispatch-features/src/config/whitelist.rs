//! Keys of `config` that may be overridden from outside
//!
//! Only the first path segment is checked: whitelisting `p2p` allows
//! `p2p.enabled`, `p2p.useStunTurn` and so on.

use serde_json::{Map, Value};

pub const WHITELISTED_KEYS: &[&str] = &[
    "_peerConnStatusOutOfLastNTimeout",
    "_peerConnStatusRtcMuteTimeout",
    "abTesting",
    "alwaysVisibleToolbar",
    "autoRecord",
    "autoRecordToken",
    "avgRtpStatsN",
    "callStatsConfIDNamespace",
    "callStatsID",
    "callStatsSecret",
    "callUUID",
    "channelLastN",
    "constraints",
    "debug",
    "debugAudioLevels",
    "defaultLanguage",
    "desktopSharingChromeDisabled",
    "desktopSharingChromeExtId",
    "desktopSharingChromeMinExtVersion",
    "desktopSharingChromeSources",
    "desktopSharingFrameRate",
    "desktopSharingFirefoxDisabled",
    "desktopSharingSources",
    "disable1On1Mode",
    "disableAEC",
    "disableAGC",
    "disableAP",
    "disableAudioLevels",
    "disableDesktopSharing",
    "disableH264",
    "disableHPF",
    "disableNS",
    "disableRemoteControl",
    "disableRtx",
    "disableSuspendVideo",
    "displayJids",
    "enableDisplayNameInStats",
    "enableLipSync",
    "enableLocalVideoFlip",
    "enableRecording",
    "enableRemb",
    "enableStatsID",
    "enableTalkWhileMuted",
    "enableTcc",
    "enableUserRolesBasedOnToken",
    "etherpad_base",
    "failICE",
    "firefox_fake_device",
    "forceJVB121Ratio",
    "gatherStats",
    "googleApiApplicationClientID",
    "hiddenDomain",
    "hosts",
    "iAmRecorder",
    "iAmSipGateway",
    "iceTransportPolicy",
    "ignoreStartMuted",
    "minParticipants",
    "nick",
    "openBridgeChannel",
    "p2p",
    "preferH264",
    "recordingType",
    "requireDisplayName",
    "resolution",
    "startAudioMuted",
    "startAudioOnly",
    "startBitrate",
    "startScreenSharing",
    "startVideoMuted",
    "startWithAudioMuted",
    "startWithVideoMuted",
    "testing",
    "useIPv6",
    "useNicks",
    "useStunTurn",
    "webrtcIceTcpDisable",
    "webrtcIceUdpDisable",
];

pub fn is_whitelisted(key: &str) -> bool {
    WHITELISTED_KEYS.contains(&key)
}

/// Overridable part of `values` for the section `section`.
///
/// Only `config` is filtered; other sections pass through whole.
pub fn whitelisted(section: &str, values: &Map<String, Value>) -> Map<String, Value> {
    if section != "config" {
        return values.clone();
    }
    values
        .iter()
        .filter(|(key, _)| is_whitelisted(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_config_is_filtered() {
        let Value::Object(values) = json!({ "channelLastN": 5, "notAllowedKey": true }) else {
            unreachable!()
        };

        let config = whitelisted("config", &values);
        assert_eq!(config.get("channelLastN"), Some(&json!(5)));
        assert!(!config.contains_key("notAllowedKey"));

        let interface = whitelisted("interfaceConfig", &values);
        assert_eq!(interface.len(), 2);
    }
}
