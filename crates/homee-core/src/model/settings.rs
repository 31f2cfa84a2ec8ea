use serde::{Deserialize, Serialize};

use super::de::{flexible_bool, nullable, percent_decoded};

/// Hub-wide settings, replaced wholesale whenever the hub sends them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "nullable")]
    pub address: String,
    #[serde(deserialize_with = "nullable")]
    pub city: String,
    #[serde(deserialize_with = "nullable")]
    pub zip: String,
    #[serde(deserialize_with = "nullable")]
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(deserialize_with = "nullable")]
    pub country: String,
    #[serde(deserialize_with = "nullable")]
    pub language: String,
    pub remote_access: i64,
    /// Whether the owner accepts beta firmware.
    pub beta: i64,
    #[serde(deserialize_with = "nullable")]
    pub webhooks_key: String,
    pub automatic_location_detection: i64,
    pub polling_interval: f64,
    #[serde(deserialize_with = "nullable")]
    pub timezone: String,
    pub enable_analytics: i64,
    #[serde(deserialize_with = "percent_decoded")]
    pub homee_name: String,
    #[serde(rename = "LastMissingCubeNotification", deserialize_with = "nullable")]
    pub last_missing_cube_notification: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub local_ssl_enabled: bool,
    pub wlan_enabled: i64,
    #[serde(deserialize_with = "nullable")]
    pub wlan_ssid: String,
    pub wlan_mode: i64,
    #[serde(deserialize_with = "flexible_bool")]
    pub internet_access: bool,
    pub lan_enabled: i64,
    #[serde(deserialize_with = "nullable")]
    pub lan_ip_address: String,
    #[serde(deserialize_with = "nullable")]
    pub available_ssids: Vec<String>,
    pub time: i64,
    #[serde(deserialize_with = "nullable")]
    pub civil_time: String,
    #[serde(deserialize_with = "nullable")]
    pub version: String,
    #[serde(deserialize_with = "nullable")]
    pub uid: String,
    /// Raw cube descriptors.
    pub cubes: serde_json::Value,
    /// Raw extension settings.
    pub extensions: serde_json::Value,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_partial_settings() {
        let s: Settings = serde_json::from_value(json!({
            "homee_name": "Mein%20Homee",
            "version": "2.41.2",
            "latitude": 52.52,
            "local_ssl_enabled": 1,
            "wlan_ssid": null,
            "LastMissingCubeNotification": "",
            "cubes": [{ "type": 1 }]
        }))
        .unwrap();

        assert_eq!(s.homee_name, "Mein Homee");
        assert_eq!(s.version, "2.41.2");
        assert!(s.local_ssl_enabled);
        assert_eq!(s.wlan_ssid, "");
        assert!(s.cubes.is_array());
        assert!(s.extensions.is_null());
    }
}
