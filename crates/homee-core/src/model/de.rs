// Serde helpers for the hub's loosely typed JSON.

use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Decode a percent-encoded string field (`"Living%20Room"` -> `"Living Room"`).
pub(crate) fn percent_decoded<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(percent_decode_str(&raw).decode_utf8_lossy().into_owned())
}

/// Treat an explicit `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a list entry by entry. Entries that do not decode are logged and
/// skipped so one malformed record cannot sink the rest; `null` is empty.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match T::deserialize(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "skipping undecodable list entry");
                None
            }
        })
        .collect())
}

/// Accept `true`/`false` as well as the `0`/`1` integers the hub often sends.
pub(crate) fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrNumber {
        Bool(bool),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<BoolOrNumber>::deserialize(deserializer)? {
        Some(BoolOrNumber::Bool(b)) => b,
        Some(BoolOrNumber::Int(i)) => i != 0,
        Some(BoolOrNumber::Float(f)) => f != 0.0,
        None => false,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "super::percent_decoded", default)]
        name: String,
        #[serde(deserialize_with = "super::flexible_bool", default)]
        flag: bool,
        #[serde(deserialize_with = "super::nullable", default)]
        ssid: String,
        #[serde(deserialize_with = "super::lenient_list", default)]
        ids: Vec<u32>,
    }

    #[test]
    fn decodes_percent_encoding() {
        let s: Sample = serde_json::from_value(json!({ "name": "K%C3%BCche%20Licht" })).unwrap();
        assert_eq!(s.name, "Küche Licht");
    }

    #[test]
    fn bool_from_int_and_bool() {
        let a: Sample = serde_json::from_value(json!({ "flag": 1 })).unwrap();
        let b: Sample = serde_json::from_value(json!({ "flag": false })).unwrap();
        let c: Sample = serde_json::from_value(json!({})).unwrap();
        assert!(a.flag);
        assert!(!b.flag);
        assert!(!c.flag);
    }

    #[test]
    fn null_name_becomes_empty() {
        let s: Sample = serde_json::from_value(json!({ "name": null })).unwrap();
        assert_eq!(s.name, "");
    }

    #[test]
    fn nullable_falls_back_to_default() {
        let s: Sample = serde_json::from_value(json!({ "ssid": null })).unwrap();
        assert_eq!(s.ssid, "");
        let s: Sample = serde_json::from_value(json!({ "ssid": "home" })).unwrap();
        assert_eq!(s.ssid, "home");
    }

    #[test]
    fn lenient_list_skips_bad_entries() {
        let s: Sample = serde_json::from_value(json!({ "ids": [1, "two", null, 3] })).unwrap();
        assert_eq!(s.ids, vec![1, 3]);
        let s: Sample = serde_json::from_value(json!({ "ids": null })).unwrap();
        assert!(s.ids.is_empty());
    }
}
