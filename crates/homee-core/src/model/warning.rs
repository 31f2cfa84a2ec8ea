use serde::{Deserialize, Serialize};

use super::de::nullable;

/// The hub's current warning. Only the latest one is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Warning {
    pub code: i64,
    pub level: i64,
    #[serde(deserialize_with = "nullable")]
    pub message: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub data: serde_json::Value,
}
