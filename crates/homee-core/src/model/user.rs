use serde::{Deserialize, Serialize};

use super::de::{flexible_bool, nullable, percent_decoded};
use super::{DeviceId, Entity, UserId};

/// A client device registered with the hub (phone, panel, this library).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default, deserialize_with = "nullable")]
    pub hardware_id: String,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub name: String,
    #[serde(default)]
    pub added: i64,
    #[serde(default)]
    pub last_connected: i64,
    #[serde(default)]
    pub os: i64,
    #[serde(rename = "type", default)]
    pub device_type: i64,
    #[serde(default)]
    pub app: i64,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub connected: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub push_registration_id: String,
}

impl Entity for Device {
    fn id(&self) -> i64 {
        self.id
    }
}

/// A hub account. Each `*_notifications` flag selects a delivery channel
/// (push, email, sms) for one category of event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub username: String,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub forename: String,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub surname: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image: String,
    #[serde(default)]
    pub role: i64,
    #[serde(rename = "type", default)]
    pub user_type: i64,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: String,
    #[serde(default)]
    pub added: i64,
    #[serde(default, deserialize_with = "percent_decoded")]
    pub homee_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub homee_image: String,
    #[serde(default)]
    pub access: i64,
    #[serde(default)]
    pub cube_push_notifications: i64,
    #[serde(default)]
    pub cube_email_notifications: i64,
    #[serde(default)]
    pub cube_sms_notifications: i64,
    #[serde(default)]
    pub node_push_notifications: i64,
    #[serde(default)]
    pub node_email_notifications: i64,
    #[serde(default)]
    pub node_sms_notifications: i64,
    #[serde(default)]
    pub warning_push_notifications: i64,
    #[serde(default)]
    pub warning_email_notifications: i64,
    #[serde(default)]
    pub warning_sms_notifications: i64,
    #[serde(default)]
    pub update_push_notifications: i64,
    #[serde(default)]
    pub update_email_notifications: i64,
    #[serde(default)]
    pub update_sms_notifications: i64,
    #[serde(default)]
    pub api_push_notifications: i64,
    #[serde(default)]
    pub api_email_notifications: i64,
    #[serde(default)]
    pub api_sms_notifications: i64,
    #[serde(default)]
    pub plan_push_notifications: i64,
    #[serde(default)]
    pub plan_email_notifications: i64,
    #[serde(default)]
    pub plan_sms_notifications: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub devices: Vec<Device>,
}

impl Entity for User {
    fn id(&self) -> i64 {
        self.id
    }
}
