// ── Runtime connection configuration ──
//
// Describes how to reach and authenticate with one hub, plus the
// reconnect and keepalive tuning. Never touches disk: the CLI (or any
// embedding application) builds a `HubConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Label the hub shows for this client in its device list.
pub const DEFAULT_DEVICE_NAME: &str = "homee-rs";

/// Configuration for a single hub session.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Hostname or IP address of the hub.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Device label; the hardware id sent to the hub is derived from it.
    pub device_name: String,
    /// How often a WebSocket ping is sent while connected.
    pub ping_interval: Duration,
    /// Base delay between reconnect attempts, multiplied by the retry count.
    pub reconnect_interval: Duration,
    pub reconnect: bool,
    /// Consecutive failed attempts after which the session gives up.
    pub max_retries: u32,
    /// Timeout for the token request and the WebSocket handshake.
    pub request_timeout: Duration,
}

impl HubConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            host: host.into(),
            port: homee_api::DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            device_name: DEFAULT_DEVICE_NAME.into(),
            ping_interval: Duration::from_secs(30),
            reconnect_interval: Duration::from_secs(5),
            reconnect: true,
            max_retries: 5,
            request_timeout: Duration::from_secs(5),
        }
    }

    /// HTTP base URL of the hub's token endpoint.
    pub fn base_url(&self) -> Result<Url, CoreError> {
        Ok(homee_api::base_url(&self.host, self.port)?)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "hub host is empty".into(),
            });
        }
        if self.username.is_empty() {
            return Err(CoreError::Config {
                message: "username is empty".into(),
            });
        }
        if self.ping_interval.is_zero() {
            return Err(CoreError::Config {
                message: "ping interval must be greater than zero".into(),
            });
        }
        if self.device_name.trim().is_empty() {
            return Err(CoreError::Config {
                message: "device name is empty".into(),
            });
        }
        self.base_url().map(|_| ())
    }
}
