// Token endpoint authentication
//
// The hub hands out short-lived access tokens in exchange for HTTP basic
// auth (username + hex SHA-512 of the password). The token is cached with
// its expiry and reused until it runs out; retry policy lives in the
// caller's reconnect loop, never here.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::error::Error;

/// `device_os` value the hub expects for Linux clients.
const DEVICE_OS_LINUX: u8 = 5;
/// `device_type` value for clients without a specific form factor.
const DEVICE_TYPE_NONE: u8 = 0;
/// `device_app` value identifying a homee client app.
const DEVICE_APP_HOMEE: u8 = 1;

static TOKEN_RESPONSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^access_token=([0-z]+)&.*&expires=(\d+)$").expect("valid token pattern")
});

// ── AccessToken ─────────────────────────────────────────────────────

/// An access token together with the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_at,
        }
    }

    /// The raw token, for building the WebSocket URL.
    pub fn secret(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is usable strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// ── TokenClient ─────────────────────────────────────────────────────

/// HTTP client for the hub's `/access_token` endpoint.
///
/// Holds the credentials and the cached token. The cache lock is held
/// across the exchange so concurrent callers never trigger two requests.
pub struct TokenClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password_hash: SecretString,
    device_name: String,
    device_id: String,
    timeout: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenClient {
    /// Build a token client for the hub at `base_url` (e.g. `http://hub:7681`).
    ///
    /// `device_name` is the label the hub shows in its device list; the
    /// hardware id is derived from it.
    pub fn new(
        base_url: Url,
        username: impl Into<String>,
        password: &SecretString,
        device_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder().build()?;
        let device_name = device_name.into();

        Ok(Self {
            http,
            base_url,
            username: username.into(),
            password_hash: SecretString::from(hash_password(password.expose_secret())),
            device_id: device_hardware_id(&device_name),
            device_name,
            timeout,
            cached: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Return the cached token if it is still valid, otherwise exchange
    /// credentials for a new one and cache it.
    pub async fn access_token(&self) -> Result<AccessToken, Error> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(Utc::now()) {
                debug!(expires_at = %token.expires_at(), "reusing cached access token");
                return Ok(token.clone());
            }
        }

        let token = self.exchange().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// The currently cached token, valid or not.
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cached.lock().await.clone()
    }

    /// Drop the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self) -> Result<AccessToken, Error> {
        let url = self.base_url.join("access_token")?;
        debug!(%url, device = %self.device_name, "requesting access token");

        let os = DEVICE_OS_LINUX.to_string();
        let device_type = DEVICE_TYPE_NONE.to_string();
        let app = DEVICE_APP_HOMEE.to_string();
        let form = [
            ("device_name", self.device_name.as_str()),
            ("device_hardware_id", self.device_id.as_str()),
            ("device_os", os.as_str()),
            ("device_type", device_type.as_str()),
            ("device_app", app.as_str()),
        ];

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(self.password_hash.expose_secret()))
            .form(&form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Authentication {
                message: format!("token request failed: {e}"),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Authentication {
            message: format!("failed to read token response: {e}"),
        })?;

        if !status.is_success() {
            return Err(Error::Authentication {
                message: format!("token request rejected (HTTP {status})"),
            });
        }

        let token = parse_token_response(&body, Utc::now())?;
        debug!(expires_at = %token.expires_at(), "access token acquired");
        Ok(token)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Hex-encoded SHA-512 digest of the password, as the hub expects it.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha512::digest(password.as_bytes()))
}

/// Hardware id derived from the device label: lower-cased, spaces to dashes.
pub fn device_hardware_id(device_name: &str) -> String {
    device_name.to_lowercase().replace(' ', "-")
}

/// Parse `access_token=...&...&expires=<secs>` into a token expiring
/// `secs` seconds after `now`.
fn parse_token_response(body: &str, now: DateTime<Utc>) -> Result<AccessToken, Error> {
    let unparsable = || Error::Authentication {
        message: "unexpected token response format".into(),
    };

    let captures = TOKEN_RESPONSE.captures(body.trim()).ok_or_else(unparsable)?;
    let token = captures.get(1).ok_or_else(unparsable)?.as_str();
    let expires: i64 = captures
        .get(2)
        .ok_or_else(unparsable)?
        .as_str()
        .parse()
        .map_err(|_| unparsable())?;

    let lifetime = TimeDelta::try_seconds(expires).ok_or_else(unparsable)?;
    Ok(AccessToken::new(token, now + lifetime))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_hex_sha512() {
        let hash = hash_password("abc");
        assert_eq!(hash.len(), 128);
        assert_eq!(
            hash,
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn hardware_id_is_slugged_label() {
        assert_eq!(device_hardware_id("Living Room Panel"), "living-room-panel");
        assert_eq!(device_hardware_id("homee-rs"), "homee-rs");
    }

    #[test]
    fn parses_token_and_expiry() {
        let now = Utc::now();
        let body = "access_token=abcDEF123&user_id=1&device_id=2&expires=3600";

        let token = parse_token_response(body, now).unwrap();
        assert_eq!(token.secret(), "abcDEF123");
        assert_eq!(token.expires_at(), now + TimeDelta::seconds(3600));
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + TimeDelta::seconds(3600)));
    }

    #[test]
    fn rejects_unexpected_body() {
        let now = Utc::now();
        for body in ["", "error=denied", "access_token=abc&expires=soon"] {
            let result = parse_token_response(body, now);
            assert!(
                matches!(result, Err(Error::Authentication { .. })),
                "body {body:?} should not parse"
            );
        }
    }
}
