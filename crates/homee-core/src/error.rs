// ── Core error types ──
//
// Session-level errors from homee-core. Consumers never see HTTP status
// codes or tungstenite errors directly; the `From<homee_api::Error>` impl
// translates transport-layer failures into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to hub at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Hub disconnected")]
    Disconnected,

    #[error("Hub connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Gave up after {retries} connection attempts")]
    MaxRetriesExceeded { retries: u32 },

    // ── Data errors ──────────────────────────────────────────────────
    /// An inbound frame could not be decoded or had an unexpected shape.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<homee_api::Error> for CoreError {
    fn from(err: homee_api::Error) -> Self {
        match err {
            homee_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            homee_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        host: e
                            .url()
                            .and_then(|u| u.host_str().map(str::to_owned))
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            homee_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid hub address: {e}"),
            },
            homee_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            homee_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                host: "<websocket>".into(),
                reason,
            },
            homee_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                host: "<websocket>".into(),
                reason: format!("closed with code {code}: {reason}"),
            },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Protocol {
            message: err.to_string(),
        }
    }
}
