//! WebSocket push channel.
//!
//! Opens the hub's `/connection` endpoint with the `v2` sub-protocol. The
//! returned stream is split by the caller into a reader and a writer; this
//! module only knows how to build the URL and perform the handshake.
//!
//! # Example
//!
//! ```rust,ignore
//! use homee_api::websocket;
//!
//! let url = websocket::connection_url("192.168.1.20", 7681, token.secret())?;
//! let stream = websocket::connect(&url, Duration::from_secs(5)).await?;
//! ```

use std::time::Duration;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Error;

/// Sub-protocol the hub speaks on the push channel.
pub const SUB_PROTOCOL: &str = "v2";

/// A connected push channel.
pub type HubStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build `ws://{host}:{port}/connection?access_token={token}`.
pub fn connection_url(host: &str, port: u16, token: &str) -> Result<Url, Error> {
    let mut url = Url::parse(&format!("ws://{host}:{port}/connection"))?;
    url.query_pairs_mut().append_pair("access_token", token);
    Ok(url)
}

/// Perform the WebSocket handshake, bounded by `timeout`.
///
/// The URL carries the access token, so only its host is logged.
pub async fn connect(url: &Url, timeout: Duration) -> Result<HubStream, Error> {
    tracing::info!(host = url.host_str().unwrap_or(""), "Connecting to WebSocket");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let request = ClientRequestBuilder::new(uri).with_sub_protocol(SUB_PROTOCOL);

    let (ws_stream, _response) =
        tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: timeout.as_secs(),
            })?
            .map_err(handshake_error)?;

    tracing::info!("WebSocket connected");
    Ok(ws_stream)
}

/// A 401/403 on the upgrade means the hub no longer accepts the token.
fn handshake_error(err: tungstenite::Error) -> Error {
    match err {
        tungstenite::Error::Http(response)
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            Error::Authentication {
                message: format!("push channel refused the access token (HTTP {})", response.status()),
            }
        }
        other => Error::WebSocketConnect(other.to_string()),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn connection_url_carries_token() {
        let url = connection_url("192.168.1.20", 7681, "abc123").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://192.168.1.20:7681/connection?access_token=abc123"
        );
    }

    #[test]
    fn connection_url_rejects_bad_host() {
        assert!(matches!(
            connection_url("not a host", 7681, "t"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn rejected_upgrade_is_an_auth_failure() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            stream
                .write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let url = connection_url("127.0.0.1", port, "stale").unwrap();
        let err = connect(&url, Duration::from_secs(2)).await.err().unwrap();
        assert!(err.is_auth_failure(), "got {err:?}");
    }

    #[tokio::test]
    async fn connect_reports_refused_connection() {
        // Port 9 (discard) is closed on test machines.
        let url = connection_url("127.0.0.1", 9, "t").unwrap();
        let result = connect(&url, Duration::from_secs(2)).await;
        assert!(
            matches!(result, Err(Error::WebSocketConnect(_) | Error::Timeout { .. })),
            "expected connection failure, got {:?}",
            result.map(|_| ())
        );
    }
}
