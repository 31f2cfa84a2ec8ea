// homee-api: Async transport for the homee hub (token endpoint + push channel)

pub mod auth;
pub mod error;
pub mod websocket;

pub use auth::{AccessToken, TokenClient};
pub use error::Error;
pub use websocket::HubStream;

/// Port the hub serves both HTTP and WebSocket traffic on.
pub const DEFAULT_PORT: u16 = 7681;

/// HTTP base URL of a hub, e.g. `http://192.168.1.20:7681/`.
pub fn base_url(host: &str, port: u16) -> Result<url::Url, Error> {
    Ok(url::Url::parse(&format!("http://{host}:{port}/"))?)
}
