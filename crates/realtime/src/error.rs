use thiserror::Error;

/// Errors raised by the realtime transport.
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

impl RealtimeError {
    pub fn protocol<T: std::fmt::Display>(msg: T) -> Self {
        Self::Protocol(msg.to_string())
    }

    pub fn connection<T: std::fmt::Display>(msg: T) -> Self {
        Self::Connection(msg.to_string())
    }
}
