//! Error handling for the watchd client

use std::fmt;
use thiserror::Error;

/// Unified error type for the watchd client
#[derive(Error, Debug)]
pub enum Error {
    /// The request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The backend answered 401; the session is no longer valid
    #[error("Session expired. Please log in again.")]
    Unauthorized,

    /// Non-2xx response carrying the backend's message
    #[error("{message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Message from the error body, or a generic fallback
        message: String,
    },

    /// The response body did not match the expected schema
    #[error("Data error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The operation was superseded or interrupted
    #[error("Request cancelled")]
    Cancelled,

    /// Rejected locally before any request was made
    #[error("{0}")]
    Validation(String),

    /// A swipe was requested with no movie left in the feed
    #[error("No movie left to swipe")]
    EmptyQueue,

    /// Credential store failure
    #[error("Credential store error: {0}")]
    Store(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Realtime connection failure
    #[error("Realtime error: {0}")]
    Realtime(#[from] watchd_realtime::RealtimeError),
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new credential store error
    pub fn store<T: fmt::Display>(msg: T) -> Self {
        Error::Store(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether this failure should be swallowed instead of shown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether this failure ends the current session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }

    /// Text suitable for an alert or inline message.
    pub fn user_message(&self) -> String {
        match self {
            Error::Network(e) if e.is_timeout() => "The request timed out.".to_string(),
            Error::Network(e) if e.is_connect() => "Could not reach the server.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type used throughout the client
pub type Result<T> = std::result::Result<T, Error>;
