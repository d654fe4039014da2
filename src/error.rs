//! Error types for the dashboard client.
//!
//! Every failure is handled by the view that issued the operation and shown
//! as a single plain message; nothing here is retried.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// Network or connection failure before a response arrived
    #[error("transport error: {0}")]
    Transport(String),

    /// The request deadline elapsed
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("malformed response body: {0}")]
    Decode(String),

    /// A push frame was not a JSON object
    #[error("malformed notification frame: {0}")]
    Frame(String),

    /// User input rejected before any request was made
    #[error("{0}")]
    Validation(String),

    #[error("not logged in")]
    Unauthenticated,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session storage error: {0}")]
    Session(String),

    #[error("channel error: {0}")]
    Channel(String),

    /// The owning view was unmounted while the operation was in flight
    #[error("operation cancelled")]
    Cancelled,
}

impl DashboardError {
    pub fn status(status: reqwest::StatusCode, body: String) -> Self {
        DashboardError::Status {
            status: status.as_u16(),
            body,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DashboardError::Status { status: 401, .. } | DashboardError::Unauthenticated)
    }

    /// Plain message suitable for showing next to a form or table
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Transport(_) | DashboardError::Timeout => {
                "Cannot reach the server.".to_string()
            }
            DashboardError::Status { status: 401, .. } | DashboardError::Unauthenticated => {
                "Not logged in.".to_string()
            }
            DashboardError::Status { status, .. } => format!("Server rejected the request ({}).", status),
            DashboardError::Decode(_) => "Unexpected response from the server.".to_string(),
            DashboardError::Frame(_) => "Failed to process notification.".to_string(),
            DashboardError::Validation(msg) => msg.clone(),
            DashboardError::Config(msg) => format!("Configuration error: {}", msg),
            DashboardError::Session(_) => "Could not store the session.".to_string(),
            DashboardError::Channel(_) => "WebSocket connection error.".to_string(),
            DashboardError::Cancelled => "Cancelled.".to_string(),
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DashboardError::Timeout
        } else if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DashboardError::status(status, err.to_string())
        } else {
            DashboardError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

impl From<sled::Error> for DashboardError {
    fn from(err: sled::Error) -> Self {
        DashboardError::Session(err.to_string())
    }
}

impl From<config::ConfigError> for DashboardError {
    fn from(err: config::ConfigError) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DashboardError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        DashboardError::Channel(err.to_string())
    }
}
