// Domain error types - every fault resolves into a short caller-safe message

use thiserror::Error;

/// Main error type for all three roles
#[derive(Error, Debug)]
pub enum RelayError {
    /// Caller supplied something we refuse to coerce (HTTP 400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection-level failure talking to another role (HTTP 502)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A downstream hop exceeded its bounded timeout (HTTP 504)
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Peer answered, but not with something we can decode (HTTP 502)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The tool-invocation decider failed (HTTP 502)
    #[error("Decider error: {0}")]
    Decider(String),

    /// Blob persistence failed (HTTP 500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl RelayError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::InvalidInput(_) => 400,
            RelayError::Transport(_) => 502,
            RelayError::Timeout(_) => 504,
            RelayError::Protocol(_) => 502,
            RelayError::Decider(_) => 502,
            RelayError::Storage(_) => 500,
            RelayError::ConfigurationError(_) => 500,
        }
    }

    /// Get user-friendly error message (no transport or parse detail)
    pub fn user_message(&self) -> String {
        match self {
            RelayError::InvalidInput(reason) => format!("Invalid input: {}", reason),
            RelayError::Transport(_) => "The file service is unreachable right now".to_string(),
            RelayError::Timeout(_) => "The file service did not answer in time".to_string(),
            RelayError::Protocol(_) => "The file service sent an unexpected reply".to_string(),
            RelayError::Decider(_) => "The assistant is unavailable right now".to_string(),
            RelayError::Storage(_) => "Internal error".to_string(),
            RelayError::ConfigurationError(_) => "Internal error".to_string(),
        }
    }

    /// Map a reqwest failure onto the transport taxonomy
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            RelayError::Timeout(format!("Request timeout after {}s", timeout_secs))
        } else if err.is_connect() {
            RelayError::Transport(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            RelayError::Protocol(format!("Failed to decode response: {}", err))
        } else {
            RelayError::Transport(format!("HTTP request failed: {}", err))
        }
    }
}
