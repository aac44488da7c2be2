//! Error types for the Workers KV client

use std::io;
use thiserror::Error;

use crate::types::ApiMessage;

/// Errors that can occur when talking to the Workers KV API
#[derive(Error, Debug)]
pub enum Error {
    /// A bulk call was given more entries than the API accepts in one request.
    /// Raised before any request is sent.
    #[error("Too many entries for a bulk call: {actual} (limit {limit})")]
    LimitExceeded {
        /// Maximum number of entries per bulk call
        limit: usize,
        /// Number of entries that were passed
        actual: usize,
    },

    /// The service answered with a failure envelope
    #[error("Remote error: {}", join_messages(.errors))]
    Remote {
        /// HTTP status of the reply, when it was not a success status
        status: Option<u16>,
        /// Errors reported by the service
        errors: Vec<ApiMessage>,
    },

    /// The service answered with an unexpected HTTP status
    #[error("Unexpected status {status}: {body}")]
    Transport {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// TLS/SSL error
    #[error("TLS error: {0}")]
    Tls(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Rejected client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Builds a remote error from a single message, for envelopes that
    /// carry no structured `errors` list.
    pub(crate) fn remote_message(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Remote {
            status,
            errors: vec![ApiMessage {
                code: None,
                message: message.into(),
            }],
        }
    }

    /// Messages reported by the service, if this is a remote error
    pub fn messages(&self) -> Vec<&str> {
        match self {
            Error::Remote { errors, .. } => errors.iter().map(|e| e.message.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true if the error was raised locally, before any request was sent
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Error::LimitExceeded { .. }
                | Error::InvalidConfig(_)
                | Error::InvalidUrl(_)
                | Error::InvalidRequest(_)
        )
    }
}

fn join_messages(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "request was not successful".to_string();
    }
    errors
        .iter()
        .map(|e| match e.code {
            Some(code) => format!("[{}] {}", code, e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
