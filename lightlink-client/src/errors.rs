// src/errors.rs

//! Error types for embedded client operations.
//!
//! Every failure the client library can report to its host: node
//! construction, lifecycle transitions, keystore setup and new-head
//! registration.

use std::io;
use thiserror::Error;

/// Main error type for embedded client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Genesis specification could not be parsed
    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    /// Configuration rejected by the node
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Node is already running
    #[error("Node already running")]
    AlreadyRunning,

    /// Node is not running
    #[error("Node not running")]
    NotRunning,

    /// Keystore error
    #[error("Keystore error: {0}")]
    KeystoreError(String),

    /// Header encoding failed
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Subscription registration failed
    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    /// No async runtime available for node services
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::EncodingError(format!("JSON error: {}", err))
    }
}

/// Result type alias for embedded client operations
pub type Result<T> = std::result::Result<T, ClientError>;
