// src/errors.rs

//! Error types for bridge operations.
//!
//! Every operation a host can invoke rejects with exactly one
//! [`BridgeError`] variant. Failures inside the asynchronous header relay
//! never reach a caller; they are counted and logged instead.

use lightlink_client::ClientError;
use thiserror::Error;

/// Shape error in configure input
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Input was not a key/value mapping
    #[error("configuration must be an object, got {0}")]
    NotAnObject(&'static str),

    /// Option present with the wrong type
    #[error("option `{option}` must be {expected}, got {found}")]
    InvalidType {
        /// Option name
        option: &'static str,
        /// Expected shape
        expected: &'static str,
        /// JSON type received
        found: &'static str,
    },

    /// Option present with an unusable value
    #[error("option `{option}` is invalid: {reason}")]
    InvalidValue {
        /// Option name
        option: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Static peers file could not be written
    #[error("failed to write static peers file: {0}")]
    StaticNodes(#[from] std::io::Error),
}

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configure input was malformed
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Node factory rejected the configuration
    #[error("node creation error: {0}")]
    NodeCreation(ClientError),

    /// Node failed to start
    #[error("start error: {0}")]
    Start(ClientError),

    /// Node failed to stop
    #[error("stop error: {0}")]
    Stop(ClientError),

    /// New-head registration failed
    #[error("subscription error: {0}")]
    Subscription(ClientError),
}

impl BridgeError {
    /// Stable rejection code reported to the host
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Configuration(_) => "E_CONFIGURATION",
            BridgeError::NodeCreation(_) => "E_NODE_CREATION",
            BridgeError::Start(_) => "E_START",
            BridgeError::Stop(_) => "E_STOP",
            BridgeError::Subscription(_) => "E_SUBSCRIPTION",
        }
    }
}

/// Header notification that could not become a record
#[derive(Debug, Error)]
pub enum RecordError {
    /// Client failed to encode the header
    #[error("header encoding failed: {0}")]
    Encode(#[from] ClientError),

    /// Encoding was not valid JSON
    #[error("header JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    /// Encoding was valid JSON but not an object
    #[error("header JSON is {0}, not an object")]
    NotAnObject(&'static str),
}

/// Service settings error
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// No home directory to derive the data root from
    #[error("cannot find home directory")]
    NoHomeDirectory,
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
