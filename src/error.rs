//! Error types for the etcd keys client

use std::fmt;
use std::io;

use serde::Deserialize;
use thiserror::Error;

/// Error code the store uses for a missing key.
pub const CODE_KEY_NOT_FOUND: u64 = 100;
/// Error code for a failed `prevValue`/`prevIndex` comparison.
pub const CODE_TEST_FAILED: u64 = 101;
/// Error code for a `prevExist=false` write on an existing key.
pub const CODE_NODE_EXIST: u64 = 105;

/// Error body reported by the store, e.g.
/// `{"errorCode":101,"message":"Compare failed","cause":"[a != b]","index":8}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreError {
    /// Numeric store error code
    pub error_code: u64,
    /// Human readable message
    pub message: String,
    /// What the store blames (usually the key or the failed comparison)
    #[serde(default)]
    pub cause: Option<String>,
    /// Store index at the time of the failure
    #[serde(default)]
    pub index: u64,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {}", self.message, self.error_code)?;
        if let Some(cause) = &self.cause {
            write!(f, ", cause {}", cause)?;
        }
        write!(f, ", index {})", self.index)
    }
}

/// Errors that can occur when talking to the store
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied arguments have an unsupported shape. Raised before any request is sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store reports that the key does not exist
    #[error("Key not found: {0}")]
    KeyNotFound(StoreError),

    /// A `prevValue`/`prevIndex` precondition did not hold
    #[error("Test failed: {0}")]
    TestFailed(StoreError),

    /// A `prevExist=false` precondition did not hold
    #[error("Node exists: {0}")]
    NodeExist(StoreError),

    /// Any other error reported by the store
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Authentication failed
    #[error("Unauthorized")]
    Unauthorized,

    /// Non-success status without a store error body
    #[error("Server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Response body, lossily decoded
        message: String,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TLS/SSL error
    #[error("TLS error: {0}")]
    Tls(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Classify a store error body by its code
    pub fn from_store(err: StoreError) -> Self {
        match err.error_code {
            CODE_KEY_NOT_FOUND => Error::KeyNotFound(err),
            CODE_TEST_FAILED => Error::TestFailed(err),
            CODE_NODE_EXIST => Error::NodeExist(err),
            _ => Error::Store(err),
        }
    }

    /// True when the store reported the key as absent
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound(_))
    }

    /// True when a `prevValue`, `prevIndex` or `prevExist=false` check failed on the store side.
    ///
    /// A failed `prevExist=true` is reported by the store as a missing key; see
    /// [`Error::is_key_not_found`].
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Error::TestFailed(_) | Error::NodeExist(_))
    }

    /// The store error body, if the store produced one
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Error::KeyNotFound(e) | Error::TestFailed(e) | Error::NodeExist(e) | Error::Store(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
