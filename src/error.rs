//! Delivery error types
//!
//! One taxonomy for URL minting and request dispatch, with HTTP status
//! mapping in the same spirit as the rest of the crate.

use thiserror::Error;

use crate::generator::GeneratorError;
use crate::storage::StorageError;

/// Errors raised while minting URLs or dispatching delivery requests
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Client id has no configured secret (or no default client exists)
    #[error("Client \"{0}\" not found")]
    UnknownClient(String),

    /// Base format is not part of the format configuration
    #[error("Format \"{0}\" not found")]
    UnknownFormat(String),

    /// Missing or malformed inbound parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bad signature, expired window or unknown client on a restricted format
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Original asset is missing on the backing store
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// The configured fallback image itself is missing
    #[error("Fallback asset for status {status} is missing: {path}")]
    FallbackMissing { status: u16, path: String },

    /// External generator reported a failure
    #[error("Variant generation failed: {0}")]
    GenerationFailed(#[from] GeneratorError),

    /// External generator did not finish within the configured bound
    #[error("Variant generation timed out after {timeout_ms}ms")]
    GenerationTimeout { timeout_ms: u64 },

    /// Filesystem/backing store error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration problem detected at runtime
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeliveryError {
    /// Maps delivery errors to HTTP status codes
    ///
    /// - InvalidRequest → 412
    /// - AccessDenied → 403
    /// - AssetNotFound → 404
    /// - GenerationTimeout → 504
    /// - everything else → 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            DeliveryError::InvalidRequest(_) => 412,
            DeliveryError::AccessDenied(_) => 403,
            DeliveryError::AssetNotFound(_) => 404,
            DeliveryError::GenerationTimeout { .. } => 504,
            DeliveryError::UnknownClient(_)
            | DeliveryError::UnknownFormat(_)
            | DeliveryError::FallbackMissing { .. }
            | DeliveryError::GenerationFailed(_)
            | DeliveryError::Storage(_)
            | DeliveryError::Config(_) => 500,
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        DeliveryError::InvalidRequest(reason.into())
    }

    pub fn access_denied(reason: impl Into<String>) -> Self {
        DeliveryError::AccessDenied(reason.into())
    }
}
