use std::fmt;

use crate::error::DeliveryError;

/// Why a request is answered with a fallback image
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    EmptyParam(&'static str),
    PathTraversal(String),
    UnknownFormat(String),
    MissingQuery(&'static str),
    MalformedQuery(&'static str),
    UnknownClient(String),
    BadSignature,
    Expired { expired_at: i64, now: i64 },
    OriginalMissing(String),
}

impl Rejection {
    pub(crate) fn status(&self) -> u16 {
        match self {
            Rejection::EmptyParam(_)
            | Rejection::PathTraversal(_)
            | Rejection::UnknownFormat(_)
            | Rejection::MissingQuery(_)
            | Rejection::MalformedQuery(_) => 412,
            Rejection::UnknownClient(_) | Rejection::BadSignature | Rejection::Expired { .. } => {
                403
            }
            Rejection::OriginalMissing(_) => 404,
        }
    }

    /// Metrics label
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Rejection::EmptyParam(_) => "empty_param",
            Rejection::PathTraversal(_) => "path_traversal",
            Rejection::UnknownFormat(_) => "unknown_format",
            Rejection::MissingQuery(_) => "missing_query",
            Rejection::MalformedQuery(_) => "malformed_query",
            Rejection::UnknownClient(_) => "unknown_client",
            Rejection::BadSignature => "bad_signature",
            Rejection::Expired { .. } => "expired",
            Rejection::OriginalMissing(_) => "original_missing",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyParam(name) => write!(f, "route parameter '{}' is empty", name),
            Rejection::PathTraversal(file) => write!(f, "path traversal in '{}'", file),
            Rejection::UnknownFormat(format) => write!(f, "format '{}' is not configured", format),
            Rejection::MissingQuery(key) => write!(f, "query parameter '{}' is missing", key),
            Rejection::MalformedQuery(key) => {
                write!(f, "query parameter '{}' is not an integer", key)
            }
            Rejection::UnknownClient(client) => write!(f, "client '{}' is not configured", client),
            Rejection::BadSignature => f.write_str("signature does not match"),
            Rejection::Expired { expired_at, now } => {
                write!(f, "URL expired at {} (now {})", expired_at, now)
            }
            Rejection::OriginalMissing(path) => write!(f, "original '{}' does not exist", path),
        }
    }
}

impl From<Rejection> for DeliveryError {
    fn from(rejection: Rejection) -> Self {
        match rejection.status() {
            412 => DeliveryError::invalid_request(rejection.to_string()),
            403 => DeliveryError::access_denied(rejection.to_string()),
            _ => DeliveryError::AssetNotFound(rejection.to_string()),
        }
    }
}
