//! Security Validation Module
//!
//! Rejects inbound file parameters that could escape the originals folder.
//! The dispatcher turns a rejection into a 412 fallback.

/// Security validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Path traversal attempt detected
    PathTraversal { path: String },
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::PathTraversal { path } => {
                write!(f, "Path traversal attempt detected: {}", path)
            }
        }
    }
}

impl std::error::Error for SecurityError {}

/// Check for path traversal attempts
///
/// Detects patterns like:
/// - `..` as a path component (either separator style)
/// - %2e%2e (URL-encoded `..`, any case)
/// - NUL bytes (path truncation)
pub fn check_path_traversal(path: &str) -> Result<(), SecurityError> {
    let path_lower = path.to_lowercase();

    let has_parent_component = path_lower
        .split(['/', '\\'])
        .any(|component| component == "..");

    if has_parent_component
        || path_lower.contains("%2e%2e")
        || path_lower.contains("%2e.")
        || path_lower.contains(".%2e")
        || path.contains('\0')
    {
        return Err(SecurityError::PathTraversal {
            path: path.to_string(),
        });
    }

    Ok(())
}
