// Constants module - centralized default values for configuration
//
// Defaults used when the YAML configuration omits a value.

// =============================================================================
// Settings defaults
// =============================================================================

/// Default route template for delivery URLs
pub const DEFAULT_ROUTE: &str = "/media/image/{format}/{id}/{file}";

/// Default validity window of a signed URL in seconds
pub const DEFAULT_VALID_FOR_SECS: u64 = 3600;

/// Default memory limit handed to the generator
pub const DEFAULT_MEMORY_LIMIT: &str = "512M";

/// Default upper bound for a single generator run in seconds
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Format defaults
// =============================================================================

/// Format used when no configured format is flagged `default`
pub const FALLBACK_FORMAT_NAME: &str = "thumb";

// =============================================================================
// Suffix defaults
// =============================================================================

pub const DEFAULT_RETINA_FORMAT_SUFFIX: &str = "-retina";
pub const DEFAULT_RETINA_FILE_SUFFIX: &str = "_retina";

pub const DEFAULT_BLURRED_FORMAT_SUFFIX: &str = "-blurred";
pub const DEFAULT_BLURRED_FILE_SUFFIX: &str = "_blurred";

pub const DEFAULT_WATERMARKED_FORMAT_SUFFIX: &str = "-watermarked";
pub const DEFAULT_WATERMARKED_FILE_SUFFIX: &str = "_watermarked";

// =============================================================================
// Query parameters
// =============================================================================

/// Signature query parameter
pub const QUERY_SIGNATURE: &str = "sig";

/// Issued-at timestamp query parameter
pub const QUERY_ISSUED_AT: &str = "ts";

/// Validity window query parameter
pub const QUERY_VALID_FOR: &str = "sec";

/// Client id query parameter
pub const QUERY_CLIENT: &str = "client";

/// Query parameters a restricted format requires, in check order
pub const REQUIRED_QUERY_PARAMS: [&str; 4] =
    [QUERY_ISSUED_AT, QUERY_VALID_FOR, QUERY_CLIENT, QUERY_SIGNATURE];
