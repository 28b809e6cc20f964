// Kagami media delivery library
//
// Signed, time-limited URLs for image variants, and the dispatcher that
// verifies them and serves the generated variant or a fallback.

pub mod cache;
pub mod coalescing;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod paths;
pub mod resource;
pub mod router;
pub mod security;
pub mod signing;
pub mod storage;
pub mod url;

#[cfg(test)]
mod test_support;

pub use config::DeliveryConfig;
pub use dispatch::{Delivery, DispatchRequest, Dispatcher, FileServer};
pub use error::DeliveryError;
pub use format::{FormatKey, FormatResolver};
pub use url::{UrlBuilder, UrlOptions};
