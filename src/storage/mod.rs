//! Backing store for originals, fallbacks and generated variants
//!
//! The delivery layer only asks whether files exist, prepares cache
//! directories and removes stale variants; reading and writing bytes is
//! left to the generator and the file server.

pub mod backend;
pub mod error;
pub mod tokio_backend;

pub use backend::AssetBackend;
pub use error::StorageError;
pub use tokio_backend::TokioFsBackend;
