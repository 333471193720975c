//! Storage backends
//!
//! A backend turns configuration into filesystem handles. The handles
//! themselves come from `object_store`; this module only decides which store
//! to build and whether to root it under a sub-folder.

pub mod local;
pub mod nextcloud;

use std::sync::Arc;

use object_store::path::Path as StorePath;
use object_store::prefix::PrefixStore;
use object_store::ObjectStore;
use thiserror::Error;

use crate::resolver::ResolvedOptions;

pub use local::LocalBackend;
pub use nextcloud::Nextcloud;

/// Error types for building filesystem handles
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend {0} is not configured")]
    NotConfigured(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    Store(#[from] object_store::Error),
}

/// A storage backend instance handed to the host.
///
/// Covers the data folder only. The host's install root and code tree stay
/// on local disk whichever backend is selected.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Display name of the backend
    fn name(&self) -> &str;

    /// Whether construction found a complete, valid configuration
    fn is_configured(&self) -> bool;

    /// Create a filesystem handle for the data folder.
    ///
    /// A non-empty `path_prefix` roots every path of the handle under that
    /// sub-folder.
    fn data(&self, path_prefix: &str) -> Result<Arc<dyn ObjectStore>, BackendError>;

    /// Describe the data folder, e.g. its directory or remote URL
    fn data_name(&self) -> String;
}

/// A backend that can be registered and built from resolved options.
///
/// Name and required options are available without an instance, so the
/// registry can describe a backend before any configuration is read.
pub trait CustomBackend: StorageBackend + Sized + 'static {
    /// Unique display name, also the prefix of its config keys
    const NAME: &'static str;

    /// Option keys (without the name prefix) that must all be configured
    const REQUIRED_OPTIONS: &'static [&'static str];

    /// Build an instance. Never fails; incomplete or invalid options leave
    /// the instance with `is_configured() == false`.
    fn from_options(options: &ResolvedOptions) -> Self;
}

/// Wrap `store` so that all paths live under `prefix`.
///
/// Leading and trailing slashes are ignored; an empty prefix returns the
/// store unchanged.
pub fn with_prefix<T: ObjectStore>(store: T, prefix: &str) -> Arc<dyn ObjectStore> {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Arc::new(store)
    } else {
        Arc::new(PrefixStore::new(store, StorePath::from(prefix)))
    }
}
