// Storage Switch - boot-time storage backend selection
//
// Settings are read from a flat key/value file. When exactly one custom
// backend is registered and fully configured there, it replaces the local
// default for the host's data folder.

pub mod backend;
pub mod config;
pub mod registry;
pub mod resolver;
pub mod selector;

pub use backend::{BackendError, CustomBackend, LocalBackend, Nextcloud, StorageBackend};
pub use config::{ConfigError, ConfigStore};
pub use registry::{BackendDescriptor, BackendRegistry};
pub use resolver::{ConfigWarning, OptionResolver, Resolution, ResolvedOptions};
pub use selector::{
    select_from_file, BackendSelection, BackendSelector, FallbackReason, SelectionOutcome,
};
