//! Active backend selection
//!
//! Exactly one registered custom backend may be active. With none, or with
//! more than one registered, the local default is used; a second selection
//! signal (such as an "active backend" setting) is deliberately not read.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backend::{LocalBackend, StorageBackend};
use crate::config::ConfigStore;
use crate::registry::BackendRegistry;
use crate::resolver::{ConfigWarning, OptionResolver, Resolution};

/// Why the default backend was chosen
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum FallbackReason {
    /// No custom backend is registered
    NoCandidates,

    /// More than one custom backend is registered
    Ambiguous { candidates: Vec<String> },

    /// The config holds no options for the candidate
    NotConfigured { backend: String },

    /// The config lacks a required option of the candidate
    Incomplete { backend: String, option: String },

    /// The candidate rejected its options during construction
    Rejected { backend: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoCandidates => write!(f, "no custom backend registered"),
            FallbackReason::Ambiguous { candidates } => {
                write!(f, "multiple custom backends registered: {}", candidates.join(", "))
            }
            FallbackReason::NotConfigured { backend } => {
                write!(f, "no configuration for backend {}", backend)
            }
            FallbackReason::Incomplete { backend, option } => {
                write!(f, "backend {} is missing option {}", backend, option)
            }
            FallbackReason::Rejected { backend } => {
                write!(f, "backend {} rejected its configuration", backend)
            }
        }
    }
}

/// How the active backend was chosen
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SelectionOutcome {
    Custom { backend: String },
    Default { fallback: FallbackReason },
}

/// The selected backend together with what happened while choosing it
#[derive(Debug)]
pub struct BackendSelection {
    backend: Box<dyn StorageBackend>,
    outcome: SelectionOutcome,
    warnings: Vec<ConfigWarning>,
}

impl BackendSelection {
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    /// Hand the backend over to the host
    pub fn into_backend(self) -> Box<dyn StorageBackend> {
        self.backend
    }

    pub fn outcome(&self) -> &SelectionOutcome {
        &self.outcome
    }

    /// User-facing warnings raised during selection
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn is_default(&self) -> bool {
        matches!(self.outcome, SelectionOutcome::Default { .. })
    }
}

/// Chooses the active backend from a registry and a config store
pub struct BackendSelector<'a> {
    registry: &'a BackendRegistry,
    config: &'a ConfigStore,
    default_data_dir: PathBuf,
}

impl<'a> BackendSelector<'a> {
    pub fn new<P: AsRef<Path>>(
        registry: &'a BackendRegistry,
        config: &'a ConfigStore,
        default_data_dir: P,
    ) -> Self {
        Self {
            registry,
            config,
            default_data_dir: default_data_dir.as_ref().to_path_buf(),
        }
    }

    /// The local backend used whenever no custom backend is selected
    pub fn default_backend(&self) -> LocalBackend {
        LocalBackend::new(&self.default_data_dir)
    }

    /// Select the backend the host should use. Never fails.
    pub fn select_active_backend(&self) -> BackendSelection {
        let mut warnings = Vec::new();

        let candidates = self.registry.discover_backends();
        let descriptor = match candidates {
            [] => return self.fall_back(FallbackReason::NoCandidates, warnings),
            [single] => single,
            many => {
                let candidates = many.iter().map(|d| d.display_name.to_string()).collect();
                return self.fall_back(FallbackReason::Ambiguous { candidates }, warnings);
            }
        };
        let name = descriptor.display_name;

        let options = match OptionResolver::new(self.registry, self.config).resolve(name) {
            Resolution::Configured(options) => options,
            Resolution::Incomplete(warning) => {
                log::warn!("{}", warning);
                let reason = FallbackReason::Incomplete {
                    backend: warning.backend.clone(),
                    option: warning.option.clone(),
                };
                warnings.push(warning);
                return self.fall_back(reason, warnings);
            }
            Resolution::NotConfigured | Resolution::UnknownBackend => {
                let reason = FallbackReason::NotConfigured {
                    backend: name.to_string(),
                };
                return self.fall_back(reason, warnings);
            }
        };

        let backend = descriptor.instantiate(&options);
        if !backend.is_configured() {
            let reason = FallbackReason::Rejected {
                backend: name.to_string(),
            };
            return self.fall_back(reason, warnings);
        }

        log::info!("Using {} storage backend: {}", name, backend.data_name());
        BackendSelection {
            backend,
            outcome: SelectionOutcome::Custom {
                backend: name.to_string(),
            },
            warnings,
        }
    }

    fn fall_back(&self, fallback: FallbackReason, warnings: Vec<ConfigWarning>) -> BackendSelection {
        let backend = self.default_backend();
        log::info!(
            "Using default storage backend {} ({})",
            backend.data_name(),
            fallback
        );
        BackendSelection {
            backend: Box::new(backend),
            outcome: SelectionOutcome::Default { fallback },
            warnings,
        }
    }
}

/// Load the settings file and select from the built-in backends.
///
/// An unreadable settings file counts as an empty one.
pub fn select_from_file<P: AsRef<Path>, Q: AsRef<Path>>(
    config_path: P,
    data_dir: Q,
) -> BackendSelection {
    let config = ConfigStore::load_or_empty(config_path.as_ref());
    let registry = BackendRegistry::builtin();
    BackendSelector::new(&registry, &config, data_dir).select_active_backend()
}
