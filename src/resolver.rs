//! Option resolution
//!
//! Settings for a backend live in the flat config as `<Name>_<option>`. The
//! resolver collects them for one backend, strips the prefix, and checks that
//! every required option is present.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::ConfigStore;
use crate::registry::BackendRegistry;

/// Separator between backend name and option name in config keys
pub const OPTION_SEPARATOR: char = '_';

/// Config key prefix for a backend, e.g. `Nextcloud_`
pub fn option_prefix(backend_name: &str) -> String {
    format!("{}{}", backend_name, OPTION_SEPARATOR)
}

/// Prefix-stripped configuration values for one backend
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedOptions {
    values: BTreeMap<String, String>,
}

impl ResolvedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key`, or an empty string when it is not set
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResolvedOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn is_secret(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["password", "secret", "token"]
        .iter()
        .any(|marker| key.contains(marker))
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(k, v)| {
                let shown = if is_secret(k) { "<redacted>" } else { v.as_str() };
                (k, shown)
            }))
            .finish()
    }
}

/// A backend is mentioned in the config but lacks a required option
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    /// Display name of the backend
    pub backend: String,
    /// Required option that is missing (without the name prefix)
    pub option: String,
    /// Settings file that should be checked
    pub config_path: Option<PathBuf>,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The configuration for the storage backend \"{}\" does not include data for the option \"{}\"",
            self.backend, self.option
        )?;
        if let Some(path) = &self.config_path {
            write!(f, ". Please check the configuration in {}", path.display())?;
        }
        Ok(())
    }
}

/// Result of resolving the options of one backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// All required options were found
    Configured(ResolvedOptions),

    /// No config key carries the backend's prefix
    NotConfigured,

    /// Some options were found but a required one is missing
    Incomplete(ConfigWarning),

    /// No registered backend has this name
    UnknownBackend,
}

impl Resolution {
    /// Resolved options, if the backend is fully configured
    pub fn into_options(self) -> Option<ResolvedOptions> {
        match self {
            Resolution::Configured(options) => Some(options),
            _ => None,
        }
    }
}

/// Resolves backend options from the config store
pub struct OptionResolver<'a> {
    registry: &'a BackendRegistry,
    config: &'a ConfigStore,
}

impl<'a> OptionResolver<'a> {
    pub fn new(registry: &'a BackendRegistry, config: &'a ConfigStore) -> Self {
        Self { registry, config }
    }

    /// Resolve the options of the backend named `backend_name`.
    ///
    /// Keys that carry the prefix but are not required are kept. Only the
    /// first missing required option (in declaration order) is reported.
    pub fn resolve(&self, backend_name: &str) -> Resolution {
        let descriptor = match self.registry.find(backend_name) {
            Some(descriptor) => descriptor,
            None => return Resolution::UnknownBackend,
        };

        let prefix = option_prefix(descriptor.display_name);
        let options: ResolvedOptions = self
            .config
            .with_prefix(&prefix)
            .map(|(key, value)| (&key[prefix.len()..], value))
            .collect();

        if options.is_empty() {
            return Resolution::NotConfigured;
        }

        if let Some(missing) = descriptor
            .required_options
            .iter()
            .find(|option| !options.contains(option))
        {
            return Resolution::Incomplete(ConfigWarning {
                backend: descriptor.display_name.to_string(),
                option: missing.to_string(),
                config_path: self.config.source().map(|p| p.to_path_buf()),
            });
        }

        Resolution::Configured(options)
    }

    /// Resolve options, logging a warning for incomplete configuration
    pub fn resolve_options(&self, backend_name: &str) -> Option<ResolvedOptions> {
        match self.resolve(backend_name) {
            Resolution::Incomplete(warning) => {
                log::warn!("{}", warning);
                None
            }
            resolution => resolution.into_options(),
        }
    }
}
