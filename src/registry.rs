//! Backend registry
//!
//! Backends are registered explicitly through their `CustomBackend`
//! implementation. Each backend module contributes a descriptor to
//! `BackendRegistry::builtin`; hosts can add their own with `register`.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;

use crate::backend::{CustomBackend, Nextcloud, StorageBackend};
use crate::resolver::ResolvedOptions;

/// Constructor stored in a descriptor
pub type BackendConstructor = fn(&ResolvedOptions) -> Box<dyn StorageBackend>;

/// Metadata about a backend type, available without an instance
#[derive(Clone, Copy)]
pub struct BackendDescriptor {
    /// Type path of the backend, e.g. `storage_switch::backend::nextcloud::Nextcloud`
    pub identifier: &'static str,
    pub type_id: TypeId,
    /// Unique display name, also the config key prefix
    pub display_name: &'static str,
    pub required_options: &'static [&'static str],
    pub constructor: BackendConstructor,
}

fn construct<B: CustomBackend>(options: &ResolvedOptions) -> Box<dyn StorageBackend> {
    Box::new(B::from_options(options))
}

impl BackendDescriptor {
    /// Describe the backend type `B`
    pub fn of<B: CustomBackend>() -> Self {
        Self {
            identifier: std::any::type_name::<B>(),
            type_id: TypeId::of::<B>(),
            display_name: B::NAME,
            required_options: B::REQUIRED_OPTIONS,
            constructor: construct::<B>,
        }
    }

    /// Short type name, without the module path
    pub fn type_name(&self) -> &'static str {
        self.identifier
            .rsplit("::")
            .next()
            .unwrap_or(self.identifier)
    }

    /// Build an instance from resolved options
    pub fn instantiate(&self, options: &ResolvedOptions) -> Box<dyn StorageBackend> {
        (self.constructor)(options)
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .field("required_options", &self.required_options)
            .finish()
    }
}

/// The set of custom backends that may be selected
#[derive(Clone, Debug, Default)]
pub struct BackendRegistry {
    descriptors: Vec<BackendDescriptor>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every backend shipped with this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register::<Nextcloud>();
        registry
    }

    /// Register backend type `B`. Returns whether it was accepted.
    pub fn register<B: CustomBackend>(&mut self) -> bool {
        self.register_descriptor(BackendDescriptor::of::<B>())
    }

    /// Register a descriptor.
    ///
    /// Descriptors with a blank display name, or whose type or display name
    /// is already registered, do not participate and are dropped.
    pub fn register_descriptor(&mut self, descriptor: BackendDescriptor) -> bool {
        if descriptor.display_name.trim().is_empty() {
            log::debug!("Ignoring backend {} with blank name", descriptor.identifier);
            return false;
        }

        if let Some(existing) = self.descriptors.iter().find(|d| {
            d.type_id == descriptor.type_id || d.display_name == descriptor.display_name
        }) {
            log::debug!(
                "Ignoring backend {} ({}): already registered as {} ({})",
                descriptor.identifier,
                descriptor.display_name,
                existing.identifier,
                existing.display_name
            );
            return false;
        }

        self.descriptors.push(descriptor);
        true
    }

    /// All registered descriptors, in registration order
    pub fn discover_backends(&self) -> &[BackendDescriptor] {
        &self.descriptors
    }

    /// Map of short type name to display name
    pub fn backend_names(&self) -> BTreeMap<&'static str, &'static str> {
        self.descriptors
            .iter()
            .map(|d| (d.type_name(), d.display_name))
            .collect()
    }

    /// Find the descriptor with the given display name
    pub fn find(&self, display_name: &str) -> Option<&BackendDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.display_name == display_name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use object_store::ObjectStore;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Blank;

    impl StorageBackend for Blank {
        fn name(&self) -> &str {
            Self::NAME
        }

        fn is_configured(&self) -> bool {
            false
        }

        fn data(&self, _path_prefix: &str) -> Result<Arc<dyn ObjectStore>, BackendError> {
            Err(BackendError::NotConfigured(Self::NAME.to_string()))
        }

        fn data_name(&self) -> String {
            String::new()
        }
    }

    impl CustomBackend for Blank {
        const NAME: &'static str = "  ";
        const REQUIRED_OPTIONS: &'static [&'static str] = &[];

        fn from_options(_options: &ResolvedOptions) -> Self {
            Blank
        }
    }

    #[test]
    fn test_builtin_has_nextcloud() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.len(), 1);

        let descriptor = registry.find("Nextcloud").unwrap();
        assert_eq!(
            descriptor.required_options,
            &["userName", "password", "nextcloudUrl", "folderName"]
        );
        assert_eq!(descriptor.type_name(), "Nextcloud");
    }

    #[test]
    fn test_backend_names() {
        let names = BackendRegistry::builtin().backend_names();
        assert_eq!(names.get("Nextcloud"), Some(&"Nextcloud"));
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let mut registry = BackendRegistry::builtin();
        assert!(!registry.register::<Nextcloud>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_name_is_ignored() {
        let mut registry = BackendRegistry::new();
        assert!(!registry.register::<Blank>());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discovery_is_repeatable() {
        let registry = BackendRegistry::builtin();
        let first: Vec<_> = registry.discover_backends().iter().map(|d| d.identifier).collect();
        let second: Vec<_> = registry.discover_backends().iter().map(|d| d.identifier).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_instantiate_uses_options() {
        let descriptor = BackendDescriptor::of::<Nextcloud>();
        let options: ResolvedOptions = [
            ("userName", "u"),
            ("password", "p"),
            ("nextcloudUrl", "https://x.org"),
            ("folderName", "wt"),
        ]
        .into_iter()
        .collect();

        let backend = descriptor.instantiate(&options);
        assert_eq!(backend.name(), "Nextcloud");
        assert!(backend.is_configured());
    }
}
