//! Local filesystem backend
//!
//! The always-available default. It needs no configuration and serves the
//! host's data directory from local disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;

use super::{with_prefix, BackendError, StorageBackend};

/// A storage backend that uses the local file system
#[derive(Clone, Debug)]
pub struct LocalBackend {
    /// Directory holding the host's data files
    data_dir: PathBuf,
}

impl LocalBackend {
    pub const NAME: &'static str = "Local";

    /// Create a new local backend rooted at `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn data(&self, path_prefix: &str) -> Result<Arc<dyn ObjectStore>, BackendError> {
        // LocalFileSystem::new_with_prefix canonicalizes, so the directory must exist
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
        }

        let store = LocalFileSystem::new_with_prefix(&self.data_dir)?;
        Ok(with_prefix(store, path_prefix))
    }

    fn data_name(&self) -> String {
        let dir = self.data_dir.to_string_lossy();
        if dir.ends_with(std::path::MAIN_SEPARATOR) {
            dir.into_owned()
        } else {
            format!("{}{}", dir, std::path::MAIN_SEPARATOR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::path::Path as StorePath;
    use object_store::PutPayload;

    #[test]
    fn test_creates_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let backend = LocalBackend::new(&data_dir);

        assert!(backend.is_configured());
        assert!(backend.data("").is_ok());
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_data_name_has_trailing_separator() {
        let backend = LocalBackend::new("data");
        assert_eq!(
            backend.data_name(),
            format!("data{}", std::path::MAIN_SEPARATOR)
        );
    }

    #[tokio::test]
    async fn test_prefixed_writes_land_in_sub_folder() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());

        let store = backend.data("media").unwrap();
        store
            .put(&StorePath::from("photo.jpg"), PutPayload::from_static(b"jpeg"))
            .await
            .unwrap();

        let on_disk = std::fs::read(dir.path().join("media").join("photo.jpg")).unwrap();
        assert_eq!(on_disk, b"jpeg");
    }
}
