//! Nextcloud backend
//!
//! Serves the data folder from a Nextcloud instance over WebDAV. Files end up
//! below `<nextcloudUrl>/remote.php/dav/files/<userName>/<folderName>/`.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use object_store::http::HttpBuilder;
use object_store::{ClientOptions, ObjectStore};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;

use super::{with_prefix, BackendError, CustomBackend, StorageBackend};
use crate::resolver::ResolvedOptions;

const USER_NAME: &str = "userName";
const PASSWORD: &str = "password";
const NEXTCLOUD_URL: &str = "nextcloudUrl";
const FOLDER_NAME: &str = "folderName";

/// WebDAV folder on a Nextcloud server
#[derive(Clone)]
pub struct Nextcloud {
    user_name: String,
    password: String,
    nextcloud_url: String,
    folder_name: String,
    /// Resolved WebDAV folder URL, present only when configured
    webdav_root: Option<Url>,
}

impl Nextcloud {
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn nextcloud_url(&self) -> &str {
        &self.nextcloud_url
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    fn unconfigured() -> Self {
        Self {
            user_name: String::new(),
            password: String::new(),
            nextcloud_url: String::new(),
            folder_name: String::new(),
            webdav_root: None,
        }
    }

    fn authorization(&self) -> Result<HeaderValue, BackendError> {
        let credentials = STANDARD.encode(format!("{}:{}", self.user_name, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {}", credentials))
            .map_err(|e| BackendError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Build `<base>/remote.php/dav/files/<user>/<folder>/` with each segment
/// percent-encoded.
fn webdav_root(base: &str, user_name: &str, folder_name: &str) -> Result<Url, BackendError> {
    let invalid = |reason: &str| BackendError::InvalidUrl {
        url: base.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(base).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL"))?;
        segments
            .pop_if_empty()
            .extend(["remote.php", "dav", "files", user_name])
            .extend(folder_name.split('/').filter(|part| !part.is_empty()))
            .push("");
    }

    Ok(url)
}

impl CustomBackend for Nextcloud {
    const NAME: &'static str = "Nextcloud";

    const REQUIRED_OPTIONS: &'static [&'static str] =
        &[USER_NAME, PASSWORD, NEXTCLOUD_URL, FOLDER_NAME];

    fn from_options(options: &ResolvedOptions) -> Self {
        if Self::REQUIRED_OPTIONS
            .iter()
            .any(|key| !options.contains(key))
        {
            return Self::unconfigured();
        }

        let mut backend = Self {
            user_name: options.value(USER_NAME).to_string(),
            password: options.value(PASSWORD).to_string(),
            nextcloud_url: options.value(NEXTCLOUD_URL).to_string(),
            folder_name: options.value(FOLDER_NAME).to_string(),
            webdav_root: None,
        };

        match webdav_root(&backend.nextcloud_url, &backend.user_name, &backend.folder_name) {
            Ok(root) => backend.webdav_root = Some(root),
            Err(e) => log::warn!("{} backend rejected its configuration: {}", Self::NAME, e),
        }

        backend
    }
}

impl StorageBackend for Nextcloud {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_configured(&self) -> bool {
        self.webdav_root.is_some()
    }

    fn data(&self, path_prefix: &str) -> Result<Arc<dyn ObjectStore>, BackendError> {
        let root = self
            .webdav_root
            .as_ref()
            .ok_or_else(|| BackendError::NotConfigured(Self::NAME.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization()?);

        let client_options = ClientOptions::new()
            .with_allow_http(root.scheme() == "http")
            .with_default_headers(headers);

        let store = HttpBuilder::new()
            .with_url(root.as_str())
            .with_client_options(client_options)
            .build()?;

        Ok(with_prefix(store, path_prefix))
    }

    fn data_name(&self) -> String {
        self.webdav_root
            .as_ref()
            .map(|root| root.to_string())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Nextcloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nextcloud")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("nextcloud_url", &self.nextcloud_url)
            .field("folder_name", &self.folder_name)
            .field("configured", &self.is_configured())
            .finish()
    }
}
