//! Flat key/value settings for backend selection
//!
//! The settings file is the host's INI config, read the way PHP's
//! `parse_ini_file` reads it without sections:
//! - `key = value`, with the value unquoted, `"double"` or `'single'` quoted
//! - `;` starts a comment, on its own line or after a value
//! - `[section]` headers group keys but do not namespace them
//! - a repeated key keeps its last value
//!
//! The usual `; <?php exit; ?>` guard line at the top of a `config.ini.php`
//! is an ordinary comment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error types for loading the settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only flat mapping of setting keys to string values.
///
/// Owned by the host bootstrap. To pick up edits, load a new store and run
/// selection again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigStore {
    entries: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from in-memory entries
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            source: None,
        }
    }

    /// Parse settings text. Lines that are not `key = value`, a section
    /// header or a comment are skipped with a warning.
    pub fn parse(contents: &str) -> Self {
        Self {
            entries: parse_flat(contents),
            source: None,
        }
    }

    /// Load the settings file at `path`.
    ///
    /// A missing file is not an error and yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config file at {}, using empty config", path.display());
            return Ok(Self {
                entries: BTreeMap::new(),
                source: Some(path.to_path_buf()),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            entries: parse_flat(&contents),
            source: Some(path.to_path_buf()),
        })
    }

    /// Load the settings file, treating a read failure as an empty config
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                log::warn!("{}; continuing with empty config", e);
                Self {
                    entries: BTreeMap::new(),
                    source: Some(path.to_path_buf()),
                }
            }
        }
    }

    /// Look up a single key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key`, or an empty string when it is not set
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// All entries, ordered by key
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose key starts with `prefix` (case-sensitive)
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries()
            .filter(move |(key, _)| key.starts_with(prefix))
    }

    /// File this store was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_flat(contents: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::warn!("Skipping config line {}: expected key = value", index + 1);
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            log::warn!("Skipping config line {}: empty key", index + 1);
            continue;
        }

        entries.insert(key.to_string(), parse_value(value));
    }

    entries
}

/// Parse the right-hand side of `key = value`.
///
/// Double quotes allow `\"` inside; every other backslash is literal.
/// Single quotes are fully literal. Text following a closing quote, up to a
/// `;` comment, is appended. Unquoted values end at `;` and map the INI
/// keywords `true`/`on`/`yes` to `"1"` and `false`/`off`/`no`/`none`/`null`
/// to `""`.
fn parse_value(raw: &str) -> String {
    let raw = raw.trim();

    let quote = match raw.chars().next() {
        Some(c @ ('"' | '\'')) => c,
        _ => return unquoted(raw),
    };

    let mut value = String::new();
    let mut chars = raw[1..].char_indices();
    let mut rest = "";
    while let Some((i, c)) = chars.next() {
        if c == quote {
            rest = &raw[1 + i + 1..];
            break;
        }
        if quote == '"' && c == '\\' && raw[1 + i + 1..].starts_with('"') {
            value.push('"');
            chars.next();
            continue;
        }
        value.push(c);
    }

    let trailing = strip_comment(rest).trim();
    value.push_str(trailing);
    value
}

fn unquoted(raw: &str) -> String {
    let value = strip_comment(raw).trim();
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => "1".to_string(),
        "false" | "off" | "no" | "none" | "null" => String::new(),
        _ => value.to_string(),
    }
}

fn strip_comment(text: &str) -> &str {
    match text.find(';') {
        Some(pos) => &text[..pos],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.ini.php");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.ini.php");

        let store = ConfigStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.source(), Some(path.as_path()));
    }

    #[test]
    fn test_load_ini_style_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "; <?php return; ?> DO NOT DELETE THIS LINE\n\
             dbtype=\"mysql\"\n\
             dbport=3306\n\
             Nextcloud_userName=\"alice\"\n\
             Nextcloud_nextcloudUrl=\"https://cloud.example.org\"\n",
        );

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.get("dbtype"), Some("mysql"));
        assert_eq!(store.get("dbport"), Some("3306"));
        assert_eq!(store.get("Nextcloud_userName"), Some("alice"));
    }

    #[test]
    fn test_sections_are_flattened() {
        let store = ConfigStore::parse(
            "top = \"1\"\n\n[storage]\nNextcloud_folderName = \"wt\"\nenabled = true\n",
        );

        assert_eq!(store.get("top"), Some("1"));
        assert_eq!(store.get("Nextcloud_folderName"), Some("wt"));
        assert_eq!(store.get("enabled"), Some("1"));
        assert_eq!(store.get("storage"), None);
    }

    #[test]
    fn test_unquoted_value() {
        let store = ConfigStore::parse("dbhost=localhost\nNextcloud_nextcloudUrl = https://x.org/\n");

        assert_eq!(store.get("dbhost"), Some("localhost"));
        assert_eq!(store.get("Nextcloud_nextcloudUrl"), Some("https://x.org/"));
    }

    #[test]
    fn test_trailing_comment() {
        let store = ConfigStore::parse(
            "dbport=\"3306\" ; default port\ndbhost = localhost ; local only\nsecret=\"a;b\"\n",
        );

        assert_eq!(store.get("dbport"), Some("3306"));
        assert_eq!(store.get("dbhost"), Some("localhost"));
        assert_eq!(store.get("secret"), Some("a;b"));
    }

    #[test]
    fn test_repeated_key_keeps_last_value() {
        let store = ConfigStore::parse("dbhost=first\ndbuser=\"u\"\ndbhost=\"second\"\n");

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("dbhost"), Some("second"));
    }

    #[test]
    fn test_backslash_is_literal() {
        let store = ConfigStore::parse(
            "dbpass=\"pa\\ss\"\nquoted=\"say \\\"hi\\\"\"\nsingle='c:\\data'\n",
        );

        assert_eq!(store.get("dbpass"), Some("pa\\ss"));
        assert_eq!(store.get("quoted"), Some("say \"hi\""));
        assert_eq!(store.get("single"), Some("c:\\data"));
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "this line has no equals\nNextcloud_userName=alice\n");

        let store = ConfigStore::load_or_empty(&path);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Nextcloud_userName"), Some("alice"));
    }

    #[test]
    fn test_unreadable_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        // A directory exists but cannot be read as a file
        assert!(matches!(
            ConfigStore::load(dir.path()),
            Err(ConfigError::Read { .. })
        ));
        assert!(ConfigStore::load_or_empty(dir.path()).is_empty());
    }

    #[test]
    fn test_keyword_values() {
        let store = ConfigStore::parse("a=On\nb=off\nc=null\nd=\"true\"\n");

        assert_eq!(store.get("a"), Some("1"));
        assert_eq!(store.get("b"), Some(""));
        assert_eq!(store.get("c"), Some(""));
        assert_eq!(store.get("d"), Some("true"));
    }

    #[test]
    fn test_value_defaults_to_empty() {
        let store = ConfigStore::from_entries([("a", "1")]);
        assert_eq!(store.value("a"), "1");
        assert_eq!(store.value("b"), "");
    }

    #[test]
    fn test_with_prefix_is_case_sensitive() {
        let store = ConfigStore::from_entries([
            ("Nextcloud_userName", "u"),
            ("nextcloud_password", "p"),
            ("Nextcloudx", "x"),
        ]);

        let matched: Vec<_> = store.with_prefix("Nextcloud_").collect();
        assert_eq!(matched, vec![("Nextcloud_userName", "u")]);
    }
}
