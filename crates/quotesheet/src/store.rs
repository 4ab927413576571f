//! File storage for the quote document.
//!
//! The whole quote lives in one JSON file. Reads return the bytes on disk
//! untouched; writes normalize the document, pretty-print it and replace the
//! file atomically so a reader never sees a half-written document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::quote::Quote;

/// Handle on the quote document file.
#[derive(Debug)]
pub struct QuoteStore {
    /// Path to the JSON file.
    path: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

/// What a successful save wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveReceipt {
    /// Bytes written to disk.
    pub bytes: usize,
    /// The document total after normalization.
    pub total: f64,
    /// BLAKE3 hex digest of the written bytes.
    pub fingerprint: String,
    /// When the write completed.
    pub saved_at: DateTime<Utc>,
}

/// BLAKE3 hex digest of a document's bytes.
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

impl QuoteStore {
    /// Create a store for the document at `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the path to the document file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the document file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the document bytes as stored.
    ///
    /// Returns `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load_raw(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::DataRead {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Read and parse the document.
    ///
    /// Returns `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a quote document.
    pub fn load(&self) -> Result<Option<Quote>> {
        self.load_raw()?
            .map(|bytes| Quote::from_json_slice(&bytes))
            .transpose()
    }

    /// Fingerprint of the current file contents, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn fingerprint(&self) -> Result<Option<String>> {
        Ok(self.load_raw()?.map(|bytes| fingerprint(&bytes)))
    }

    /// Normalize and write the document.
    ///
    /// The file is written to a temporary sibling and renamed into place.
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem step fails.
    pub fn save(&self, quote: &Quote) -> Result<SaveReceipt> {
        let quote = quote.clone().normalized();
        let mut json = quote.to_pretty_json()?;
        json.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::internal("quote store write lock poisoned"))?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.temp_path(parent);
        debug!("Writing {} bytes to {}", json.len(), tmp_path.display());
        let written = write_synced(&tmp_path, json.as_bytes()).and_then(|()| {
            std::fs::rename(&tmp_path, &self.path)
        });
        if let Err(source) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(Error::DataWrite {
                path: self.path.clone(),
                source,
            });
        }

        let receipt = SaveReceipt {
            bytes: json.len(),
            total: quote.total.unwrap_or_default(),
            fingerprint: fingerprint(json.as_bytes()),
            saved_at: Utc::now(),
        };
        info!(
            "Saved {} ({} groups, {} items, {} bytes)",
            self.path.display(),
            quote.groups.len(),
            quote.item_count(),
            receipt.bytes
        );
        Ok(receipt)
    }

    fn temp_path(&self, parent: &Path) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "data.json".into(), |n| n.to_string_lossy().into_owned());
        parent.join(format!(".{name}.tmp-{}", std::process::id()))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{Group, Item};

    fn sample() -> Quote {
        Quote {
            title: " Sample ".to_string(),
            groups: vec![Group {
                label: "G".to_string(),
                items: vec![
                    Item {
                        kind: "a".to_string(),
                        price: 10.0,
                        ..Item::default()
                    },
                    Item::default(),
                ],
            }],
            ..Quote::default()
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path().join("data.json"));

        assert!(!store.exists());
        assert!(store.load_raw().unwrap().is_none());
        assert!(store.load().unwrap().is_none());
        assert!(store.fingerprint().unwrap().is_none());
    }

    #[test]
    fn test_save_normalizes_and_pretty_prints() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path().join("data.json"));

        let receipt = store.save(&sample()).unwrap();
        assert_eq!(receipt.total, 10.0);

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("{\n  \"title\": \"Sample\","));
        assert!(text.ends_with("}\n"));
        assert_eq!(receipt.bytes, text.len());
        assert_eq!(receipt.fingerprint, fingerprint(text.as_bytes()));

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.groups[0].items.len(), 1);
        assert_eq!(loaded.total, Some(10.0));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/data.json");
        let store = QuoteStore::new(&path);

        store.save(&Quote::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = QuoteStore::new(dir.path().join("data.json"));

        store.save(&sample()).unwrap();
        let mut second = sample();
        second.title = "Second".to_string();
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap().unwrap().title, "Second");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_load_raw_returns_bytes_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{\"title\":\"hand edited\",\"extra\":1}").unwrap();

        let store = QuoteStore::new(&path);
        let raw = store.load_raw().unwrap().unwrap();
        assert_eq!(raw, b"{\"title\":\"hand edited\",\"extra\":1}");
        assert_eq!(store.load().unwrap().unwrap().title, "hand edited");
    }

    #[test]
    fn test_load_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "not json").unwrap();

        let err = QuoteStore::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_eq!(fingerprint(b"a"), fingerprint(b"a"));
        assert_ne!(fingerprint(b"a"), fingerprint(b"b"));
        assert_eq!(fingerprint(b"a").len(), 64);
    }

    #[test]
    fn test_relative_path_without_parent() {
        let store = QuoteStore::new("data.json");
        assert_eq!(store.path(), Path::new("data.json"));
    }
}
