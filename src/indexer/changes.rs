// Content fingerprints and new/changed/deleted classification

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::CodeFile;

/// File name of the persisted fingerprint table inside the index directory
pub const FINGERPRINTS_FILE: &str = "file_hashes.json";

/// Content hash of a file's full text
pub fn fingerprint(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// path -> content hash, one entry per known file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintTable(BTreeMap<String, String>);

impl FingerprintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprints for a file list; a repeated path keeps its last content
    pub fn from_files(files: &[CodeFile]) -> Self {
        Self(
            files
                .iter()
                .map(|file| (file.path.clone(), fingerprint(&file.content)))
                .collect(),
        )
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.0.insert(path.into(), hash.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load a table; a missing or unreadable file yields an empty table
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No fingerprint table at {}", path.display());
            return Self::new();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(crate::error::IndexError::from)
            .and_then(|content| Ok(serde_json::from_str::<Self>(&content)?));

        match parsed {
            Ok(table) => {
                info!("Loaded hashes for {} files", table.len());
                table
            }
            Err(e) => {
                warn!("Ignoring unreadable fingerprint table {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    /// Write the table atomically (temp file + rename)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string(self)?)?;
        std::fs::rename(&tmp, path)?;

        info!("Saved hashes for {} files", self.len());
        Ok(())
    }
}

/// Classification of a file snapshot against the previous fingerprints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: BTreeSet<String>,
    pub new: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.new.is_empty() && self.deleted.is_empty()
    }

    /// Paths whose current content must be (re)indexed
    pub fn to_index(&self) -> BTreeSet<&str> {
        self.changed.iter().chain(&self.new).map(String::as_str).collect()
    }

    /// Paths whose existing rows must leave the index
    pub fn to_evict(&self) -> BTreeSet<&str> {
        self.changed.iter().chain(&self.deleted).map(String::as_str).collect()
    }
}

/// Classify `files` against `previous`, returning the replacement table
///
/// Pure: nothing is read from or written to disk.
pub fn detect_changes(files: &[CodeFile], previous: &FingerprintTable) -> (ChangeSet, FingerprintTable) {
    let current = FingerprintTable::from_files(files);
    let mut changes = ChangeSet::default();

    for (path, hash) in &current.0 {
        match previous.get(path) {
            None => {
                debug!("New file: {}", path);
                changes.new.insert(path.clone());
            }
            Some(old) if old != hash.as_str() => {
                debug!("Changed file: {}", path);
                changes.changed.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    for path in previous.paths() {
        if !current.contains(path) {
            debug!("Deleted file: {}", path);
            changes.deleted.insert(path.to_string());
        }
    }

    info!(
        "Changes detected: {} changed, {} new, {} deleted",
        changes.changed.len(),
        changes.new.len(),
        changes.deleted.len()
    );

    (changes, current)
}
