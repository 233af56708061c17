//! Directory-backed persistence of named rules documents.
//!
//! Each document lives in `<name>.yml` (or `<name>.yaml`) inside the store
//! directory; the file stem is the document name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::document::RuleDocument;
use crate::error::{Result, RuleError};

/// Outcome of loading a single file during [`RuleStore::load_all`].
#[derive(Debug, Serialize)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Document loaded; `hash` is its content hash.
    Loaded { name: String, hash: String },
    /// File was skipped (dotfile, non-YAML, directory).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}

/// Rules documents stored as YAML files in one directory.
#[derive(Debug, Clone)]
pub struct RuleStore {
    rules_dir: PathBuf,
}

impl RuleStore {
    /// Create a store for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        let rules_dir = rules_dir.into();
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self { rules_dir }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Path of the existing file for `name`, preferring `.yml`.
    fn existing_path(&self, name: &str) -> Result<Option<PathBuf>> {
        validate_name(name)?;
        Ok(["yml", "yaml"]
            .iter()
            .map(|ext| self.rules_dir.join(format!("{name}.{ext}")))
            .find(|p| p.is_file()))
    }

    /// True when a document is stored under `name`. Names that are not a
    /// plain file stem are never stored.
    pub fn exists(&self, name: &str) -> bool {
        matches!(self.existing_path(name), Ok(Some(_)))
    }

    /// Load the document stored under `name`.
    pub fn load(&self, name: &str) -> Result<RuleDocument> {
        let path = self
            .existing_path(name)?
            .ok_or_else(|| RuleError::NotFound(name.to_string()))?;
        let contents = fs::read(&path)?;
        RuleDocument::from_bytes(name, &contents)
    }

    /// Scan the store directory and load every YAML file, in file-name order.
    ///
    /// Dotfiles, subdirectories and non-YAML files are skipped. Parse errors
    /// are reported per file and do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut paths = fs::read_dir(&self.rules_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let status = self.load_path(&path);
            match &status {
                LoadStatus::Loaded { name, hash } => {
                    info!(name = %name, hash = %hash, path = %path.display(), "loaded rules document")
                }
                LoadStatus::Failed { error } => {
                    warn!(path = %path.display(), error = %error, "failed to load rules file")
                }
                LoadStatus::Skipped { .. } => {}
            }
            results.push(LoadResult { path, status });
        }
        Ok(results)
    }

    fn load_path(&self, path: &Path) -> LoadStatus {
        let skipped = |reason: &str| LoadStatus::Skipped {
            reason: reason.to_string(),
        };

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return skipped("non-UTF-8 file name");
        };
        if file_name.starts_with('.') {
            return skipped("dotfile");
        }
        if path.is_dir() {
            return skipped("directory");
        }

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);
        let stem = path.file_stem().and_then(|s| s.to_str());
        let (true, Some(name)) = (is_yaml, stem) else {
            return skipped("not a YAML file");
        };

        let loaded = fs::read(path)
            .map_err(RuleError::from)
            .and_then(|bytes| RuleDocument::from_bytes(name, &bytes))
            .and_then(|doc| doc.content_hash());
        match loaded {
            Ok(hash) => LoadStatus::Loaded {
                name: name.to_string(),
                hash,
            },
            Err(e) => LoadStatus::Failed {
                error: e.to_string(),
            },
        }
    }

    /// Atomically write a document to `<name>.yml`.
    ///
    /// Writes to a `.tmp` file first, then renames to the final path to
    /// avoid partial writes on crash. A stale `.yaml` twin is removed.
    pub fn write(&self, doc: &RuleDocument) -> Result<PathBuf> {
        let name = doc.name();
        validate_name(name)?;
        let final_path = self.rules_dir.join(format!("{name}.yml"));
        let tmp_path = self.rules_dir.join(format!(".{name}.tmp"));

        let yaml = doc.to_yaml()?;
        fs::write(&tmp_path, yaml)?;
        fs::rename(&tmp_path, &final_path)?;

        let twin = self.rules_dir.join(format!("{name}.yaml"));
        if twin.is_file() {
            fs::remove_file(&twin)?;
        }

        info!(name = %name, path = %final_path.display(), "wrote rules document");
        Ok(final_path)
    }

    /// Delete the document stored under `name`.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self
            .existing_path(name)?
            .ok_or_else(|| RuleError::NotFound(name.to_string()))?;
        fs::remove_file(&path)?;
        info!(name = %name, "deleted rules document");
        Ok(())
    }
}

/// Document names map to file stems directly under the store directory, so a
/// name must be a single non-hidden path component.
fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        "must not be empty"
    } else if name.contains(['/', '\\', '\0']) {
        "must not contain path separators"
    } else if name.starts_with('.') {
        "must not start with '.'"
    } else {
        return Ok(());
    };
    Err(RuleError::InvalidArgument(format!(
        "invalid rules name '{name}': {reason}"
    )))
}
