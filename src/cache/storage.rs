//! JSON file storage for the issue cache.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::traits::{EmptyReason, Loaded};
use crate::jira::types::IssueSnapshot;

/// Cached icon for an issue type. Icons never change for a given type id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTypeIcon {
  /// Base64-encoded image data
  pub icon: String,
}

/// Everything the cache file holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheState {
  #[serde(default)]
  pub issues: BTreeMap<String, IssueSnapshot>,
  #[serde(default)]
  pub types: BTreeMap<String, IssueTypeIcon>,
}

impl CacheState {
  /// Icon for an issue type, if it has been fetched.
  pub fn icon(&self, issue_type_id: &str) -> Option<&str> {
    self.types.get(issue_type_id).map(|t| t.icon.as_str())
  }

  /// Distinct statuses in first-seen order.
  pub fn statuses(&self) -> Vec<&str> {
    let mut statuses: Vec<&str> = Vec::new();
    for issue in self.issues.values() {
      if !statuses.contains(&issue.status.as_str()) {
        statuses.push(&issue.status);
      }
    }
    statuses
  }
}

/// Read a JSON document, reporting why it could not be used instead of failing.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Loaded<T> {
  let contents = match fs::read_to_string(path) {
    Ok(contents) => contents,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Loaded::Empty(EmptyReason::Missing),
    Err(e) => return Loaded::Empty(EmptyReason::Unreadable(e.to_string())),
  };

  match serde_json::from_str(&contents) {
    Ok(value) => Loaded::Found(value),
    Err(e) => Loaded::Empty(EmptyReason::Corrupt(e.to_string())),
  }
}

/// Write a JSON document atomically via a uniquely named temp file in the
/// same directory, so concurrent writers never share a temp path.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
  let parent = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  fs::create_dir_all(parent)
    .map_err(|e| eyre!("Failed to create directory {}: {}", parent.display(), e))?;

  let json =
    serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize {}: {}", path.display(), e))?;

  let write = || -> io::Result<()> {
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(&json)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
  };

  write().map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
}

/// The on-disk issue cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
  path: PathBuf,
}

impl CacheStore {
  pub const FILE_NAME: &'static str = "cache.json";

  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Store located in the given data directory.
  pub fn in_dir(dir: &Path) -> Self {
    Self::new(dir.join(Self::FILE_NAME))
  }

  #[cfg(test)]
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn load(&self) -> Loaded<CacheState> {
    read_json(&self.path)
  }

  pub fn save(&self, state: &CacheState) -> Result<()> {
    write_json(&self.path, state).map_err(|e| eyre!("Unable to write cache file: {}", e))
  }
}
