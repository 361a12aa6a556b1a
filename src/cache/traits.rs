//! Core traits and types for the caching system.

use std::fmt;

/// Trait for entities that can be cached.
///
/// Implementors provide a unique cache key and the opaque update token the
/// sync engine compares against the remote copy.
pub trait Cacheable {
  /// Unique identifier for this entity (e.g., issue key)
  fn cache_key(&self) -> &str;

  /// Last modification token as reported by the server
  fn updated_at(&self) -> &str;

  /// True when the remote copy carries a different update token.
  fn is_stale(&self, remote_updated: &str) -> bool {
    self.updated_at() != remote_updated
  }
}

/// Outcome of reading a persisted document.
///
/// Reads never fail: a missing or broken file yields `Empty` with the reason,
/// and the caller decides how loudly to recover.
#[derive(Debug)]
pub enum Loaded<T> {
  Found(T),
  Empty(EmptyReason),
}

/// Why a persisted document could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
  /// First run, nothing written yet
  Missing,
  /// The file exists but could not be read
  Unreadable(String),
  /// The file was read but is not a valid document
  Corrupt(String),
}

impl fmt::Display for EmptyReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Missing => write!(f, "file does not exist"),
      Self::Unreadable(e) => write!(f, "unreadable: {}", e),
      Self::Corrupt(e) => write!(f, "corrupt: {}", e),
    }
  }
}

impl<T: Default> Loaded<T> {
  /// Take the loaded value, substituting an empty one and logging the reason.
  pub fn recover(self, what: &str) -> T {
    match self {
      Loaded::Found(value) => value,
      Loaded::Empty(EmptyReason::Missing) => {
        tracing::debug!("No {} yet, starting empty", what);
        T::default()
      }
      Loaded::Empty(reason) => {
        tracing::warn!("Error loading {} ({}), starting empty", what, reason);
        T::default()
      }
    }
  }
}

#[cfg(test)]
impl<T> Loaded<T> {
  pub fn is_found(&self) -> bool {
    matches!(self, Loaded::Found(_))
  }

  pub fn reason(&self) -> Option<&EmptyReason> {
    match self {
      Loaded::Found(_) => None,
      Loaded::Empty(reason) => Some(reason),
    }
  }
}
