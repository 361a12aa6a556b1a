//! Caching implementations for Jira types.

use crate::cache::Cacheable;

use super::types::IssueSnapshot;

impl Cacheable for IssueSnapshot {
  fn cache_key(&self) -> &str {
    &self.key
  }

  fn updated_at(&self) -> &str {
    &self.updated
  }
}
