use serde::{Deserialize, Serialize};

/// Issue type reference carried by every snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueType {
  pub id: String,
  pub name: String,
  pub icon_url: String,
}

/// Last known state of an issue, as stored in the local cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSnapshot {
  pub key: String,
  pub summary: String,
  /// Free-text description, shown under the tracked issue
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub status: String,
  pub issue_type: IssueType,
  /// Opaque update token; only ever compared for equality
  pub updated: String,
}

/// Key + update token returned by the lightweight search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
  pub key: String,
  pub updated: String,
}

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
  pub hits: Vec<SearchHit>,
  /// Total number of matching issues reported by the server
  pub total: u64,
}

impl SearchPage {
  /// True when more issues match than were returned.
  pub fn is_truncated(&self) -> bool {
    self.total > self.hits.len() as u64
  }
}

/// Workflow transition currently available on an issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Clone)]
pub struct User {
  /// Identifier accepted by the assignee field
  pub id: String,
  pub display_name: String,
  /// 16x16 avatar, when the server provides one
  pub avatar_url: Option<String>,
}
