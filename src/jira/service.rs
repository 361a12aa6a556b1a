//! The remote operations the rest of the crate needs from Jira.

use async_trait::async_trait;
use color_eyre::Result;

use super::types::{IssueSnapshot, SearchPage, Transition, User};

/// Remote issue tracker as seen by the sync engine, the tracker and the menu.
///
/// `JiraClient` is the production implementation; tests use in-memory fakes.
#[async_trait]
pub trait IssueService: Send + Sync {
  /// Run a JQL search returning only the requested fields.
  async fn search(&self, jql: &str, fields: &[&str], max_results: u32) -> Result<SearchPage>;

  /// Fetch the full snapshot of a single issue.
  async fn fetch_issue(&self, key: &str) -> Result<IssueSnapshot>;

  /// Transitions currently legal for an issue.
  async fn transitions(&self, key: &str) -> Result<Vec<Transition>>;

  /// Apply a transition by name, optionally reassigning the issue.
  async fn apply_transition(&self, key: &str, name: &str, assignee: Option<&str>) -> Result<()>;

  /// Log `minutes` of work on an issue.
  async fn add_worklog(&self, key: &str, minutes: u64, comment: &str) -> Result<()>;

  async fn fetch_user(&self, id: &str) -> Result<User>;

  async fn search_users(&self, query: &str, max_results: u32) -> Result<Vec<User>>;

  /// Download a binary asset (issue type icon, avatar) with the client's credentials.
  async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>>;
}
