//! In-memory `IssueService` used by unit tests.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use super::service::IssueService;
use super::types::{IssueSnapshot, IssueType, SearchHit, SearchPage, Transition, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedWork {
  pub key: String,
  pub minutes: u64,
  pub comment: String,
}

#[derive(Default)]
struct State {
  issues: BTreeMap<String, IssueSnapshot>,
  transitions: HashMap<String, Vec<String>>,
  users: HashMap<String, User>,
  /// Overrides the reported total to simulate a capped search
  total_override: Option<u64>,
  fail_worklogs: bool,
  fail_fetches: bool,
  failing_assets: HashSet<String>,
  fetched: Vec<String>,
  searches: usize,
  applied: Vec<(String, String, Option<String>)>,
  worklogs: Vec<LoggedWork>,
  assets: Vec<String>,
}

/// Remote tracker double that records every call it receives.
#[derive(Default)]
pub struct FakeJira {
  state: Mutex<State>,
}

pub fn snapshot(key: &str, updated: &str) -> IssueSnapshot {
  IssueSnapshot {
    key: key.to_string(),
    summary: format!("Summary of {}", key),
    description: None,
    status: "Next".to_string(),
    issue_type: IssueType {
      id: "10001".to_string(),
      name: "Task".to_string(),
      icon_url: "https://jira.example.com/icons/task.png".to_string(),
    },
    updated: updated.to_string(),
  }
}

impl FakeJira {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_issues(issues: impl IntoIterator<Item = IssueSnapshot>) -> Self {
    let fake = Self::new();
    for issue in issues {
      fake.put_issue(issue);
    }
    fake
  }

  pub fn put_issue(&self, issue: IssueSnapshot) {
    let mut state = self.state.lock().unwrap();
    state.issues.insert(issue.key.clone(), issue);
  }

  pub fn remove_issue(&self, key: &str) {
    self.state.lock().unwrap().issues.remove(key);
  }

  pub fn set_transitions(&self, key: &str, names: &[&str]) {
    let mut state = self.state.lock().unwrap();
    state.transitions.insert(
      key.to_string(),
      names.iter().map(|n| n.to_string()).collect(),
    );
  }

  pub fn put_user(&self, user: User) {
    let mut state = self.state.lock().unwrap();
    state.users.insert(user.id.clone(), user);
  }

  pub fn set_total(&self, total: u64) {
    self.state.lock().unwrap().total_override = Some(total);
  }

  pub fn fail_worklogs(&self) {
    self.state.lock().unwrap().fail_worklogs = true;
  }

  pub fn fail_fetches(&self) {
    self.state.lock().unwrap().fail_fetches = true;
  }

  /// Make downloads of `url` fail until told otherwise.
  pub fn set_asset_failing(&self, url: &str, failing: bool) {
    let mut state = self.state.lock().unwrap();
    if failing {
      state.failing_assets.insert(url.to_string());
    } else {
      state.failing_assets.remove(url);
    }
  }

  pub fn fetched(&self) -> Vec<String> {
    self.state.lock().unwrap().fetched.clone()
  }

  pub fn clear_fetched(&self) {
    self.state.lock().unwrap().fetched.clear();
  }

  pub fn searches(&self) -> usize {
    self.state.lock().unwrap().searches
  }

  pub fn applied(&self) -> Vec<(String, String, Option<String>)> {
    self.state.lock().unwrap().applied.clone()
  }

  pub fn worklogs(&self) -> Vec<LoggedWork> {
    self.state.lock().unwrap().worklogs.clone()
  }

  pub fn assets(&self) -> Vec<String> {
    self.state.lock().unwrap().assets.clone()
  }
}

#[async_trait]
impl IssueService for FakeJira {
  async fn search(&self, _jql: &str, _fields: &[&str], max_results: u32) -> Result<SearchPage> {
    let mut state = self.state.lock().unwrap();
    state.searches += 1;

    let hits: Vec<SearchHit> = state
      .issues
      .values()
      .take(max_results as usize)
      .map(|issue| SearchHit {
        key: issue.key.clone(),
        updated: issue.updated.clone(),
      })
      .collect();
    let total = state
      .total_override
      .unwrap_or(state.issues.len() as u64);

    Ok(SearchPage { hits, total })
  }

  async fn fetch_issue(&self, key: &str) -> Result<IssueSnapshot> {
    let mut state = self.state.lock().unwrap();
    state.fetched.push(key.to_string());
    if state.fail_fetches {
      return Err(eyre!("Failed to get issue {}: operation timed out", key));
    }
    state
      .issues
      .get(key)
      .cloned()
      .ok_or_else(|| eyre!("Issue {} does not exist", key))
  }

  async fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
    let state = self.state.lock().unwrap();
    Ok(
      state
        .transitions
        .get(key)
        .map(|names| {
          names
            .iter()
            .enumerate()
            .map(|(i, name)| Transition {
              id: (i + 1).to_string(),
              name: name.clone(),
            })
            .collect()
        })
        .unwrap_or_default(),
    )
  }

  async fn apply_transition(&self, key: &str, name: &str, assignee: Option<&str>) -> Result<()> {
    let mut state = self.state.lock().unwrap();
    state
      .applied
      .push((key.to_string(), name.to_string(), assignee.map(String::from)));
    Ok(())
  }

  async fn add_worklog(&self, key: &str, minutes: u64, comment: &str) -> Result<()> {
    let mut state = self.state.lock().unwrap();
    if state.fail_worklogs {
      return Err(eyre!("Failed to add worklog to {}: connection reset", key));
    }
    state.worklogs.push(LoggedWork {
      key: key.to_string(),
      minutes,
      comment: comment.to_string(),
    });
    Ok(())
  }

  async fn fetch_user(&self, id: &str) -> Result<User> {
    let state = self.state.lock().unwrap();
    state
      .users
      .get(id)
      .cloned()
      .ok_or_else(|| eyre!("User {} does not exist", id))
  }

  async fn search_users(&self, _query: &str, max_results: u32) -> Result<Vec<User>> {
    let state = self.state.lock().unwrap();
    Ok(
      state
        .users
        .values()
        .take(max_results as usize)
        .cloned()
        .collect(),
    )
  }

  async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
    let mut state = self.state.lock().unwrap();
    state.assets.push(url.to_string());
    if state.failing_assets.contains(url) {
      return Err(eyre!("Failed to download {}: 404 Not Found", url));
    }
    Ok(url.as_bytes().to_vec())
  }
}
