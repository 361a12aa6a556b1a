//! Serde-deserializable types matching Jira API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;
use std::collections::HashMap;

use super::types::{IssueSnapshot, IssueType, SearchHit, SearchPage, Transition, User};

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiStatus {
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiIssueType {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(rename = "iconUrl", default)]
  pub icon_url: String,
}

// ============================================================================
// Search endpoint response (fields=key,updated)
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiSearchFields {
  #[serde(default)]
  pub updated: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSearchIssue {
  pub key: String,
  #[serde(default)]
  pub fields: ApiSearchFields,
}

#[derive(Debug, Deserialize)]
pub struct ApiSearchResponse {
  #[serde(default)]
  pub issues: Vec<ApiSearchIssue>,
  #[serde(default)]
  pub total: u64,
}

// ============================================================================
// Issue endpoint response (fields=summary,status,updated,issuetype)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiIssueFields {
  #[serde(default)]
  pub summary: String,
  pub description: Option<String>,
  pub status: Option<ApiStatus>,
  #[serde(rename = "issuetype")]
  pub issue_type: Option<ApiIssueType>,
  #[serde(default)]
  pub updated: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiIssue {
  pub key: String,
  pub fields: ApiIssueFields,
}

// ============================================================================
// Transitions endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTransition {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiTransitionsResponse {
  #[serde(default)]
  pub transitions: Vec<ApiTransition>,
}

// ============================================================================
// User endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub key: Option<String>,
  pub name: Option<String>,
  #[serde(rename = "accountId")]
  pub account_id: Option<String>,
  #[serde(rename = "displayName", default)]
  pub display_name: String,
  #[serde(rename = "avatarUrls", default)]
  pub avatar_urls: HashMap<String, String>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiSearchResponse> for SearchPage {
  fn from(resp: ApiSearchResponse) -> Self {
    SearchPage {
      hits: resp
        .issues
        .into_iter()
        .map(|issue| SearchHit {
          key: issue.key,
          updated: issue.fields.updated,
        })
        .collect(),
      total: resp.total,
    }
  }
}

impl From<ApiIssue> for IssueSnapshot {
  fn from(issue: ApiIssue) -> Self {
    let f = issue.fields;
    let issue_type = f
      .issue_type
      .map(|t| IssueType {
        id: t.id,
        name: t.name,
        icon_url: t.icon_url,
      })
      .unwrap_or_default();

    IssueSnapshot {
      key: issue.key,
      summary: f.summary,
      description: f.description.filter(|d| !d.trim().is_empty()),
      status: f.status.map(|s| s.name).unwrap_or_default(),
      issue_type,
      updated: f.updated,
    }
  }
}

impl From<ApiTransition> for Transition {
  fn from(t: ApiTransition) -> Self {
    Transition {
      id: t.id,
      name: t.name,
    }
  }
}

impl From<ApiUser> for User {
  fn from(user: ApiUser) -> Self {
    // Server exposes `key`/`name`, Cloud only `accountId`
    let id = user
      .key
      .or(user.name)
      .or(user.account_id)
      .unwrap_or_default();

    User {
      id,
      display_name: user.display_name,
      avatar_url: user.avatar_urls.get("16x16").cloned(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_issue_conversion() {
    let raw = serde_json::json!({
      "key": "OPS-7",
      "fields": {
        "summary": "Rotate certificates",
        "description": "Renew the wildcard cert\nbefore Friday",
        "status": { "id": "3", "name": "In Progress" },
        "updated": "2024-03-01T10:00:00.000+0000",
        "issuetype": { "id": "10001", "name": "Task", "iconUrl": "https://jira/icon.png" }
      }
    });

    let issue: IssueSnapshot = serde_json::from_value::<ApiIssue>(raw).unwrap().into();
    assert_eq!(issue.key, "OPS-7");
    assert_eq!(issue.status, "In Progress");
    assert_eq!(issue.issue_type.id, "10001");
    assert_eq!(issue.issue_type.icon_url, "https://jira/icon.png");
    assert_eq!(
      issue.description.as_deref(),
      Some("Renew the wildcard cert\nbefore Friday")
    );
  }

  #[test]
  fn test_blank_description_is_dropped() {
    let raw = serde_json::json!({
      "key": "OPS-8",
      "fields": { "summary": "s", "description": "  ", "updated": "t1" }
    });

    let issue: IssueSnapshot = serde_json::from_value::<ApiIssue>(raw).unwrap().into();
    assert_eq!(issue.description, None);
  }

  #[test]
  fn test_search_page_truncation() {
    let raw = serde_json::json!({
      "total": 3,
      "issues": [
        { "key": "A-1", "fields": { "updated": "t1" } },
        { "key": "A-2", "fields": { "updated": "t2" } }
      ]
    });

    let page: SearchPage = serde_json::from_value::<ApiSearchResponse>(raw)
      .unwrap()
      .into();
    assert_eq!(page.hits.len(), 2);
    assert_eq!(page.hits[1].updated, "t2");
    assert!(page.is_truncated());
  }

  #[test]
  fn test_user_id_fallback() {
    let raw = serde_json::json!({
      "accountId": "5b10a2844c20165700ede21g",
      "displayName": "Mia Krystof",
      "avatarUrls": { "16x16": "https://avatar/16", "48x48": "https://avatar/48" }
    });

    let user: User = serde_json::from_value::<ApiUser>(raw).unwrap().into();
    assert_eq!(user.id, "5b10a2844c20165700ede21g");
    assert_eq!(user.avatar_url.as_deref(), Some("https://avatar/16"));
  }
}
