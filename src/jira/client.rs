use crate::config::{AuthType, Config};
use crate::jira::api_types::{ApiIssue, ApiSearchResponse, ApiTransitionsResponse, ApiUser};
use crate::jira::service::IssueService;
use crate::jira::types::{IssueSnapshot, SearchPage, Transition, User};
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;

/// Fields requested when refreshing a single issue
const ISSUE_FIELDS: &str = "summary,description,status,updated,issuetype";

#[derive(Clone)]
enum AssetAuth {
  Basic { username: String, token: String },
  Bearer(String),
}

/// Jira API client wrapper
#[derive(Clone)]
pub struct JiraClient {
  client: gouqi::r#async::Jira,
  http: reqwest::Client,
  asset_auth: AssetAuth,
}

impl JiraClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = config.api_token()?;

    let (credentials, asset_auth) = match config.jira.auth_type {
      AuthType::Basic => (
        gouqi::Credentials::Basic(config.jira.username.clone(), token.clone()),
        AssetAuth::Basic {
          username: config.jira.username.clone(),
          token,
        },
      ),
      AuthType::Bearer => (
        gouqi::Credentials::Bearer(token.clone()),
        AssetAuth::Bearer(token),
      ),
    };

    let client = gouqi::r#async::Jira::new(config.server(), credentials)
      .map_err(|e| eyre!("Failed to create Jira client: {}", e))?;

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      http,
      asset_auth,
    })
  }
}

fn encode(value: &str) -> String {
  url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[async_trait]
impl IssueService for JiraClient {
  async fn search(&self, jql: &str, fields: &[&str], max_results: u32) -> Result<SearchPage> {
    let endpoint = format!(
      "/search?jql={}&fields={}&maxResults={}",
      encode(jql),
      encode(&fields.join(",")),
      max_results
    );

    let response: ApiSearchResponse = self
      .client
      .get("api", &endpoint)
      .await
      .map_err(|e| eyre!("Failed to search issues: {}", e))?;

    Ok(response.into())
  }

  async fn fetch_issue(&self, key: &str) -> Result<IssueSnapshot> {
    let endpoint = format!("/issue/{}?fields={}", encode(key), ISSUE_FIELDS);

    let issue: ApiIssue = self
      .client
      .get("api", &endpoint)
      .await
      .map_err(|e| eyre!("Failed to get issue {}: {}", key, e))?;

    Ok(issue.into())
  }

  async fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
    let endpoint = format!("/issue/{}/transitions", encode(key));

    let response: ApiTransitionsResponse = self
      .client
      .get("api", &endpoint)
      .await
      .map_err(|e| eyre!("Failed to get transitions for {}: {}", key, e))?;

    Ok(
      response
        .transitions
        .into_iter()
        .map(Transition::from)
        .collect(),
    )
  }

  async fn apply_transition(&self, key: &str, name: &str, assignee: Option<&str>) -> Result<()> {
    let transition_id = self
      .transitions(key)
      .await?
      .into_iter()
      .find(|t| t.name == name)
      .map(|t| t.id)
      .ok_or_else(|| eyre!("Transition \"{}\" is not available for {}", name, key))?;

    let mut body = serde_json::json!({
      "transition": {
        "id": transition_id
      }
    });
    if let Some(assignee) = assignee {
      body["fields"] = serde_json::json!({
        "assignee": { "name": assignee }
      });
    }

    let endpoint = format!("/issue/{}/transitions", encode(key));
    self
      .client
      .post::<Value, _>("api", &endpoint, body)
      .await
      .map_err(|e| eyre!("Failed to execute transition \"{}\" on {}: {}", name, key, e))?;

    Ok(())
  }

  async fn add_worklog(&self, key: &str, minutes: u64, comment: &str) -> Result<()> {
    let endpoint = format!("/issue/{}/worklog", encode(key));
    let body = serde_json::json!({
      "timeSpent": format!("{}m", minutes),
      "comment": comment,
    });

    self
      .client
      .post::<Value, _>("api", &endpoint, body)
      .await
      .map_err(|e| eyre!("Failed to add worklog to {}: {}", key, e))?;

    Ok(())
  }

  async fn fetch_user(&self, id: &str) -> Result<User> {
    let endpoint = format!("/user?username={}", encode(id));

    let user: ApiUser = self
      .client
      .get("api", &endpoint)
      .await
      .map_err(|e| eyre!("Failed to get user {}: {}", id, e))?;

    Ok(user.into())
  }

  async fn search_users(&self, query: &str, max_results: u32) -> Result<Vec<User>> {
    let endpoint = format!(
      "/user/search?username={}&maxResults={}",
      encode(query),
      max_results
    );

    let users: Vec<ApiUser> = self
      .client
      .get("api", &endpoint)
      .await
      .map_err(|e| eyre!("Failed to search users: {}", e))?;

    Ok(users.into_iter().map(User::from).collect())
  }

  async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
    let request = match &self.asset_auth {
      AssetAuth::Basic { username, token } => self.http.get(url).basic_auth(username, Some(token)),
      AssetAuth::Bearer(token) => self.http.get(url).bearer_auth(token),
    };

    let response = request
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to download {}: {}", url, e))?;

    let bytes = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read {}: {}", url, e))?;

    Ok(bytes.to_vec())
  }
}
