use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default search used when the config does not set `query`
pub const DEFAULT_QUERY: &str = "resolution = Unresolved AND assignee = currentUser()";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub jira: JiraConfig,
  /// JQL selecting the issues shown in the menu
  #[serde(default = "default_query")]
  pub query: String,
  /// User ids offered as reassignment targets when resolving an issue
  #[serde(default)]
  pub reviewers: Vec<String>,
  /// Directory holding cache.json and tracking.json
  pub data_dir: Option<PathBuf>,
  /// Optional log file; diagnostics always go to stderr as well
  pub log_file: Option<PathBuf>,
}

fn default_query() -> String {
  DEFAULT_QUERY.to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
  /// Username + API token (Cloud) or password (on-premise)
  #[default]
  Basic,
  /// On-premise personal access token
  Bearer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub username: String,
  /// API token or password. Falls back to the environment when unset.
  pub token: Option<String>,
  #[serde(default)]
  pub auth_type: AuthType,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jirabar.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jirabar/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/jirabar/config.yaml"
        ))
      }
    };

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("jirabar.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jirabar").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Reject configs missing a required credential field.
  pub fn validate(&self) -> Result<()> {
    if self.jira.url.trim().is_empty() {
      return Err(eyre!("Missing required jira.url in config"));
    }
    if self.jira.username.trim().is_empty() {
      return Err(eyre!("Missing required jira.username in config"));
    }
    Ok(())
  }

  /// Get the Jira API token, preferring the config file.
  ///
  /// Falls back to JIRABAR_TOKEN, then JIRA_API_TOKEN.
  pub fn api_token(&self) -> Result<String> {
    if let Some(token) = self.jira.token.as_ref().filter(|t| !t.is_empty()) {
      return Ok(token.clone());
    }

    std::env::var("JIRABAR_TOKEN")
      .or_else(|_| std::env::var("JIRA_API_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Missing required jira.token in config (or JIRABAR_TOKEN / JIRA_API_TOKEN environment variable)"
        )
      })
  }

  /// Directory for the cache and tracking files.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("jirabar"))
  }

  /// Base URL without a trailing slash
  pub fn server(&self) -> &str {
    self.jira.url.trim_end_matches('/')
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_applies_defaults() {
    let config = Config::parse(
      r#"
jira:
  url: https://jira.example.com/
  username: alice
"#,
    )
    .unwrap();

    assert_eq!(config.query, DEFAULT_QUERY);
    assert!(config.reviewers.is_empty());
    assert_eq!(config.jira.auth_type, AuthType::Basic);
    assert_eq!(config.server(), "https://jira.example.com");
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_missing_username_is_rejected() {
    let config = Config::parse(
      r#"
jira:
  url: https://jira.example.com
"#,
    )
    .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("username"));
  }

  #[test]
  fn test_token_from_config_wins() {
    let config = Config::parse(
      r#"
jira:
  url: https://jira.example.com
  username: alice
  token: secret
query: project = OPS
reviewers: [bob, carol]
"#,
    )
    .unwrap();

    assert_eq!(config.api_token().unwrap(), "secret");
    assert_eq!(config.query, "project = OPS");
    assert_eq!(config.reviewers, vec!["bob", "carol"]);
  }

  #[test]
  fn test_bearer_auth_type() {
    let config = Config::parse(
      r#"
jira:
  url: https://jira.example.com
  username: alice
  auth_type: bearer
"#,
    )
    .unwrap();

    assert_eq!(config.jira.auth_type, AuthType::Bearer);
  }
}
