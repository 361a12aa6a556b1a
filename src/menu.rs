//! Menu output for Argos/xbar style menu-bar hosts.
//!
//! Each line is an entry, optionally followed by `|key=value` options.
//! `---` separates sections and a `--` prefix nests an entry under the
//! previous one.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use color_eyre::Result;
use std::fmt;
use tracing::warn;

use crate::cache::CacheState;
use crate::config::Config;
use crate::jira::types::IssueSnapshot;
use crate::jira::IssueService;
use crate::tracking::TrackingState;
use crate::workflow::{
  AvailableTransitions, DESELECT, RESOLVED, SELECT, START_PROGRESS, STOP_PROGRESS,
};

/// Jira logo, 16x16 PNG
const JIRA_ICON: &str = "iVBORw0KGgoAAAANSUhEUgAAABAAAAAQCAYAAAAf8/9hAAAABHNCSVQICAgIfAhkiAAAAMZJREFUOI2Vkj0OAUEAhb9IJOKn3PM5gEaCWqOROIIrKPWicAm9hEoidHyaXdaameUl00zevL8MpDEFZjWcKDL1ql6ALEZqJAT6QBvoAuO/7dWNbyRTxATOJQGB+T/vW+rDTwRTxDZ4BO66wKjOOQNWQE89+Y3aLeZ53yWwDggkt8jUS867A4uQQDVFeYNx3rO4bwKnyBZf/6LsXmAHTH5J8epewQHoqMe6LULuhQC/pAi5q25zgXQKda/eqgcYlCoOQxx1/wRTboLP64okfwAAAABJRU5ErkJggg==";

/// One menu line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
  Separator,
  Entry {
    text: String,
    nested: bool,
    options: Vec<(String, String)>,
  },
}

impl fmt::Display for Line {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Line::Separator => write!(f, "---"),
      Line::Entry {
        text,
        nested,
        options,
      } => {
        if *nested {
          write!(f, "--")?;
        }
        write!(f, "{}", text)?;
        if !options.is_empty() {
          write!(f, "|")?;
          for (key, value) in options {
            write!(f, "{}={} ", key, value)?;
          }
        }
        Ok(())
      }
    }
  }
}

/// Keep entry text on one line and out of the option syntax.
fn sanitize(text: &str) -> String {
  text.replace(['\n', '\r'], " ").replace('|', "¦")
}

/// Fill the host defaults for entries that run a command.
fn with_defaults(options: &[(&str, &str)]) -> Vec<(String, String)> {
  let mut owned: Vec<(String, String)> = options
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

  let has = |key: &str| options.iter().any(|(k, _)| *k == key);
  if has("bash") {
    if !has("refresh") {
      owned.push(("refresh".to_string(), "true".to_string()));
    }
    if !has("terminal") {
      owned.push(("terminal".to_string(), "false".to_string()));
    }
  }
  owned
}

/// Ordered menu lines, printed top to bottom.
#[derive(Debug, Default)]
pub struct Menu {
  lines: Vec<Line>,
}

impl Menu {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn entry(&mut self, text: &str, options: &[(&str, &str)]) -> &mut Self {
    self.lines.push(Line::Entry {
      text: sanitize(text),
      nested: false,
      options: with_defaults(options),
    });
    self
  }

  pub fn sub_entry(&mut self, text: &str, options: &[(&str, &str)]) -> &mut Self {
    self.lines.push(Line::Entry {
      text: sanitize(text),
      nested: true,
      options: with_defaults(options),
    });
    self
  }

  pub fn separator(&mut self) -> &mut Self {
    self.lines.push(Line::Separator);
    self
  }
}

impl fmt::Display for Menu {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{}", line)?;
    }
    Ok(())
  }
}

/// Single-line fatal message shown in place of the menu.
pub fn fatal(message: &str) -> String {
  format!(":no_entry: {}", sanitize(message))
}

/// Shell command re-invoking this executable, quoted for the host.
fn command(exe: &str, args: &[&str]) -> String {
  let mut cmd = exe.to_string();
  for arg in args {
    if arg.contains(' ') {
      cmd.push_str(&format!(" \"{}\"", arg));
    } else {
      cmd.push_str(&format!(" {}", arg));
    }
  }
  format!("'{}'", cmd)
}

fn issue_link(server: &str, key: &str) -> String {
  format!("{}/browse/{}", server, key)
}

/// Everything the main menu is built from.
pub struct MenuContext<'a> {
  pub config: &'a Config,
  pub cache: &'a CacheState,
  pub tracking: &'a TrackingState,
  /// Path used to re-invoke this executable from menu actions
  pub exe: &'a str,
}

/// Build the main menu: tracking status, the tracked issue, cached issues
/// grouped by status, and the footer actions.
pub async fn build<S>(service: &S, ctx: &MenuContext<'_>) -> Result<Menu>
where
  S: IssueService + ?Sized,
{
  let mut menu = Menu::new();
  let tracked: Vec<&str> = ctx.tracking.keys().collect();

  match tracked.as_slice() {
    [] => {
      menu.entry(
        "💤  <span font_weight=\"normal\">Not working...</span>",
        &[],
      );
      if ctx.cache.issues.is_empty() {
        menu.separator();
        menu.entry("No issues match the configured query", &[]);
      }
    }
    [key] => {
      let issue = match ctx.cache.issues.get(*key) {
        Some(issue) => issue.clone(),
        None => service.fetch_issue(key).await?,
      };
      tracked_section(service, ctx, &mut menu, &issue).await?;
    }
    _ => {
      menu.entry("You can only track one issue!", &[]);
      menu.entry("Something went wrong 🤭", &[]);
    }
  }
  menu.separator();

  for status in ctx.cache.statuses() {
    let listed: Vec<&IssueSnapshot> = ctx
      .cache
      .issues
      .values()
      .filter(|issue| issue.status == status && !ctx.tracking.contains(&issue.key))
      .collect();
    if listed.is_empty() {
      continue;
    }

    menu.entry(&format!("<b>{}</b>", status), &[]);
    for issue in listed {
      issue_entry(service, ctx, &mut menu, issue).await?;
    }
    menu.separator();
  }

  menu.entry(
    "Track other issue...",
    &[
      ("bash", command(ctx.exe, &["custom"]).as_str()),
      ("terminal", "true"),
    ],
  );
  menu.separator();
  menu.entry(
    "Open Jira",
    &[("href", ctx.config.server()), ("image", JIRA_ICON)],
  );
  menu.entry(
    "Refresh",
    &[
      ("refresh", "true"),
      ("iconName", "object-rotate-right-symbolic"),
    ],
  );

  Ok(menu)
}

async fn tracked_section<S>(
  service: &S,
  ctx: &MenuContext<'_>,
  menu: &mut Menu,
  issue: &IssueSnapshot,
) -> Result<()>
where
  S: IssueService + ?Sized,
{
  let key = issue.key.as_str();
  let available = AvailableTransitions::fetch(service, key).await?;

  menu.entry(
    &format!(
      "👨‍💻  {} - <span font_weight=\"normal\">{}</span>",
      key, issue.summary
    ),
    &[],
  );
  menu.separator();
  menu.entry(&format!("<b>{}</b>", issue.summary), &[]);
  if let Some(description) = &issue.description {
    menu.entry(description, &[]);
  }
  menu.entry(
    "Stop progress",
    &[
      ("bash", command(ctx.exe, &["transition", key, STOP_PROGRESS]).as_str()),
      ("iconName", "media-playback-pause-symbolic"),
    ],
  );

  if available.allows(RESOLVED) {
    menu.entry(
      "Resolve and reassign for review",
      &[("iconName", "document-properties-symbolic")],
    );
    for reviewer in &ctx.config.reviewers {
      let user = service.fetch_user(reviewer).await?;
      let bash = command(ctx.exe, &["transition", key, RESOLVED, user.id.as_str()]);
      let avatar = match &user.avatar_url {
        Some(url) => match service.fetch_asset(url).await {
          Ok(bytes) => Some(BASE64_STANDARD.encode(bytes)),
          Err(e) => {
            warn!("Failed to fetch avatar for {}: {}", user.id, e);
            None
          }
        },
        None => None,
      };

      match &avatar {
        Some(image) => menu.sub_entry(
          &user.display_name,
          &[
            ("image", image.as_str()),
            ("imageWidth", "16"),
            ("imageHeight", "16"),
            ("bash", bash.as_str()),
          ],
        ),
        None => menu.sub_entry(&user.display_name, &[("bash", bash.as_str())]),
      };
    }
  }

  if available.allows(SELECT) {
    menu.entry(
      "Select",
      &[
        ("iconName", "view-pin-symbolic"),
        ("bash", command(ctx.exe, &["transition", key, SELECT]).as_str()),
      ],
    );
  }

  menu.entry(
    "Show issue in browser...",
    &[
      ("href", issue_link(ctx.config.server(), key).as_str()),
      ("iconName", "web-browser-symbolic"),
    ],
  );

  Ok(())
}

async fn issue_entry<S>(
  service: &S,
  ctx: &MenuContext<'_>,
  menu: &mut Menu,
  issue: &IssueSnapshot,
) -> Result<()>
where
  S: IssueService + ?Sized,
{
  let key = issue.key.as_str();
  let available = AvailableTransitions::fetch(service, key).await?;
  let title = format!("<b>{}</b>: {}", key, issue.summary);

  match ctx.cache.icon(&issue.issue_type.id) {
    Some(icon) => menu.entry(&title, &[("image", icon)]),
    None => menu.entry(&title, &[]),
  };

  let start_label = if available.allows(START_PROGRESS) {
    START_PROGRESS
  } else {
    "Start tracking"
  };
  menu.sub_entry(
    start_label,
    &[
      ("bash", command(ctx.exe, &["transition", key, START_PROGRESS]).as_str()),
      ("iconName", "media-playback-start-symbolic"),
    ],
  );

  if available.allows(STOP_PROGRESS) {
    menu.sub_entry(
      STOP_PROGRESS,
      &[
        ("bash", command(ctx.exe, &["transition", key, STOP_PROGRESS]).as_str()),
        ("iconName", "media-playback-stop-symbolic"),
      ],
    );
  }

  if available.allows(DESELECT) {
    menu.sub_entry(
      DESELECT,
      &[
        ("bash", command(ctx.exe, &["transition", key, DESELECT]).as_str()),
        ("iconName", "edit-clear-symbolic"),
      ],
    );
  }

  menu.sub_entry(
    "Open in Jira",
    &[("href", issue_link(ctx.config.server(), key).as_str())],
  );

  Ok(())
}
