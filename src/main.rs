mod cache;
mod config;
mod jira;
mod logging;
mod menu;
mod sync;
mod tracking;
mod workflow;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::jira::{IssueService, JiraClient};
use crate::menu::MenuContext;
use crate::tracking::{StopOutcome, SystemClock, Tracker, TrackingStore};

/// Upper bound on users listed by the `users` command
const USER_LIST_LIMIT: u32 = 150;

#[derive(Parser, Debug)]
#[command(name = "jirabar")]
#[command(about = "Jira issues, transitions and time tracking for the menu bar")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jirabar/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Apply a workflow transition, starting or stopping time tracking with it
  Transition {
    key: String,
    name: String,
    /// User to reassign the issue to when resolving
    assignee: Option<String>,
  },
  /// List users and their display names
  Users {
    #[arg(default_value = "")]
    filter: String,
  },
  /// Start tracking an issue that is not in the menu
  Custom { key: Option<String> },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = match Config::load(args.config.as_deref()) {
    Ok(config) => config,
    Err(e) => return Ok(fatal(&e.to_string())),
  };

  let _guard = logging::init(config.log_file.as_deref());

  let data_dir = match config.data_dir() {
    Ok(dir) => dir,
    Err(e) => return Ok(fatal(&e.to_string())),
  };
  let client = match JiraClient::new(&config) {
    Ok(client) => client,
    Err(e) => return Ok(fatal(&e.to_string())),
  };

  match args.command {
    None => refresh(&client, &config, &data_dir).await,
    Some(Command::Transition {
      key,
      name,
      assignee,
    }) => {
      let mut tracker = Tracker::open(&client, TrackingStore::in_dir(&data_dir), SystemClock);
      let outcome =
        workflow::apply_transition(&client, &mut tracker, &key, &name, assignee.as_deref()).await?;
      log_sessions(&outcome.stopped);
      for paused in &outcome.paused {
        debug!("Paused {} before starting {}", paused, key);
      }
      if outcome.started {
        debug!("Now tracking {}", key);
      }
      if !outcome.applied {
        debug!("Tracking updated without moving {} through \"{}\"", key, name);
      }
      Ok(ExitCode::SUCCESS)
    }
    Some(Command::Users { filter }) => {
      list_users(&client, &filter).await?;
      Ok(ExitCode::SUCCESS)
    }
    Some(Command::Custom { key }) => {
      let key = match key {
        Some(key) => key,
        None => prompt_issue_key()?,
      };
      let mut tracker = Tracker::open(&client, TrackingStore::in_dir(&data_dir), SystemClock);
      let stopped = tracker.start_tracking(&key).await?;
      log_sessions(&stopped);
      Ok(ExitCode::SUCCESS)
    }
  }
}

/// Print a one-line failure the menu host can display.
fn fatal(message: &str) -> ExitCode {
  println!("{}", menu::fatal(message));
  ExitCode::FAILURE
}

fn log_sessions(stopped: &[StopOutcome]) {
  for session in stopped {
    match session.logged_minutes {
      Some(minutes) => debug!("{} ran {}s, logged {}m", session.key, session.elapsed_secs, minutes),
      None => debug!("{} ran {}s, not logged", session.key, session.elapsed_secs),
    }
  }
}

/// Sync the cache, then print the menu.
async fn refresh(client: &JiraClient, config: &Config, data_dir: &Path) -> Result<ExitCode> {
  let store = CacheStore::in_dir(data_dir);
  let mut cache = store.load().recover("issue cache");

  let report = sync::reconcile(client, &config.query, &mut cache).await?;
  info!(
    "Sync done: {} fetched, {} evicted{}",
    report.fetched.len(),
    report.evicted.len(),
    if report.eviction_skipped {
      " (eviction skipped)"
    } else {
      ""
    }
  );
  if let Err(e) = store.save(&cache) {
    return Ok(fatal(&e.to_string()));
  }

  if sync::populate_icons(client, &mut cache).await > 0 {
    if let Err(e) = store.save(&cache) {
      return Ok(fatal(&e.to_string()));
    }
  }

  let tracker = Tracker::open(client, TrackingStore::in_dir(data_dir), SystemClock);
  let exe = std::env::current_exe()
    .map(|p| p.display().to_string())
    .unwrap_or_else(|_| "jirabar".to_string());

  let ctx = MenuContext {
    config,
    cache: &cache,
    tracking: tracker.state(),
    exe: &exe,
  };
  let menu = menu::build(client, &ctx).await?;
  print!("{}", menu);

  Ok(ExitCode::SUCCESS)
}

async fn list_users<S>(service: &S, filter: &str) -> Result<()>
where
  S: IssueService + ?Sized,
{
  let users = service.search_users(filter, USER_LIST_LIMIT).await?;

  println!("Username\t(Display Name)");
  println!("--------\t--------------");
  for user in users {
    println!("{}\t({})", user.id, user.display_name);
  }

  Ok(())
}

fn prompt_issue_key() -> Result<String> {
  print!("Enter issue key: ");
  std::io::stdout().flush()?;

  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;

  let key = line.trim();
  if key.is_empty() {
    return Err(eyre!("No issue key entered"));
  }
  Ok(key.to_string())
}
