//! Local time tracking tied to workflow transitions.
//!
//! At most one issue is tracked at a time. The tracking file maps issue key to
//! the epoch second tracking started; it is rewritten after every change.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::cache::{read_json, write_json, Loaded};
use crate::jira::IssueService;

/// Comment attached to every automatic worklog
pub const WORKLOG_COMMENT: &str = "Auto-logged by jirabar";

/// Sessions shorter than this are discarded instead of logged
pub const MIN_LOGGED_SECS: i64 = 60;

/// Source of the current time.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Persisted tracking entries: issue key to start time in epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingState {
  entries: BTreeMap<String, f64>,
}

impl TrackingState {
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn started_at(&self, key: &str) -> Option<DateTime<Utc>> {
    let secs = *self.entries.get(key)?;
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
  }

  fn insert(&mut self, key: &str, at: DateTime<Utc>) {
    self
      .entries
      .insert(key.to_string(), at.timestamp_millis() as f64 / 1000.0);
  }

  fn remove(&mut self, key: &str) {
    self.entries.remove(key);
  }
}

/// The on-disk tracking file.
#[derive(Debug, Clone)]
pub struct TrackingStore {
  path: PathBuf,
}

impl TrackingStore {
  pub const FILE_NAME: &'static str = "tracking.json";

  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn in_dir(dir: &Path) -> Self {
    Self::new(dir.join(Self::FILE_NAME))
  }

  #[cfg(test)]
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn load(&self) -> Loaded<TrackingState> {
    read_json(&self.path)
  }

  pub fn save(&self, state: &TrackingState) -> Result<()> {
    write_json(&self.path, state).map_err(|e| eyre!("Unable to write tracking state: {}", e))
  }
}

/// Result of stopping a tracked issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
  pub key: String,
  pub elapsed_secs: i64,
  /// Minutes submitted as a worklog, `None` for sub-minute sessions
  pub logged_minutes: Option<u64>,
}

/// Whole minutes to log for a session, or `None` if it is too short.
pub fn loggable_minutes(elapsed_secs: i64) -> Option<u64> {
  if elapsed_secs < MIN_LOGGED_SECS {
    return None;
  }
  Some((elapsed_secs as f64 / 60.0).round() as u64)
}

/// Enforces single-issue tracking and submits worklogs on stop.
pub struct Tracker<'a, S: ?Sized, C> {
  service: &'a S,
  store: TrackingStore,
  state: TrackingState,
  clock: C,
}

impl<'a, S, C> Tracker<'a, S, C>
where
  S: IssueService + ?Sized,
  C: Clock,
{
  /// Load the tracking state; an unreadable file means nothing is tracked.
  pub fn open(service: &'a S, store: TrackingStore, clock: C) -> Self {
    let state = store.load().recover("tracking state");
    Self {
      service,
      store,
      state,
      clock,
    }
  }

  pub fn state(&self) -> &TrackingState {
    &self.state
  }

  #[cfg(test)]
  pub fn is_tracking(&self, key: &str) -> bool {
    self.state.contains(key)
  }

  /// Keys currently tracked. More than one means the file was edited or raced.
  pub fn active(&self) -> Vec<String> {
    self.state.keys().map(String::from).collect()
  }

  /// Stop whatever is tracked, then start tracking `key`.
  pub async fn start_tracking(&mut self, key: &str) -> Result<Vec<StopOutcome>> {
    let mut stopped = Vec::new();
    for other in self.active() {
      if let Some(outcome) = self.stop_tracking(&other).await? {
        stopped.push(outcome);
      }
    }

    self.state.insert(key, self.clock.now());
    self.store.save(&self.state)?;
    info!("Started tracking {}", key);

    Ok(stopped)
  }

  /// Stop tracking `key`, logging the session if it lasted at least a minute.
  ///
  /// Returns `None` when `key` was not tracked. An entry whose start time
  /// cannot be read is dropped without a worklog. If the worklog cannot be
  /// submitted the entry is kept so the session is not lost.
  pub async fn stop_tracking(&mut self, key: &str) -> Result<Option<StopOutcome>> {
    if !self.state.contains(key) {
      debug!("{} is not tracked, nothing to stop", key);
      return Ok(None);
    }

    let Some(started) = self.state.started_at(key) else {
      warn!("Discarding session on {}: start time is out of range", key);
      self.state.remove(key);
      self.store.save(&self.state)?;
      return Ok(Some(StopOutcome {
        key: key.to_string(),
        elapsed_secs: 0,
        logged_minutes: None,
      }));
    };

    let elapsed_secs = (self.clock.now() - started).num_seconds().max(0);
    let logged_minutes = loggable_minutes(elapsed_secs);

    match logged_minutes {
      Some(minutes) => {
        self
          .service
          .add_worklog(key, minutes, WORKLOG_COMMENT)
          .await?;
        info!("Logged {}m on {}", minutes, key);
      }
      None => debug!("Discarding {}s session on {}", elapsed_secs, key),
    }

    self.state.remove(key);
    self.store.save(&self.state)?;

    Ok(Some(StopOutcome {
      key: key.to_string(),
      elapsed_secs,
      logged_minutes,
    }))
  }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
  now: std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn at(now: DateTime<Utc>) -> Self {
    Self {
      now: std::sync::Arc::new(std::sync::Mutex::new(now)),
    }
  }

  pub fn advance_secs(&self, secs: i64) {
    let mut now = self.now.lock().unwrap();
    *now += chrono::Duration::seconds(secs);
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}
