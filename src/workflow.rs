//! Workflow transitions and their effect on time tracking.

use color_eyre::Result;
use tracing::info;

use crate::jira::types::Transition;
use crate::jira::IssueService;
use crate::tracking::{Clock, StopOutcome, Tracker};

pub const START_PROGRESS: &str = "Start progress";
pub const STOP_PROGRESS: &str = "Stop progress";
pub const RESOLVED: &str = "Resolved";
pub const SELECT: &str = "Select";
pub const DESELECT: &str = "Deselect";

/// Transitions the server allows for one issue right now.
///
/// Never cached across decisions; fetch again when the question is asked again.
#[derive(Debug, Clone)]
pub struct AvailableTransitions(Vec<Transition>);

impl AvailableTransitions {
  pub async fn fetch<S>(service: &S, key: &str) -> Result<Self>
  where
    S: IssueService + ?Sized,
  {
    Ok(Self(service.transitions(key).await?))
  }

  /// Case-sensitive exact match on the transition name.
  pub fn allows(&self, name: &str) -> bool {
    self.0.iter().any(|t| t.name == name)
  }
}

/// Whether `name` is currently a legal transition for `key`.
pub async fn can_transition<S>(service: &S, key: &str, name: &str) -> Result<bool>
where
  S: IssueService + ?Sized,
{
  Ok(AvailableTransitions::fetch(service, key).await?.allows(name))
}

/// What `apply_transition` did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TransitionOutcome {
  /// Sessions closed as part of this transition
  pub stopped: Vec<StopOutcome>,
  /// Other issues moved out of progress before starting this one
  pub paused: Vec<String>,
  pub started: bool,
  /// Whether the transition itself was legal and applied remotely
  pub applied: bool,
}

/// Apply a workflow transition and keep time tracking in step with it.
///
/// - `Start progress` first moves every tracked issue that allows it through
///   `Stop progress`, then starts tracking `key`.
/// - `Stop progress` and `Resolved` stop tracking `key`.
/// - The transition itself is applied only if the server currently allows it;
///   `Resolved` carries the optional reassignment.
pub async fn apply_transition<S, C>(
  service: &S,
  tracker: &mut Tracker<'_, S, C>,
  key: &str,
  name: &str,
  assignee: Option<&str>,
) -> Result<TransitionOutcome>
where
  S: IssueService + ?Sized,
  C: Clock,
{
  let mut outcome = TransitionOutcome::default();

  match name {
    START_PROGRESS => {
      for other in tracker.active() {
        if can_transition(service, &other, STOP_PROGRESS).await? {
          service.apply_transition(&other, STOP_PROGRESS, None).await?;
          info!("Moved {} out of progress", other);
          outcome.paused.push(other);
        }
      }
      outcome.stopped = tracker.start_tracking(key).await?;
      outcome.started = true;
    }
    STOP_PROGRESS | RESOLVED => {
      if let Some(stopped) = tracker.stop_tracking(key).await? {
        outcome.stopped.push(stopped);
      }
    }
    _ => {}
  }

  if can_transition(service, key, name).await? {
    let assignee = if name == RESOLVED { assignee } else { None };
    service.apply_transition(key, name, assignee).await?;
    info!("Applied \"{}\" to {}", name, key);
    outcome.applied = true;
  } else {
    info!("\"{}\" is not available for {}, skipping", name, key);
  }

  Ok(outcome)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::jira::fake::FakeJira;
  use crate::tracking::{ManualClock, TrackingStore};
  use chrono::{TimeZone, Utc};
  use tempfile::TempDir;

  fn clock() -> ManualClock {
    ManualClock::at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
  }

  #[tokio::test]
  async fn test_can_transition_is_exact_match() {
    let jira = FakeJira::new();
    jira.set_transitions("OPS-1", &["Start progress", "Resolved"]);

    assert!(can_transition(&jira, "OPS-1", "Resolved").await.unwrap());
    assert!(!can_transition(&jira, "OPS-1", "resolved").await.unwrap());
    assert!(!can_transition(&jira, "OPS-1", "Start").await.unwrap());
    assert!(!can_transition(&jira, "OPS-2", "Resolved").await.unwrap());
  }

  #[tokio::test]
  async fn test_start_progress_pauses_other_issue() {
    let temp_dir = TempDir::new().unwrap();
    let jira = FakeJira::new();
    let clock = clock();
    let mut tracker = Tracker::open(&jira, TrackingStore::in_dir(temp_dir.path()), clock.clone());
    tracker.start_tracking("OPS-1").await.unwrap();
    clock.advance_secs(300);

    jira.set_transitions("OPS-1", &[STOP_PROGRESS]);
    jira.set_transitions("OPS-2", &[START_PROGRESS]);

    let outcome = apply_transition(&jira, &mut tracker, "OPS-2", START_PROGRESS, None)
      .await
      .unwrap();

    assert_eq!(outcome.paused, vec!["OPS-1"]);
    assert!(outcome.started);
    assert!(outcome.applied);
    assert_eq!(outcome.stopped[0].logged_minutes, Some(5));
    assert_eq!(tracker.active(), vec!["OPS-2"]);
    assert_eq!(
      jira.applied(),
      vec![
        ("OPS-1".to_string(), STOP_PROGRESS.to_string(), None),
        ("OPS-2".to_string(), START_PROGRESS.to_string(), None),
      ]
    );
  }

  #[tokio::test]
  async fn test_start_tracking_without_legal_transition() {
    let temp_dir = TempDir::new().unwrap();
    let jira = FakeJira::new();
    let mut tracker = Tracker::open(&jira, TrackingStore::in_dir(temp_dir.path()), clock());

    let outcome = apply_transition(&jira, &mut tracker, "OPS-3", START_PROGRESS, None)
      .await
      .unwrap();

    assert!(outcome.started);
    assert!(!outcome.applied);
    assert!(tracker.is_tracking("OPS-3"));
    assert!(jira.applied().is_empty());
  }

  #[tokio::test]
  async fn test_resolve_stops_tracking_and_reassigns() {
    let temp_dir = TempDir::new().unwrap();
    let jira = FakeJira::new();
    let clock = clock();
    let mut tracker = Tracker::open(&jira, TrackingStore::in_dir(temp_dir.path()), clock.clone());
    tracker.start_tracking("OPS-1").await.unwrap();
    clock.advance_secs(45 * 60);
    jira.set_transitions("OPS-1", &[STOP_PROGRESS, RESOLVED]);

    let outcome = apply_transition(&jira, &mut tracker, "OPS-1", RESOLVED, Some("bob"))
      .await
      .unwrap();

    assert!(outcome.applied);
    assert!(tracker.active().is_empty());
    assert_eq!(jira.worklogs()[0].minutes, 45);
    assert_eq!(
      jira.applied(),
      vec![(
        "OPS-1".to_string(),
        RESOLVED.to_string(),
        Some("bob".to_string())
      )]
    );
  }

  #[tokio::test]
  async fn test_other_transitions_leave_tracking_alone() {
    let temp_dir = TempDir::new().unwrap();
    let jira = FakeJira::new();
    let mut tracker = Tracker::open(&jira, TrackingStore::in_dir(temp_dir.path()), clock());
    tracker.start_tracking("OPS-1").await.unwrap();
    jira.set_transitions("OPS-1", &[DESELECT]);

    let outcome = apply_transition(&jira, &mut tracker, "OPS-1", DESELECT, Some("bob"))
      .await
      .unwrap();

    assert!(outcome.applied);
    assert!(outcome.stopped.is_empty());
    assert!(tracker.is_tracking("OPS-1"));
    // Assignee only travels with Resolved
    assert_eq!(jira.applied()[0].2, None);
  }
}
