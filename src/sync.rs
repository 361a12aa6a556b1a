//! Reconciles the local issue cache with the remote search results.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use color_eyre::Result;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::cache::{CacheState, Cacheable, IssueTypeIcon};
use crate::jira::types::IssueType;
use crate::jira::IssueService;

/// Upper bound on issues considered per sync cycle
pub const SEARCH_LIMIT: u32 = 100;

/// Fields requested by the lightweight search
const SEARCH_FIELDS: &[&str] = &["key", "updated"];

/// What a reconcile pass changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
  /// Keys fetched because they were new or stale
  pub fetched: Vec<String>,
  /// Keys dropped because the search no longer returns them
  pub evicted: Vec<String>,
  /// Set when the search was capped and eviction was skipped
  pub eviction_skipped: bool,
}

/// Bring `cache.issues` in line with what `query` currently matches.
///
/// New and stale issues are re-fetched in full, unchanged ones are left
/// alone, and issues the search no longer returns are evicted. If the server
/// reports more matches than the capped search returned, nothing is evicted
/// this cycle. Remote failures abort the pass; the caller persists the cache.
pub async fn reconcile<S>(service: &S, query: &str, cache: &mut CacheState) -> Result<SyncReport>
where
  S: IssueService + ?Sized,
{
  let page = service.search(query, SEARCH_FIELDS, SEARCH_LIMIT).await?;

  let mut report = SyncReport::default();
  let mut known: BTreeSet<String> = cache.issues.keys().cloned().collect();

  for hit in &page.hits {
    known.remove(&hit.key);

    let needs_fetch = match cache.issues.get(&hit.key) {
      Some(cached) => cached.is_stale(&hit.updated),
      None => true,
    };

    if needs_fetch {
      let issue = service.fetch_issue(&hit.key).await?;
      info!("Updating issue {}", issue.cache_key());
      cache.issues.insert(hit.key.clone(), issue);
      report.fetched.push(hit.key.clone());
    }
  }

  if page.is_truncated() {
    warn!(
      "Search matched {} issues but only {} were returned; skipping eviction",
      page.total,
      page.hits.len()
    );
    report.eviction_skipped = true;
    return Ok(report);
  }

  for key in known {
    cache.issues.remove(&key);
    info!("Removing issue {}", key);
    report.evicted.push(key);
  }

  Ok(report)
}

/// Download icons for issue types that have none yet.
///
/// Icons are append-only. A failed download is logged and left for the next
/// run. Returns the number of icons added.
pub async fn populate_icons<S>(service: &S, cache: &mut CacheState) -> usize
where
  S: IssueService + ?Sized,
{
  let mut missing: Vec<IssueType> = Vec::new();
  for issue in cache.issues.values() {
    let issue_type = &issue.issue_type;
    if issue_type.id.is_empty() || cache.types.contains_key(&issue_type.id) {
      continue;
    }
    if missing.iter().any(|t| t.id == issue_type.id) {
      continue;
    }
    missing.push(issue_type.clone());
  }

  let mut added = 0;
  for issue_type in missing {
    if issue_type.icon_url.is_empty() {
      debug!("Issue type {} has no icon url", issue_type.name);
      continue;
    }

    match service.fetch_asset(&issue_type.icon_url).await {
      Ok(bytes) => {
        cache.types.insert(
          issue_type.id,
          IssueTypeIcon {
            icon: BASE64_STANDARD.encode(bytes),
          },
        );
        added += 1;
      }
      Err(e) => warn!(
        "Failed to fetch icon for issue type {} ({}): {}",
        issue_type.name, issue_type.id, e
      ),
    }
  }

  added
}
