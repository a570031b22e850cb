//! Startup decision: serve the cached snapshot, refresh it, or block on a
//! first fetch. Evaluated exactly once per session.

use chrono::{DateTime, Duration, Utc};

use super::store::Snapshot;

/// How old the snapshot may get before a background refresh is triggered.
pub fn stale_after() -> Duration {
  Duration::minutes(5)
}

/// What to do with the remote collections at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
  /// Nothing cached: fetch both collections before the list counts as loaded.
  InitialFetch,
  /// Cache is usable but past the staleness threshold: show it immediately
  /// and refresh both collections in the background.
  RefreshInBackground,
  /// Cache is fresh: no network access.
  CacheOnly,
}

impl RefreshPlan {
  pub fn decide(snapshot: &Snapshot, now: DateTime<Utc>) -> RefreshPlan {
    if snapshot.jobs.is_none() && snapshot.attachments.is_none() {
      return RefreshPlan::InitialFetch;
    }

    // An absent refresh instant counts as the epoch, which is always stale.
    let last_refresh = snapshot.last_refresh.unwrap_or(DateTime::UNIX_EPOCH);
    if now - last_refresh > stale_after() {
      RefreshPlan::RefreshInBackground
    } else {
      RefreshPlan::CacheOnly
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn now() -> DateTime<Utc> {
    "2024-03-01T12:00:00Z".parse().unwrap()
  }

  fn snapshot_with_jobs(last_refresh: Option<DateTime<Utc>>) -> Snapshot {
    Snapshot {
      jobs: Some(Vec::new()),
      attachments: Some(Vec::new()),
      last_refresh,
    }
  }

  #[test]
  fn test_empty_snapshot_blocks_on_initial_fetch() {
    let snapshot = Snapshot::default();
    assert_eq!(
      RefreshPlan::decide(&snapshot, now()),
      RefreshPlan::InitialFetch
    );
  }

  #[test]
  fn test_one_cached_collection_is_enough_to_skip_blocking() {
    let snapshot = Snapshot {
      jobs: Some(Vec::new()),
      attachments: None,
      last_refresh: None,
    };
    assert_eq!(
      RefreshPlan::decide(&snapshot, now()),
      RefreshPlan::RefreshInBackground
    );
  }

  #[test]
  fn test_ten_minute_old_snapshot_refreshes_in_background() {
    let last = now() - Duration::minutes(10);
    assert_eq!(
      RefreshPlan::decide(&snapshot_with_jobs(Some(last)), now()),
      RefreshPlan::RefreshInBackground
    );
  }

  #[test]
  fn test_fresh_snapshot_stays_cache_only() {
    let last = now() - Duration::minutes(2);
    assert_eq!(
      RefreshPlan::decide(&snapshot_with_jobs(Some(last)), now()),
      RefreshPlan::CacheOnly
    );
  }

  #[test]
  fn test_exactly_at_threshold_is_not_stale() {
    let last = now() - stale_after();
    assert_eq!(
      RefreshPlan::decide(&snapshot_with_jobs(Some(last)), now()),
      RefreshPlan::CacheOnly
    );
  }

  #[test]
  fn test_missing_refresh_instant_counts_as_epoch() {
    assert_eq!(
      RefreshPlan::decide(&snapshot_with_jobs(None), now()),
      RefreshPlan::RefreshInBackground
    );
  }
}
