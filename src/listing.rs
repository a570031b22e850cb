//! The list query pipeline: free-text search, categorical filters, a single
//! sort key, and page slicing over the in-memory job collection.
//!
//! `ListQuery::apply` is a pure function of its inputs and the collection; it
//! is recomputed on every input change. The setters encode the reset rules:
//! changing search, filters, sort, or page size snaps back to page 1, while
//! plain page navigation does not.

use std::cmp::Ordering;

use crate::backend::types::{JobRecord, JobStatus};

/// Selectable page sizes, in cycling order.
pub const PAGE_SIZES: [usize; 3] = [10, 20, 50];

/// Categorical filter on job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
  #[default]
  All,
  Only(JobStatus),
}

impl StatusFilter {
  pub fn label(&self) -> &'static str {
    match self {
      StatusFilter::All => "All",
      StatusFilter::Only(status) => status.label(),
    }
  }

  /// Next filter value in cycling order: All, then each status.
  pub fn next(&self) -> StatusFilter {
    match self {
      StatusFilter::All => StatusFilter::Only(JobStatus::ALL[0]),
      StatusFilter::Only(status) => match status.next() {
        JobStatus::NotApplied => StatusFilter::All,
        other => StatusFilter::Only(other),
      },
    }
  }

  fn matches(&self, job: &JobRecord) -> bool {
    match self {
      StatusFilter::All => true,
      StatusFilter::Only(status) => job.status == *status,
    }
  }
}

/// Categorical filter on the applied flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppliedFilter {
  #[default]
  All,
  Applied,
  NotApplied,
}

impl AppliedFilter {
  pub fn label(&self) -> &'static str {
    match self {
      AppliedFilter::All => "All",
      AppliedFilter::Applied => "Applied",
      AppliedFilter::NotApplied => "Not applied",
    }
  }

  pub fn next(&self) -> AppliedFilter {
    match self {
      AppliedFilter::All => AppliedFilter::Applied,
      AppliedFilter::Applied => AppliedFilter::NotApplied,
      AppliedFilter::NotApplied => AppliedFilter::All,
    }
  }

  fn matches(&self, job: &JobRecord) -> bool {
    match self {
      AppliedFilter::All => true,
      AppliedFilter::Applied => job.applied,
      AppliedFilter::NotApplied => !job.applied,
    }
  }
}

/// The active sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  Company,
  Position,
  DateFound,
  Applied,
  Status,
}

impl SortKey {
  pub fn label(&self) -> &'static str {
    match self {
      SortKey::Company => "company",
      SortKey::Position => "position",
      SortKey::DateFound => "date",
      SortKey::Applied => "applied",
      SortKey::Status => "status",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
  Asc,
  Desc,
}

impl SortDir {
  fn flip(&self) -> SortDir {
    match self {
      SortDir::Asc => SortDir::Desc,
      SortDir::Desc => SortDir::Asc,
    }
  }

  pub fn indicator(&self) -> &'static str {
    match self {
      SortDir::Asc => "^",
      SortDir::Desc => "v",
    }
  }
}

/// One page of the derived view, borrowed from the source collection.
#[derive(Debug)]
pub struct Listing<'a> {
  pub rows: Vec<&'a JobRecord>,
  /// Total records after filtering, across all pages.
  pub total: usize,
  /// Clamped 1-based page actually shown.
  pub page: usize,
  pub page_count: usize,
  /// 1-based ordinals of the first and last visible row; 0/0 when empty.
  pub start_display: usize,
  pub end_display: usize,
}

/// All inputs of the pipeline. Page state is private so every change goes
/// through a setter that applies the right reset rule.
#[derive(Debug, Clone)]
pub struct ListQuery {
  pub search: String,
  pub status: StatusFilter,
  pub applied: AppliedFilter,
  sort_key: SortKey,
  sort_dir: SortDir,
  page: usize,
  page_size: usize,
}

impl Default for ListQuery {
  fn default() -> Self {
    Self {
      search: String::new(),
      status: StatusFilter::All,
      applied: AppliedFilter::All,
      sort_key: SortKey::DateFound,
      sort_dir: SortDir::Desc,
      page: 1,
      page_size: PAGE_SIZES[0],
    }
  }
}

impl ListQuery {
  pub fn sort_key(&self) -> SortKey {
    self.sort_key
  }

  pub fn sort_dir(&self) -> SortDir {
    self.sort_dir
  }

  pub fn page(&self) -> usize {
    self.page
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn set_search(&mut self, term: impl Into<String>) {
    self.search = term.into();
    self.page = 1;
  }

  pub fn cycle_status(&mut self) {
    self.status = self.status.next();
    self.page = 1;
  }

  pub fn cycle_applied(&mut self) {
    self.applied = self.applied.next();
    self.page = 1;
  }

  pub fn clear_filters(&mut self) {
    self.search.clear();
    self.status = StatusFilter::All;
    self.applied = AppliedFilter::All;
    self.page = 1;
  }

  /// Select a sort column. A new key starts ascending; re-selecting the
  /// active key toggles direction. Both reset to page 1.
  pub fn select_sort(&mut self, key: SortKey) {
    if self.sort_key == key {
      self.sort_dir = self.sort_dir.flip();
    } else {
      self.sort_key = key;
      self.sort_dir = SortDir::Asc;
    }
    self.page = 1;
  }

  pub fn cycle_page_size(&mut self) {
    let idx = PAGE_SIZES
      .iter()
      .position(|&s| s == self.page_size)
      .unwrap_or(0);
    self.page_size = PAGE_SIZES[(idx + 1) % PAGE_SIZES.len()];
    self.page = 1;
  }

  /// Navigate to a page, clamped to the valid range. Does not reset any
  /// other input.
  pub fn set_page(&mut self, page: usize, page_count: usize) {
    self.page = page.clamp(1, page_count.max(1));
  }

  fn matches(&self, job: &JobRecord) -> bool {
    matches_search(&self.search, job) && self.status.matches(job) && self.applied.matches(job)
  }

  /// Run the full pipeline: filter, stable sort, page slice.
  pub fn apply<'a>(&self, jobs: &'a [JobRecord]) -> Listing<'a> {
    let mut rows: Vec<&JobRecord> = jobs.iter().filter(|job| self.matches(job)).collect();

    // Stable sort: equal keys keep their pre-sort relative order, in both
    // directions, because reversing Equal is still Equal.
    rows.sort_by(|a, b| {
      let ordering = compare_by(self.sort_key, a, b);
      match self.sort_dir {
        SortDir::Asc => ordering,
        SortDir::Desc => ordering.reverse(),
      }
    });

    let total = rows.len();
    let page_count = total.div_ceil(self.page_size).max(1);
    let page = self.page.clamp(1, page_count);

    let start = (page - 1) * self.page_size;
    let end = (start + self.page_size).min(total);
    let rows: Vec<&JobRecord> = rows[start.min(total)..end].to_vec();

    let (start_display, end_display) = if rows.is_empty() {
      (0, 0)
    } else {
      (start + 1, end)
    };

    Listing {
      rows,
      total,
      page,
      page_count,
      start_display,
      end_display,
    }
  }
}

fn matches_search(term: &str, job: &JobRecord) -> bool {
  if term.is_empty() {
    return true;
  }

  let term = term.to_lowercase();
  job.company.to_lowercase().contains(&term)
    || job.position.to_lowercase().contains(&term)
    || job.description.to_lowercase().contains(&term)
    || job
      .url
      .as_deref()
      .is_some_and(|url| url.to_lowercase().contains(&term))
}

fn compare_by(key: SortKey, a: &JobRecord, b: &JobRecord) -> Ordering {
  match key {
    SortKey::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
    SortKey::Position => a.position.to_lowercase().cmp(&b.position.to_lowercase()),
    SortKey::DateFound => a.date_found.cmp(&b.date_found),
    SortKey::Applied => a.applied.cmp(&b.applied),
    SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  fn job(id: &str, company: &str, position: &str, status: JobStatus, applied: bool) -> JobRecord {
    JobRecord {
      id: id.to_string(),
      owner_id: "u1".to_string(),
      company: company.to_string(),
      position: position.to_string(),
      url: Some(format!("https://example.com/{}", id)),
      date_found: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
      description: String::new(),
      applied,
      applied_date: None,
      status,
      created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
    }
  }

  fn ids(listing: &Listing) -> Vec<String> {
    listing.rows.iter().map(|j| j.id.clone()).collect()
  }

  fn sample() -> Vec<JobRecord> {
    vec![
      job("j1", "Acme", "Engineer", JobStatus::NotApplied, false),
      job("j2", "Borg", "Designer", JobStatus::Interview, true),
      job("j3", "acme", "Manager", JobStatus::Pending, true),
      job("j4", "Cyberdyne", "Engineer", JobStatus::Rejected, true),
      job("j5", "Initech", "Engineer", JobStatus::NotApplied, false),
    ]
  }

  #[test]
  fn test_empty_search_passes_everything() {
    let jobs = sample();
    let query = ListQuery::default();
    assert_eq!(query.apply(&jobs).total, 5);
  }

  #[test]
  fn test_search_matches_any_text_field_case_insensitively() {
    let jobs = sample();
    let mut query = ListQuery::default();

    query.set_search("ACME");
    let by_company: Vec<_> = ids(&query.apply(&jobs));
    assert_eq!(by_company.len(), 2);

    query.set_search("design");
    assert_eq!(ids(&query.apply(&jobs)), vec!["j2"]);

    query.set_search("example.com/j4");
    assert_eq!(ids(&query.apply(&jobs)), vec!["j4"]);
  }

  #[test]
  fn test_filter_predicates_are_order_independent() {
    let jobs = sample();

    let mut full = ListQuery::default();
    full.set_search("engineer");
    full.cycle_applied(); // Applied
    let combined: std::collections::BTreeSet<String> = ids(&full.apply(&jobs)).into_iter().collect();

    // Apply the predicates one at a time, in the opposite order, over owned
    // subsets: the surviving set must be identical.
    let mut applied_only = ListQuery::default();
    applied_only.cycle_applied();
    let step1: Vec<JobRecord> = applied_only
      .apply(&jobs)
      .rows
      .into_iter()
      .cloned()
      .collect();

    let mut search_only = ListQuery::default();
    search_only.set_search("engineer");
    let step2: std::collections::BTreeSet<String> =
      ids(&search_only.apply(&step1)).into_iter().collect();

    assert_eq!(combined, step2);
  }

  #[test]
  fn test_status_filter_and_applied_filter() {
    let jobs = sample();
    let mut query = ListQuery::default();
    query.status = StatusFilter::Only(JobStatus::Interview);
    assert_eq!(ids(&query.apply(&jobs)), vec!["j2"]);

    let mut query = ListQuery::default();
    query.applied = AppliedFilter::NotApplied;
    assert_eq!(ids(&query.apply(&jobs)), vec!["j1", "j5"]);
  }

  #[test]
  fn test_sort_is_stable_for_equal_keys() {
    let jobs = sample();
    let mut query = ListQuery::default();
    query.select_sort(SortKey::Position); // asc

    // Three engineers with equal keys keep input order j1, j4, j5.
    let listing = query.apply(&jobs);
    let engineers: Vec<&String> = listing
      .rows
      .iter()
      .filter(|j| j.position == "Engineer")
      .map(|j| &j.id)
      .collect();
    assert_eq!(engineers, vec!["j1", "j4", "j5"]);

    // Still stable when descending.
    query.select_sort(SortKey::Position); // desc
    let listing = query.apply(&jobs);
    let engineers: Vec<&String> = listing
      .rows
      .iter()
      .filter(|j| j.position == "Engineer")
      .map(|j| &j.id)
      .collect();
    assert_eq!(engineers, vec!["j1", "j4", "j5"]);
  }

  #[test]
  fn test_sort_company_is_case_insensitive() {
    let jobs = sample();
    let mut query = ListQuery::default();
    query.select_sort(SortKey::Company);

    let listing = query.apply(&jobs);
    assert_eq!(ids(&listing), vec!["j1", "j3", "j2", "j4", "j5"]);
  }

  #[test]
  fn test_sort_applied_orders_false_before_true() {
    let jobs = sample();
    let mut query = ListQuery::default();
    query.select_sort(SortKey::Applied);

    let listing = query.apply(&jobs);
    assert!(!listing.rows[0].applied);
    assert!(!listing.rows[1].applied);
    assert!(listing.rows[2].applied);
  }

  #[test]
  fn test_selecting_sort_key_sets_asc_then_toggles() {
    let mut query = ListQuery::default();
    assert_eq!(query.sort_key(), SortKey::DateFound);

    query.select_sort(SortKey::Company);
    assert_eq!(query.sort_dir(), SortDir::Asc);

    query.select_sort(SortKey::Company);
    assert_eq!(query.sort_dir(), SortDir::Desc);

    query.select_sort(SortKey::Status);
    assert_eq!(query.sort_dir(), SortDir::Asc);
  }

  #[test]
  fn test_pagination_invariant_partitions_the_filtered_set() {
    for n in [0usize, 1, 9, 10, 11, 25, 50, 101] {
      let jobs: Vec<JobRecord> = (0..n)
        .map(|i| {
          job(
            &format!("j{}", i),
            "Acme",
            "Engineer",
            JobStatus::NotApplied,
            false,
          )
        })
        .collect();

      for (cycles, &size) in PAGE_SIZES.iter().enumerate() {
        let mut query = ListQuery::default();
        for _ in 0..cycles {
          query.cycle_page_size();
        }
        assert_eq!(query.page_size(), size);
        let first = query.apply(&jobs);
        assert_eq!(first.page_count, n.div_ceil(size).max(1));

        let mut seen = 0;
        for page in 1..=first.page_count {
          query.set_page(page, first.page_count);
          seen += query.apply(&jobs).rows.len();
        }
        assert_eq!(seen, n, "pages must partition n={} at size={}", n, size);
      }
    }
  }

  #[test]
  fn test_pipeline_is_idempotent() {
    let jobs = sample();
    let mut query = ListQuery::default();
    query.set_search("e");
    query.cycle_status();

    let first = ids(&query.apply(&jobs));
    let second = ids(&query.apply(&jobs));
    assert_eq!(first, second);
  }

  #[test]
  fn test_interview_filter_scenario() {
    // 25 jobs, three of them in interview; page size 10.
    let mut jobs: Vec<JobRecord> = (0..22)
      .map(|i| {
        job(
          &format!("j{}", i),
          "Acme",
          "Engineer",
          JobStatus::NotApplied,
          false,
        )
      })
      .collect();
    for i in 0..3 {
      jobs.push(job(
        &format!("i{}", i),
        "Borg",
        "Engineer",
        JobStatus::Interview,
        true,
      ));
    }

    let mut query = ListQuery::default();
    query.status = StatusFilter::Only(JobStatus::Interview);
    let listing = query.apply(&jobs);

    assert_eq!(listing.total, 3);
    assert_eq!(listing.page_count, 1);
    assert_eq!(listing.rows.len(), 3);
    assert_eq!(listing.start_display, 1);
    assert_eq!(listing.end_display, 3);
  }

  #[test]
  fn test_filter_change_resets_page_but_navigation_does_not() {
    let mut query = ListQuery::default();
    query.set_page(3, 5);
    assert_eq!(query.page(), 3);

    query.set_page(2, 5);
    assert_eq!(query.page(), 2);

    query.cycle_status();
    assert_eq!(query.page(), 1);

    query.set_page(4, 5);
    query.set_search("acme");
    assert_eq!(query.page(), 1);

    query.set_page(4, 5);
    query.cycle_page_size();
    assert_eq!(query.page(), 1);
  }

  #[test]
  fn test_page_is_clamped_to_valid_range() {
    let mut query = ListQuery::default();
    query.set_page(99, 3);
    assert_eq!(query.page(), 3);

    query.set_page(0, 3);
    assert_eq!(query.page(), 1);

    // A stale page number is also clamped inside apply().
    let jobs = sample();
    query.set_page(3, 3);
    let listing = query.apply(&jobs);
    assert_eq!(listing.page, 1);
    assert_eq!(listing.rows.len(), 5);
  }

  #[test]
  fn test_empty_listing_displays_zero_range() {
    let jobs = sample();
    let mut query = ListQuery::default();
    query.set_search("no such company");

    let listing = query.apply(&jobs);
    assert_eq!(listing.total, 0);
    assert_eq!(listing.page_count, 1);
    assert_eq!(listing.start_display, 0);
    assert_eq!(listing.end_display, 0);
  }

  #[test]
  fn test_page_size_cycles_through_allowed_sizes() {
    let mut query = ListQuery::default();
    assert_eq!(query.page_size(), 10);
    query.cycle_page_size();
    assert_eq!(query.page_size(), 20);
    query.cycle_page_size();
    assert_eq!(query.page_size(), 50);
    query.cycle_page_size();
    assert_eq!(query.page_size(), 10);
  }
}
