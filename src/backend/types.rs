use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

/// Application status of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  #[default]
  NotApplied,
  Pending,
  Interview,
  Offer,
  Rejected,
}

impl JobStatus {
  /// All statuses in form/filter cycling order.
  pub const ALL: [JobStatus; 5] = [
    JobStatus::NotApplied,
    JobStatus::Pending,
    JobStatus::Interview,
    JobStatus::Offer,
    JobStatus::Rejected,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      JobStatus::NotApplied => "not_applied",
      JobStatus::Pending => "pending",
      JobStatus::Interview => "interview",
      JobStatus::Offer => "offer",
      JobStatus::Rejected => "rejected",
    }
  }

  /// Human-readable label for list and form rendering.
  pub fn label(&self) -> &'static str {
    match self {
      JobStatus::NotApplied => "Not applied",
      JobStatus::Pending => "Pending",
      JobStatus::Interview => "Interview",
      JobStatus::Offer => "Offer",
      JobStatus::Rejected => "Rejected",
    }
  }

  /// Next status in cycling order, wrapping around.
  pub fn next(&self) -> JobStatus {
    let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

impl std::fmt::Display for JobStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// A tracked job opportunity, as stored in the remote `jobs` table.
///
/// `status` defaults when absent on the wire; older rows predate the column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
  pub id: String,
  pub owner_id: String,
  pub company: String,
  pub position: String,
  #[serde(default)]
  pub url: Option<String>,
  pub date_found: NaiveDate,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub applied: bool,
  #[serde(default)]
  pub applied_date: Option<NaiveDate>,
  #[serde(default)]
  pub status: JobStatus,
  pub created_at: DateTime<Utc>,
}

/// Metadata for one uploaded file bound to a job, as stored in the remote
/// `job_attachments` table. The blob itself lives in the storage bucket at
/// `object_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
  pub id: String,
  pub job_id: String,
  pub owner_id: String,
  pub object_path: String,
  pub file_name: String,
  #[serde(default)]
  pub mime_type: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// An authenticated session, produced by the auth client.
#[derive(Debug, Clone)]
pub struct Session {
  pub user_id: String,
  pub email: String,
  pub access_token: String,
}

/// Form-side shape of a job: fields as the user entered them, before
/// validation and normalization.
#[derive(Debug, Clone, Default)]
pub struct JobDraft {
  pub company: String,
  pub position: String,
  pub url: String,
  pub date_found: String,
  pub description: String,
  pub applied: bool,
  pub applied_date: String,
  pub status: JobStatus,
}

impl JobDraft {
  /// Pre-fill a draft from an existing record for editing.
  pub fn from_record(record: &JobRecord) -> Self {
    Self {
      company: record.company.clone(),
      position: record.position.clone(),
      url: record.url.clone().unwrap_or_default(),
      date_found: record.date_found.to_string(),
      description: record.description.clone(),
      applied: record.applied,
      applied_date: record
        .applied_date
        .map(|d| d.to_string())
        .unwrap_or_default(),
      status: record.status,
    }
  }

  /// Validation problems that must be fixed before any request is sent.
  /// Empty means the draft is submittable.
  pub fn problems(&self) -> Vec<String> {
    let mut problems = Vec::new();

    if self.company.trim().is_empty() {
      problems.push("company is required".to_string());
    }
    if self.position.trim().is_empty() {
      problems.push("position is required".to_string());
    }
    if self.date_found.trim().is_empty() {
      problems.push("date found is required".to_string());
    } else if parse_date(&self.date_found).is_err() {
      problems.push("date found must be YYYY-MM-DD".to_string());
    }
    if self.applied && !self.applied_date.trim().is_empty() && parse_date(&self.applied_date).is_err()
    {
      problems.push("applied date must be YYYY-MM-DD".to_string());
    }

    problems
  }

  /// Build the write payload for this draft, enforcing the write-time
  /// invariant: a job that was not applied to carries no applied date and
  /// stays in `not_applied`.
  pub fn into_payload(self, owner_id: &str) -> Result<JobPayload> {
    let date_found = parse_date(&self.date_found)?;

    let (applied_date, status) = if self.applied {
      let applied_date = if self.applied_date.trim().is_empty() {
        None
      } else {
        Some(parse_date(&self.applied_date)?)
      };
      (applied_date, self.status)
    } else {
      (None, JobStatus::NotApplied)
    };

    let url = self.url.trim();

    Ok(JobPayload {
      owner_id: owner_id.to_string(),
      company: self.company.trim().to_string(),
      position: self.position.trim().to_string(),
      url: if url.is_empty() {
        None
      } else {
        Some(url.to_string())
      },
      date_found,
      description: self.description,
      applied: self.applied,
      applied_date,
      status,
    })
  }
}

/// Write body for job inserts and full-record updates. The server assigns
/// `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct JobPayload {
  pub owner_id: String,
  pub company: String,
  pub position: String,
  pub url: Option<String>,
  pub date_found: NaiveDate,
  pub description: String,
  pub applied: bool,
  pub applied_date: Option<NaiveDate>,
  pub status: JobStatus,
}

/// Write body for attachment metadata inserts.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentPayload {
  pub job_id: String,
  pub owner_id: String,
  pub object_path: String,
  pub file_name: String,
  pub mime_type: Option<String>,
}

fn parse_date(input: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
    .map_err(|e| eyre!("Invalid date '{}': {}", input.trim(), e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draft() -> JobDraft {
    JobDraft {
      company: "Acme".to_string(),
      position: "Engineer".to_string(),
      url: String::new(),
      date_found: "2024-01-15".to_string(),
      description: "referred by a friend".to_string(),
      applied: false,
      applied_date: String::new(),
      status: JobStatus::NotApplied,
    }
  }

  #[test]
  fn test_complete_draft_has_no_problems() {
    assert!(draft().problems().is_empty());
  }

  #[test]
  fn test_missing_required_fields_are_named() {
    let mut d = draft();
    d.company = "  ".to_string();
    d.position = String::new();
    d.date_found = String::new();

    let problems = d.problems();
    assert_eq!(problems.len(), 3);
    assert!(problems[0].contains("company"));
    assert!(problems[1].contains("position"));
    assert!(problems[2].contains("date found"));
  }

  #[test]
  fn test_unparseable_date_is_a_problem() {
    let mut d = draft();
    d.date_found = "15/01/2024".to_string();
    assert_eq!(d.problems().len(), 1);
  }

  #[test]
  fn test_not_applied_discards_applied_date_and_status() {
    let mut d = draft();
    d.applied = false;
    d.applied_date = "2024-01-01".to_string();
    d.status = JobStatus::Interview;

    let payload = d.into_payload("user-1").unwrap();
    assert_eq!(payload.applied_date, None);
    assert_eq!(payload.status, JobStatus::NotApplied);
  }

  #[test]
  fn test_applied_keeps_date_and_status() {
    let mut d = draft();
    d.applied = true;
    d.applied_date = "2024-02-01".to_string();
    d.status = JobStatus::Pending;

    let payload = d.into_payload("user-1").unwrap();
    assert_eq!(
      payload.applied_date,
      Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
    );
    assert_eq!(payload.status, JobStatus::Pending);
  }

  #[test]
  fn test_empty_url_becomes_none() {
    let payload = draft().into_payload("user-1").unwrap();
    assert_eq!(payload.url, None);
    assert_eq!(payload.owner_id, "user-1");
  }

  #[test]
  fn test_status_absent_on_wire_defaults_to_not_applied() {
    let row = r#"{
      "id": "j1",
      "owner_id": "u1",
      "company": "Acme",
      "position": "Engineer",
      "date_found": "2024-01-15",
      "created_at": "2024-01-15T10:00:00Z"
    }"#;

    let record: JobRecord = serde_json::from_str(row).unwrap();
    assert_eq!(record.status, JobStatus::NotApplied);
    assert!(!record.applied);
    assert_eq!(record.applied_date, None);
  }
}
