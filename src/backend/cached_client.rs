//! Store client with local snapshot write-through.
//!
//! Every read overwrites the matching snapshot slot and stamps the refresh
//! instant; every mutation goes to the remote store first and reconciles the
//! snapshot only on confirmed success, so the cache never diverges from the
//! last known-good remote state.

use chrono::Utc;
use color_eyre::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use url::Url;

use crate::snapshot::{RefreshPlan, SnapshotStore};

use super::client::StoreClient;
use super::storage::{self, BlobClient};
use super::types::{AttachmentPayload, AttachmentRecord, JobDraft, JobRecord, Session};

/// Cached collections plus the startup refresh decision.
pub struct Hydration {
  pub jobs: Vec<JobRecord>,
  pub attachments: Vec<AttachmentRecord>,
  pub plan: RefreshPlan,
}

#[derive(Clone)]
pub struct CachedStoreClient {
  store: StoreClient,
  blob: BlobClient,
  snapshot: Arc<dyn SnapshotStore>,
  session: Session,
}

impl CachedStoreClient {
  pub fn new(
    store: StoreClient,
    blob: BlobClient,
    snapshot: Arc<dyn SnapshotStore>,
    session: Session,
  ) -> Self {
    Self {
      store,
      blob,
      snapshot,
      session,
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  /// Read the snapshot slots once and decide the startup refresh plan.
  /// This is the only point in a session where the slots are read.
  pub fn hydrate(&self) -> Result<Hydration> {
    let snapshot = self.snapshot.load()?;
    let plan = RefreshPlan::decide(&snapshot, Utc::now());

    Ok(Hydration {
      jobs: snapshot.jobs.unwrap_or_default(),
      attachments: snapshot.attachments.unwrap_or_default(),
      plan,
    })
  }

  /// Fetch the authoritative job collection, overwrite the snapshot slot,
  /// and stamp the refresh instant.
  pub async fn refresh_jobs(&self) -> Result<Vec<JobRecord>> {
    let jobs = self.store.fetch_jobs(&self.session).await?;
    self.snapshot.save_jobs(&jobs)?;
    self.snapshot.stamp_refresh(Utc::now())?;
    Ok(jobs)
  }

  /// Symmetric refresh for attachment metadata.
  pub async fn refresh_attachments(&self) -> Result<Vec<AttachmentRecord>> {
    let attachments = self.store.fetch_attachments(&self.session).await?;
    self.snapshot.save_attachments(&attachments)?;
    self.snapshot.stamp_refresh(Utc::now())?;
    Ok(attachments)
  }

  /// Refresh both collections. The collections are independent, so the two
  /// fetches run concurrently.
  pub async fn refresh_all(&self) -> Result<(Vec<JobRecord>, Vec<AttachmentRecord>)> {
    tokio::try_join!(self.refresh_jobs(), self.refresh_attachments())
  }

  /// Insert a new job and refetch the full collection so server-assigned
  /// fields (id, creation timestamp) are captured.
  pub async fn create_job(&self, draft: JobDraft) -> Result<Vec<JobRecord>> {
    let payload = draft.into_payload(&self.session.user_id)?;
    self.store.insert_job(&self.session, &payload).await?;
    self.refresh_jobs().await
  }

  /// Full-record replace of an existing job, then the same
  /// refetch-and-reconcile as create. No optimistic local mutation.
  pub async fn update_job(&self, id: &str, draft: JobDraft) -> Result<Vec<JobRecord>> {
    let payload = draft.into_payload(&self.session.user_id)?;
    self.store.update_job(&self.session, id, &payload).await?;
    self.refresh_jobs().await
  }

  /// Delete a job remotely, then mirror the server-side cascade locally:
  /// the job and its attachment rows leave both collections and both
  /// snapshot slots. Returns the reconciled collections.
  pub async fn delete_job(
    &self,
    id: &str,
    jobs: &[JobRecord],
    attachments: &[AttachmentRecord],
  ) -> Result<(Vec<JobRecord>, Vec<AttachmentRecord>)> {
    self.store.delete_job(&self.session, id).await?;

    let (jobs, attachments) = cascade_job_delete(id, jobs, attachments);
    self.snapshot.save_jobs(&jobs)?;
    self.snapshot.save_attachments(&attachments)?;
    Ok((jobs, attachments))
  }

  /// Two-phase attachment create: upload the blob, then insert the metadata
  /// row. If the insert fails the blob stays behind; that orphan is accepted
  /// and logged rather than compensated. On success the returned row is
  /// prepended locally, no refetch needed.
  pub async fn upload_attachment(
    &self,
    job_id: &str,
    file: &Path,
    attachments: &[AttachmentRecord],
  ) -> Result<Vec<AttachmentRecord>> {
    let file_name = file
      .file_name()
      .and_then(|n| n.to_str())
      .ok_or_else(|| color_eyre::eyre::eyre!("Not a file path: {}", file.display()))?
      .to_string();

    let bytes = tokio::fs::read(file)
      .await
      .map_err(|e| color_eyre::eyre::eyre!("Failed to read {}: {}", file.display(), e))?;

    let object_path = storage::object_path(&self.session.user_id, job_id, &file_name, Utc::now());
    let mime_type = storage::guess_mime_type(&file_name);

    self
      .blob
      .upload(&self.session, &object_path, bytes, mime_type)
      .await?;

    let payload = AttachmentPayload {
      job_id: job_id.to_string(),
      owner_id: self.session.user_id.clone(),
      object_path: object_path.clone(),
      file_name,
      mime_type: mime_type.map(String::from),
    };

    let row = match self.store.insert_attachment(&self.session, &payload).await {
      Ok(row) => row,
      Err(e) => {
        warn!("Metadata insert failed; uploaded blob {} is orphaned", object_path);
        return Err(e);
      }
    };

    let attachments = prepend_attachment(row, attachments);
    self.snapshot.save_attachments(&attachments)?;
    Ok(attachments)
  }

  /// Two-phase attachment delete: blob first, metadata row second. A blob
  /// failure aborts with the row retained, so no metadata ever points at a
  /// missing blob.
  pub async fn delete_attachment(
    &self,
    attachment: &AttachmentRecord,
    attachments: &[AttachmentRecord],
  ) -> Result<Vec<AttachmentRecord>> {
    self
      .blob
      .delete(&self.session, &attachment.object_path)
      .await?;
    self
      .store
      .delete_attachment(&self.session, &attachment.id)
      .await?;

    let attachments = remove_attachment(&attachment.id, attachments);
    self.snapshot.save_attachments(&attachments)?;
    Ok(attachments)
  }

  /// Public URL for an attachment's blob. Pure derivation.
  pub fn attachment_url(&self, attachment: &AttachmentRecord) -> Result<Url> {
    self.blob.public_url(&attachment.object_path)
  }
}

/// Remove a job and every attachment row bound to it.
fn cascade_job_delete(
  id: &str,
  jobs: &[JobRecord],
  attachments: &[AttachmentRecord],
) -> (Vec<JobRecord>, Vec<AttachmentRecord>) {
  let jobs = jobs.iter().filter(|job| job.id != id).cloned().collect();
  let attachments = attachments
    .iter()
    .filter(|attachment| attachment.job_id != id)
    .cloned()
    .collect();
  (jobs, attachments)
}

fn prepend_attachment(
  row: AttachmentRecord,
  attachments: &[AttachmentRecord],
) -> Vec<AttachmentRecord> {
  let mut out = Vec::with_capacity(attachments.len() + 1);
  out.push(row);
  out.extend(attachments.iter().cloned());
  out
}

fn remove_attachment(id: &str, attachments: &[AttachmentRecord]) -> Vec<AttachmentRecord> {
  attachments
    .iter()
    .filter(|attachment| attachment.id != id)
    .cloned()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::types::JobStatus;
  use crate::snapshot::MemorySnapshot;
  use chrono::NaiveDate;

  fn job(id: &str) -> JobRecord {
    JobRecord {
      id: id.to_string(),
      owner_id: "u1".to_string(),
      company: "Acme".to_string(),
      position: "Engineer".to_string(),
      url: None,
      date_found: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
      description: String::new(),
      applied: false,
      applied_date: None,
      status: JobStatus::NotApplied,
      created_at: "2024-01-15T10:00:00Z".parse().unwrap(),
    }
  }

  fn attachment(id: &str, job_id: &str) -> AttachmentRecord {
    AttachmentRecord {
      id: id.to_string(),
      job_id: job_id.to_string(),
      owner_id: "u1".to_string(),
      object_path: format!("u1/{}/1700000000_cv.pdf", job_id),
      file_name: "cv.pdf".to_string(),
      mime_type: None,
      created_at: "2024-01-15T10:00:00Z".parse().unwrap(),
    }
  }

  #[test]
  fn test_cascade_removes_job_and_its_attachments() {
    let jobs = vec![job("j1"), job("j2")];
    let attachments = vec![
      attachment("a1", "j1"),
      attachment("a2", "j1"),
      attachment("a3", "j2"),
    ];

    let (jobs, attachments) = cascade_job_delete("j1", &jobs, &attachments);

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "j2");
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].id, "a3");
  }

  #[test]
  fn test_cascade_of_unknown_id_changes_nothing() {
    let jobs = vec![job("j1")];
    let attachments = vec![attachment("a1", "j1")];

    let (jobs, attachments) = cascade_job_delete("nope", &jobs, &attachments);
    assert_eq!(jobs.len(), 1);
    assert_eq!(attachments.len(), 1);
  }

  #[test]
  fn test_cascade_result_reconciles_the_snapshot() {
    let snapshot = MemorySnapshot::new();
    let jobs = vec![job("j1"), job("j2")];
    let attachments = vec![attachment("a1", "j1"), attachment("a2", "j1")];
    snapshot.save_jobs(&jobs).unwrap();
    snapshot.save_attachments(&attachments).unwrap();

    let (jobs, attachments) = cascade_job_delete("j1", &jobs, &attachments);
    snapshot.save_jobs(&jobs).unwrap();
    snapshot.save_attachments(&attachments).unwrap();

    let reloaded = snapshot.load().unwrap();
    assert_eq!(reloaded.jobs.unwrap().len(), 1);
    assert!(reloaded.attachments.unwrap().is_empty());
  }

  #[test]
  fn test_new_attachment_row_is_prepended() {
    let existing = vec![attachment("a1", "j1")];
    let merged = prepend_attachment(attachment("a2", "j2"), &existing);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, "a2");
    assert_eq!(merged[1].id, "a1");
  }

  #[test]
  fn test_remove_attachment_by_id() {
    let existing = vec![attachment("a1", "j1"), attachment("a2", "j1")];
    let remaining = remove_attachment("a1", &existing);

    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "a2");
  }
}
