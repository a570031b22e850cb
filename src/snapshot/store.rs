//! Durable local snapshot of the remote collections.
//!
//! Three named slots — jobs, attachments, last-refresh instant — live in a
//! single SQLite table. The snapshot is read once at startup as a cold-start
//! seed; every successful fetch or mutation writes through to it.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Mutex;
use tracing::warn;

use crate::backend::types::{AttachmentRecord, JobRecord};

const JOBS_SLOT: &str = "jobs";
const ATTACHMENTS_SLOT: &str = "attachments";
const REFRESH_SLOT: &str = "last_refresh";

/// Everything the local store knew when the session started. Each slot is
/// independently optional; a corrupt slot reads as absent.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub jobs: Option<Vec<JobRecord>>,
  pub attachments: Option<Vec<AttachmentRecord>>,
  pub last_refresh: Option<DateTime<Utc>>,
}

/// Storage backend for the snapshot slots.
pub trait SnapshotStore: Send + Sync {
  /// Read all three slots. Parse failures are logged and surface as `None`
  /// for that slot only.
  fn load(&self) -> Result<Snapshot>;

  /// Overwrite the jobs slot. Does not touch the refresh instant.
  fn save_jobs(&self, jobs: &[JobRecord]) -> Result<()>;

  /// Overwrite the attachments slot. Does not touch the refresh instant.
  fn save_attachments(&self, attachments: &[AttachmentRecord]) -> Result<()>;

  /// Overwrite the refresh instant, independently of the collection slots.
  fn stamp_refresh(&self, instant: DateTime<Utc>) -> Result<()>;
}

const SNAPSHOT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS slots (
    slot TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-backed snapshot store.
pub struct SqliteSnapshot {
  conn: Mutex<Connection>,
}

impl SqliteSnapshot {
  /// Open or create the snapshot database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create snapshot directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open snapshot database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// In-memory store, used by tests.
  #[cfg(test)]
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory snapshot database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SNAPSHOT_SCHEMA)
      .map_err(|e| eyre!("Failed to run snapshot migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("jobtrack").join("snapshot.db"))
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn write_slot(&self, slot: &str, data: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO slots (slot, data, written_at) VALUES (?, ?, datetime('now'))",
        params![slot, data],
      )
      .map_err(|e| eyre!("Failed to write snapshot slot '{}': {}", slot, e))?;
    Ok(())
  }

  fn read_slot(conn: &Connection, slot: &str) -> Option<String> {
    conn
      .query_row("SELECT data FROM slots WHERE slot = ?", params![slot], |row| {
        row.get(0)
      })
      .ok()
  }

  #[cfg(test)]
  fn write_raw_slot(&self, slot: &str, data: &str) -> Result<()> {
    self.write_slot(slot, data)
  }
}

/// Deserialize a slot's contents, treating corruption as absence.
fn parse_slot<T: DeserializeOwned>(slot: &str, data: Option<String>) -> Option<T> {
  let data = data?;
  match serde_json::from_str(&data) {
    Ok(value) => Some(value),
    Err(e) => {
      warn!("Discarding corrupt snapshot slot '{}': {}", slot, e);
      None
    }
  }
}

fn serialize_collection<T: Serialize>(items: &[T]) -> Result<String> {
  serde_json::to_string(items).map_err(|e| eyre!("Failed to serialize snapshot: {}", e))
}

impl SnapshotStore for SqliteSnapshot {
  fn load(&self) -> Result<Snapshot> {
    let conn = self.lock()?;

    let jobs = parse_slot(JOBS_SLOT, Self::read_slot(&conn, JOBS_SLOT));
    let attachments = parse_slot(ATTACHMENTS_SLOT, Self::read_slot(&conn, ATTACHMENTS_SLOT));
    let last_refresh: Option<DateTime<Utc>> =
      parse_slot(REFRESH_SLOT, Self::read_slot(&conn, REFRESH_SLOT));

    Ok(Snapshot {
      jobs,
      attachments,
      last_refresh,
    })
  }

  fn save_jobs(&self, jobs: &[JobRecord]) -> Result<()> {
    self.write_slot(JOBS_SLOT, &serialize_collection(jobs)?)
  }

  fn save_attachments(&self, attachments: &[AttachmentRecord]) -> Result<()> {
    self.write_slot(ATTACHMENTS_SLOT, &serialize_collection(attachments)?)
  }

  fn stamp_refresh(&self, instant: DateTime<Utc>) -> Result<()> {
    let data =
      serde_json::to_string(&instant).map_err(|e| eyre!("Failed to serialize instant: {}", e))?;
    self.write_slot(REFRESH_SLOT, &data)
  }
}

/// Volatile store for tests and for running with the snapshot disabled.
#[derive(Default)]
pub struct MemorySnapshot {
  slots: Mutex<std::collections::HashMap<String, String>>,
}

impl MemorySnapshot {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SnapshotStore for MemorySnapshot {
  fn load(&self) -> Result<Snapshot> {
    let slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(Snapshot {
      jobs: parse_slot(JOBS_SLOT, slots.get(JOBS_SLOT).cloned()),
      attachments: parse_slot(ATTACHMENTS_SLOT, slots.get(ATTACHMENTS_SLOT).cloned()),
      last_refresh: parse_slot(REFRESH_SLOT, slots.get(REFRESH_SLOT).cloned()),
    })
  }

  fn save_jobs(&self, jobs: &[JobRecord]) -> Result<()> {
    let data = serialize_collection(jobs)?;
    let mut slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    slots.insert(JOBS_SLOT.to_string(), data);
    Ok(())
  }

  fn save_attachments(&self, attachments: &[AttachmentRecord]) -> Result<()> {
    let data = serialize_collection(attachments)?;
    let mut slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    slots.insert(ATTACHMENTS_SLOT.to_string(), data);
    Ok(())
  }

  fn stamp_refresh(&self, instant: DateTime<Utc>) -> Result<()> {
    let data =
      serde_json::to_string(&instant).map_err(|e| eyre!("Failed to serialize instant: {}", e))?;
    let mut slots = self
      .slots
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    slots.insert(REFRESH_SLOT.to_string(), data);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::types::JobStatus;
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
      mime_type: Some("application/pdf".to_string()),
      created_at: "2024-01-15T10:00:00Z".parse().unwrap(),
    }
  }

  #[test]
  fn test_empty_store_loads_all_slots_absent() {
    let store = SqliteSnapshot::in_memory().unwrap();
    let snapshot = store.load().unwrap();

    assert!(snapshot.jobs.is_none());
    assert!(snapshot.attachments.is_none());
    assert!(snapshot.last_refresh.is_none());
  }

  #[test]
  fn test_save_and_load_round_trips_collections() {
    let store = SqliteSnapshot::in_memory().unwrap();
    store.save_jobs(&[job("j1"), job("j2")]).unwrap();
    store.save_attachments(&[attachment("a1", "j1")]).unwrap();

    let snapshot = store.load().unwrap();
    let jobs = snapshot.jobs.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, "j1");
    assert_eq!(snapshot.attachments.unwrap()[0].job_id, "j1");
  }

  #[test]
  fn test_saving_collections_does_not_stamp_refresh() {
    let store = SqliteSnapshot::in_memory().unwrap();
    store.save_jobs(&[job("j1")]).unwrap();

    assert!(store.load().unwrap().last_refresh.is_none());
  }

  #[test]
  fn test_stamp_refresh_round_trips() {
    let store = SqliteSnapshot::in_memory().unwrap();
    let instant: DateTime<Utc> = "2024-03-01T12:00:00Z".parse().unwrap();
    store.stamp_refresh(instant).unwrap();

    assert_eq!(store.load().unwrap().last_refresh, Some(instant));
  }

  #[test]
  fn test_corrupt_slot_reads_as_absent_without_blocking_others() {
    let store = SqliteSnapshot::in_memory().unwrap();
    store.save_attachments(&[attachment("a1", "j1")]).unwrap();
    store.write_raw_slot(JOBS_SLOT, "{not json").unwrap();

    let snapshot = store.load().unwrap();
    assert!(snapshot.jobs.is_none());
    assert_eq!(snapshot.attachments.unwrap().len(), 1);
  }

  #[test]
  fn test_save_overwrites_wholesale() {
    let store = SqliteSnapshot::in_memory().unwrap();
    store.save_jobs(&[job("j1"), job("j2")]).unwrap();
    store.save_jobs(&[job("j3")]).unwrap();

    let jobs = store.load().unwrap().jobs.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "j3");
  }

  #[test]
  fn test_memory_snapshot_behaves_like_sqlite() {
    let store = MemorySnapshot::new();
    store.save_jobs(&[job("j1")]).unwrap();

    let snapshot = store.load().unwrap();
    assert_eq!(snapshot.jobs.unwrap().len(), 1);
    assert!(snapshot.last_refresh.is_none());
  }
}
