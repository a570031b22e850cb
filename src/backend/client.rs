//! Client for the remote table API. One method per operation; row-level
//! isolation is enforced by the backend from the bearer token, so reads never
//! filter by owner here.

use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::config::Config;

use super::api_types::check_response;
use super::types::{AttachmentPayload, AttachmentRecord, JobPayload, JobRecord, Session};

const JOBS_TABLE: &str = "jobs";
const ATTACHMENTS_TABLE: &str = "job_attachments";

#[derive(Clone)]
pub struct StoreClient {
  http: reqwest::Client,
  base: Url,
  anon_key: String,
}

impl StoreClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend url '{}': {}", config.backend.url, e))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base,
      anon_key: config.backend.anon_key.clone(),
    })
  }

  fn table_url(&self, table: &str) -> Result<Url> {
    self
      .base
      .join(&format!("/rest/v1/{}", table))
      .map_err(|e| eyre!("Invalid table endpoint '{}': {}", table, e))
  }

  /// All job records visible to the session, newest first.
  pub async fn fetch_jobs(&self, session: &Session) -> Result<Vec<JobRecord>> {
    let mut url = self.table_url(JOBS_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("order", "created_at.desc");

    let response = self
      .http
      .get(url)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach table service: {}", e))?;

    check_response(response, "fetch jobs")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse job rows: {}", e))
  }

  /// All attachment metadata rows visible to the session, newest first.
  pub async fn fetch_attachments(&self, session: &Session) -> Result<Vec<AttachmentRecord>> {
    let mut url = self.table_url(ATTACHMENTS_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("order", "created_at.desc");

    let response = self
      .http
      .get(url)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach table service: {}", e))?;

    check_response(response, "fetch attachments")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse attachment rows: {}", e))
  }

  /// Insert a job row. Server-assigned fields are picked up by the caller's
  /// follow-up fetch, so no representation is requested back.
  pub async fn insert_job(&self, session: &Session, payload: &JobPayload) -> Result<()> {
    let response = self
      .http
      .post(self.table_url(JOBS_TABLE)?)
      .header("apikey", &self.anon_key)
      .header("Prefer", "return=minimal")
      .bearer_auth(&session.access_token)
      .json(payload)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach table service: {}", e))?;

    check_response(response, "insert job").await?;
    Ok(())
  }

  /// Replace a job row's fields by identifier.
  pub async fn update_job(&self, session: &Session, id: &str, payload: &JobPayload) -> Result<()> {
    let mut url = self.table_url(JOBS_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let response = self
      .http
      .patch(url)
      .header("apikey", &self.anon_key)
      .header("Prefer", "return=minimal")
      .bearer_auth(&session.access_token)
      .json(payload)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach table service: {}", e))?;

    check_response(response, "update job").await?;
    Ok(())
  }

  /// Delete a job row by identifier. Attachment rows cascade server-side.
  pub async fn delete_job(&self, session: &Session, id: &str) -> Result<()> {
    let mut url = self.table_url(JOBS_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let response = self
      .http
      .delete(url)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach table service: {}", e))?;

    check_response(response, "delete job").await?;
    Ok(())
  }

  /// Insert an attachment metadata row and return it, so the caller can
  /// patch local state without a refetch.
  pub async fn insert_attachment(
    &self,
    session: &Session,
    payload: &AttachmentPayload,
  ) -> Result<AttachmentRecord> {
    let response = self
      .http
      .post(self.table_url(ATTACHMENTS_TABLE)?)
      .header("apikey", &self.anon_key)
      .header("Prefer", "return=representation")
      .bearer_auth(&session.access_token)
      .json(payload)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach table service: {}", e))?;

    let mut rows: Vec<AttachmentRecord> = check_response(response, "insert attachment")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse attachment row: {}", e))?;

    rows
      .pop()
      .ok_or_else(|| eyre!("Insert returned no attachment row"))
  }

  /// Delete an attachment metadata row by identifier.
  pub async fn delete_attachment(&self, session: &Session, id: &str) -> Result<()> {
    let mut url = self.table_url(ATTACHMENTS_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    let response = self
      .http
      .delete(url)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach table service: {}", e))?;

    check_response(response, "delete attachment").await?;
    Ok(())
  }
}
