//! Client for the blob storage bucket: upload, delete, and public URL
//! derivation, plus the object path scheme for uploaded files.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::config::Config;

use super::api_types::check_response;
use super::types::Session;

#[derive(Clone)]
pub struct BlobClient {
  http: reqwest::Client,
  base: Url,
  anon_key: String,
  bucket: String,
}

impl BlobClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend url '{}': {}", config.backend.url, e))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base,
      anon_key: config.backend.anon_key.clone(),
      bucket: config.backend.bucket.clone(),
    })
  }

  fn object_url(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(&format!("/storage/v1/object/{}/{}", self.bucket, path))
      .map_err(|e| eyre!("Invalid object path '{}': {}", path, e))
  }

  /// Upload a blob to the given path.
  pub async fn upload(
    &self,
    session: &Session,
    path: &str,
    bytes: Vec<u8>,
    content_type: Option<&str>,
  ) -> Result<()> {
    let mut request = self
      .http
      .post(self.object_url(path)?)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .body(bytes);

    if let Some(content_type) = content_type {
      request = request.header("Content-Type", content_type);
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach storage service: {}", e))?;

    check_response(response, "upload blob").await?;
    Ok(())
  }

  /// Public URL for a stored object. Pure derivation, no network call.
  pub fn public_url(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(&format!(
        "/storage/v1/object/public/{}/{}",
        self.bucket, path
      ))
      .map_err(|e| eyre!("Invalid object path '{}': {}", path, e))
  }

  /// Delete a blob by path.
  pub async fn delete(&self, session: &Session, path: &str) -> Result<()> {
    let response = self
      .http
      .delete(self.object_url(path)?)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach storage service: {}", e))?;

    check_response(response, "delete blob").await?;
    Ok(())
  }
}

/// Storage path for a new upload: namespaced by owner and job, with a
/// timestamp component for collision avoidance.
pub fn object_path(owner_id: &str, job_id: &str, file_name: &str, now: DateTime<Utc>) -> String {
  format!(
    "{}/{}/{}_{}",
    owner_id,
    job_id,
    now.timestamp(),
    sanitize_file_name(file_name)
  )
}

/// Collapse whitespace runs to underscores so the name is path-safe.
pub fn sanitize_file_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut in_whitespace = false;

  for c in name.chars() {
    if c.is_whitespace() {
      if !in_whitespace {
        out.push('_');
      }
      in_whitespace = true;
    } else {
      out.push(c);
      in_whitespace = false;
    }
  }

  out
}

/// Best-effort MIME type from the file extension. Unknown extensions stay
/// untyped; the metadata column is nullable.
pub fn guess_mime_type(file_name: &str) -> Option<&'static str> {
  let extension = file_name.rsplit_once('.')?.1.to_lowercase();
  match extension.as_str() {
    "pdf" => Some("application/pdf"),
    "txt" | "md" => Some("text/plain"),
    "doc" => Some("application/msword"),
    "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    "png" => Some("image/png"),
    "jpg" | "jpeg" => Some("image/jpeg"),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sanitize_collapses_whitespace_runs() {
    assert_eq!(sanitize_file_name("my resume  final.pdf"), "my_resume_final.pdf");
    assert_eq!(sanitize_file_name("cover\tletter\n v2.txt"), "cover_letter_v2.txt");
    assert_eq!(sanitize_file_name("plain.pdf"), "plain.pdf");
  }

  #[test]
  fn test_object_path_is_namespaced_and_timestamped() {
    let now: DateTime<Utc> = "2024-03-01T12:00:00Z".parse().unwrap();
    let path = object_path("u1", "j1", "my resume.pdf", now);
    assert_eq!(path, format!("u1/j1/{}_my_resume.pdf", now.timestamp()));
  }

  #[test]
  fn test_mime_guess_by_extension() {
    assert_eq!(guess_mime_type("cv.pdf"), Some("application/pdf"));
    assert_eq!(guess_mime_type("notes.TXT"), Some("text/plain"));
    assert_eq!(guess_mime_type("archive.zip"), None);
    assert_eq!(guess_mime_type("no-extension"), None);
  }
}
