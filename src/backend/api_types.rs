//! Wire-only shapes for the backend HTTP APIs, kept apart from the domain
//! types in `types.rs`.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;

/// Response of `POST /auth/v1/token?grant_type=password`.
#[derive(Debug, Deserialize)]
pub struct ApiTokenResponse {
  pub access_token: String,
  pub user: ApiUser,
}

/// User object returned by the auth API.
#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub id: String,
  #[serde(default)]
  pub email: Option<String>,
}

/// Error body shape shared by the auth, table, and storage APIs. The services
/// disagree on the field name, so all candidates are optional.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub msg: Option<String>,
  #[serde(default)]
  pub error_description: Option<String>,
}

impl ApiErrorBody {
  pub fn message(self) -> Option<String> {
    self.message.or(self.msg).or(self.error_description)
  }
}

/// Turn a non-success response into an error carrying the backend's own
/// message when one can be extracted.
pub(crate) async fn check_response(
  response: reqwest::Response,
  what: &str,
) -> Result<reqwest::Response> {
  if response.status().is_success() {
    return Ok(response);
  }

  let status = response.status();
  let body = response.text().await.unwrap_or_default();
  let detail = serde_json::from_str::<ApiErrorBody>(&body)
    .ok()
    .and_then(ApiErrorBody::message)
    .unwrap_or(body);

  Err(eyre!("Failed to {}: HTTP {}: {}", what, status, detail))
}
