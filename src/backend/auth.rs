//! Client for the authentication boundary: sign-up, sign-in, sign-out and
//! the current-session lookup. Session changes are published on a watch
//! channel that the application subscribes to for the lifetime of the run.

use color_eyre::{eyre::eyre, Result};
use serde_json::json;
use tokio::sync::watch;
use tracing::info;
use url::Url;

use crate::config::Config;

use super::api_types::{check_response, ApiTokenResponse, ApiUser};
use super::types::Session;

#[derive(Clone)]
pub struct AuthClient {
  http: reqwest::Client,
  base: Url,
  anon_key: String,
  sessions: watch::Sender<Option<Session>>,
}

impl AuthClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend url '{}': {}", config.backend.url, e))?;
    let (sessions, _) = watch::channel(None);

    Ok(Self {
      http: reqwest::Client::new(),
      base,
      anon_key: config.backend.anon_key.clone(),
      sessions,
    })
  }

  /// Subscribe to session changes. Receives the current value immediately.
  pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
    self.sessions.subscribe()
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid auth endpoint '{}': {}", path, e))
  }

  /// Register a new account. The backend may require email confirmation
  /// before the first sign-in succeeds.
  pub async fn sign_up(&self, email: &str, password: &str) -> Result<()> {
    let response = self
      .http
      .post(self.endpoint("/auth/v1/signup")?)
      .header("apikey", &self.anon_key)
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach auth service: {}", e))?;

    check_response(response, "sign up").await?;
    info!("Registered account for {}", email);
    Ok(())
  }

  /// Exchange credentials for a session and publish it.
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
    let response = self
      .http
      .post(self.endpoint("/auth/v1/token?grant_type=password")?)
      .header("apikey", &self.anon_key)
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach auth service: {}", e))?;

    let token: ApiTokenResponse = check_response(response, "sign in")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse sign-in response: {}", e))?;

    let session = Session {
      user_id: token.user.id,
      email: token.user.email.unwrap_or_else(|| email.to_string()),
      access_token: token.access_token,
    };

    self.sessions.send_replace(Some(session.clone()));
    info!("Signed in as {}", session.email);
    Ok(session)
  }

  /// Revoke the session remotely and publish the sign-out.
  pub async fn sign_out(&self, session: &Session) -> Result<()> {
    let response = self
      .http
      .post(self.endpoint("/auth/v1/logout")?)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach auth service: {}", e))?;

    check_response(response, "sign out").await?;
    self.sessions.send_replace(None);
    Ok(())
  }

  /// Look up the user behind a token, verifying the session is still valid.
  #[allow(dead_code)]
  pub async fn current_user(&self, session: &Session) -> Result<ApiUser> {
    let response = self
      .http
      .get(self.endpoint("/auth/v1/user")?)
      .header("apikey", &self.anon_key)
      .bearer_auth(&session.access_token)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach auth service: {}", e))?;

    check_response(response, "fetch current user")
      .await?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse user response: {}", e))
  }
}
