use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  /// Account email used to sign in.
  pub email: String,
  /// Custom title for the header (defaults to the backend host if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Base URL of the backend project, e.g. https://xyz.supabase.co
  pub url: String,
  /// Public (anon) API key; sent with every request alongside the bearer
  /// token. Not a secret.
  pub anon_key: String,
  /// Storage bucket holding attachment blobs.
  #[serde(default = "default_bucket")]
  pub bucket: String,
}

fn default_bucket() -> String {
  "attachments".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jobtrack.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jobtrack/config.yaml
  /// 4. ~/.config/jobtrack/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/jobtrack/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("jobtrack.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jobtrack").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the account password from the environment.
  pub fn get_password() -> Result<String> {
    std::env::var("JOBTRACK_PASSWORD").map_err(|_| {
      eyre!("Account password not found. Set the JOBTRACK_PASSWORD environment variable.")
    })
  }

  /// Title shown in the header.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }

    url::Url::parse(&self.backend.url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| "jobtrack".to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_minimal_config() {
    let yaml = r#"
backend:
  url: https://xyz.supabase.co
  anon_key: public-key
email: me@example.com
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.backend.bucket, "attachments");
    assert_eq!(config.display_title(), "xyz.supabase.co");
  }

  #[test]
  fn test_title_override_wins() {
    let yaml = r#"
backend:
  url: https://xyz.supabase.co
  anon_key: public-key
  bucket: files
email: me@example.com
title: my hunt
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.backend.bucket, "files");
    assert_eq!(config.display_title(), "my hunt");
  }
}
