//! Server configuration, deserialised from `config.toml` layered under
//! `AGORA_*` environment variables.

use std::{
  fmt,
  path::{Path, PathBuf},
  time::Duration,
};

use agora_core::CoreConfig;
use serde::Deserialize;

use crate::error::{Error, Result};

/// One login the local identity gateway accepts.
#[derive(Deserialize, Clone)]
pub struct AccountConfig {
  pub email:         String,
  pub subject_id:    String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:                String,
  #[serde(default = "defaults::port")]
  pub port:                u16,
  #[serde(default = "defaults::store_path")]
  pub store_path:          PathBuf,
  pub jwt_secret:          String,
  #[serde(default = "defaults::access_ttl_secs")]
  pub access_ttl_secs:     u64,
  #[serde(default = "defaults::refresh_ttl_secs")]
  pub refresh_ttl_secs:    u64,
  #[serde(default = "defaults::storage_timeout_ms")]
  pub storage_timeout_ms:  u64,
  #[serde(default = "defaults::upstream_timeout_ms")]
  pub upstream_timeout_ms: u64,
  #[serde(default = "defaults::media_dir")]
  pub media_dir:           PathBuf,
  /// Public prefix for returned image URLs.
  #[serde(default = "defaults::media_base_url")]
  pub media_base_url:      String,
  #[serde(default = "defaults::max_image_bytes")]
  pub max_image_bytes:     usize,
  #[serde(default)]
  pub accounts:            Vec<AccountConfig>,
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".into() }
  pub fn port() -> u16 { 8080 }
  pub fn store_path() -> PathBuf { PathBuf::from("agora.db") }
  pub fn access_ttl_secs() -> u64 { 15 * 60 }
  pub fn refresh_ttl_secs() -> u64 { 30 * 24 * 60 * 60 }
  pub fn storage_timeout_ms() -> u64 { 2_000 }
  pub fn upstream_timeout_ms() -> u64 { 5_000 }
  pub fn media_dir() -> PathBuf { PathBuf::from("./uploads") }
  pub fn media_base_url() -> String { "/media".into() }
  pub fn max_image_bytes() -> usize { 5 * 1024 * 1024 }
}

impl ServerConfig {
  /// Reject settings the server cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.jwt_secret.len() < 16 {
      return Err(Error::Config("jwt_secret must be at least 16 bytes".into()));
    }
    if self.access_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
      return Err(Error::Config("token lifetimes must be positive".into()));
    }
    if self.access_ttl_secs > self.refresh_ttl_secs {
      return Err(Error::Config("access_ttl_secs may not exceed refresh_ttl_secs".into()));
    }
    if self.storage_timeout_ms == 0 || self.upstream_timeout_ms == 0 {
      return Err(Error::Config("timeouts must be positive".into()));
    }
    Ok(())
  }

  pub fn core_config(&self) -> CoreConfig {
    CoreConfig {
      jwt_secret:       self.jwt_secret.clone(),
      access_ttl:       Duration::from_secs(self.access_ttl_secs),
      refresh_ttl:      Duration::from_secs(self.refresh_ttl_secs),
      storage_timeout:  Duration::from_millis(self.storage_timeout_ms),
      upstream_timeout: Duration::from_millis(self.upstream_timeout_ms),
      max_image_bytes:  self.max_image_bytes,
    }
  }
}

impl fmt::Debug for ServerConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServerConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("store_path", &self.store_path)
      .field("jwt_secret", &"<redacted>")
      .field("access_ttl_secs", &self.access_ttl_secs)
      .field("refresh_ttl_secs", &self.refresh_ttl_secs)
      .field("media_dir", &self.media_dir)
      .field("media_base_url", &self.media_base_url)
      .field("accounts", &self.accounts.len())
      .finish_non_exhaustive()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
