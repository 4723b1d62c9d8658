//! Runtime knobs for the core. Built by the binary from its own config file;
//! the core itself never reads the environment.

use std::{fmt, time::Duration};

#[derive(Clone)]
pub struct CoreConfig {
  /// HS256 secret used to sign access tokens.
  pub jwt_secret:       String,
  pub access_ttl:       Duration,
  pub refresh_ttl:      Duration,
  /// Upper bound on any single storage call.
  pub storage_timeout:  Duration,
  /// Upper bound on any identity-gateway or media-store call.
  pub upstream_timeout: Duration,
  pub max_image_bytes:  usize,
}

impl CoreConfig {
  pub fn new(jwt_secret: impl Into<String>) -> Self {
    Self {
      jwt_secret:       jwt_secret.into(),
      access_ttl:       Duration::from_secs(15 * 60),
      refresh_ttl:      Duration::from_secs(30 * 24 * 60 * 60),
      storage_timeout:  Duration::from_secs(2),
      upstream_timeout: Duration::from_secs(5),
      max_image_bytes:  5 * 1024 * 1024,
    }
  }
}

impl fmt::Debug for CoreConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CoreConfig")
      .field("jwt_secret", &"<redacted>")
      .field("access_ttl", &self.access_ttl)
      .field("refresh_ttl", &self.refresh_ttl)
      .field("storage_timeout", &self.storage_timeout)
      .field("upstream_timeout", &self.upstream_timeout)
      .field("max_image_bytes", &self.max_image_bytes)
      .finish()
  }
}
