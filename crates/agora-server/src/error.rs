//! Startup errors for the server's own adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
