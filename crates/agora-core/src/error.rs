//! The caller-facing error taxonomy.
//!
//! Every operation exposed by [`crate::Agora`] fails with exactly one of these
//! variants. Storage and collaborator failures are folded into
//! [`Error::Transient`] before they reach the caller.

use serde::Serialize;
use thiserror::Error;

/// Why a session was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
  /// The access token was well-formed and signed but is past its expiry.
  /// Rotating with the refresh token may help.
  Expired,
  /// The access token is malformed, forged, or belongs to a session that is
  /// no longer live.
  Invalid,
  /// The refresh token is malformed, unknown, expired, or already rotated.
  Rejected,
  /// The identity gateway refused the credential pair.
  BadCredentials,
}

impl AuthFailure {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Expired => "expired",
      Self::Invalid => "invalid",
      Self::Rejected => "rejected",
      Self::BadCredentials => "bad_credentials",
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Missing and soft-deleted entities are reported identically.
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("unauthenticated: {}", .0.as_str())]
  Unauthenticated(AuthFailure),

  #[error("transient failure: {0}")]
  Transient(String),
}

/// Flat discriminant of [`Error`], handy for transports and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  InvalidInput,
  NotFound,
  Conflict,
  Forbidden,
  Unauthenticated,
  Transient,
}

impl Error {
  pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidInput(msg.into()) }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidInput(_) => ErrorKind::InvalidInput,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
      Self::Transient(_) => ErrorKind::Transient,
    }
  }

  /// Only transient failures may be retried automatically.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Transient(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
