//! External collaborators: the identity provider and the media store.
//!
//! The core only sees these traits. It never stores
//! passwords and never inspects image bytes beyond their size and declared
//! content type.

use std::future::Future;

use bytes::Bytes;
use thiserror::Error;

use crate::Result;

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("invalid credentials")]
  InvalidCredentials,
  #[error("identity provider unavailable: {0}")]
  Unavailable(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
  #[error("upload rejected: {0}")]
  Rejected(String),
  #[error("media store unavailable: {0}")]
  Unavailable(String),
}

/// Verifies a credential pair and yields the durable subject identifier.
pub trait IdentityGateway: Send + Sync {
  fn verify_credentials(
    &self,
    email: String,
    password: String,
  ) -> impl Future<Output = Result<String, AuthError>> + Send + '_;
}

/// Accepts an image payload and returns a durable public URL.
pub trait MediaStore: Send + Sync {
  fn store(
    &self,
    bytes: Bytes,
    content_type: String,
  ) -> impl Future<Output = Result<String, UploadError>> + Send + '_;
}

/// Image types accepted for post attachments.
pub const IMAGE_CONTENT_TYPES: &[&str] =
  &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// An image attached to a post submission, not yet uploaded.
#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub bytes:        Bytes,
  pub content_type: String,
}

impl ImageUpload {
  /// File extension for an accepted content type.
  pub fn extension(content_type: &str) -> Option<&'static str> {
    match content_type {
      "image/png" => Some("png"),
      "image/jpeg" => Some("jpg"),
      "image/gif" => Some("gif"),
      "image/webp" => Some("webp"),
      _ => None,
    }
  }

  /// Reject payloads the media store should never see.
  pub fn validate(&self, max_bytes: usize) -> Result<()> {
    if Self::extension(&self.content_type).is_none() {
      return Err(crate::Error::invalid(format!(
        "unsupported image type {:?}; expected one of {}",
        self.content_type,
        IMAGE_CONTENT_TYPES.join(", ")
      )));
    }
    if self.bytes.is_empty() {
      return Err(crate::Error::invalid("image is empty"));
    }
    if self.bytes.len() > max_bytes {
      return Err(crate::Error::invalid(format!("image is larger than {max_bytes} bytes")));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn image(content_type: &str, len: usize) -> ImageUpload {
    ImageUpload { bytes: Bytes::from(vec![0u8; len]), content_type: content_type.into() }
  }

  #[test]
  fn accepts_known_types_within_limit() {
    for ct in IMAGE_CONTENT_TYPES {
      assert!(image(ct, 10).validate(10).is_ok(), "{ct}");
    }
  }

  #[test]
  fn rejects_unknown_empty_and_oversize() {
    assert!(image("application/pdf", 10).validate(100).is_err());
    assert!(image("image/png", 0).validate(100).is_err());
    assert!(image("image/png", 101).validate(100).is_err());
  }
}
