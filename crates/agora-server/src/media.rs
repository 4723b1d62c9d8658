//! Media store writing images to a local directory.
//!
//! Files are named `<uuid>.<ext>` and the returned URL is
//! `<base_url>/<uuid>.<ext>`; the router serves the directory under `/media`.

use std::path::{Path, PathBuf};

use agora_core::gateway::{ImageUpload, MediaStore, UploadError};
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

pub struct FsMediaStore {
  dir:      PathBuf,
  base_url: String,
}

impl FsMediaStore {
  /// Create the directory if needed.
  pub async fn new(dir: impl Into<PathBuf>, base_url: &str) -> Result<Self> {
    let dir = dir.into();
    tokio::fs::create_dir_all(&dir).await?;
    Ok(Self { dir, base_url: base_url.trim_end_matches('/').to_owned() })
  }

  pub fn dir(&self) -> &Path { &self.dir }
}

fn unavailable(e: std::io::Error) -> UploadError {
  warn!(error = %e, "writing image failed");
  UploadError::Unavailable(e.to_string())
}

impl MediaStore for FsMediaStore {
  async fn store(&self, bytes: Bytes, content_type: String) -> Result<String, UploadError> {
    let ext = ImageUpload::extension(&content_type)
      .ok_or_else(|| UploadError::Rejected(format!("unsupported content type {content_type:?}")))?;

    let name = format!("{}.{ext}", Uuid::new_v4());
    let part = self.dir.join(format!(".{name}.part"));
    let path = self.dir.join(&name);

    // Written aside and renamed so the served name never exposes a partial file.
    tokio::fs::write(&part, &bytes).await.map_err(unavailable)?;
    if let Err(e) = tokio::fs::rename(&part, &path).await {
      let _ = tokio::fs::remove_file(&part).await;
      return Err(unavailable(e));
    }

    debug!(file = %name, size = bytes.len(), "image written");
    Ok(format!("{}/{name}", self.base_url))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_dir() -> PathBuf { std::env::temp_dir().join(format!("agora-media-{}", Uuid::new_v4())) }

  #[tokio::test]
  async fn stores_file_and_returns_public_url() {
    let dir = scratch_dir();
    let media = FsMediaStore::new(&dir, "https://cdn.example.com/media/").await.unwrap();

    let url = media
      .store(Bytes::from_static(b"GIF89a"), "image/gif".into())
      .await
      .unwrap();
    let name = url.strip_prefix("https://cdn.example.com/media/").unwrap();
    assert!(name.ends_with(".gif"));
    assert_eq!(tokio::fs::read(dir.join(name)).await.unwrap(), b"GIF89a");

    tokio::fs::remove_dir_all(&dir).await.unwrap();
  }

  #[tokio::test]
  async fn unsupported_type_is_rejected_without_writing() {
    let dir = scratch_dir();
    let media = FsMediaStore::new(&dir, "/media").await.unwrap();

    let res = media.store(Bytes::from_static(b"<svg/>"), "image/svg+xml".into()).await;
    assert!(matches!(res, Err(UploadError::Rejected(_))));

    let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
    tokio::fs::remove_dir_all(&dir).await.unwrap();
  }
}
