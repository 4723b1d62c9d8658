//! Agora server assembly: configuration, the local identity gateway, the
//! filesystem media store, and the top-level router.

pub mod config;
pub mod error;
pub mod identity;
pub mod media;

pub use config::{AccountConfig, ServerConfig};
pub use error::{Error, Result};
pub use identity::LocalIdentityGateway;
pub use media::FsMediaStore;

use std::{path::Path, sync::Arc};

use agora_core::{
  Agora,
  gateway::{IdentityGateway, MediaStore},
  store::SocialStore,
};
use axum::Router;
use tower_http::services::ServeDir;

/// The API routes plus uploaded images under `/media`.
pub fn app<S, G, M>(agora: Arc<Agora<S, G, M>>, media_dir: &Path) -> Router
where
  S: SocialStore + 'static,
  G: IdentityGateway + 'static,
  M: MediaStore + 'static,
{
  agora_api::api_router(agora).nest_service("/media", ServeDir::new(media_dir))
}

#[cfg(test)]
mod tests {
  use super::*;

  use agora_core::CoreConfig;
  use agora_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use bytes::Bytes;
  use tower::ServiceExt as _;

  #[tokio::test]
  async fn uploaded_image_is_served_under_media() {
    let dir = std::env::temp_dir().join(format!("agora-app-{}", uuid::Uuid::new_v4()));
    let media = FsMediaStore::new(&dir, "/media").await.unwrap();
    let url = media.store(Bytes::from_static(b"\x89PNG"), "image/png".into()).await.unwrap();

    let password_hash = identity::hash_password("pw").unwrap();
    let gateway = LocalIdentityGateway::new(&[AccountConfig {
      email: "ann@example.com".into(),
      subject_id: "subject-ann".into(),
      password_hash,
    }])
    .unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let agora = Arc::new(Agora::new(
      Arc::new(store),
      gateway,
      media,
      CoreConfig::new("server-test-secret"),
    ));

    let res = app(agora.clone(), &dir)
      .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"\x89PNG");

    // API routes are mounted alongside.
    let res = app(agora, &dir)
      .oneshot(
        Request::builder()
          .method("POST")
          .uri("/auth/login")
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(r#"{"email":"ann@example.com","password":"pw"}"#))
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
  }
}
