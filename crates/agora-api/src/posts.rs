//! Handlers for `/posts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/posts` | Optional `?before=<rfc3339>&before_id=<uuid>&limit=<1..=100>` |
//! | `POST`   | `/posts` | Body: `{"content":…,"category":"GENERAL","image":<base64>?}` |
//! | `GET`    | `/posts/{id}` | 404 if missing or deleted |
//! | `DELETE` | `/posts/{id}` | Author only; soft delete |

use std::sync::Arc;

use agora_core::{
  Agora,
  gateway::{IdentityGateway, ImageUpload, MediaStore},
  post::{Category, FeedQuery, PostView},
  store::SocialStore,
};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  auth::Authenticated,
  error::ApiError,
  extract::{JsonBody, PathParam, QueryParams},
};

const DEFAULT_IMAGE_TYPE: &str = "image/png";

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub before:    Option<DateTime<Utc>>,
  /// `post_id` of the last item already seen; only meaningful with `before`.
  pub before_id: Option<Uuid>,
  pub limit:     Option<usize>,
}

/// `GET /posts[?before=<ts>&before_id=<uuid>&limit=<n>]`
pub async fn list<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  _caller: Authenticated,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Vec<PostView>>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  let query = FeedQuery {
    before:    params.before,
    before_id: params.before_id,
    limit:     params.limit,
  };
  Ok(Json(agora.list_posts(query).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub content:            String,
  pub category:           String,
  /// Base64-encoded image bytes.
  pub image:              Option<String>,
  pub image_content_type: Option<String>,
}

impl CreateBody {
  fn image_upload(&self) -> Result<Option<ImageUpload>, ApiError> {
    let Some(encoded) = &self.image else {
      return Ok(None);
    };
    let bytes = B64
      .decode(encoded.trim())
      .map_err(|e| ApiError::BadRequest(format!("image is not valid base64: {e}")))?;
    Ok(Some(ImageUpload {
      bytes:        Bytes::from(bytes),
      content_type: self
        .image_content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_owned()),
    }))
  }
}

/// `POST /posts`
pub async fn create<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  Authenticated(user): Authenticated,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  let category: Category = body.category.parse()?;
  let image = body.image_upload()?;
  let post = agora.create_post(user.user_id, body.content, category, image).await?;
  Ok((StatusCode::CREATED, Json(post)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /posts/{id}`
pub async fn get_one<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  _caller: Authenticated,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<PostView>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  Ok(Json(agora.get_post(id).await?))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /posts/{id}`
pub async fn delete_one<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  Authenticated(user): Authenticated,
  PathParam(id): PathParam<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  agora.soft_delete_post(id, user.user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
