//! Handlers for `/posts/{id}/comments`.

use std::sync::Arc;

use agora_core::{
  Agora,
  gateway::{IdentityGateway, MediaStore},
  post::CommentView,
  store::SocialStore,
};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::Authenticated, error::ApiError, extract::{JsonBody, PathParam}};

/// `GET /posts/{id}/comments` — newest first; empty for a deleted post.
pub async fn list<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  _caller: Authenticated,
  PathParam(post_id): PathParam<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  Ok(Json(agora.list_comments(post_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub content: String,
}

/// `POST /posts/{id}/comments` — body: `{"content":"…"}`
pub async fn create<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  Authenticated(user): Authenticated,
  PathParam(post_id): PathParam<Uuid>,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  let comment = agora.create_comment(user.user_id, post_id, body.content).await?;
  Ok((StatusCode::CREATED, Json(comment)))
}
