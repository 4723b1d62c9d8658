//! Handlers for `/posts/{id}/like`.

use std::sync::Arc;

use agora_core::{
  Agora,
  gateway::{IdentityGateway, MediaStore},
  store::SocialStore,
};
use axum::{
  Json,
  extract::State,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{auth::Authenticated, error::ApiError, extract::PathParam};

/// Like state of a post from the caller's point of view.
#[derive(Debug, Serialize)]
pub struct LikeStatus {
  pub liked:       bool,
  pub likes_count: u64,
}

/// `GET /posts/{id}/like`
pub async fn status<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  Authenticated(user): Authenticated,
  PathParam(post_id): PathParam<Uuid>,
) -> Result<Json<LikeStatus>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  let likes_count = agora.like_count(post_id).await?;
  let liked = agora.has_liked(user.user_id, post_id).await?;
  Ok(Json(LikeStatus { liked, likes_count }))
}

/// `POST /posts/{id}/like` — flips the caller's like.
pub async fn toggle<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  Authenticated(user): Authenticated,
  PathParam(post_id): PathParam<Uuid>,
) -> Result<Json<LikeStatus>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  let toggled = agora.toggle_like(user.user_id, post_id).await?;
  let likes_count = agora.like_count(post_id).await?;
  Ok(Json(LikeStatus { liked: toggled.liked, likes_count }))
}
