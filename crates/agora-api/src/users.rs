//! Handlers for `/users` endpoints.

use std::sync::Arc;

use agora_core::{
  Agora,
  gateway::{IdentityGateway, MediaStore},
  store::SocialStore,
  user::{Profile, User},
};
use axum::{
  Json,
  extract::State,
};
use uuid::Uuid;

use crate::{auth::Authenticated, error::ApiError, extract::PathParam};

/// `GET /users/me`
pub async fn me(Authenticated(user): Authenticated) -> Json<User> { Json(user) }

/// `GET /users/{id}` — public profile only.
pub async fn get_one<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  _caller: Authenticated,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  Ok(Json(agora.lookup_user(id).await?.profile()))
}
