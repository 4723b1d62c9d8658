//! Bearer-token extractors.
//!
//! | Extractor | Proves |
//! |-----------|--------|
//! | [`BearerToken`] | an `Authorization: Bearer …` header is present |
//! | [`SessionAuth`] | the token belongs to a live session |
//! | [`Authenticated`] | the session's subject is a registered user |

use std::sync::Arc;

use agora_core::{
  Agora, AuthFailure, Error as CoreError, gateway::{IdentityGateway, MediaStore},
  session::SessionIdentity, store::SocialStore, user::User,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};

use crate::error::ApiError;

/// The raw access token from the `Authorization` header.
pub struct BearerToken(pub String);

/// A validated session, possibly for a subject that has not registered yet.
pub struct SessionAuth(pub SessionIdentity);

/// A validated session bound to its internal user.
pub struct Authenticated(pub User);

/// Pull the bearer token out of the request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let missing = || ApiError::Core(CoreError::Unauthenticated(AuthFailure::Invalid));

  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(missing)?;

  let (scheme, token) = value.split_once(' ').ok_or_else(missing)?;
  if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
    return Err(missing());
  }
  Ok(token.trim())
}

impl<S, G, M> FromRequestParts<Arc<Agora<S, G, M>>> for BearerToken
where
  S: SocialStore + 'static,
  G: IdentityGateway + 'static,
  M: MediaStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &Arc<Agora<S, G, M>>,
  ) -> Result<Self, Self::Rejection> {
    Ok(BearerToken(bearer_token(&parts.headers)?.to_owned()))
  }
}

impl<S, G, M> FromRequestParts<Arc<Agora<S, G, M>>> for SessionAuth
where
  S: SocialStore + 'static,
  G: IdentityGateway + 'static,
  M: MediaStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<Agora<S, G, M>>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    Ok(SessionAuth(state.validate_session(token).await?))
  }
}

impl<S, G, M> FromRequestParts<Arc<Agora<S, G, M>>> for Authenticated
where
  S: SocialStore + 'static,
  G: IdentityGateway + 'static,
  M: MediaStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &Arc<Agora<S, G, M>>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    Ok(Authenticated(state.authenticate(token).await?))
  }
}
