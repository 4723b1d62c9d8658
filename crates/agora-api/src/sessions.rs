//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"email":…,"password":…}` |
//! | `POST` | `/auth/refresh` | Body: `{"refresh_token":…}`; the token is consumed |
//! | `POST` | `/auth/logout` | Ends the bearer's session |
//! | `GET`  | `/auth/session` | Describes the bearer's session |
//! | `POST` | `/auth/register` | Creates the user for the bearer's subject |

use std::sync::Arc;

use agora_core::{
  Agora, LoginOutcome, Registration,
  gateway::{IdentityGateway, MediaStore},
  session::{SessionIdentity, SessionTokens},
  store::SocialStore,
  user::User,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::{
  auth::{BearerToken, SessionAuth},
  error::ApiError,
  extract::JsonBody,
};

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<LoginOutcome>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  Ok(Json(agora.login(&body.email, &body.password).await?))
}

// ─── Refresh ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
  pub refresh_token: String,
}

/// `POST /auth/refresh`
pub async fn refresh<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  JsonBody(body): JsonBody<RefreshBody>,
) -> Result<Json<SessionTokens>, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  Ok(Json(agora.rotate_session(&body.refresh_token).await?))
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  BearerToken(token): BearerToken,
) -> Result<StatusCode, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  agora.logout(&token).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Session ──────────────────────────────────────────────────────────────────

/// `GET /auth/session`
pub async fn session(SessionAuth(identity): SessionAuth) -> Json<SessionIdentity> {
  Json(identity)
}

// ─── Register ─────────────────────────────────────────────────────────────────

/// `POST /auth/register` — body: `{"username":…,"first_name":…,"last_name":…}`
pub async fn register<S, G, M>(
  State(agora): State<Arc<Agora<S, G, M>>>,
  SessionAuth(identity): SessionAuth,
  JsonBody(body): JsonBody<Registration>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  let user: User = agora.register_user(&identity, body).await?;
  Ok((StatusCode::CREATED, Json(user)))
}
