//! API error type and [`axum::response::IntoResponse`] implementation.

use agora_core::{AuthFailure, Error as CoreError, ErrorKind};
use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  /// The request could not be decoded into something the core understands.
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
    ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let err = match self {
      ApiError::Core(e) => e,
      ApiError::BadRequest(m) => CoreError::InvalidInput(m),
    };

    let kind = err.kind();
    let body = match &err {
      CoreError::Unauthenticated(reason) => {
        json!({ "error": err.to_string(), "kind": kind, "reason": reason })
      }
      _ => json!({ "error": err.to_string(), "kind": kind }),
    };
    let mut res = (status_for(kind), Json(body)).into_response();

    match err {
      // Token problems get a bearer challenge; a refused password does not.
      CoreError::Unauthenticated(reason) if reason != AuthFailure::BadCredentials => {
        let challenge = format!(
          "Bearer error=\"invalid_token\", error_description=\"{}\"",
          reason.as_str()
        );
        if let Ok(value) = HeaderValue::from_str(&challenge) {
          res.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
      }
      CoreError::Transient(_) => {
        res.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
      }
      _ => {}
    }
    res
  }
}
