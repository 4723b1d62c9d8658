//! JSON REST API for Agora.
//!
//! Exposes an axum [`Router`] over an [`Agora`] instance. Every route except
//! login and refresh expects `Authorization: Bearer <access token>`. TLS and
//! static file serving are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(agora_api::api_router(agora.clone()))
//! ```

pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod likes;
pub mod posts;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use agora_core::{
  Agora,
  gateway::{IdentityGateway, MediaStore},
  store::SocialStore,
};
use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Build the API router for `agora`.
///
/// The returned `Router<()>` can be merged or nested into any parent router
/// regardless of its own state type.
pub fn api_router<S, G, M>(agora: Arc<Agora<S, G, M>>) -> Router<()>
where
  S: SocialStore + 'static,
  G: IdentityGateway + 'static,
  M: MediaStore + 'static,
{
  Router::new()
    // Sessions
    .route("/auth/login", post(sessions::login::<S, G, M>))
    .route("/auth/refresh", post(sessions::refresh::<S, G, M>))
    .route("/auth/logout", post(sessions::logout::<S, G, M>))
    .route("/auth/session", get(sessions::session))
    .route("/auth/register", post(sessions::register::<S, G, M>))
    // Users
    .route("/users/me", get(users::me))
    .route("/users/{id}", get(users::get_one::<S, G, M>))
    // Posts
    .route("/posts", get(posts::list::<S, G, M>).post(posts::create::<S, G, M>))
    .route("/posts/{id}", get(posts::get_one::<S, G, M>).delete(posts::delete_one::<S, G, M>))
    // Comments
    .route(
      "/posts/{id}/comments",
      get(comments::list::<S, G, M>).post(comments::create::<S, G, M>),
    )
    // Likes
    .route("/posts/{id}/like", get(likes::status::<S, G, M>).post(likes::toggle::<S, G, M>))
    .layer(TraceLayer::new_for_http())
    .with_state(agora)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  use agora_core::{
    CoreConfig,
    gateway::{AuthError, UploadError},
  };
  use agora_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use bytes::Bytes;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  struct Accounts(HashMap<String, (String, String)>);

  impl IdentityGateway for Accounts {
    async fn verify_credentials(&self, email: String, password: String) -> Result<String, AuthError> {
      match self.0.get(&email) {
        Some((pw, subject)) if *pw == password => Ok(subject.clone()),
        _ => Err(AuthError::InvalidCredentials),
      }
    }
  }

  struct Media;

  impl MediaStore for Media {
    async fn store(&self, bytes: Bytes, _content_type: String) -> Result<String, UploadError> {
      Ok(format!("https://media.test/{}.png", bytes.len()))
    }
  }

  type TestAgora = Agora<SqliteStore, Accounts, Media>;

  async fn make_agora() -> Arc<TestAgora> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let accounts = Accounts(HashMap::from([
      ("ann@example.com".to_string(), ("pw-ann".to_string(), "subject-ann".to_string())),
      ("bob@example.com".to_string(), ("pw-bob".to_string(), "subject-bob".to_string())),
    ]));
    Arc::new(Agora::new(Arc::new(store), accounts, Media, CoreConfig::new("api-test-secret")))
  }

  async fn send(
    agora: &Arc<TestAgora>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    api_router(agora.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn login(agora: &Arc<TestAgora>, email: &str, password: &str) -> Value {
    let res = send(agora, "POST", "/auth/login", None, Some(json!({
      "email": email, "password": password,
    })))
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    json_body(res).await
  }

  /// Log in and register; returns the access token.
  async fn sign_up(agora: &Arc<TestAgora>, email: &str, password: &str, username: &str) -> String {
    let session = login(agora, email, password).await;
    let token = session["access_token"].as_str().unwrap().to_string();
    let res = send(agora, "POST", "/auth/register", Some(&token), Some(json!({
      "username": username, "first_name": "Test", "last_name": "User",
    })))
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    token
  }

  async fn create_post(agora: &Arc<TestAgora>, token: &str, content: &str) -> Value {
    let res = send(agora, "POST", "/posts", Some(token), Some(json!({
      "content": content, "category": "GENERAL",
    })))
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    json_body(res).await
  }

  // ── Sessions ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn login_reports_missing_registration() {
    let agora = make_agora().await;
    let session = login(&agora, "ann@example.com", "pw-ann").await;
    assert!(session["user_id"].is_null());
    assert_eq!(session["subject_id"], "subject-ann");
    assert!(session["refresh_token"].as_str().unwrap().len() == 64);
  }

  #[tokio::test]
  async fn wrong_password_is_unauthorized_without_challenge() {
    let agora = make_agora().await;
    let res = send(&agora, "POST", "/auth/login", None, Some(json!({
      "email": "ann@example.com", "password": "nope",
    })))
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(header::WWW_AUTHENTICATE).is_none());
    assert_eq!(json_body(res).await["reason"], "bad_credentials");
  }

  #[tokio::test]
  async fn missing_bearer_gets_challenge() {
    let agora = make_agora().await;
    let res = send(&agora, "GET", "/posts", None, None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().get(header::WWW_AUTHENTICATE).is_some());
  }

  #[tokio::test]
  async fn unregistered_session_is_forbidden_from_content() {
    let agora = make_agora().await;
    let session = login(&agora, "ann@example.com", "pw-ann").await;
    let token = session["access_token"].as_str().unwrap();

    let res = send(&agora, "GET", "/auth/session", Some(token), None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(&agora, "GET", "/posts", Some(token), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn refresh_rotates_once() {
    let agora = make_agora().await;
    let session = login(&agora, "ann@example.com", "pw-ann").await;
    let refresh = session["refresh_token"].as_str().unwrap();

    let res = send(&agora, "POST", "/auth/refresh", None, Some(json!({ "refresh_token": refresh }))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let next = json_body(res).await;
    assert_ne!(next["refresh_token"], session["refresh_token"]);

    let replay = send(&agora, "POST", "/auth/refresh", None, Some(json!({ "refresh_token": refresh }))).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(replay).await["reason"], "rejected");

    let old = send(&agora, "GET", "/auth/session", session["access_token"].as_str(), None).await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn logout_ends_session() {
    let agora = make_agora().await;
    let token = sign_up(&agora, "ann@example.com", "pw-ann", "ann").await;

    let res = send(&agora, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = send(&agora, "GET", "/users/me", Some(&token), None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn duplicate_username_conflicts() {
    let agora = make_agora().await;
    sign_up(&agora, "ann@example.com", "pw-ann", "shared").await;

    let session = login(&agora, "bob@example.com", "pw-bob").await;
    let token = session["access_token"].as_str().unwrap();
    let res = send(&agora, "POST", "/auth/register", Some(token), Some(json!({
      "username": "shared", "first_name": "Bob", "last_name": "B",
    })))
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(res).await["kind"], "conflict");
  }

  // ── Users ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn me_and_profile_lookup() {
    let agora = make_agora().await;
    let ann = sign_up(&agora, "ann@example.com", "pw-ann", "ann").await;
    let bob = sign_up(&agora, "bob@example.com", "pw-bob", "bob").await;

    let me = json_body(send(&agora, "GET", "/users/me", Some(&ann), None).await).await;
    assert_eq!(me["username"], "ann");

    let uri = format!("/users/{}", me["user_id"].as_str().unwrap());
    let profile = json_body(send(&agora, "GET", &uri, Some(&bob), None).await).await;
    assert_eq!(profile["username"], "ann");
    assert!(profile.get("external_subject_id").is_none());

    let res = send(&agora, "GET", &format!("/users/{}", uuid::Uuid::new_v4()), Some(&bob), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }

  // ── Posts, comments, likes ──────────────────────────────────────────────────

  #[tokio::test]
  async fn post_like_comment_flow() {
    let agora = make_agora().await;
    let ann = sign_up(&agora, "ann@example.com", "pw-ann", "ann").await;
    let bob = sign_up(&agora, "bob@example.com", "pw-bob", "bob").await;

    let post = create_post(&agora, &ann, "hello").await;
    assert_eq!(post["category"], "GENERAL");
    assert_eq!(post["is_active"], true);
    let post_uri = format!("/posts/{}", post["post_id"].as_str().unwrap());

    let like_uri = format!("{post_uri}/like");
    let liked = json_body(send(&agora, "POST", &like_uri, Some(&bob), None).await).await;
    assert_eq!(liked, json!({ "liked": true, "likes_count": 1 }));
    let unliked = json_body(send(&agora, "POST", &like_uri, Some(&bob), None).await).await;
    assert_eq!(unliked, json!({ "liked": false, "likes_count": 0 }));

    let comments_uri = format!("{post_uri}/comments");
    let res = send(&agora, "POST", &comments_uri, Some(&bob), Some(json!({ "content": "nice" }))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = send(&agora, "POST", &comments_uri, Some(&bob), Some(json!({ "content": "" }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let listed = json_body(send(&agora, "GET", &comments_uri, Some(&ann), None).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["author"]["username"], "bob");

    let view = json_body(send(&agora, "GET", &post_uri, Some(&bob), None).await).await;
    assert_eq!(view["comments_count"], 1);
    assert_eq!(view["likes_count"], 0);
    assert_eq!(view["author"]["username"], "ann");
    assert_eq!(view["author"]["user_id"], post["author_id"]);

    let res = send(&agora, "DELETE", &post_uri, Some(&bob), None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = send(&agora, "DELETE", &post_uri, Some(&ann), None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = send(&agora, "POST", &like_uri, Some(&bob), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = send(&agora, "GET", &post_uri, Some(&bob), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let listed = json_body(send(&agora, "GET", &comments_uri, Some(&ann), None).await).await;
    assert!(listed.as_array().unwrap().is_empty());
  }

  #[tokio::test]
  async fn feed_lists_newest_first() {
    let agora = make_agora().await;
    let ann = sign_up(&agora, "ann@example.com", "pw-ann", "ann").await;
    for text in ["one", "two", "three"] {
      create_post(&agora, &ann, text).await;
    }

    let feed = json_body(send(&agora, "GET", "/posts?limit=2", Some(&ann), None).await).await;
    let contents: Vec<_> = feed.as_array().unwrap().iter().map(|p| p["content"].clone()).collect();
    assert_eq!(contents, [json!("three"), json!("two")]);
    assert_eq!(feed[0]["author"]["username"], "ann");

    let last = &feed[1];
    let uri = format!(
      "/posts?limit=2&before={}&before_id={}",
      last["created_at"].as_str().unwrap(),
      last["post_id"].as_str().unwrap(),
    );
    let rest = json_body(send(&agora, "GET", &uri, Some(&ann), None).await).await;
    let contents: Vec<_> = rest.as_array().unwrap().iter().map(|p| p["content"].clone()).collect();
    assert_eq!(contents, [json!("one")]);
  }

  #[tokio::test]
  async fn malformed_requests_get_json_errors() {
    let agora = make_agora().await;
    let ann = sign_up(&agora, "ann@example.com", "pw-ann", "ann").await;

    let res = send(&agora, "GET", "/posts/not-a-uuid", Some(&ann), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["kind"], "invalid_input");

    let res = send(&agora, "POST", "/posts/not-a-uuid/like", Some(&ann), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["kind"], "invalid_input");

    let res = send(&agora, "GET", "/posts?limit=lots", Some(&ann), None).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["kind"], "invalid_input");

    // Well-formed JSON missing a required field.
    let res = send(&agora, "POST", "/posts", Some(&ann), Some(json!({ "content": "hi" }))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["kind"], "invalid_input");

    // Not JSON at all.
    let req = Request::builder()
      .method("POST")
      .uri("/auth/login")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{email:"))
      .unwrap();
    let res = api_router(agora.clone()).oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["kind"], "invalid_input");
    assert!(body["error"].as_str().unwrap().starts_with("invalid input"));
  }

  #[tokio::test]
  async fn unknown_category_is_bad_request() {
    let agora = make_agora().await;
    let ann = sign_up(&agora, "ann@example.com", "pw-ann", "ann").await;
    let res = send(&agora, "POST", "/posts", Some(&ann), Some(json!({
      "content": "hi", "category": "RANT",
    })))
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["kind"], "invalid_input");
  }

  #[tokio::test]
  async fn image_is_uploaded_from_base64() {
    let agora = make_agora().await;
    let ann = sign_up(&agora, "ann@example.com", "pw-ann", "ann").await;

    let res = send(&agora, "POST", "/posts", Some(&ann), Some(json!({
      "content": "pic", "category": "ANNOUNCEMENT", "image": B64.encode([1u8, 2, 3, 4]),
    })))
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json_body(res).await["image_url"], "https://media.test/4.png");

    let res = send(&agora, "POST", "/posts", Some(&ann), Some(json!({
      "content": "pic", "category": "GENERAL", "image": "%%%",
    })))
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(&agora, "POST", "/posts", Some(&ann), Some(json!({
      "content": "pic", "category": "GENERAL", "image": B64.encode(b"x"),
      "image_content_type": "text/plain",
    })))
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
  }
}
