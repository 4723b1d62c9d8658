//! [`Agora`] — the caller-facing operations, independent of transport.
//!
//! Wires the session manager, user directory, content store and engagement
//! ledger to one storage backend and the two external collaborators. Each
//! method returns `Ok(payload)` or one [`Error`] variant.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  AuthFailure, Error, Result, bounded,
  config::CoreConfig,
  content::ContentStore,
  directory::UserDirectory,
  gateway::{AuthError, IdentityGateway, ImageUpload, MediaStore, UploadError},
  ledger::EngagementLedger,
  like::LikeToggle,
  post::{Category, Comment, CommentView, FeedQuery, NewPost, Post, PostView, validate_post_content},
  session::{SessionIdentity, SessionManager, SessionTokens},
  store::SocialStore,
  user::{NewUser, User},
};

/// Result of a successful login.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoginOutcome {
  #[serde(flatten)]
  pub session: SessionTokens,
  /// `None` until the subject completes registration.
  pub user_id: Option<Uuid>,
}

/// Profile fields supplied at registration. The external subject comes from
/// the validated session, never from the caller.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Registration {
  pub username:   String,
  pub first_name: String,
  pub last_name:  String,
}

pub struct Agora<S, G, M> {
  config:    CoreConfig,
  sessions:  SessionManager<S>,
  directory: UserDirectory<S>,
  content:   Arc<ContentStore<S>>,
  ledger:    EngagementLedger<S>,
  gateway:   G,
  media:     M,
}

impl<S, G, M> Agora<S, G, M>
where
  S: SocialStore,
  G: IdentityGateway,
  M: MediaStore,
{
  pub fn new(store: Arc<S>, gateway: G, media: M, config: CoreConfig) -> Self {
    let timeout = config.storage_timeout;
    let content = Arc::new(ContentStore::new(store.clone(), timeout));
    Self {
      sessions: SessionManager::new(store.clone(), &config),
      directory: UserDirectory::new(store.clone(), timeout),
      ledger: EngagementLedger::new(store, content.clone(), timeout),
      content,
      gateway,
      media,
      config,
    }
  }

  pub fn config(&self) -> &CoreConfig { &self.config }

  pub fn sessions(&self) -> &SessionManager<S> { &self.sessions }

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Verify credentials with the identity gateway and start a session.
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
    if email.trim().is_empty() || password.is_empty() {
      return Err(Error::invalid("email and password are required"));
    }

    let subject_id = bounded::within(
      self.config.upstream_timeout,
      "verify_credentials",
      self.gateway.verify_credentials(email.to_owned(), password.to_owned()),
    )
    .await?
    .map_err(|e| match e {
      AuthError::InvalidCredentials => Error::Unauthenticated(AuthFailure::BadCredentials),
      AuthError::Unavailable(msg) => {
        warn!(error = %msg, "identity gateway unavailable");
        Error::Transient(msg)
      }
    })?;

    let session = self.sessions.issue(&subject_id).await?;
    let user_id = self
      .directory
      .find_by_external_id(&subject_id)
      .await?
      .map(|u| u.user_id);

    info!(subject = %subject_id, registered = user_id.is_some(), "login");
    Ok(LoginOutcome { session, user_id })
  }

  pub async fn validate_session(&self, access_token: &str) -> Result<SessionIdentity> {
    self.sessions.validate(access_token).await
  }

  pub async fn rotate_session(&self, refresh_token: &str) -> Result<SessionTokens> {
    self.sessions.rotate(refresh_token).await
  }

  pub async fn logout(&self, access_token: &str) -> Result<()> {
    let identity = self.sessions.validate(access_token).await?;
    self.sessions.revoke(&identity).await
  }

  /// Validate a session and bind it to its internal user.
  ///
  /// A live session whose subject never registered is authenticated but may
  /// not act, hence `Forbidden`.
  pub async fn authenticate(&self, access_token: &str) -> Result<User> {
    let identity = self.sessions.validate(access_token).await?;
    self.current_user(&identity).await
  }

  pub async fn current_user(&self, identity: &SessionIdentity) -> Result<User> {
    self
      .directory
      .find_by_external_id(&identity.subject_id)
      .await?
      .ok_or_else(|| Error::Forbidden("session subject has not registered".into()))
  }

  // ── Users ─────────────────────────────────────────────────────────────

  pub async fn register_user(&self, identity: &SessionIdentity, input: Registration) -> Result<User> {
    self
      .directory
      .register(NewUser {
        external_subject_id: identity.subject_id.clone(),
        username:            input.username,
        first_name:          input.first_name,
        last_name:           input.last_name,
      })
      .await
  }

  pub async fn lookup_user(&self, user_id: Uuid) -> Result<User> { self.directory.lookup(user_id).await }

  pub async fn lookup_by_external_id(&self, external_subject_id: &str) -> Result<User> {
    self.directory.lookup_by_external_id(external_subject_id).await
  }

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Create a post, uploading its image first.
  ///
  /// Every precondition is checked before the upload, and a failed or
  /// timed-out upload aborts before anything is written, so no post points at
  /// a missing image. An upload whose post insert then fails leaves an
  /// unreferenced image behind for the media store to collect.
  pub async fn create_post(
    &self,
    author_id: Uuid,
    content: String,
    category: Category,
    image: Option<ImageUpload>,
  ) -> Result<Post> {
    validate_post_content(&content)?;
    if let Some(image) = &image {
      image.validate(self.config.max_image_bytes)?;
    }
    self.content.require_user(author_id).await?;

    let image_url = match image {
      Some(image) => Some(self.upload(image).await?),
      None => None,
    };

    self
      .content
      .create_post(NewPost { author_id, content, category, image_url })
      .await
  }

  pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> { self.content.get_post(post_id).await }

  pub async fn list_posts(&self, query: FeedQuery) -> Result<Vec<PostView>> {
    self.content.list_posts(query).await
  }

  pub async fn soft_delete_post(&self, post_id: Uuid, requesting_user_id: Uuid) -> Result<()> {
    self.content.soft_delete_post(post_id, requesting_user_id).await
  }

  // ── Comments ──────────────────────────────────────────────────────────

  pub async fn create_comment(&self, author_id: Uuid, post_id: Uuid, content: String) -> Result<Comment> {
    self.content.create_comment(author_id, post_id, content).await
  }

  pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
    self.content.list_comments(post_id).await
  }

  // ── Likes ─────────────────────────────────────────────────────────────

  pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle> {
    self.ledger.toggle_like(user_id, post_id).await
  }

  pub async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
    self.ledger.has_liked(user_id, post_id).await
  }

  pub async fn like_count(&self, post_id: Uuid) -> Result<u64> { self.ledger.like_count(post_id).await }

  async fn upload(&self, image: ImageUpload) -> Result<String> {
    let size = image.bytes.len();
    let url = bounded::within(
      self.config.upstream_timeout,
      "media_store",
      self.media.store(image.bytes, image.content_type),
    )
    .await?
    .map_err(|e| match e {
      UploadError::Rejected(msg) => Error::InvalidInput(msg),
      UploadError::Unavailable(msg) => {
        warn!(error = %msg, "media store unavailable");
        Error::Transient(msg)
      }
    })?;

    debug!(%url, size, "image stored");
    Ok(url)
  }
}
