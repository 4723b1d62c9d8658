//! The `SocialStore` trait.
//!
//! Implemented by storage backends (e.g. `agora-store-sqlite`). The core
//! components depend on this abstraction, never on a concrete backend.
//!
//! Cross-request ordering guarantees live here, not in application locks:
//! several server instances may share one database, so the two races the core
//! cares about are settled by the backend's own atomic primitives.
//!
//! - [`SocialStore::insert_like`] relies on a unique `(user_id, post_id)` index
//!   and reports a violation as [`LikeInsert::AlreadyLiked`] instead of an
//!   error.
//! - [`SocialStore::rotate_session`] is a compare-and-swap on the refresh
//!   token digest; at most one caller can consume a given token.

use std::future::Future;

use uuid::Uuid;

use crate::{
  like::LikeInsert,
  post::{Comment, CommentView, FeedQuery, NewComment, NewPost, Post, PostView, Visibility},
  session::{SessionGrant, SessionRecord},
  user::{NewUser, User},
};

/// Result of [`SocialStore::insert_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInsert {
  Inserted(User),
  DuplicateUsername,
  DuplicateSubject,
}

/// Result of [`SocialStore::deactivate_post`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deactivation {
  Deactivated,
  /// The post exists and is active, but belongs to someone else.
  NotAuthor,
  /// The post does not exist or is already inactive.
  Missing,
}

/// Abstraction over the relational store backing the core.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded runtime behind `axum`.
pub trait SocialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert a user. Uniqueness of `username` and `external_subject_id` is
  /// checked by the insert itself, so two racing registrations cannot both
  /// succeed.
  fn insert_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserInsert, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_subject(
    &self,
    external_subject_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Persist a new, active post. `created_at` is set by the store.
  fn insert_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    post_id: Uuid,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// A single post with computed like and comment counts.
  fn get_post_view(
    &self,
    post_id: Uuid,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Option<PostView>, Self::Error>> + Send + '_;

  /// Posts newest first, with computed counts.
  fn list_posts(
    &self,
    query: FeedQuery,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Vec<PostView>, Self::Error>> + Send + '_;

  /// Flip `is_active` to false if the post is active and authored by
  /// `author_id`. Comments and likes are left in place.
  fn deactivate_post(
    &self,
    post_id: Uuid,
    author_id: Uuid,
  ) -> impl Future<Output = Result<Deactivation, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Insert a comment only if its post is active, in one statement. Returns
  /// `None` when the post is missing or inactive.
  fn insert_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Comments for a post, newest first. With [`Visibility::ActiveOnly`] both
  /// the comments and their post must be active.
  fn list_comments(
    &self,
    post_id: Uuid,
    visibility: Visibility,
  ) -> impl Future<Output = Result<Vec<CommentView>, Self::Error>> + Send + '_;

  // ── Likes ─────────────────────────────────────────────────────────────

  /// Insert a like if the post is active. A unique-index violation is
  /// reported as [`LikeInsert::AlreadyLiked`].
  fn insert_like(
    &self,
    user_id: Uuid,
    post_id: Uuid,
  ) -> impl Future<Output = Result<LikeInsert, Self::Error>> + Send + '_;

  /// Delete the like for the pair. Returns whether a row was removed.
  fn delete_like(
    &self,
    user_id: Uuid,
    post_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn has_like(
    &self,
    user_id: Uuid,
    post_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn count_likes(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Start a fresh session for `subject_id`, superseding every live session
  /// the subject already holds, atomically.
  fn create_session(
    &self,
    subject_id: String,
    grant: SessionGrant,
  ) -> impl Future<Output = Result<SessionRecord, Self::Error>> + Send + '_;

  /// Consume the live, unexpired session whose refresh digest is
  /// `refresh_hash` and replace it with `grant`, atomically. Returns `None`
  /// if no such session exists (unknown, expired or already rotated).
  fn rotate_session(
    &self,
    refresh_hash: String,
    grant: SessionGrant,
  ) -> impl Future<Output = Result<Option<SessionRecord>, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<SessionRecord>, Self::Error>> + Send + '_;

  /// Mark a live session superseded. Returns whether it was live.
  fn end_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
