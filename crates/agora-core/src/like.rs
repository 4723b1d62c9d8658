//! Likes. At most one row exists per `(user_id, post_id)` pair; the storage
//! layer's unique index is what enforces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
  pub like_id:    Uuid,
  pub user_id:    Uuid,
  pub post_id:    Uuid,
  pub created_at: DateTime<Utc>,
}

/// Result of the store's conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeInsert {
  Inserted(Like),
  /// The unique `(user_id, post_id)` index rejected the row: a like already
  /// exists, possibly inserted by a concurrent toggle.
  AlreadyLiked,
  /// The post is missing or no longer active. Nothing was written.
  PostUnavailable,
}

/// Outcome of a toggle, reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
  pub liked: bool,
}
