//! Engagement ledger: likes and the toggle protocol.
//!
//! A toggle reads whether the pair is liked and then deletes or inserts. The
//! read is only a hint; the unique `(user_id, post_id)` index decides. When an
//! insert loses to a concurrent one, the toggle turns into an unlike; when a
//! delete finds the row already gone, it turns back into an insert. Like
//! counts are always computed from rows, never stored.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result, bounded,
  content::ContentStore,
  like::{LikeInsert, LikeToggle},
  store::SocialStore,
};

/// Insert/delete attempts before a toggle gives up with a conflict.
pub const TOGGLE_ATTEMPTS: usize = 4;

pub struct EngagementLedger<S> {
  store:   Arc<S>,
  content: Arc<ContentStore<S>>,
  timeout: std::time::Duration,
}

impl<S: SocialStore> EngagementLedger<S> {
  pub fn new(store: Arc<S>, content: Arc<ContentStore<S>>, timeout: std::time::Duration) -> Self {
    Self { store, content, timeout }
  }

  pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle> {
    self.content.active_post(post_id).await?;
    self.content.require_user(user_id).await?;

    let mut liked =
      bounded::storage(self.timeout, "has_like", self.store.has_like(user_id, post_id)).await?;

    for attempt in 1..=TOGGLE_ATTEMPTS {
      if liked {
        let removed =
          bounded::storage(self.timeout, "delete_like", self.store.delete_like(user_id, post_id))
            .await?;
        if removed {
          debug!(user = %user_id, post = %post_id, "like removed");
          return Ok(LikeToggle { liked: false });
        }
        debug!(user = %user_id, post = %post_id, attempt, "like vanished under a concurrent toggle");
        liked = false;
      } else {
        match bounded::storage(self.timeout, "insert_like", self.store.insert_like(user_id, post_id))
          .await?
        {
          LikeInsert::Inserted(_) => {
            debug!(user = %user_id, post = %post_id, "like added");
            return Ok(LikeToggle { liked: true });
          }
          LikeInsert::AlreadyLiked => {
            debug!(user = %user_id, post = %post_id, attempt, "like already present; toggling off");
            liked = true;
          }
          LikeInsert::PostUnavailable => return Err(Error::NotFound("post")),
        }
      }
    }

    Err(Error::Conflict("like toggle raced with concurrent toggles; try again".into()))
  }

  /// Whether the pair is currently liked. A pure read of committed state.
  pub async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
    bounded::storage(self.timeout, "has_like", self.store.has_like(user_id, post_id)).await
  }

  /// Like count of an active post, computed from like rows.
  pub async fn like_count(&self, post_id: Uuid) -> Result<u64> {
    self.content.active_post(post_id).await?;
    bounded::storage(self.timeout, "count_likes", self.store.count_likes(post_id)).await
  }
}
