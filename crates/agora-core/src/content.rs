//! Content store: posts and comments.
//!
//! Every read here passes [`Visibility::ActiveOnly`] down to storage. Callers
//! never filter soft-deleted rows themselves.

use std::{sync::Arc, time::Duration};

use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result, bounded,
  post::{
    Comment, CommentView, FeedQuery, NewComment, NewPost, Post, PostView, Visibility,
  },
  store::{Deactivation, SocialStore},
};

pub struct ContentStore<S> {
  store:   Arc<S>,
  timeout: Duration,
}

impl<S: SocialStore> ContentStore<S> {
  pub fn new(store: Arc<S>, timeout: Duration) -> Self { Self { store, timeout } }

  /// Persist a post. The author must exist; an image URL, if any, is stored
  /// as-is.
  pub async fn create_post(&self, input: NewPost) -> Result<Post> {
    input.validate()?;
    self.require_user(input.author_id).await?;

    let post = bounded::storage(self.timeout, "insert_post", self.store.insert_post(input)).await?;
    info!(post = %post.post_id, author = %post.author_id, category = %post.category, "post created");
    Ok(post)
  }

  pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
    bounded::storage(
      self.timeout,
      "get_post_view",
      self.store.get_post_view(post_id, Visibility::ActiveOnly),
    )
    .await?
    .ok_or(Error::NotFound("post"))
  }

  /// The feed: active posts, newest first.
  pub async fn list_posts(&self, query: FeedQuery) -> Result<Vec<PostView>> {
    bounded::storage(
      self.timeout,
      "list_posts",
      self.store.list_posts(query, Visibility::ActiveOnly),
    )
    .await
  }

  /// Soft-delete a post. Only its author may do so.
  pub async fn soft_delete_post(&self, post_id: Uuid, requesting_user_id: Uuid) -> Result<()> {
    let post = self.active_post(post_id).await?;
    if post.author_id != requesting_user_id {
      return Err(Error::Forbidden("only the author may delete a post".into()));
    }

    match bounded::storage(
      self.timeout,
      "deactivate_post",
      self.store.deactivate_post(post_id, requesting_user_id),
    )
    .await?
    {
      Deactivation::Deactivated => {
        info!(post = %post_id, "post soft-deleted");
        Ok(())
      }
      Deactivation::NotAuthor => Err(Error::Forbidden("only the author may delete a post".into())),
      Deactivation::Missing => Err(Error::NotFound("post")),
    }
  }

  /// Add a comment to an active post.
  ///
  /// Checks run in a fixed order and all of them before anything is written:
  /// content shape, then the post, then the author.
  pub async fn create_comment(&self, author_id: Uuid, post_id: Uuid, content: String) -> Result<Comment> {
    let input = NewComment { post_id, author_id, content };
    input.validate()?;

    self.active_post(post_id).await?;
    self.require_user(author_id).await?;

    // The insert re-checks the post, so a delete racing with this call still
    // cannot leave a comment on an inactive post.
    let comment = bounded::storage(self.timeout, "insert_comment", self.store.insert_comment(input))
      .await?
      .ok_or(Error::NotFound("post"))?;

    info!(comment = %comment.comment_id, post = %post_id, "comment created");
    Ok(comment)
  }

  /// All active comments of an active post, newest first. Empty for a
  /// missing or deleted post.
  pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
    bounded::storage(
      self.timeout,
      "list_comments",
      self.store.list_comments(post_id, Visibility::ActiveOnly),
    )
    .await
  }

  pub(crate) async fn active_post(&self, post_id: Uuid) -> Result<Post> {
    bounded::storage(
      self.timeout,
      "get_post",
      self.store.get_post(post_id, Visibility::ActiveOnly),
    )
    .await?
    .ok_or(Error::NotFound("post"))
  }

  pub(crate) async fn require_user(&self, user_id: Uuid) -> Result<()> {
    bounded::storage(self.timeout, "get_user", self.store.get_user(user_id))
      .await?
      .map(|_| ())
      .ok_or(Error::NotFound("user"))
  }
}
