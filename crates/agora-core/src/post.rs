//! Posts and comments.
//!
//! Deletion is soft: a post's `is_active` flips to `false` and it disappears,
//! together with its comments, from every read path. No like or comment row is
//! physically removed as a side effect.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, user::Profile};

pub const POST_CONTENT_MAX: usize = 5_000;
pub const COMMENT_CONTENT_MAX: usize = 200;

// ─── Category ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
  General,
  Announcement,
  Question,
}

impl Category {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::General => "GENERAL",
      Self::Announcement => "ANNOUNCEMENT",
      Self::Question => "QUESTION",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Category {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "GENERAL" => Ok(Self::General),
      "ANNOUNCEMENT" => Ok(Self::Announcement),
      "QUESTION" => Ok(Self::Question),
      other => Err(Error::invalid(format!("unknown category: {other:?}"))),
    }
  }
}

// ─── Visibility ──────────────────────────────────────────────────────────────

/// Which rows a read may return.
///
/// Every read path of the content store passes [`Visibility::ActiveOnly`];
/// `All` exists for ownership checks that must see a deactivated post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  ActiveOnly,
  All,
}

// ─── Post ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub post_id:    Uuid,
  pub author_id:  Uuid,
  pub content:    String,
  pub category:   Category,
  /// Opaque URL returned by the media collaborator. Never dereferenced here.
  pub image_url:  Option<String>,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
  pub author_id: Uuid,
  pub content:   String,
  pub category:  Category,
  pub image_url: Option<String>,
}

impl NewPost {
  pub fn validate(&self) -> Result<()> { validate_post_content(&self.content) }
}

pub fn validate_post_content(content: &str) -> Result<()> {
  if content.trim().is_empty() {
    return Err(Error::invalid("post content is empty"));
  }
  if content.chars().count() > POST_CONTENT_MAX {
    return Err(Error::invalid(format!(
      "post content is longer than {POST_CONTENT_MAX} characters"
    )));
  }
  Ok(())
}

/// A post with its author's public profile and computed engagement counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
  #[serde(flatten)]
  pub post:           Post,
  pub author:         Profile,
  pub likes_count:    u64,
  pub comments_count: u64,
}

/// Parameters for the feed read.
///
/// The feed is ordered by `(created_at, post_id)` descending. To fetch the
/// next page pass the last item's `created_at` as `before` and its `post_id`
/// as `before_id`; posts sharing that timestamp are then continued rather than
/// skipped. `before` alone keeps only posts strictly older than the instant.
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
  pub before:    Option<DateTime<Utc>>,
  pub before_id: Option<Uuid>,
  pub limit:     Option<usize>,
}

impl FeedQuery {
  pub const DEFAULT_LIMIT: usize = 20;
  pub const MAX_LIMIT: usize = 100;

  /// Cursor continuing after `last`.
  pub fn after(last: &Post, limit: Option<usize>) -> Self {
    Self { before: Some(last.created_at), before_id: Some(last.post_id), limit }
  }

  pub fn effective_limit(&self) -> usize {
    self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
  }
}

// ─── Comment ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub post_id:    Uuid,
  pub author_id:  Uuid,
  pub content:    String,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
  pub post_id:   Uuid,
  pub author_id: Uuid,
  pub content:   String,
}

impl NewComment {
  pub fn validate(&self) -> Result<()> {
    if self.content.trim().is_empty() {
      return Err(Error::invalid("comment content is empty"));
    }
    if self.content.chars().count() > COMMENT_CONTENT_MAX {
      return Err(Error::invalid(format!(
        "comment is longer than {COMMENT_CONTENT_MAX} characters"
      )));
    }
    Ok(())
  }
}

/// A comment joined with its author's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
  #[serde(flatten)]
  pub comment: Comment,
  pub author:  Profile,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn category_parses_only_the_three_values() {
    assert_eq!("GENERAL".parse::<Category>().unwrap(), Category::General);
    assert_eq!("ANNOUNCEMENT".parse::<Category>().unwrap(), Category::Announcement);
    assert_eq!("QUESTION".parse::<Category>().unwrap(), Category::Question);
    assert!(matches!("general".parse::<Category>(), Err(Error::InvalidInput(_))));
    assert!(matches!("POLL".parse::<Category>(), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn category_serde_uses_upper_case() {
    let json = serde_json::to_string(&Category::Announcement).unwrap();
    assert_eq!(json, "\"ANNOUNCEMENT\"");
    let back: Category = serde_json::from_str("\"QUESTION\"").unwrap();
    assert_eq!(back, Category::Question);
  }

  #[test]
  fn comment_length_bounds() {
    let mk = |content: String| NewComment {
      post_id: Uuid::new_v4(),
      author_id: Uuid::new_v4(),
      content,
    };
    assert!(mk("x".into()).validate().is_ok());
    assert!(mk("x".repeat(200)).validate().is_ok());
    assert!(mk("x".repeat(201)).validate().is_err());
    assert!(mk(String::new()).validate().is_err());
    assert!(mk("   ".into()).validate().is_err());
  }

  #[test]
  fn feed_limit_is_clamped() {
    assert_eq!(FeedQuery::default().effective_limit(), 20);
    assert_eq!(FeedQuery { limit: Some(0), ..Default::default() }.effective_limit(), 1);
    assert_eq!(FeedQuery { limit: Some(500), ..Default::default() }.effective_limit(), 100);
  }
}
