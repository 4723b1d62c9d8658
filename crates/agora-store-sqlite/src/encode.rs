//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC strings with fixed microsecond precision, so
//! string order is time order. UUIDs are hyphenated lowercase strings.

use agora_core::{
  post::{Category, Comment, CommentView, Post, PostView},
  session::SessionRecord,
  user::{Profile, User},
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_category(s: &str) -> Result<Category> {
  s.parse().map_err(|_| Error::UnknownCategory(s.to_owned()))
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub struct RawUser {
  pub user_id:             String,
  pub external_subject_id: String,
  pub username:            String,
  pub first_name:          String,
  pub last_name:           String,
  pub created_at:          String,
}

impl RawUser {
  pub const COLUMNS: &'static str =
    "user_id, external_subject_id, username, first_name, last_name, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:             row.get(0)?,
      external_subject_id: row.get(1)?,
      username:            row.get(2)?,
      first_name:          row.get(3)?,
      last_name:           row.get(4)?,
      created_at:          row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:             decode_uuid(&self.user_id)?,
      external_subject_id: self.external_subject_id,
      username:            self.username,
      first_name:          self.first_name,
      last_name:           self.last_name,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawPost {
  pub post_id:    String,
  pub author_id:  String,
  pub content:    String,
  pub category:   String,
  pub image_url:  Option<String>,
  pub is_active:  bool,
  pub created_at: String,
}

impl RawPost {
  /// Column list, qualified with the `p` alias used by every post query.
  pub const COLUMNS: &'static str =
    "p.post_id, p.author_id, p.content, p.category, p.image_url, p.is_active, p.created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:    row.get(0)?,
      author_id:  row.get(1)?,
      content:    row.get(2)?,
      category:   row.get(3)?,
      image_url:  row.get(4)?,
      is_active:  row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:    decode_uuid(&self.post_id)?,
      author_id:  decode_uuid(&self.author_id)?,
      content:    self.content,
      category:   decode_category(&self.category)?,
      image_url:  self.image_url,
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawPostView {
  pub post:           RawPost,
  pub likes_count:    i64,
  pub comments_count: i64,
  pub username:       String,
  pub first_name:     String,
  pub last_name:      String,
}

impl RawPostView {
  /// `RawPost::COLUMNS`, the two computed counts, then the author's
  /// username, first and last name.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post:           RawPost::from_row(row)?,
      likes_count:    row.get(7)?,
      comments_count: row.get(8)?,
      username:       row.get(9)?,
      first_name:     row.get(10)?,
      last_name:      row.get(11)?,
    })
  }

  pub fn into_view(self) -> Result<PostView> {
    let post = self.post.into_post()?;
    Ok(PostView {
      author:         Profile {
        user_id:    post.author_id,
        username:   self.username,
        first_name: self.first_name,
        last_name:  self.last_name,
      },
      post,
      likes_count:    self.likes_count.max(0) as u64,
      comments_count: self.comments_count.max(0) as u64,
    })
  }
}

pub struct RawCommentView {
  pub comment_id: String,
  pub post_id:    String,
  pub author_id:  String,
  pub content:    String,
  pub is_active:  bool,
  pub created_at: String,
  pub username:   String,
  pub first_name: String,
  pub last_name:  String,
}

impl RawCommentView {
  pub fn into_view(self) -> Result<CommentView> {
    let author_id = decode_uuid(&self.author_id)?;
    Ok(CommentView {
      comment: Comment {
        comment_id: decode_uuid(&self.comment_id)?,
        post_id: decode_uuid(&self.post_id)?,
        author_id,
        content: self.content,
        is_active: self.is_active,
        created_at: decode_dt(&self.created_at)?,
      },
      author:  Profile {
        user_id:    author_id,
        username:   self.username,
        first_name: self.first_name,
        last_name:  self.last_name,
      },
    })
  }
}

pub struct RawSession {
  pub session_id:    String,
  pub subject_id:    String,
  pub refresh_hash:  String,
  pub issued_at:     String,
  pub expires_at:    String,
  pub superseded_at: Option<String>,
}

impl RawSession {
  pub fn into_record(self) -> Result<SessionRecord> {
    Ok(SessionRecord {
      session_id:    decode_uuid(&self.session_id)?,
      subject_id:    self.subject_id,
      refresh_hash:  self.refresh_hash,
      issued_at:     decode_dt(&self.issued_at)?,
      expires_at:    decode_dt(&self.expires_at)?,
      superseded_at: self.superseded_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
