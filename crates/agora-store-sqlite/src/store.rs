//! [`SqliteStore`] — the SQLite implementation of [`SocialStore`].

use std::path::Path;

use agora_core::{
  like::{Like, LikeInsert},
  post::{
    Comment, CommentView, FeedQuery, NewComment, NewPost, Post, PostView, Visibility,
  },
  session::{SessionGrant, SessionRecord},
  store::{Deactivation, SocialStore, UserInsert},
  user::{NewUser, User},
};
use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::info;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawCommentView, RawPost, RawPostView, RawSession, RawUser, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// The message SQLite attaches to a unique-index violation, if `e` is one.
fn unique_violation(e: &rusqlite::Error) -> Option<&str> {
  match e {
    rusqlite::Error::SqliteFailure(err, msg)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
    {
      Some(msg.as_deref().unwrap_or_default())
    }
    _ => None,
  }
}

fn active_only(visibility: Visibility) -> bool { visibility == Visibility::ActiveOnly }

const POST_VIEW_SELECT: &str = "
  SELECT p.post_id, p.author_id, p.content, p.category, p.image_url, p.is_active, p.created_at,
         (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.post_id),
         (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.post_id AND c.is_active = 1),
         u.username, u.first_name, u.last_name
  FROM posts p
  JOIN users u ON u.user_id = p.author_id";

const SESSION_COLUMNS: &str =
  "session_id, subject_id, refresh_hash, issued_at, expires_at, superseded_at";

fn raw_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSession> {
  Ok(RawSession {
    session_id:    row.get(0)?,
    subject_id:    row.get(1)?,
    refresh_hash:  row.get(2)?,
    issued_at:     row.get(3)?,
    expires_at:    row.get(4)?,
    superseded_at: row.get(5)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Agora store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    info!(path = %path.display(), "store opened");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_user(&self, column: &'static str, value: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM users WHERE {column} = ?1", RawUser::COLUMNS);
        Ok(conn.query_row(&sql, rusqlite::params![value], RawUser::from_row).optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  /// Overwrite a post's creation time, for pinning feed order in tests.
  #[cfg(test)]
  pub(crate) async fn set_post_created_at(
    &self,
    post_id: Uuid,
    at: chrono::DateTime<Utc>,
  ) -> Result<()> {
    let id_str = encode_uuid(post_id);
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE posts SET created_at = ?2 WHERE post_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SocialStore impl ────────────────────────────────────────────────────────

impl SocialStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, input: NewUser) -> Result<UserInsert> {
    let user = User {
      user_id:             Uuid::new_v4(),
      external_subject_id: input.external_subject_id,
      username:            input.username,
      first_name:          input.first_name,
      last_name:           input.last_name,
      created_at:          Utc::now(),
    };

    let id_str     = encode_uuid(user.user_id);
    let subject    = user.external_subject_id.clone();
    let username   = user.username.clone();
    let first_name = user.first_name.clone();
    let last_name  = user.last_name.clone();
    let at_str     = encode_dt(user.created_at);

    let conflict: Option<UserInsert> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (user_id, external_subject_id, username, first_name, last_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, subject, username, first_name, last_name, at_str],
        );
        match res {
          Ok(_) => Ok(None),
          Err(e) => {
            let conflict = match unique_violation(&e) {
              Some(m) if m.contains("users.username") => Some(UserInsert::DuplicateUsername),
              Some(m) if m.contains("users.external_subject_id") => {
                Some(UserInsert::DuplicateSubject)
              }
              _ => None,
            };
            conflict.map(Some).ok_or_else(|| e.into())
          }
        }
      })
      .await?;

    Ok(conflict.unwrap_or(UserInsert::Inserted(user)))
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    self.query_user("user_id", encode_uuid(user_id)).await
  }

  async fn get_user_by_subject(&self, external_subject_id: String) -> Result<Option<User>> {
    self.query_user("external_subject_id", external_subject_id).await
  }

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn insert_post(&self, input: NewPost) -> Result<Post> {
    let post = Post {
      post_id:    Uuid::new_v4(),
      author_id:  input.author_id,
      content:    input.content,
      category:   input.category,
      image_url:  input.image_url,
      is_active:  true,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(post.post_id);
    let author_str = encode_uuid(post.author_id);
    let content    = post.content.clone();
    let category   = post.category.as_str();
    let image_url  = post.image_url.clone();
    let at_str     = encode_dt(post.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO posts (post_id, author_id, content, category, image_url, is_active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
          rusqlite::params![id_str, author_str, content, category, image_url, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(post)
  }

  async fn get_post(&self, post_id: Uuid, visibility: Visibility) -> Result<Option<Post>> {
    let id_str = encode_uuid(post_id);
    let active = active_only(visibility);

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM posts p WHERE p.post_id = ?1 AND (?2 = 0 OR p.is_active = 1)",
          RawPost::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str, active], RawPost::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn get_post_view(&self, post_id: Uuid, visibility: Visibility) -> Result<Option<PostView>> {
    let id_str = encode_uuid(post_id);
    let active = active_only(visibility);

    let raw: Option<RawPostView> = self
      .conn
      .call(move |conn| {
        let sql =
          format!("{POST_VIEW_SELECT} WHERE p.post_id = ?1 AND (?2 = 0 OR p.is_active = 1)");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str, active], RawPostView::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPostView::into_view).transpose()
  }

  async fn list_posts(&self, query: FeedQuery, visibility: Visibility) -> Result<Vec<PostView>> {
    let active = active_only(visibility);
    let before    = query.before.map(encode_dt);
    let before_id = query.before_id.map(encode_uuid);
    let limit     = query.effective_limit() as i64;

    let raws: Vec<RawPostView> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{POST_VIEW_SELECT}
           WHERE (?1 = 0 OR p.is_active = 1)
             AND (?2 IS NULL
                  OR p.created_at < ?2
                  OR (p.created_at = ?2 AND ?3 IS NOT NULL AND p.post_id < ?3))
           ORDER BY p.created_at DESC, p.post_id DESC
           LIMIT ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![active, before, before_id, limit], RawPostView::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPostView::into_view).collect()
  }

  async fn deactivate_post(&self, post_id: Uuid, author_id: Uuid) -> Result<Deactivation> {
    let id_str     = encode_uuid(post_id);
    let author_str = encode_uuid(author_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
          "UPDATE posts SET is_active = 0
           WHERE post_id = ?1 AND author_id = ?2 AND is_active = 1",
          rusqlite::params![id_str, author_str],
        )?;
        let outcome = if changed == 1 {
          Deactivation::Deactivated
        } else {
          let still_active = tx
            .query_row(
              "SELECT 1 FROM posts WHERE post_id = ?1 AND is_active = 1",
              rusqlite::params![id_str],
              |_| Ok(()),
            )
            .optional()?;
          match still_active {
            Some(()) => Deactivation::NotAuthor,
            None => Deactivation::Missing,
          }
        };
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn insert_comment(&self, input: NewComment) -> Result<Option<Comment>> {
    let comment = Comment {
      comment_id: Uuid::new_v4(),
      post_id:    input.post_id,
      author_id:  input.author_id,
      content:    input.content,
      is_active:  true,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(comment.comment_id);
    let post_str   = encode_uuid(comment.post_id);
    let author_str = encode_uuid(comment.author_id);
    let content    = comment.content.clone();
    let at_str     = encode_dt(comment.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO comments (comment_id, post_id, author_id, content, is_active, created_at)
           SELECT ?1, ?2, ?3, ?4, 1, ?5
           WHERE EXISTS (SELECT 1 FROM posts WHERE post_id = ?2 AND is_active = 1)",
          rusqlite::params![id_str, post_str, author_str, content, at_str],
        )?;
        Ok(changed == 1)
      })
      .await?;

    Ok(inserted.then_some(comment))
  }

  async fn list_comments(&self, post_id: Uuid, visibility: Visibility) -> Result<Vec<CommentView>> {
    let post_str = encode_uuid(post_id);
    let active   = active_only(visibility);

    let raws: Vec<RawCommentView> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.comment_id, c.post_id, c.author_id, c.content, c.is_active, c.created_at,
                  u.username, u.first_name, u.last_name
           FROM comments c
           JOIN posts p ON p.post_id = c.post_id
           JOIN users u ON u.user_id = c.author_id
           WHERE c.post_id = ?1
             AND (?2 = 0 OR (c.is_active = 1 AND p.is_active = 1))
           ORDER BY c.created_at DESC, c.rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![post_str, active], |row| {
            Ok(RawCommentView {
              comment_id: row.get(0)?,
              post_id:    row.get(1)?,
              author_id:  row.get(2)?,
              content:    row.get(3)?,
              is_active:  row.get(4)?,
              created_at: row.get(5)?,
              username:   row.get(6)?,
              first_name: row.get(7)?,
              last_name:  row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCommentView::into_view).collect()
  }

  // ── Likes ─────────────────────────────────────────────────────────────────

  async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeInsert> {
    let like = Like {
      like_id: Uuid::new_v4(),
      user_id,
      post_id,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(like.like_id);
    let user_str = encode_uuid(user_id);
    let post_str = encode_uuid(post_id);
    let at_str   = encode_dt(like.created_at);

    // `None` means the unique index fired.
    let changed: Option<usize> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO likes (like_id, user_id, post_id, created_at)
           SELECT ?1, ?2, ?3, ?4
           WHERE EXISTS (SELECT 1 FROM posts WHERE post_id = ?3 AND is_active = 1)",
          rusqlite::params![id_str, user_str, post_str, at_str],
        );
        match res {
          Ok(n) => Ok(Some(n)),
          Err(e) if unique_violation(&e).is_some() => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(match changed {
      None => LikeInsert::AlreadyLiked,
      Some(0) => LikeInsert::PostUnavailable,
      Some(_) => LikeInsert::Inserted(like),
    })
  }

  async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
    let user_str = encode_uuid(user_id);
    let post_str = encode_uuid(post_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
          rusqlite::params![user_str, post_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn has_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
    let user_str = encode_uuid(user_id);
    let post_str = encode_uuid(post_id);

    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM likes WHERE user_id = ?1 AND post_id = ?2",
              rusqlite::params![user_str, post_str],
              |_| Ok(()),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(found.is_some())
  }

  async fn count_likes(&self, post_id: Uuid) -> Result<u64> {
    let post_str = encode_uuid(post_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
          rusqlite::params![post_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, subject_id: String, grant: SessionGrant) -> Result<SessionRecord> {
    let record = SessionRecord {
      session_id:    grant.session_id,
      subject_id,
      refresh_hash:  grant.refresh_hash,
      issued_at:     grant.issued_at,
      expires_at:    grant.expires_at,
      superseded_at: None,
    };

    let id_str      = encode_uuid(record.session_id);
    let subject     = record.subject_id.clone();
    let hash        = record.refresh_hash.clone();
    let issued_str  = encode_dt(record.issued_at);
    let expires_str = encode_dt(record.expires_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "UPDATE sessions SET superseded_at = ?2
           WHERE subject_id = ?1 AND superseded_at IS NULL",
          rusqlite::params![subject, issued_str],
        )?;
        tx.execute(
          "INSERT INTO sessions (session_id, subject_id, refresh_hash, issued_at, expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, subject, hash, issued_str, expires_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn rotate_session(
    &self,
    refresh_hash: String,
    grant:        SessionGrant,
  ) -> Result<Option<SessionRecord>> {
    let id_str      = encode_uuid(grant.session_id);
    let new_hash    = grant.refresh_hash.clone();
    let now_str     = encode_dt(grant.issued_at);
    let expires_str = encode_dt(grant.expires_at);

    let subject: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Compare-and-swap: only a live, unexpired row can be consumed, and
        // only once.
        let subject: Option<String> = tx
          .query_row(
            "UPDATE sessions SET superseded_at = ?2
             WHERE refresh_hash = ?1 AND superseded_at IS NULL AND expires_at > ?2
             RETURNING subject_id",
            rusqlite::params![refresh_hash, now_str],
            |row| row.get(0),
          )
          .optional()?;

        let Some(subject) = subject else {
          return Ok(None);
        };

        tx.execute(
          "INSERT INTO sessions (session_id, subject_id, refresh_hash, issued_at, expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, subject, new_hash, now_str, expires_str],
        )?;
        tx.commit()?;
        Ok(Some(subject))
      })
      .await?;

    Ok(subject.map(|subject_id| SessionRecord {
      session_id: grant.session_id,
      subject_id,
      refresh_hash: grant.refresh_hash,
      issued_at: grant.issued_at,
      expires_at: grant.expires_at,
      superseded_at: None,
    }))
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionRecord>> {
    let id_str = encode_uuid(session_id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1");
        Ok(conn.query_row(&sql, rusqlite::params![id_str], raw_session).optional()?)
      })
      .await?;

    raw.map(RawSession::into_record).transpose()
  }

  async fn end_session(&self, session_id: Uuid) -> Result<bool> {
    let id_str  = encode_uuid(session_id);
    let now_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions SET superseded_at = ?2
           WHERE session_id = ?1 AND superseded_at IS NULL",
          rusqlite::params![id_str, now_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }
}
