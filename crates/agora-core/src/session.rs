//! Session lifecycle: issuing, validating and rotating token pairs.
//!
//! An access token is a short-lived HS256 JWT naming the external subject and
//! the session it belongs to. A refresh token is 32 random bytes, hex-encoded;
//! only its SHA-256 digest is persisted.
//!
//! A subject holds at most one live session. Logging in supersedes the old
//! one; rotating consumes the presented refresh token and replaces the session
//! with a successor. An access token is only valid while its session is live,
//! so rotation retires the previous access token as well.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
  errors::ErrorKind as JwtErrorKind,
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  AuthFailure, Error, Result, bounded, config::CoreConfig, store::SocialStore,
};

const REFRESH_TOKEN_BYTES: usize = 32;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
  /// External subject identifier.
  pub sub: String,
  /// The session this token belongs to.
  pub sid: Uuid,
  pub iat: i64,
  pub exp: i64,
}

/// A freshly minted token pair, handed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
  pub subject_id:         String,
  pub access_token:       String,
  pub refresh_token:      String,
  pub access_expires_at:  DateTime<Utc>,
  pub refresh_expires_at: DateTime<Utc>,
}

/// What a valid access token proves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
  pub subject_id: String,
  pub session_id: Uuid,
  pub expires_at: DateTime<Utc>,
}

/// The persisted part of a new session, before the store binds it to a
/// subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
  pub session_id:   Uuid,
  pub refresh_hash: String,
  pub issued_at:    DateTime<Utc>,
  pub expires_at:   DateTime<Utc>,
}

/// A session row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
  pub session_id:    Uuid,
  pub subject_id:    String,
  pub refresh_hash:  String,
  pub issued_at:     DateTime<Utc>,
  /// Expiry of the refresh token.
  pub expires_at:    DateTime<Utc>,
  pub superseded_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
  pub fn is_live(&self, now: DateTime<Utc>) -> bool {
    self.superseded_at.is_none() && self.expires_at > now
  }
}

// ─── Token helpers ───────────────────────────────────────────────────────────

pub fn generate_refresh_token() -> String {
  let mut buf = [0u8; REFRESH_TOKEN_BYTES];
  OsRng.fill_bytes(&mut buf);
  hex::encode(buf)
}

pub fn hash_refresh_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

fn is_well_formed_refresh_token(token: &str) -> bool {
  token.len() == REFRESH_TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Signing and verification keys for access tokens.
#[derive(Clone)]
pub struct TokenKeys {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
}

impl TokenKeys {
  pub fn from_secret(secret: &[u8]) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
    }
  }

  pub fn sign(&self, claims: &AccessClaims) -> Result<String> {
    encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
      .map_err(|e| Error::Transient(format!("signing access token: {e}")))
  }

  /// Decode and verify. Expiry is reported separately from every other
  /// failure so the caller knows whether rotation can help.
  pub fn verify(&self, token: &str) -> Result<AccessClaims> {
    decode::<AccessClaims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| match e.kind() {
        JwtErrorKind::ExpiredSignature => Error::Unauthenticated(AuthFailure::Expired),
        _ => Error::Unauthenticated(AuthFailure::Invalid),
      })
  }
}

fn ttl(d: Duration) -> TimeDelta { TimeDelta::from_std(d).unwrap_or(TimeDelta::days(365)) }

// ─── Manager ─────────────────────────────────────────────────────────────────

pub struct SessionManager<S> {
  store:       Arc<S>,
  keys:        TokenKeys,
  access_ttl:  TimeDelta,
  refresh_ttl: TimeDelta,
  timeout:     Duration,
}

impl<S: SocialStore> SessionManager<S> {
  pub fn new(store: Arc<S>, config: &CoreConfig) -> Self {
    Self {
      store,
      keys: TokenKeys::from_secret(config.jwt_secret.as_bytes()),
      access_ttl: ttl(config.access_ttl),
      refresh_ttl: ttl(config.refresh_ttl),
      timeout: config.storage_timeout,
    }
  }

  pub fn keys(&self) -> &TokenKeys { &self.keys }

  /// Start a new session for a subject whose credentials were just verified.
  /// Any session the subject already held stops being valid.
  pub async fn issue(&self, subject_id: &str) -> Result<SessionTokens> {
    let (grant, refresh_token) = self.new_grant();
    let record = bounded::storage(
      self.timeout,
      "create_session",
      self.store.create_session(subject_id.to_owned(), grant),
    )
    .await?;

    info!(subject = %record.subject_id, session = %record.session_id, "session issued");
    self.tokens_for(&record, refresh_token)
  }

  /// Check an access token and that its session is still live.
  pub async fn validate(&self, access_token: &str) -> Result<SessionIdentity> {
    let claims = self.keys.verify(access_token)?;

    let record = bounded::storage(self.timeout, "get_session", self.store.get_session(claims.sid))
      .await?
      .ok_or(Error::Unauthenticated(AuthFailure::Invalid))?;

    if !record.is_live(Utc::now()) || record.subject_id != claims.sub {
      debug!(session = %claims.sid, "access token for a retired session");
      return Err(Error::Unauthenticated(AuthFailure::Invalid));
    }

    let expires_at = DateTime::from_timestamp(claims.exp, 0)
      .ok_or(Error::Unauthenticated(AuthFailure::Invalid))?;

    Ok(SessionIdentity {
      subject_id: claims.sub,
      session_id: claims.sid,
      expires_at,
    })
  }

  /// Exchange a refresh token for a new pair. The presented token is consumed:
  /// replaying it, concurrently or later, is rejected.
  ///
  /// Every failure, storage timeouts included, is
  /// `Unauthenticated(Rejected)`: the caller must drop its tokens and log in
  /// again rather than retry with the same refresh token.
  pub async fn rotate(&self, refresh_token: &str) -> Result<SessionTokens> {
    if !is_well_formed_refresh_token(refresh_token) {
      return Err(Error::Unauthenticated(AuthFailure::Rejected));
    }

    let (grant, new_refresh) = self.new_grant();
    let record = bounded::storage(
      self.timeout,
      "rotate_session",
      self.store.rotate_session(hash_refresh_token(refresh_token), grant),
    )
    .await
    .map_err(|e| {
      // A swap cut off by the deadline may still commit and consume the token.
      warn!(error = %e, "rotation outcome unknown, refresh token treated as rejected");
      Error::Unauthenticated(AuthFailure::Rejected)
    })?
    .ok_or_else(|| {
      debug!("refresh token unknown, expired or already rotated");
      Error::Unauthenticated(AuthFailure::Rejected)
    })?;

    info!(subject = %record.subject_id, session = %record.session_id, "session rotated");
    self.tokens_for(&record, new_refresh)
  }

  /// End the session an identity belongs to.
  pub async fn revoke(&self, identity: &SessionIdentity) -> Result<()> {
    let ended =
      bounded::storage(self.timeout, "end_session", self.store.end_session(identity.session_id))
        .await?;
    if ended {
      info!(subject = %identity.subject_id, session = %identity.session_id, "session ended");
    }
    Ok(())
  }

  fn new_grant(&self) -> (SessionGrant, String) {
    let refresh_token = generate_refresh_token();
    let now = Utc::now();
    let grant = SessionGrant {
      session_id:   Uuid::new_v4(),
      refresh_hash: hash_refresh_token(&refresh_token),
      issued_at:    now,
      expires_at:   now + self.refresh_ttl,
    };
    (grant, refresh_token)
  }

  fn tokens_for(&self, record: &SessionRecord, refresh_token: String) -> Result<SessionTokens> {
    let access_expires_at = record.issued_at + self.access_ttl;
    let claims = AccessClaims {
      sub: record.subject_id.clone(),
      sid: record.session_id,
      iat: record.issued_at.timestamp(),
      exp: access_expires_at.timestamp(),
    };
    Ok(SessionTokens {
      subject_id: record.subject_id.clone(),
      access_token: self.keys.sign(&claims)?,
      refresh_token,
      access_expires_at,
      refresh_expires_at: record.expires_at,
    })
  }
}
