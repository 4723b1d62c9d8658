//! Users — the internal identity every engagement row points at.
//!
//! A user is created exactly once per external subject, on registration. The
//! `external_subject_id` never changes afterwards; it is the bridge between a
//! validated session and the internal `user_id` the rest of the core uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;
pub const NAME_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:             Uuid,
  pub external_subject_id: String,
  pub username:            String,
  pub first_name:          String,
  pub last_name:           String,
  pub created_at:          DateTime<Utc>,
}

impl User {
  pub fn profile(&self) -> Profile {
    Profile {
      user_id:    self.user_id,
      username:   self.username.clone(),
      first_name: self.first_name.clone(),
      last_name:  self.last_name.clone(),
    }
  }
}

/// The public face of a user, embedded in comment listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:    Uuid,
  pub username:   String,
  pub first_name: String,
  pub last_name:  String,
}

/// Registration input, already bound to a validated external subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub external_subject_id: String,
  pub username:            String,
  pub first_name:          String,
  pub last_name:           String,
}

impl NewUser {
  /// Check field shape. Uniqueness is the store's job.
  pub fn validate(&self) -> Result<()> {
    if self.external_subject_id.trim().is_empty() {
      return Err(Error::invalid("external subject id is empty"));
    }
    validate_username(&self.username)?;
    validate_name("first name", &self.first_name)?;
    validate_name("last name", &self.last_name)?;
    Ok(())
  }
}

/// 3–30 characters from `[A-Za-z0-9_]`.
pub fn validate_username(username: &str) -> Result<()> {
  let len = username.chars().count();
  if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
    return Err(Error::invalid(format!(
      "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
    )));
  }
  if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(Error::invalid(
      "username may only contain letters, digits and underscores",
    ));
  }
  Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<()> {
  if value.chars().count() > NAME_MAX {
    return Err(Error::invalid(format!("{field} is longer than {NAME_MAX} characters")));
  }
  Ok(())
}
