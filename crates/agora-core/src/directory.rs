//! User directory: maps external subjects to internal users.

use std::{sync::Arc, time::Duration};

use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result, bounded,
  store::{SocialStore, UserInsert},
  user::{NewUser, User},
};

pub struct UserDirectory<S> {
  store:   Arc<S>,
  timeout: Duration,
}

impl<S: SocialStore> UserDirectory<S> {
  pub fn new(store: Arc<S>, timeout: Duration) -> Self { Self { store, timeout } }

  /// Create the one user an external subject may have.
  ///
  /// The uniqueness checks happen inside the store's insert, so two
  /// concurrent registrations for the same username cannot both win.
  pub async fn register(&self, input: NewUser) -> Result<User> {
    input.validate()?;

    match bounded::storage(self.timeout, "insert_user", self.store.insert_user(input)).await? {
      UserInsert::Inserted(user) => {
        info!(user = %user.user_id, username = %user.username, "user registered");
        Ok(user)
      }
      UserInsert::DuplicateUsername => Err(Error::Conflict("username is already taken".into())),
      UserInsert::DuplicateSubject => {
        Err(Error::Conflict("this identity is already registered".into()))
      }
    }
  }

  pub async fn lookup(&self, user_id: Uuid) -> Result<User> {
    bounded::storage(self.timeout, "get_user", self.store.get_user(user_id))
      .await?
      .ok_or(Error::NotFound("user"))
  }

  pub async fn lookup_by_external_id(&self, external_subject_id: &str) -> Result<User> {
    bounded::storage(
      self.timeout,
      "get_user_by_subject",
      self.store.get_user_by_subject(external_subject_id.to_owned()),
    )
    .await?
    .ok_or(Error::NotFound("user"))
  }

  /// Like [`Self::lookup_by_external_id`], but absence is not an error.
  pub async fn find_by_external_id(&self, external_subject_id: &str) -> Result<Option<User>> {
    bounded::storage(
      self.timeout,
      "get_user_by_subject",
      self.store.get_user_by_subject(external_subject_id.to_owned()),
    )
    .await
  }
}
