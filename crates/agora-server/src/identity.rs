//! Identity gateway backed by the configured account list.

use std::collections::HashMap;

use agora_core::gateway::{AuthError, IdentityGateway};
use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;
use tracing::debug;

use crate::{
  config::AccountConfig,
  error::{Error, Result},
};

struct Account {
  subject_id:    String,
  password_hash: String,
}

/// Checks email/password pairs against argon2 PHC hashes held in memory.
pub struct LocalIdentityGateway {
  /// Keyed by normalised email.
  accounts: HashMap<String, Account>,
}

fn normalize_email(email: &str) -> String { email.trim().to_ascii_lowercase() }

impl LocalIdentityGateway {
  /// Fails on a malformed hash or a repeated email, so a typo in the config
  /// surfaces at startup rather than as a refused login.
  pub fn new(accounts: &[AccountConfig]) -> Result<Self> {
    let mut map = HashMap::with_capacity(accounts.len());
    for a in accounts {
      PasswordHash::new(&a.password_hash)
        .map_err(|e| Error::Config(format!("account {}: bad password_hash: {e}", a.email)))?;
      let key = normalize_email(&a.email);
      let account = Account {
        subject_id:    a.subject_id.clone(),
        password_hash: a.password_hash.clone(),
      };
      if map.insert(key, account).is_some() {
        return Err(Error::Config(format!("account {} is listed twice", a.email)));
      }
    }
    Ok(Self { accounts: map })
  }

  pub fn len(&self) -> usize { self.accounts.len() }

  pub fn is_empty(&self) -> bool { self.accounts.is_empty() }
}

impl IdentityGateway for LocalIdentityGateway {
  async fn verify_credentials(&self, email: String, password: String) -> Result<String, AuthError> {
    let Some(account) = self.accounts.get(&normalize_email(&email)) else {
      debug!("login for unknown account");
      return Err(AuthError::InvalidCredentials);
    };

    let hash = account.password_hash.clone();
    // argon2 is deliberately slow; keep it off the async workers.
    tokio::task::spawn_blocking(move || {
      let parsed = PasswordHash::new(&hash).map_err(|e| AuthError::Unavailable(e.to_string()))?;
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
    })
    .await
    .map_err(|e| AuthError::Unavailable(format!("password check aborted: {e}")))??;

    Ok(account.subject_id.clone())
  }
}

/// Produce the argon2 PHC string for an `[[accounts]]` entry.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}
