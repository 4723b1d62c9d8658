//! Deadlines for calls that leave the process.
//!
//! Nothing in the core waits on storage or a collaborator without a bound.
//! When the bound is hit, or the backend fails, the caller gets
//! [`Error::Transient`].

use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

use crate::{Error, Result};

/// Run `fut` for at most `limit`.
pub(crate) async fn within<T, F>(limit: Duration, what: &'static str, fut: F) -> Result<T>
where
  F: Future<Output = T>,
{
  tokio::time::timeout(limit, fut).await.map_err(|_| {
    warn!(operation = what, ?limit, "call timed out");
    Error::Transient(format!("{what} timed out after {limit:?}"))
  })
}

/// Run a storage call for at most `limit`, folding backend errors into
/// [`Error::Transient`].
pub(crate) async fn storage<T, E, F>(limit: Duration, what: &'static str, fut: F) -> Result<T>
where
  F: Future<Output = Result<T, E>>,
  E: Display,
{
  within(limit, what, fut).await?.map_err(|e| {
    warn!(operation = what, error = %e, "storage call failed");
    Error::Transient(format!("{what}: {e}"))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn slow_call_becomes_transient() {
    let res = within(Duration::from_millis(10), "sleepy", async {
      tokio::time::sleep(Duration::from_secs(5)).await;
    })
    .await;
    assert!(matches!(res, Err(Error::Transient(m)) if m.contains("sleepy")));
  }

  #[tokio::test]
  async fn backend_error_becomes_transient() {
    let res: Result<()> = storage(Duration::from_secs(1), "insert", async {
      Err::<(), _>(std::io::Error::other("disk on fire"))
    })
    .await;
    assert!(matches!(res, Err(Error::Transient(m)) if m.contains("disk on fire")));
  }

  #[tokio::test]
  async fn fast_call_passes_through() {
    let res = storage(Duration::from_secs(1), "read", async { Ok::<_, std::io::Error>(7) }).await;
    assert_eq!(res.unwrap(), 7);
  }
}
