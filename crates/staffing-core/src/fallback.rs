//! A hosted-primary backend with a local fallback.
//!
//! Reads and writes go to the primary. When the primary fails the error is
//! logged and the local backend serves the operation instead. Successful
//! primary writes are mirrored into the local backend so a later fallback
//! read sees recent data. Writes made while the primary is down are never
//! replayed to it; the two may diverge.

use tokio::sync::broadcast;

use crate::backend::Backend;

pub struct FallbackBackend<P, L> {
  primary: P,
  local:   L,
}

impl<P, L> FallbackBackend<P, L>
where
  P: Backend,
  L: Backend,
{
  pub fn new(primary: P, local: L) -> Self { Self { primary, local } }

  pub fn primary(&self) -> &P { &self.primary }

  pub fn local(&self) -> &L { &self.local }
}

impl<P, L> Backend for FallbackBackend<P, L>
where
  P: Backend,
  L: Backend,
{
  type Error = L::Error;

  async fn read(&self, key: &str) -> Result<Option<String>, L::Error> {
    match self.primary.read(key).await {
      Ok(value) => Ok(value),
      Err(e) => {
        tracing::warn!(key, error = %e, "primary read failed; using local copy");
        self.local.read(key).await
      }
    }
  }

  async fn write(&self, key: &str, value: String) -> Result<(), L::Error> {
    match self.primary.write(key, value.clone()).await {
      Ok(()) => {
        if let Err(e) = self.local.write(key, value).await {
          tracing::warn!(key, error = %e, "failed to mirror write locally");
        }
        Ok(())
      }
      Err(e) => {
        tracing::warn!(key, error = %e, "primary write failed; writing locally");
        self.local.write(key, value).await
      }
    }
  }

  async fn remove(&self, key: &str) -> Result<(), L::Error> {
    if let Err(e) = self.primary.remove(key).await {
      tracing::warn!(key, error = %e, "primary remove failed");
    }
    self.local.remove(key).await
  }

  async fn keys(&self) -> Result<Vec<String>, L::Error> {
    match self.primary.keys().await {
      Ok(keys) => Ok(keys),
      Err(e) => {
        tracing::warn!(error = %e, "primary key listing failed; using local");
        self.local.keys().await
      }
    }
  }

  fn watch(&self) -> Option<broadcast::Receiver<String>> {
    self.primary.watch().or_else(|| self.local.watch())
  }
}
