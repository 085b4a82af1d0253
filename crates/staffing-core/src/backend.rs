//! The `Backend` trait and the in-memory backend.
//!
//! A backend is a plain key-value substrate holding one string blob per key.
//! JSON encoding lives one layer up, in [`crate::adapter::StorageAdapter`].
//! Concrete substrates (SQLite in `staffing-store-sqlite`, the in-memory map
//! below, the [`crate::fallback::FallbackBackend`] composite) implement this
//! trait; nothing above the adapter depends on a concrete backend.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Arc, RwLock},
};

use tokio::sync::broadcast;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a key-value persistence substrate.
///
/// All methods return `Send` futures so a backend can sit behind an axum
/// router on a multi-threaded runtime.
pub trait Backend: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the blob stored under `key`. `None` if absent.
  fn read<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous blob.
  fn write<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Removing an absent key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// List every key currently stored.
  fn keys(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Subscribe to change events (the changed key) if the substrate can
  /// produce them. Backends that cannot return `None` and rely on polling.
  fn watch(&self) -> Option<broadcast::Receiver<String>> { None }
}

// ─── MemoryBackend ───────────────────────────────────────────────────────────

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A process-local backend.
///
/// Cloning is cheap and every clone shares the same map, so two repositories
/// built over clones of one `MemoryBackend` observe each other's writes
/// through [`Backend::watch`].
#[derive(Clone)]
pub struct MemoryBackend {
  entries: Arc<RwLock<HashMap<String, String>>>,
  changes: broadcast::Sender<String>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
    Self { entries: Arc::new(RwLock::new(HashMap::new())), changes }
  }

  fn publish(&self, key: &str) {
    // No receivers is fine; nobody is watching yet.
    let _ = self.changes.send(key.to_owned());
  }
}

impl Default for MemoryBackend {
  fn default() -> Self { Self::new() }
}

impl Backend for MemoryBackend {
  type Error = Infallible;

  async fn read(&self, key: &str) -> Result<Option<String>, Infallible> {
    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    Ok(entries.get(key).cloned())
  }

  async fn write(&self, key: &str, value: String) -> Result<(), Infallible> {
    self
      .entries
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .insert(key.to_owned(), value);
    self.publish(key);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    let removed = self
      .entries
      .write()
      .unwrap_or_else(|e| e.into_inner())
      .remove(key);
    if removed.is_some() {
      self.publish(key);
    }
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>, Infallible> {
    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    Ok(entries.keys().cloned().collect())
  }

  fn watch(&self) -> Option<broadcast::Receiver<String>> {
    Some(self.changes.subscribe())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn read_write_remove() {
    let b = MemoryBackend::new();
    assert_eq!(b.read("jobs").await.unwrap(), None);

    b.write("jobs", "[]".into()).await.unwrap();
    assert_eq!(b.read("jobs").await.unwrap().as_deref(), Some("[]"));
    assert_eq!(b.keys().await.unwrap(), ["jobs"]);

    b.remove("jobs").await.unwrap();
    b.remove("jobs").await.unwrap();
    assert_eq!(b.read("jobs").await.unwrap(), None);
  }

  #[tokio::test]
  async fn clones_share_state_and_publish_changes() {
    let a = MemoryBackend::new();
    let b = a.clone();
    let mut rx = b.watch().expect("memory backend is watchable");

    a.write("teams", "[]".into()).await.unwrap();

    assert_eq!(b.read("teams").await.unwrap().as_deref(), Some("[]"));
    assert_eq!(rx.recv().await.unwrap(), "teams");
  }
}
