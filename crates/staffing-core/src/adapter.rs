//! JSON boundary over a [`Backend`].

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Error, Result, backend::Backend};

/// Encodes and decodes whole-collection JSON documents on top of a raw
/// string backend.
pub struct StorageAdapter<B> {
  backend: B,
}

impl<B: Backend> StorageAdapter<B> {
  pub fn new(backend: B) -> Self { Self { backend } }

  pub fn backend(&self) -> &B { &self.backend }

  /// Read and parse the document under `key`.
  ///
  /// Returns [`Error::Corrupt`] if the stored blob is not valid JSON; callers
  /// reading collections treat that as an empty collection.
  pub async fn get(&self, key: &str) -> Result<Option<Value>> {
    let Some(raw) = self.backend.read(key).await.map_err(Error::backend)?
    else {
      return Ok(None);
    };
    serde_json::from_str(&raw)
      .map(Some)
      .map_err(|source| Error::Corrupt { key: key.to_owned(), source })
  }

  pub async fn set(&self, key: &str, value: &Value) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    self.backend.write(key, raw).await.map_err(Error::backend)
  }

  pub async fn remove(&self, key: &str) -> Result<()> {
    self.backend.remove(key).await.map_err(Error::backend)
  }

  /// SHA-256 hex digest of the raw blob under `key`, or `None` if absent.
  ///
  /// Computed over the stored bytes, so it changes whenever any writer
  /// replaces the blob, including writers in other processes.
  pub async fn fingerprint(&self, key: &str) -> Result<Option<String>> {
    let raw = self.backend.read(key).await.map_err(Error::backend)?;
    Ok(raw.map(|r| hex::encode(Sha256::digest(r.as_bytes()))))
  }
}
