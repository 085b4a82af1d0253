//! [`SqliteBackend`]: the SQLite implementation of [`Backend`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use staffing_core::backend::Backend;

use crate::{Error, Result, schema::SCHEMA};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// A key-value document backend stored in a single SQLite file.
///
/// Several processes may open the same file; each sees the others' writes on
/// its next read. SQLite cannot push change events, so [`Backend::watch`]
/// returns `None` and cross-process sync relies on polling.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteBackend {
  conn: tokio_rusqlite::Connection,
}

impl SqliteBackend {
  /// Open (or create) a database at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let backend = Self { conn };
    backend.init_schema().await?;
    Ok(backend)
  }

  /// Open an in-memory database, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let backend = Self { conn };
    backend.init_schema().await?;
    Ok(backend)
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

  /// When `key` was last written, as stored (RFC 3339).
  pub async fn updated_at(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let at = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT updated_at FROM documents WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(at)
  }
}

// ─── Backend impl ────────────────────────────────────────────────────────────

impl Backend for SqliteBackend {
  type Error = Error;

  async fn read(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM documents WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn write(&self, key: &str, value: String) -> Result<()> {
    let key_str = key.to_owned();
    let at_str = Utc::now().to_rfc3339();
    let bytes = value.len();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET
             value      = excluded.value,
             updated_at = excluded.updated_at",
          rusqlite::params![key_str, value, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::trace!(key, bytes, "document written");
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM documents WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn keys(&self) -> Result<Vec<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM documents ORDER BY key")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(keys)
  }
}
