//! Error types for `staffing-core`.

use thiserror::Error;

use crate::entity::Collection;

#[derive(Debug, Error)]
pub enum Error {
  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The blob stored under `key` is not valid JSON (or not a JSON array).
  #[error("stored document under {key:?} is corrupt: {source}")]
  Corrupt {
    key:    String,
    #[source]
    source: serde_json::Error,
  },

  #[error("{collection} record not found: {id}")]
  NotFound { collection: Collection, id: String },

  #[error("{collection} already contains a record with id {id}")]
  DuplicateId { collection: Collection, id: String },

  /// A shallow-merge patch produced a document the entity type rejects.
  #[error("invalid patch for {collection}: {source}")]
  InvalidPatch {
    collection: Collection,
    #[source]
    source:     serde_json::Error,
  },

  /// The stored document with this id does not decode as the collection's
  /// entity type, so a typed change cannot be applied to it.
  #[error("{collection} record {id} is stored in a shape this build cannot read")]
  Unreadable { collection: Collection, id: String },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
