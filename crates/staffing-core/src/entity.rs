//! The record envelope shared by every collection.
//!
//! A stored document is a [`Record`]: an id, a creation timestamp, an
//! optional update timestamp, and the entity payload flattened alongside
//! them. Each collection is persisted as one JSON array under its
//! [`Collection::key`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum::{Display, EnumIter, EnumString};

use crate::id::de_id;

// ─── Collection ──────────────────────────────────────────────────────────────

/// The named collections managed by the repository.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
  Jobs,
  Candidates,
  Employers,
  Applications,
  Employees,
  Teams,
  Events,
}

impl Collection {
  /// The storage key under which the collection's JSON array is kept.
  /// Must match the `serialize_all = "snake_case"` strum names above.
  pub fn key(self) -> &'static str {
    match self {
      Self::Jobs => "jobs",
      Self::Candidates => "candidates",
      Self::Employers => "employers",
      Self::Applications => "applications",
      Self::Employees => "employees",
      Self::Teams => "teams",
      Self::Events => "events",
    }
  }

  /// Reverse of [`Collection::key`].
  pub fn from_key(key: &str) -> Option<Self> { key.parse().ok() }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// A payload type stored in exactly one collection.
pub trait Entity:
  Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
  const COLLECTION: Collection;

  /// Check the fields a record of this type cannot be stored without.
  /// Returns a user-facing message on failure.
  fn validate(&self) -> Result<(), String> { Ok(()) }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted entity. `id` and `created_at` are assigned by the store and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
  #[serde(deserialize_with = "de_id")]
  pub id:         String,
  /// Documents written before timestamps were tracked decode as the epoch.
  #[serde(default = "unknown_created_at")]
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub data:       T,
}

fn unknown_created_at() -> DateTime<Utc> { DateTime::<Utc>::UNIX_EPOCH }

/// Names of the envelope fields a patch is never allowed to overwrite.
pub(crate) const PROTECTED_FIELDS: [&str; 2] = ["id", "createdAt"];

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn keys_round_trip_through_from_key() {
    for c in Collection::iter() {
      assert_eq!(Collection::from_key(c.key()), Some(c));
      assert_eq!(c.to_string(), c.key());
    }
    assert_eq!(Collection::from_key("nope"), None);
  }
}
