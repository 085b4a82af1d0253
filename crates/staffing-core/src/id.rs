//! Record id generation and normalisation.
//!
//! Every id is a string. Legacy documents may carry numeric ids (millisecond
//! timestamps); those are decoded as their decimal string so that all id
//! comparisons are exact string equality.

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Generate a fresh record id (hyphenated lowercase UUID v4).
pub fn new_id() -> String { Uuid::new_v4().hyphenated().to_string() }

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
  Str(String),
  Int(i64),
  Uint(u64),
  Float(f64),
}

impl From<RawId> for String {
  fn from(raw: RawId) -> Self {
    match raw {
      RawId::Str(s) => s,
      RawId::Int(n) => n.to_string(),
      RawId::Uint(n) => n.to_string(),
      // Integral floats (`1700000000000.0`) collapse to their integer form.
      RawId::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
        (f as i64).to_string()
      }
      RawId::Float(f) => f.to_string(),
    }
  }
}

/// Normalise a JSON id value. `None` for anything but a non-empty string or
/// a number.
pub fn id_from_value(value: &serde_json::Value) -> Option<String> {
  let id = String::from(RawId::deserialize(value).ok()?);
  (!id.trim().is_empty()).then_some(id)
}

/// Deserialise a string-or-number id into a `String`.
pub fn de_id<'de, D>(d: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  RawId::deserialize(d).map(String::from)
}

/// Deserialise an optional string-or-number id.
pub fn de_opt_id<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<RawId>::deserialize(d)?.map(String::from))
}

/// Deserialise a list of string-or-number ids. `null` decodes as empty.
pub fn de_id_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(
    Option::<Vec<RawId>>::deserialize(d)?
      .unwrap_or_default()
      .into_iter()
      .map(String::from)
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;
  use serde_json::json;

  use super::*;

  #[derive(Deserialize)]
  struct IdFields {
    #[serde(deserialize_with = "de_id")]
    id:   String,
    #[serde(default, deserialize_with = "de_opt_id")]
    job:  Option<String>,
    #[serde(default, deserialize_with = "de_id_list")]
    jobs: Vec<String>,
  }

  #[test]
  fn numeric_ids_normalise_to_strings() {
    let p: IdFields = serde_json::from_value(json!({
      "id": 1700000000000_i64,
      "job": 42,
      "jobs": ["JOB001", 7, 1700000000000.0],
    }))
    .unwrap();
    assert_eq!(p.id, "1700000000000");
    assert_eq!(p.job.as_deref(), Some("42"));
    assert_eq!(p.jobs, ["JOB001", "7", "1700000000000"]);
  }

  #[test]
  fn null_list_is_empty() {
    let p: IdFields =
      serde_json::from_value(json!({ "id": "a", "jobs": null })).unwrap();
    assert!(p.jobs.is_empty());
    assert!(p.job.is_none());
  }

  #[test]
  fn id_values_normalise() {
    assert_eq!(id_from_value(&json!("JOB001")).as_deref(), Some("JOB001"));
    assert_eq!(id_from_value(&json!(12)).as_deref(), Some("12"));
    assert_eq!(id_from_value(&json!("")), None);
    assert_eq!(id_from_value(&json!({ "a": 1 })), None);
  }

  #[test]
  fn generated_ids_are_unique() {
    assert_ne!(new_id(), new_id());
  }
}
