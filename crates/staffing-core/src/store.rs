//! [`EntityStore`]: generic CRUD over one collection.
//!
//! Each collection is a single JSON array. Every mutation loads the whole
//! array, changes it, and writes it back, then notifies the bus. Mutations
//! through one [`Repository`] are serialised by its write lock and notify
//! subscribers before the lock is released, so events arrive in commit
//! order. Separate repositories sharing a backend race with
//! last-writer-wins semantics.
//!
//! Elements are decoded one at a time. An element that does not decode as
//! `T` is kept as raw JSON: reads skip it, writes carry it through
//! unchanged, and a patch through [`EntityStore::update`] may repair it.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  backend::Backend,
  bus::{ChangeAction, ChangeEvent},
  entity::{Entity, PROTECTED_FIELDS, Record},
  id::{id_from_value, new_id},
  repository::{Repository, WriteGuard},
};

// ─── Slot ────────────────────────────────────────────────────────────────────

/// One element of a stored collection.
#[derive(Serialize)]
#[serde(untagged)]
enum Slot<T> {
  Typed(Record<T>),
  Raw(Value),
}

impl<T> Slot<T> {
  fn has_id(&self, id: &str) -> bool {
    match self {
      Slot::Typed(r) => r.id == id,
      Slot::Raw(v) => v
        .get("id")
        .and_then(id_from_value)
        .is_some_and(|raw| raw == id),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A typed view of one collection inside a [`Repository`].
pub struct EntityStore<'r, B, T> {
  repo:    &'r Repository<B>,
  _entity: PhantomData<fn() -> T>,
}

impl<'r, B, T> EntityStore<'r, B, T>
where
  B: Backend,
  T: Entity,
{
  pub(crate) fn new(repo: &'r Repository<B>) -> Self {
    Self { repo, _entity: PhantomData }
  }

  fn key(&self) -> &'static str { T::COLLECTION.key() }

  // ── Persistence ───────────────────────────────────────────────────────────

  /// Load every element of the collection. A missing or unreadable document
  /// is an empty collection; corruption is logged, not returned.
  async fn load_slots(&self) -> Result<Vec<Slot<T>>> {
    let key = self.key();
    let value = match self.repo.adapter().get(key).await {
      Ok(Some(value)) => value,
      Ok(None) => return Ok(Vec::new()),
      Err(Error::Corrupt { source, .. }) => {
        tracing::warn!(key, error = %source, "stored collection is not valid JSON; treating as empty");
        return Ok(Vec::new());
      }
      Err(e) => return Err(e),
    };

    let Value::Array(items) = value else {
      tracing::warn!(key, "stored collection is not a JSON array; treating as empty");
      return Ok(Vec::new());
    };

    let slots = items
      .into_iter()
      .enumerate()
      .map(|(index, item)| match Record::<T>::deserialize(&item) {
        Ok(record) => Slot::Typed(record),
        Err(e) => {
          let id = item.get("id").and_then(id_from_value);
          tracing::warn!(key, index, ?id, error = %e, "skipping record that does not decode");
          Slot::Raw(item)
        }
      })
      .collect();
    Ok(slots)
  }

  /// The decodable records, in stored order.
  async fn load(&self) -> Result<Vec<Record<T>>> {
    let slots = self.load_slots().await?;
    Ok(
      slots
        .into_iter()
        .filter_map(|slot| match slot {
          Slot::Typed(record) => Some(record),
          Slot::Raw(_) => None,
        })
        .collect(),
    )
  }

  async fn save(&self, slots: &[Slot<T>]) -> Result<()> {
    let value = serde_json::to_value(slots)?;
    self.repo.adapter().set(self.key(), &value).await
  }

  fn publish(&self, action: ChangeAction, record: Option<&Record<T>>, id: &str) {
    let mut event = ChangeEvent::new(T::COLLECTION, action).with_id(id);
    if let Some(record) = record {
      match serde_json::to_value(record) {
        Ok(data) => event = event.with_data(data),
        Err(e) => tracing::warn!(error = %e, "could not attach record to change event"),
      }
    }
    self.repo.bus().notify(&event);
  }

  fn unreadable(id: &str) -> Error {
    Error::Unreadable { collection: T::COLLECTION, id: id.to_owned() }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get_all(&self) -> Result<Vec<Record<T>>> { self.load().await }

  /// Look a record up by exact id. `None` if absent.
  pub async fn get_by_id(&self, id: &str) -> Result<Option<Record<T>>> {
    Ok(self.load().await?.into_iter().find(|r| r.id == id))
  }

  /// All records matching `pred`, in stored order.
  pub async fn find<F>(&self, pred: F) -> Result<Vec<Record<T>>>
  where
    F: Fn(&Record<T>) -> bool,
  {
    let mut records = self.load().await?;
    records.retain(|r| pred(r));
    Ok(records)
  }

  /// The first record matching `pred`.
  pub async fn find_one<F>(&self, pred: F) -> Result<Option<Record<T>>>
  where
    F: Fn(&Record<T>) -> bool,
  {
    Ok(self.load().await?.into_iter().find(|r| pred(r)))
  }

  pub async fn count<F>(&self, pred: F) -> Result<usize>
  where
    F: Fn(&Record<T>) -> bool,
  {
    Ok(self.load().await?.iter().filter(|r| pred(r)).count())
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Persist `data` as a new record with a generated id.
  pub async fn create(&self, data: T) -> Result<Record<T>> {
    self.create_with_id(new_id(), data).await
  }

  /// Persist `data` under a caller-supplied id.
  ///
  /// Fails with [`Error::DuplicateId`] if the id is already taken, including
  /// by a stored document that does not decode.
  pub async fn create_with_id(
    &self,
    id: impl Into<String>,
    data: T,
  ) -> Result<Record<T>> {
    let guard = self.repo.write_lock().await;
    self.create_locked(&guard, id.into(), data).await
  }

  pub(crate) async fn create_locked(
    &self,
    _held: &WriteGuard<'_>,
    id: String,
    data: T,
  ) -> Result<Record<T>> {
    data.validate().map_err(Error::Validation)?;
    if id.trim().is_empty() {
      return Err(Error::Validation("id must not be empty".to_owned()));
    }

    let mut slots = self.load_slots().await?;
    if slots.iter().any(|s| s.has_id(&id)) {
      return Err(Error::DuplicateId { collection: T::COLLECTION, id });
    }
    let record = Record { id, created_at: Utc::now(), updated_at: None, data };
    slots.push(Slot::Typed(record.clone()));
    self.save(&slots).await?;

    tracing::debug!(collection = %T::COLLECTION, id = %record.id, "created");
    self.publish(ChangeAction::Created, Some(&record), &record.id);
    Ok(record)
  }

  /// Apply `change` to the stored payload of `id` and write it back.
  ///
  /// The load, the change and the write happen under the repository's write
  /// lock, so concurrent modifications of the same record all land. Returns
  /// `None` if no record has this id. A change that leaves the payload
  /// invalid is rejected and nothing is written.
  pub async fn modify<F>(&self, id: &str, change: F) -> Result<Option<Record<T>>>
  where
    F: FnOnce(&mut T),
  {
    let guard = self.repo.write_lock().await;
    self.modify_locked(&guard, id, change).await
  }

  pub(crate) async fn modify_locked<F>(
    &self,
    _held: &WriteGuard<'_>,
    id: &str,
    change: F,
  ) -> Result<Option<Record<T>>>
  where
    F: FnOnce(&mut T),
  {
    let mut slots = self.load_slots().await?;
    let Some(slot) = slots.iter_mut().find(|s| s.has_id(id)) else {
      return Ok(None);
    };
    let Slot::Typed(record) = slot else {
      return Err(Self::unreadable(id));
    };

    let mut data = record.data.clone();
    change(&mut data);
    data.validate().map_err(Error::Validation)?;
    record.data = data;
    record.updated_at = Some(Utc::now());
    let updated = record.clone();
    self.save(&slots).await?;

    tracing::debug!(collection = %T::COLLECTION, id, "modified");
    self.publish(ChangeAction::Updated, Some(&updated), id);
    Ok(Some(updated))
  }

  /// Shallow-merge `patch` onto the stored record.
  ///
  /// `id` and `createdAt` keys in the patch are ignored. Returns `None` if no
  /// record has this id. A patch that leaves the document invalid for `T`
  /// is rejected and nothing is written. A stored document that did not
  /// decode is patched as raw JSON and becomes readable if the result does.
  pub async fn update(
    &self,
    id: &str,
    patch: Map<String, Value>,
  ) -> Result<Option<Record<T>>> {
    let _guard = self.repo.write_lock().await;
    let mut slots = self.load_slots().await?;
    let Some(slot) = slots.iter_mut().find(|s| s.has_id(id)) else {
      return Ok(None);
    };

    let (mut doc, created_at): (_, Option<DateTime<Utc>>) = match slot {
      Slot::Typed(record) => (Self::document(record)?, Some(record.created_at)),
      Slot::Raw(Value::Object(doc)) => (doc.clone(), None),
      Slot::Raw(_) => return Err(Self::unreadable(id)),
    };
    for (k, v) in patch {
      if !PROTECTED_FIELDS.contains(&k.as_str()) {
        doc.insert(k, v);
      }
    }
    doc.insert("updatedAt".to_owned(), serde_json::to_value(Utc::now())?);

    let mut merged: Record<T> = serde_json::from_value(Value::Object(doc))
      .map_err(|source| Error::InvalidPatch { collection: T::COLLECTION, source })?;
    merged.data.validate().map_err(Error::Validation)?;
    // The envelope is the store's, whatever the merged document claimed.
    merged.id = id.to_owned();
    if let Some(created_at) = created_at {
      merged.created_at = created_at;
    }

    *slot = Slot::Typed(merged.clone());
    self.save(&slots).await?;

    tracing::debug!(collection = %T::COLLECTION, id, "updated");
    self.publish(ChangeAction::Updated, Some(&merged), id);
    Ok(Some(merged))
  }

  fn document(record: &Record<T>) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
      Value::Object(doc) => Ok(doc),
      other => Err(Error::Serialization(serde::ser::Error::custom(format!(
        "{} record serialised as {other}, not an object",
        T::COLLECTION
      )))),
    }
  }

  /// Overwrite the payload of an existing record with `record.data`.
  ///
  /// The stored `created_at` is kept and `updated_at` is stamped. Returns
  /// `None` if no record has `record.id`. Prefer [`EntityStore::modify`]
  /// when the new payload is derived from the stored one.
  pub async fn replace(&self, record: Record<T>) -> Result<Option<Record<T>>> {
    record.data.validate().map_err(Error::Validation)?;
    let Record { id, data, .. } = record;
    self.modify(&id, move |slot| *slot = data).await
  }

  /// Remove the record with `id`.
  ///
  /// Idempotent: returns `true` if a record was removed and `false` if none
  /// existed. Nothing is written or notified in the latter case.
  pub async fn delete(&self, id: &str) -> Result<bool> {
    let _guard = self.repo.write_lock().await;
    let mut slots = self.load_slots().await?;
    let before = slots.len();
    slots.retain(|s| !s.has_id(id));
    if slots.len() == before {
      return Ok(false);
    }
    self.save(&slots).await?;

    tracing::debug!(collection = %T::COLLECTION, id, "deleted");
    self.publish(ChangeAction::Deleted, None, id);
    Ok(true)
  }

  /// Remove the whole collection document.
  pub async fn clear(&self) -> Result<()> {
    let _guard = self.repo.write_lock().await;
    self.repo.adapter().remove(self.key()).await?;
    self.repo.bus().notify(&ChangeEvent::new(T::COLLECTION, ChangeAction::Deleted));
    Ok(())
  }
}
