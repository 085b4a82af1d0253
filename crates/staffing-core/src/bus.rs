//! In-process change notification.
//!
//! Callbacks are invoked synchronously, in registration order, on the task
//! that performed the mutation. A [`Subscription`] unregisters its callback
//! when dropped.

use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Collection;

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
  Created,
  Updated,
  Deleted,
  /// The collection changed underneath us (another writer); the record set
  /// should be reloaded.
  Synced,
}

/// Payload delivered to every subscriber after a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub collection: Collection,
  pub action:     ChangeAction,
  /// The affected record id, when the change concerns a single record.
  pub id:         Option<String>,
  /// The record as written, for creates and updates.
  pub data:       Option<Value>,
  pub timestamp:  DateTime<Utc>,
}

impl ChangeEvent {
  pub fn new(collection: Collection, action: ChangeAction) -> Self {
    Self { collection, action, id: None, data: None, timestamp: Utc::now() }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn with_data(mut self, data: Value) -> Self {
    self.data = Some(data);
    self
  }
}

// ─── Bus ─────────────────────────────────────────────────────────────────────

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
  next_id:     u64,
  subscribers: Vec<(u64, Callback)>,
}

/// Observer registry shared by everything that mutates a repository.
///
/// Cloning is cheap; clones share the same subscriber list.
#[derive(Clone, Default)]
pub struct NotificationBus {
  registry: Arc<Mutex<Registry>>,
}

impl NotificationBus {
  pub fn new() -> Self { Self::default() }

  /// Register `callback`. It stays registered until the returned handle is
  /// dropped (or forever, after [`Subscription::detach`]).
  pub fn subscribe<F>(&self, callback: F) -> Subscription
  where
    F: Fn(&ChangeEvent) + Send + Sync + 'static,
  {
    let mut reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
    let id = reg.next_id;
    reg.next_id += 1;
    reg.subscribers.push((id, Arc::new(callback)));
    Subscription { id, registry: Arc::downgrade(&self.registry) }
  }

  /// Deliver `event` to every current subscriber.
  ///
  /// The subscriber list is snapshotted first, so callbacks may subscribe or
  /// drop subscriptions without deadlocking; such changes take effect from
  /// the next notification.
  pub fn notify(&self, event: &ChangeEvent) {
    let snapshot: Vec<Callback> = {
      let reg = self.registry.lock().unwrap_or_else(|e| e.into_inner());
      reg.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    };
    tracing::trace!(
      collection = %event.collection,
      action = ?event.action,
      subscribers = snapshot.len(),
      "notify"
    );
    for cb in snapshot {
      cb(event);
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self
      .registry
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .subscribers
      .len()
  }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// RAII handle for a registered callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
  id:       u64,
  registry: Weak<Mutex<Registry>>,
}

impl Subscription {
  /// Keep the callback registered for the lifetime of the bus.
  pub fn detach(mut self) { self.registry = Weak::new(); }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(registry) = self.registry.upgrade() {
      let mut reg = registry.lock().unwrap_or_else(|e| e.into_inner());
      reg.subscribers.retain(|(id, _)| *id != self.id);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  fn event() -> ChangeEvent {
    ChangeEvent::new(Collection::Jobs, ChangeAction::Created).with_id("j1")
  }

  #[test]
  fn delivers_in_registration_order() {
    let bus = NotificationBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let l1 = Arc::clone(&log);
    let _a = bus.subscribe(move |_| l1.lock().unwrap().push("first"));
    let l2 = Arc::clone(&log);
    let _b = bus.subscribe(move |_| l2.lock().unwrap().push("second"));

    bus.notify(&event());
    assert_eq!(*log.lock().unwrap(), ["first", "second"]);
  }

  #[test]
  fn dropping_the_handle_unsubscribes() {
    let bus = NotificationBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    let sub = bus.subscribe(move |_| {
      h.fetch_add(1, Ordering::SeqCst);
    });
    bus.notify(&event());
    drop(sub);
    bus.notify(&event());

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(bus.subscriber_count(), 0);
  }

  #[test]
  fn detached_subscription_survives() {
    let bus = NotificationBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    bus
      .subscribe(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
      })
      .detach();
    bus.notify(&event());

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(bus.subscriber_count(), 1);
  }

  #[test]
  fn callbacks_may_subscribe_during_delivery() {
    let bus = NotificationBus::new();
    let inner = bus.clone();
    let spawned = Arc::new(Mutex::new(Vec::new()));

    let s = Arc::clone(&spawned);
    let _outer = bus.subscribe(move |_| {
      s.lock().unwrap().push(inner.subscribe(|_| {}));
    });

    bus.notify(&event());
    assert_eq!(bus.subscriber_count(), 2);
  }
}
