//! [`Repository`]: the single entry point to every collection.
//!
//! Construct one per process (or per test) and pass it by reference or in an
//! `Arc`. It owns the storage adapter, the notification bus, and the write
//! lock that serialises read-modify-write cycles.

use tokio::sync::{Mutex, MutexGuard};

use crate::{
  adapter::StorageAdapter,
  backend::Backend,
  bus::{ChangeEvent, NotificationBus, Subscription},
  entity::Entity,
  model::{Application, Candidate, Employee, Employer, Job, ScheduleEvent, Team},
  store::EntityStore,
};

/// Proof that the caller holds the repository's write lock.
pub(crate) type WriteGuard<'a> = MutexGuard<'a, ()>;

pub struct Repository<B> {
  adapter:    StorageAdapter<B>,
  bus:        NotificationBus,
  write_lock: Mutex<()>,
}

impl<B: Backend> Repository<B> {
  pub fn new(backend: B) -> Self { Self::with_bus(backend, NotificationBus::new()) }

  /// Build a repository that publishes onto an existing bus.
  pub fn with_bus(backend: B, bus: NotificationBus) -> Self {
    Self {
      adapter: StorageAdapter::new(backend),
      bus,
      write_lock: Mutex::new(()),
    }
  }

  pub fn adapter(&self) -> &StorageAdapter<B> { &self.adapter }

  pub fn bus(&self) -> &NotificationBus { &self.bus }

  /// Shorthand for `self.bus().subscribe(..)`.
  pub fn subscribe<F>(&self, callback: F) -> Subscription
  where
    F: Fn(&ChangeEvent) + Send + Sync + 'static,
  {
    self.bus.subscribe(callback)
  }

  /// The lock is not reentrant: code holding it must use the `*_locked`
  /// store methods.
  pub(crate) async fn write_lock(&self) -> WriteGuard<'_> {
    self.write_lock.lock().await
  }

  /// The store for any entity type.
  pub fn store<T: Entity>(&self) -> EntityStore<'_, B, T> { EntityStore::new(self) }

  pub fn jobs(&self) -> EntityStore<'_, B, Job> { self.store() }

  pub fn candidates(&self) -> EntityStore<'_, B, Candidate> { self.store() }

  pub fn employers(&self) -> EntityStore<'_, B, Employer> { self.store() }

  pub fn applications(&self) -> EntityStore<'_, B, Application> { self.store() }

  pub fn employees(&self) -> EntityStore<'_, B, Employee> { self.store() }

  pub fn teams(&self) -> EntityStore<'_, B, Team> { self.store() }

  pub fn events(&self) -> EntityStore<'_, B, ScheduleEvent> { self.store() }
}
