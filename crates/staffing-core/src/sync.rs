//! Detects changes made by other writers sharing the same backend.
//!
//! Two sources feed the bus with [`ChangeAction::Synced`] events:
//!
//! - a poll that fingerprints every collection each `interval` and reports
//!   the ones whose stored bytes changed since the previous tick;
//! - the backend's change channel ([`Backend::watch`]), if it has one,
//!   reported as soon as it fires.
//!
//! Both may report the same write, and writes made through this process's
//! own repository are reported too. Subscribers must tolerate duplicates.

use std::{collections::HashMap, sync::Arc, time::Duration};

use strum::IntoEnumIterator;
use tokio::{
  sync::broadcast::{self, error::RecvError},
  task::JoinHandle,
  time::MissedTickBehavior,
};

use crate::{
  Result,
  backend::Backend,
  bus::{ChangeAction, ChangeEvent},
  entity::Collection,
  repository::Repository,
};

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Handle to a running watcher. Dropping it stops the watcher.
#[must_use = "dropping a SyncWatcher stops it"]
pub struct SyncWatcher {
  task: JoinHandle<()>,
}

impl SyncWatcher {
  /// Spawn a watcher over `repo` on the current tokio runtime.
  ///
  /// The first fingerprint pass runs before this returns, so only writes made
  /// after `spawn` are reported.
  pub async fn spawn<B: Backend>(
    repo: Arc<Repository<B>>,
    interval: Duration,
  ) -> Result<Self> {
    let mut seen = HashMap::new();
    for collection in Collection::iter() {
      let fp = repo.adapter().fingerprint(collection.key()).await?;
      seen.insert(collection, fp);
    }
    let changes = repo.adapter().backend().watch();

    tracing::debug!(
      interval_ms = interval.as_millis() as u64,
      watchable = changes.is_some(),
      "sync watcher started"
    );
    let task = tokio::spawn(run(repo, interval, seen, changes));
    Ok(Self { task })
  }

  /// Stop the watcher and wait for the task to wind down.
  pub async fn shutdown(mut self) {
    self.task.abort();
    let _ = (&mut self.task).await;
  }
}

impl Drop for SyncWatcher {
  fn drop(&mut self) { self.task.abort(); }
}

async fn run<B: Backend>(
  repo: Arc<Repository<B>>,
  interval: Duration,
  mut seen: HashMap<Collection, Option<String>>,
  mut changes: Option<broadcast::Receiver<String>>,
) {
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  // The first tick completes immediately; the baseline is already taken.
  ticker.tick().await;

  loop {
    tokio::select! {
      _ = ticker.tick() => poll(&*repo, &mut seen).await,
      msg = recv(&mut changes) => match msg {
        Ok(key) => {
          if let Some(collection) = Collection::from_key(&key) {
            publish(&*repo, collection);
          }
        }
        Err(RecvError::Lagged(skipped)) => {
          tracing::debug!(skipped, "change channel lagged; rescanning");
          poll(&*repo, &mut seen).await;
        }
        Err(RecvError::Closed) => {
          tracing::debug!("change channel closed; polling only");
          changes = None;
        }
      },
    }
  }
}

/// Receive from the change channel, or park forever when there is none.
async fn recv(
  changes: &mut Option<broadcast::Receiver<String>>,
) -> Result<String, RecvError> {
  match changes {
    Some(rx) => rx.recv().await,
    None => std::future::pending().await,
  }
}

async fn poll<B: Backend>(
  repo: &Repository<B>,
  seen: &mut HashMap<Collection, Option<String>>,
) {
  for collection in Collection::iter() {
    let current = match repo.adapter().fingerprint(collection.key()).await {
      Ok(fp) => fp,
      Err(e) => {
        tracing::warn!(collection = %collection, error = %e, "sync poll failed");
        continue;
      }
    };
    if seen.get(&collection) != Some(&current) {
      seen.insert(collection, current);
      publish(repo, collection);
    }
  }
}

fn publish<B: Backend>(repo: &Repository<B>, collection: Collection) {
  tracing::debug!(collection = %collection, "external change detected");
  repo.bus().notify(&ChangeEvent::new(collection, ChangeAction::Synced));
}
