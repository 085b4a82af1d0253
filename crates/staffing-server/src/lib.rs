//! HTTP server wiring for the staffing back office.
//!
//! Loads [`ServerConfig`], mounts the JSON API under `/api` with request
//! tracing, and logs every change published on a repository's bus.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use serde::Deserialize;
use staffing_core::{
  backend::Backend,
  bus::{NotificationBus, Subscription},
  repository::Repository,
  sync::DEFAULT_POLL_INTERVAL,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Which substrate the repository persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  #[default]
  Sqlite,
  Memory,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `STAFFING_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub backend:            BackendKind,
  pub store_path:         PathBuf,
  /// How often the sync watcher fingerprints collections, in milliseconds.
  pub poll_interval_ms:   u64,
  /// Keep serving from memory when the SQLite store fails.
  pub fallback_to_memory: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8080,
      backend:            BackendKind::default(),
      store_path:         PathBuf::from("~/.local/share/staffing/staffing.db"),
      poll_interval_ms:   DEFAULT_POLL_INTERVAL.as_millis() as u64,
      fallback_to_memory: false,
    }
  }
}

impl ServerConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms.max(1))
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Read `path` (optional) then `STAFFING_*` overrides on top of the defaults.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("STAFFING").try_parsing(true))
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the API under `/api`, with HTTP trace logging.
pub fn app<B: Backend>(repo: Arc<Repository<B>>) -> Router {
  Router::new()
    .nest("/api", staffing_api::api_router(repo))
    .layer(TraceLayer::new_for_http())
}

// ─── Change log ───────────────────────────────────────────────────────────────

/// Log every change published on `bus` at debug level. Logging stops when
/// the returned subscription is dropped.
pub fn log_changes(bus: &NotificationBus) -> Subscription {
  bus.subscribe(|event| {
    tracing::debug!(
      collection = %event.collection,
      action = ?event.action,
      id = event.id.as_deref().unwrap_or("-"),
      "change"
    );
  })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use staffing_core::{backend::MemoryBackend, model::Job};
  use tower::ServiceExt as _;

  fn temp_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir()
      .join(format!("staffing-{name}-{}.toml", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_config_file_uses_defaults() {
    let cfg = load_config(Path::new("/nonexistent/staffing.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.backend, BackendKind::Sqlite);
    assert_eq!(cfg.poll_interval(), DEFAULT_POLL_INTERVAL);
    assert!(!cfg.fallback_to_memory);
  }

  #[test]
  fn config_file_overrides_defaults() {
    let path = temp_config(
      "cfg",
      "port = 9090\nbackend = \"memory\"\npoll_interval_ms = 250\n",
    );
    let cfg = load_config(&path).unwrap();
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.backend, BackendKind::Memory);
    assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.address(), "127.0.0.1:9090");
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/staffing.db")),
      PathBuf::from(home).join("staffing.db")
    );
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let repo = Arc::new(Repository::new(MemoryBackend::new()));
    repo.jobs().create(Job::new("Welder", "Acme")).await.unwrap();

    let resp = app(Arc::clone(&repo))
      .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["jobs"], 1);

    let resp = app(repo)
      .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn change_log_unsubscribes_on_drop() {
    let bus = NotificationBus::new();
    let sub = log_changes(&bus);
    assert_eq!(bus.subscriber_count(), 1);
    drop(sub);
    assert_eq!(bus.subscriber_count(), 0);
  }
}
