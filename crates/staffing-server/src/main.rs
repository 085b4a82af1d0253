//! staffing-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! configured backend, starts the sync watcher, and serves the JSON API over
//! HTTP under `/api`.
//!
//! ```
//! cargo run -p staffing-server -- --config config.toml
//! STAFFING_BACKEND=memory STAFFING_PORT=9000 cargo run -p staffing-server
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use staffing_core::{
  backend::{Backend, MemoryBackend},
  fallback::FallbackBackend,
  repository::Repository,
  sync::SyncWatcher,
};
use staffing_server::{BackendKind, ServerConfig, expand_tilde, load_config};
use staffing_store_sqlite::SqliteBackend;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Staffing back-office API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = load_config(&cli.config).context("failed to load configuration")?;

  match cfg.backend {
    BackendKind::Memory => {
      tracing::warn!("using the in-memory backend; data is lost on exit");
      serve(MemoryBackend::new(), &cfg).await
    }
    BackendKind::Sqlite => {
      let store_path = expand_tilde(&cfg.store_path);
      if let Some(parent) = store_path.parent()
        && !parent.as_os_str().is_empty()
      {
        std::fs::create_dir_all(parent)
          .with_context(|| format!("failed to create {parent:?}"))?;
      }

      match SqliteBackend::open(&store_path).await {
        Ok(db) if cfg.fallback_to_memory => {
          serve(FallbackBackend::new(db, MemoryBackend::new()), &cfg).await
        }
        Ok(db) => serve(db, &cfg).await,
        Err(e) if cfg.fallback_to_memory => {
          tracing::warn!(
            error = %e,
            path = ?store_path,
            "failed to open store; falling back to memory"
          );
          serve(MemoryBackend::new(), &cfg).await
        }
        Err(e) => Err(e)
          .with_context(|| format!("failed to open store at {store_path:?}")),
      }
    }
  }
}

async fn serve<B: Backend>(backend: B, cfg: &ServerConfig) -> anyhow::Result<()> {
  let repo = Arc::new(Repository::new(backend));
  let _change_log = staffing_server::log_changes(repo.bus());

  let watcher = SyncWatcher::spawn(Arc::clone(&repo), cfg.poll_interval())
    .await
    .context("failed to start sync watcher")?;

  let app = staffing_server::app(repo);
  let address = cfg.address();

  tracing::info!(backend = ?cfg.backend, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  watcher.shutdown().await;
  tracing::info!("shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
}
