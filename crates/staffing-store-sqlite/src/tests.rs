//! Integration tests for `SqliteBackend`, directly and under a repository.

use std::{
  path::PathBuf,
  sync::{Arc, Mutex},
  time::Duration,
};

use staffing_core::{
  backend::Backend,
  bus::ChangeAction,
  entity::Collection,
  model::{ApprovalStatus, Candidate, Job},
  repository::Repository,
  submit::ApplicationForm,
  sync::SyncWatcher,
};

use crate::SqliteBackend;

async fn backend() -> SqliteBackend {
  SqliteBackend::open_in_memory()
    .await
    .expect("in-memory backend")
}

/// A fresh database path under the system temp dir.
fn temp_db(name: &str) -> PathBuf {
  let path = std::env::temp_dir()
    .join(format!("staffing-{name}-{}.db", std::process::id()));
  let _ = std::fs::remove_file(&path);
  path
}

// ─── Raw key-value behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn read_missing_key_returns_none() {
  let b = backend().await;
  assert_eq!(b.read("jobs").await.unwrap(), None);
  assert_eq!(b.updated_at("jobs").await.unwrap(), None);
}

#[tokio::test]
async fn write_then_read() {
  let b = backend().await;
  b.write("jobs", "[]".into()).await.unwrap();
  assert_eq!(b.read("jobs").await.unwrap().as_deref(), Some("[]"));
  assert!(b.updated_at("jobs").await.unwrap().is_some());
}

#[tokio::test]
async fn write_overwrites_previous_value() {
  let b = backend().await;
  b.write("jobs", "[1]".into()).await.unwrap();
  b.write("jobs", "[1,2]".into()).await.unwrap();
  assert_eq!(b.read("jobs").await.unwrap().as_deref(), Some("[1,2]"));
  assert_eq!(b.keys().await.unwrap(), ["jobs"]);
}

#[tokio::test]
async fn remove_is_idempotent() {
  let b = backend().await;
  b.write("teams", "[]".into()).await.unwrap();
  b.remove("teams").await.unwrap();
  b.remove("teams").await.unwrap();
  assert_eq!(b.read("teams").await.unwrap(), None);
  assert!(b.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn keys_are_sorted() {
  let b = backend().await;
  for k in ["teams", "applications", "jobs"] {
    b.write(k, "[]".into()).await.unwrap();
  }
  assert_eq!(b.keys().await.unwrap(), ["applications", "jobs", "teams"]);
}

#[tokio::test]
async fn cannot_watch() {
  assert!(backend().await.watch().is_none());
}

// ─── Under a repository ──────────────────────────────────────────────────────

#[tokio::test]
async fn repository_crud_round_trip() {
  let repo = Repository::new(backend().await);

  let job = repo.jobs().create(Job::new("Welder", "Acme")).await.unwrap();
  let fetched = repo.jobs().get_by_id(&job.id).await.unwrap().unwrap();
  assert_eq!(fetched, job);

  let patch = serde_json::json!({ "location": "Hull" });
  let serde_json::Value::Object(patch) = patch else { unreachable!() };
  let updated = repo.jobs().update(&job.id, patch).await.unwrap().unwrap();
  assert_eq!(updated.data.location, "Hull");

  assert!(repo.jobs().delete(&job.id).await.unwrap());
  assert!(!repo.jobs().delete(&job.id).await.unwrap());
  assert!(repo.jobs().get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_row_reads_as_empty_collection() {
  let b = backend().await;
  b.write("candidates", "[{\"id\":".into()).await.unwrap();
  let repo = Repository::new(b);

  assert!(repo.candidates().get_all().await.unwrap().is_empty());
  repo
    .candidates()
    .create(Candidate::new("Ada", "ada@example.com"))
    .await
    .unwrap();
  assert_eq!(repo.candidates().get_all().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_and_patches_all_persist() {
  let repo = Arc::new(Repository::new(backend().await));
  let mut ids = Vec::new();
  for i in 0..30 {
    let c = Candidate::new(format!("Candidate {i}"), format!("c{i}@example.com"));
    ids.push(repo.candidates().create(c).await.unwrap().id);
  }

  let mut tasks = tokio::task::JoinSet::new();
  for id in ids {
    let (r, id_) = (Arc::clone(&repo), id.clone());
    tasks.spawn(async move {
      r.set_approval(&id_, ApprovalStatus::Approved).await.map(drop)
    });
    let r = Arc::clone(&repo);
    tasks.spawn(async move {
      let patch = serde_json::json!({ "phone": "555-0100" });
      let serde_json::Value::Object(patch) = patch else { unreachable!() };
      r.candidates().update(&id, patch).await.map(drop)
    });
  }
  while let Some(res) = tasks.join_next().await {
    res.unwrap().unwrap();
  }

  for c in repo.candidates().get_all().await.unwrap() {
    assert_eq!(c.data.approval_status, ApprovalStatus::Approved, "{}", c.id);
    assert_eq!(c.data.phone.as_deref(), Some("555-0100"), "{}", c.id);
  }
}

#[tokio::test]
async fn data_survives_reopening_the_file() {
  let path = temp_db("reopen");

  let id = {
    let repo = Repository::new(SqliteBackend::open(&path).await.unwrap());
    repo.jobs().create(Job::new("Welder", "Acme")).await.unwrap().id
  };

  let repo = Repository::new(SqliteBackend::open(&path).await.unwrap());
  let job = repo.jobs().get_by_id(&id).await.unwrap().unwrap();
  assert_eq!(job.data.title, "Welder");

  let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn submission_flow_against_sqlite() {
  let repo = Repository::new(backend().await);
  let job = repo.jobs().create(Job::new("Data Analyst", "Acme")).await.unwrap();

  let receipt = repo
    .submit_application(ApplicationForm {
      job_id: job.id.clone(),
      name: "Ada".into(),
      email: "a@b.com".into(),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(receipt.job.data.applications_count, 1);
  assert_eq!(receipt.candidate.data.applied_jobs, [job.id]);
}

#[tokio::test]
async fn second_connection_is_seen_by_polling() {
  let path = temp_db("poll");
  let ours = Arc::new(Repository::new(SqliteBackend::open(&path).await.unwrap()));
  let theirs = Repository::new(SqliteBackend::open(&path).await.unwrap());

  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = Arc::clone(&seen);
  let _sub = ours.subscribe(move |e| sink.lock().unwrap().push((e.collection, e.action)));
  let watcher = SyncWatcher::spawn(Arc::clone(&ours), Duration::from_millis(50))
    .await
    .unwrap();

  theirs.jobs().create(Job::new("Welder", "Acme")).await.unwrap();

  let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
  loop {
    if seen.lock().unwrap().contains(&(Collection::Jobs, ChangeAction::Synced)) {
      break;
    }
    assert!(tokio::time::Instant::now() < deadline, "no sync event within 2s");
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  assert_eq!(ours.jobs().get_all().await.unwrap().len(), 1);

  watcher.shutdown().await;
  let _ = std::fs::remove_file(&path);
}
