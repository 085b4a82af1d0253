//! JSON REST API for the staffing back office.
//!
//! Exposes an axum [`Router`] backed by a [`Repository`] over any
//! [`Backend`]. TLS, auth, and request tracing are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", staffing_api::api_router(repo.clone()))
//! ```

pub mod board;
pub mod dashboard;
pub mod error;
pub mod records;
pub mod review;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use staffing_core::{
  backend::Backend,
  model::{Application, Candidate, Employee, Employer, Job, ScheduleEvent, Team},
  repository::Repository,
};

pub use error::ApiError;

/// Mount list/create and get/patch/delete for one entity type.
macro_rules! crud {
  ($router:expr, $path:literal, $entity:ty, $backend:ty) => {
    $router
      .route(
        $path,
        get(records::list::<$backend, $entity>)
          .post(records::create::<$backend, $entity>),
      )
      .route(
        concat!($path, "/{id}"),
        get(records::get_one::<$backend, $entity>)
          .patch(records::update::<$backend, $entity>)
          .delete(records::remove::<$backend, $entity>),
      )
  };
}

/// Build a fully-materialised API router for `repo`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<B: Backend>(repo: Arc<Repository<B>>) -> Router<()> {
  let router = Router::new();
  let router = crud!(router, "/jobs", Job, B);
  let router = crud!(router, "/candidates", Candidate, B);
  let router = crud!(router, "/employers", Employer, B);
  let router = crud!(router, "/applications", Application, B);
  let router = crud!(router, "/employees", Employee, B);
  let router = crud!(router, "/teams", Team, B);
  let router = crud!(router, "/events", ScheduleEvent, B);

  router
    // Public board
    .route("/public/jobs", get(board::jobs::<B>))
    .route("/public/candidates", get(board::candidates::<B>))
    .route("/jobs/{id}/apply", post(board::apply::<B>))
    // Review
    .route("/candidates/{id}/approval", put(review::set_approval::<B>))
    .route("/applications/{id}/status", put(review::set_status::<B>))
    .route("/applications/{id}/hire", post(review::hire::<B>))
    // Dashboard
    .route("/employers/{id}/teams", get(dashboard::employer_teams::<B>))
    .route("/schedule/upcoming", get(dashboard::upcoming::<B>))
    .route("/stats", get(dashboard::stats::<B>))
    .with_state(repo)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use staffing_core::backend::MemoryBackend;
  use tower::ServiceExt as _;

  fn make_repo() -> Arc<Repository<MemoryBackend>> {
    Arc::new(Repository::new(MemoryBackend::new()))
  }

  async fn call(
    repo: &Arc<Repository<MemoryBackend>>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = api_router(Arc::clone(repo))
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  // ── CRUD ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn empty_collection_lists_as_empty_array() {
    let repo = make_repo();
    let (status, body) = call(&repo, "GET", "/teams", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
  }

  #[tokio::test]
  async fn create_then_get_one() {
    let repo = make_repo();
    let (status, created) = call(
      &repo,
      "POST",
      "/jobs",
      Some(json!({ "title": "Welder", "company": "Acme", "shift": "night" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();
    assert!(created["createdAt"].is_string());
    assert_eq!(created["status"], "Active");

    let (status, fetched) = call(&repo, "GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert_eq!(fetched["shift"], "night", "unknown fields are kept");
  }

  #[tokio::test]
  async fn create_with_explicit_id_and_conflict() {
    let repo = make_repo();
    let body = json!({ "id": "JOB001", "title": "Welder" });
    let (status, created) = call(&repo, "POST", "/jobs", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "JOB001");

    let (status, err) = call(&repo, "POST", "/jobs", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["error"].is_string());
  }

  #[tokio::test]
  async fn create_invalid_entity_is_400() {
    let repo = make_repo();
    let (status, _) =
      call(&repo, "POST", "/candidates", Some(json!({ "name": "Ada" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(repo.candidates().get_all().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn get_unknown_id_is_404() {
    let repo = make_repo();
    let (status, body) = call(&repo, "GET", "/employers/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
  }

  #[tokio::test]
  async fn patch_merges_and_protects_envelope() {
    let repo = make_repo();
    let job = repo.jobs().create(Job::new("Welder", "Acme")).await.unwrap();

    let (status, patched) = call(
      &repo,
      "PATCH",
      &format!("/jobs/{}", job.id),
      Some(json!({ "id": "hijack", "location": "Hull" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["id"], job.id.as_str());
    assert_eq!(patched["location"], "Hull");
    assert_eq!(patched["title"], "Welder");
    assert!(patched["updatedAt"].is_string());
  }

  #[tokio::test]
  async fn patch_with_wrong_type_is_400() {
    let repo = make_repo();
    let job = repo.jobs().create(Job::new("Welder", "Acme")).await.unwrap();
    let (status, _) = call(
      &repo,
      "PATCH",
      &format!("/jobs/{}", job.id),
      Some(json!({ "applicationsCount": "many" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn delete_then_delete_again() {
    let repo = make_repo();
    let team = repo
      .teams()
      .create(Team::new("Platform", "ops@acme.test"))
      .await
      .unwrap();
    let uri = format!("/teams/{}", team.id);

    let (status, _) = call(&repo, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&repo, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Board ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn odd_stored_records_do_not_hide_their_neighbours() {
    let backend = MemoryBackend::new();
    let seeded = json!([
      { "id": "c1", "name": "Ada", "email": "ada@example.com", "location": null },
      { "id": "c2", "name": "Bob", "email": "bob@example.com", "skills": "welding" },
    ]);
    backend.write("candidates", seeded.to_string()).await.unwrap();
    let repo = Arc::new(Repository::new(backend));

    let (status, listed) = call(&repo, "GET", "/candidates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], "c1");

    let (status, _) = call(
      &repo,
      "PUT",
      "/candidates/c2/approval",
      Some(json!({ "approvalStatus": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, healed) = call(
      &repo,
      "PATCH",
      "/candidates/c2",
      Some(json!({ "skills": ["welding"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(healed["skills"], json!(["welding"]));
  }

  #[tokio::test]
  async fn public_board_filters_active_jobs() {
    let repo = make_repo();
    let mut remote = Job::new("Rust Engineer", "Acme");
    remote.location = "Remote".into();
    repo.jobs().create(remote).await.unwrap();
    let mut closed = Job::new("Rust Intern", "Acme");
    closed.status = staffing_core::model::JobStatus::Closed;
    repo.jobs().create(closed).await.unwrap();
    repo.jobs().create(Job::new("Forklift Driver", "Depot")).await.unwrap();

    let (status, body) = call(&repo, "GET", "/public/jobs?q=rust", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = body
      .as_array()
      .unwrap()
      .iter()
      .map(|j| j["title"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(titles, ["Rust Engineer"]);
  }

  #[tokio::test]
  async fn apply_runs_submission_flow() {
    let repo = make_repo();
    let job = repo
      .jobs()
      .create(Job::new("Data Analyst", "Acme"))
      .await
      .unwrap();

    let (status, receipt) = call(
      &repo,
      "POST",
      &format!("/jobs/{}/apply", job.id),
      Some(json!({
        "name": "Ada",
        "email": "ada@example.com",
        "coverLetter": "Hello",
        "resume": { "fileName": "cv.pdf", "mediaType": "application/pdf", "data": "aGk=" },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["newCandidate"], true);
    assert_eq!(receipt["job"]["applicationsCount"], 1);
    assert_eq!(receipt["application"]["jobId"], job.id.as_str());
    assert_eq!(
      receipt["application"]["resume"],
      "data:application/pdf;base64,aGk="
    );
    assert_eq!(receipt["candidate"]["appliedJobs"], json!([job.id]));
  }

  #[tokio::test]
  async fn apply_to_unknown_job_is_404() {
    let repo = make_repo();
    let (status, _) = call(
      &repo,
      "POST",
      "/jobs/missing/apply",
      Some(json!({ "name": "Ada", "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(repo.candidates().get_all().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn apply_with_bad_base64_is_400() {
    let repo = make_repo();
    let job = repo.jobs().create(Job::new("Welder", "Acme")).await.unwrap();
    let (status, _) = call(
      &repo,
      "POST",
      &format!("/jobs/{}/apply", job.id),
      Some(json!({
        "name": "Ada",
        "email": "ada@example.com",
        "resume": { "fileName": "cv.pdf", "data": "***" },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Review ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn approval_controls_public_candidates() {
    let repo = make_repo();
    let ada = repo
      .candidates()
      .create(Candidate::new("Ada", "ada@example.com"))
      .await
      .unwrap();

    let (_, listed) = call(&repo, "GET", "/public/candidates", None).await;
    assert_eq!(listed, json!([]));

    let (status, updated) = call(
      &repo,
      "PUT",
      &format!("/candidates/{}/approval", ada.id),
      Some(json!({ "approvalStatus": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["approvalStatus"], "approved");

    let (_, listed) = call(&repo, "GET", "/public/candidates", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = call(
      &repo,
      "PUT",
      &format!("/candidates/{}/approval", ada.id),
      Some(json!({ "approvalStatus": "maybe" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn status_then_hire() {
    let repo = make_repo();
    let job = repo.jobs().create(Job::new("Welder", "Acme")).await.unwrap();
    let (_, receipt) = call(
      &repo,
      "POST",
      &format!("/jobs/{}/apply", job.id),
      Some(json!({ "name": "Ada", "email": "ada@example.com" })),
    )
    .await;
    let app_id = receipt["application"]["id"].as_str().unwrap().to_owned();

    let (status, app) = call(
      &repo,
      "PUT",
      &format!("/applications/{app_id}/status"),
      Some(json!({ "status": "Interview", "stage": "Panel" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app["status"], "Interview");
    assert_eq!(app["stage"], "Panel");

    let hire_uri = format!("/applications/{app_id}/hire");
    let (status, hired) =
      call(&repo, "POST", &hire_uri, Some(json!({ "department": "Fabrication" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(hired["employee"]["position"], "Welder");
    assert_eq!(hired["application"]["status"], "Accepted");

    let (status, _) =
      call(&repo, "POST", &hire_uri, Some(json!({ "department": "Fabrication" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Dashboard ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn employer_teams_and_stats() {
    let repo = make_repo();
    let acme = repo
      .employers()
      .create(Employer::new("Acme", "HR@acme.test"))
      .await
      .unwrap();
    repo
      .teams()
      .create(Team::new("Platform", "hr@acme.test"))
      .await
      .unwrap();
    repo
      .teams()
      .create(Team::new("Elsewhere", "ops@other.test"))
      .await
      .unwrap();

    let (status, teams) =
      call(&repo, "GET", &format!("/employers/{}/teams", acme.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(teams.as_array().unwrap().len(), 1);
    assert_eq!(teams[0]["teamName"], "Platform");

    let (status, _) = call(&repo, "GET", "/employers/ghost/teams", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, stats) = call(&repo, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["teams"], 2);
    assert_eq!(stats["jobs"], 0);
  }

  #[tokio::test]
  async fn upcoming_schedule_respects_from() {
    let repo = make_repo();
    let day = |d| chrono::NaiveDate::from_ymd_opt(2030, 1, d).unwrap();
    repo
      .events()
      .create(ScheduleEvent::new("Later", day(20)))
      .await
      .unwrap();
    repo
      .events()
      .create(ScheduleEvent::new("Past", day(1)))
      .await
      .unwrap();
    repo
      .events()
      .create(ScheduleEvent::new("Sooner", day(10)))
      .await
      .unwrap();

    let (status, events) =
      call(&repo, "GET", "/schedule/upcoming?from=2030-01-05", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = events
      .as_array()
      .unwrap()
      .iter()
      .map(|e| e["title"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(titles, ["Sooner", "Later"]);
  }
}
