//! Back-office review actions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/candidates/{id}/approval` | Body: `{"approvalStatus":"approved"}` |
//! | `PUT`  | `/applications/{id}/status` | Body: `{"status":"Interview","stage":"..."}` |
//! | `POST` | `/applications/{id}/hire` | Body: `{"department":"..","position":".."}`; returns 201 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use staffing_core::{
  backend::Backend,
  entity::Record,
  model::{Application, ApplicationStatus, ApprovalStatus, Candidate},
  repository::Repository,
};

use crate::error::ApiError;

// ─── Approval ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalBody {
  pub approval_status: ApprovalStatus,
}

/// `PUT /candidates/{id}/approval`
pub async fn set_approval<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
  Path(id): Path<String>,
  Json(body): Json<ApprovalBody>,
) -> Result<Json<Record<Candidate>>, ApiError> {
  if let ApprovalStatus::Other(raw) = &body.approval_status {
    return Err(ApiError::BadRequest(format!("unknown approval status {raw:?}")));
  }
  let candidate = repo
    .set_approval(&id, body.approval_status)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("candidate {id} not found")))?;
  Ok(Json(candidate))
}

// ─── Application status ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: ApplicationStatus,
  /// Free-form pipeline stage; left unchanged when absent.
  pub stage:  Option<String>,
}

/// `PUT /applications/{id}/status`
pub async fn set_status<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
  Path(id): Path<String>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Record<Application>>, ApiError> {
  let stage = body.stage.filter(|s| !s.trim().is_empty());
  let application = repo
    .set_application_status(&id, body.status, stage)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("application {id} not found")))?;
  Ok(Json(application))
}

// ─── Hire ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HireBody {
  pub department: String,
  /// Defaults to the application's job title when empty.
  pub position:   String,
}

/// `POST /applications/{id}/hire`. Returns 201 + the new employee and the
/// accepted application.
pub async fn hire<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
  Path(id): Path<String>,
  Json(body): Json<HireBody>,
) -> Result<impl IntoResponse, ApiError> {
  let receipt = repo
    .hire_applicant(&id, &body.department, &body.position)
    .await?;
  Ok((StatusCode::CREATED, Json(receipt)))
}
