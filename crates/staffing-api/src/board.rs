//! Handlers for the public job board.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/public/jobs` | Active jobs; optional `q`, `type`, `category`, `location` |
//! | `GET`  | `/public/candidates` | Approved candidates only |
//! | `POST` | `/jobs/{id}/apply` | Body: [`ApplyBody`]; returns 201 + receipt |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use serde::Deserialize;
use staffing_core::{
  backend::Backend,
  entity::Record,
  model::{Candidate, Job},
  repository::Repository,
  submit::{ApplicationForm, ResumeUpload},
  workflow::JobFilter,
};

use crate::error::ApiError;

// ─── Listings ─────────────────────────────────────────────────────────────────

/// `GET /public/jobs[?q=..][&type=..][&category=..][&location=..]`
pub async fn jobs<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
  Query(filter): Query<JobFilter>,
) -> Result<Json<Vec<Record<Job>>>, ApiError> {
  Ok(Json(repo.public_jobs(&filter).await?))
}

/// `GET /public/candidates`
pub async fn candidates<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
) -> Result<Json<Vec<Record<Candidate>>>, ApiError> {
  Ok(Json(repo.approved_candidates().await?))
}

// ─── Apply ────────────────────────────────────────────────────────────────────

/// A resume file carried inline as base64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeBody {
  pub file_name:  String,
  #[serde(default)]
  pub media_type: String,
  /// Standard base64, no `data:` prefix.
  pub data:       String,
}

/// JSON body accepted by `POST /jobs/{id}/apply`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBody {
  pub name:         String,
  pub email:        String,
  pub phone:        Option<String>,
  pub cover_letter: Option<String>,
  pub resume:       Option<ResumeBody>,
}

impl ApplyBody {
  fn into_form(self, job_id: String) -> Result<ApplicationForm, ApiError> {
    let resume = self
      .resume
      .map(|r| {
        let bytes = B64.decode(r.data.trim()).map_err(|e| {
          ApiError::BadRequest(format!("resume is not valid base64: {e}"))
        })?;
        Ok::<_, ApiError>(ResumeUpload {
          file_name: r.file_name,
          media_type: r.media_type,
          bytes,
        })
      })
      .transpose()?;

    Ok(ApplicationForm {
      job_id,
      name: self.name,
      email: self.email,
      phone: self.phone.filter(|p| !p.trim().is_empty()),
      cover_letter: self.cover_letter.filter(|c| !c.trim().is_empty()),
      resume,
    })
  }
}

/// `POST /jobs/{id}/apply`. Returns 201 + the submission receipt.
pub async fn apply<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
  Path(job_id): Path<String>,
  Json(body): Json<ApplyBody>,
) -> Result<impl IntoResponse, ApiError> {
  let form = body.into_form(job_id)?;
  let receipt = repo.submit_application(form).await?;
  Ok((StatusCode::CREATED, Json(receipt)))
}
