//! Read-only views for the back office.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/employers/{id}/teams` | Teams sharing the employer's email |
//! | `GET`  | `/schedule/upcoming` | `?from=YYYY-MM-DD`, defaults to today (UTC) |
//! | `GET`  | `/stats` | [`DashboardStats`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use staffing_core::{
  backend::Backend,
  entity::Record,
  model::{ScheduleEvent, Team},
  repository::Repository,
  workflow::DashboardStats,
};

use crate::error::ApiError;

/// `GET /employers/{id}/teams`
pub async fn employer_teams<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Record<Team>>>, ApiError> {
  Ok(Json(repo.teams_for_employer(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingParams {
  pub from: Option<NaiveDate>,
}

/// `GET /schedule/upcoming[?from=YYYY-MM-DD]`
pub async fn upcoming<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
  Query(params): Query<UpcomingParams>,
) -> Result<Json<Vec<Record<ScheduleEvent>>>, ApiError> {
  let from = params.from.unwrap_or_else(|| Utc::now().date_naive());
  Ok(Json(repo.upcoming_events(from).await?))
}

/// `GET /stats`
pub async fn stats<B: Backend>(
  State(repo): State<Arc<Repository<B>>>,
) -> Result<Json<DashboardStats>, ApiError> {
  Ok(Json(repo.stats().await?))
}
