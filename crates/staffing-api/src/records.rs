//! Generic CRUD handlers, instantiated once per collection.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/{collection}` | Every record, in stored order |
//! | `POST`   | `/{collection}` | Body: entity JSON, optional `id`; returns 201 |
//! | `GET`    | `/{collection}/{id}` | 404 if not found |
//! | `PATCH`  | `/{collection}/{id}` | Shallow-merge body into the record |
//! | `DELETE` | `/{collection}/{id}` | 204, or 404 if nothing was removed |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::{Map, Value};
use staffing_core::{
  backend::Backend,
  entity::{Entity, Record},
  id::id_from_value,
  repository::Repository,
};

use crate::error::ApiError;

fn not_found<T: Entity>(id: &str) -> ApiError {
  ApiError::NotFound(format!("{} record {id} not found", T::COLLECTION))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /{collection}`
pub async fn list<B, T>(
  State(repo): State<Arc<Repository<B>>>,
) -> Result<Json<Vec<Record<T>>>, ApiError>
where
  B: Backend,
  T: Entity,
{
  Ok(Json(repo.store::<T>().get_all().await?))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /{collection}/{id}`
pub async fn get_one<B, T>(
  State(repo): State<Arc<Repository<B>>>,
  Path(id): Path<String>,
) -> Result<Json<Record<T>>, ApiError>
where
  B: Backend,
  T: Entity,
{
  let record = repo
    .store::<T>()
    .get_by_id(&id)
    .await?
    .ok_or_else(|| not_found::<T>(&id))?;
  Ok(Json(record))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /{collection}`. Returns 201 + the stored record.
///
/// An `id` in the body is honoured (409 if taken); envelope timestamps in the
/// body are ignored.
pub async fn create<B, T>(
  State(repo): State<Arc<Repository<B>>>,
  Json(mut body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError>
where
  B: Backend,
  T: Entity,
{
  let id = match body.remove("id") {
    None | Some(Value::Null) => None,
    Some(v) => Some(
      id_from_value(&v)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid id: {v}")))?,
    ),
  };
  body.remove("createdAt");
  body.remove("updatedAt");

  let data: T = serde_json::from_value(Value::Object(body))
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let store = repo.store::<T>();
  let record = match id {
    Some(id) => store.create_with_id(id, data).await?,
    None => store.create(data).await?,
  };
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /{collection}/{id}`. The body is a JSON object merged onto the record.
pub async fn update<B, T>(
  State(repo): State<Arc<Repository<B>>>,
  Path(id): Path<String>,
  Json(patch): Json<Map<String, Value>>,
) -> Result<Json<Record<T>>, ApiError>
where
  B: Backend,
  T: Entity,
{
  let record = repo
    .store::<T>()
    .update(&id, patch)
    .await?
    .ok_or_else(|| not_found::<T>(&id))?;
  Ok(Json(record))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /{collection}/{id}`
pub async fn remove<B, T>(
  State(repo): State<Arc<Repository<B>>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  B: Backend,
  T: Entity,
{
  if repo.store::<T>().delete(&id).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(not_found::<T>(&id))
  }
}
