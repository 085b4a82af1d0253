//! Async HTTP client wrapping the staffing JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use staffing_core::{
  entity::Record,
  model::{Candidate, Job},
  workflow::DashboardStats,
};

/// Connection settings for the staffing API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the staffing JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp
    .json::<Value>()
    .await
    .ok()
    .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
    .unwrap_or_default();
  if message.is_empty() {
    Err(anyhow!("{what} → {status}"))
  } else {
    Err(anyhow!("{what} → {status}: {message}"))
  }
}

async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  check(resp, what)
    .await?
    .json()
    .await
    .with_context(|| format!("deserialising {what} response"))
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  // ── Jobs ──────────────────────────────────────────────────────────────────

  /// `GET /api/jobs`, or `GET /api/public/jobs?..` when `public` is set.
  pub async fn list_jobs(
    &self,
    public: bool,
    filter: &[(&str, String)],
  ) -> Result<Vec<Record<Job>>> {
    let req = if public {
      self.client.get(self.url("/public/jobs")).query(filter)
    } else {
      self.client.get(self.url("/jobs"))
    };
    let resp = req.send().await.context("GET /jobs failed")?;
    decode(resp, "GET /jobs").await
  }

  /// `POST /api/jobs`
  pub async fn create_job(&self, job: &Job) -> Result<Record<Job>> {
    let resp = self
      .client
      .post(self.url("/jobs"))
      .json(job)
      .send()
      .await
      .context("POST /jobs failed")?;
    decode(resp, "POST /jobs").await
  }

  /// `DELETE /api/jobs/{id}`. `Ok(false)` if there was no such job.
  pub async fn delete_job(&self, id: &str) -> Result<bool> {
    let resp = self
      .client
      .delete(self.url(&format!("/jobs/{id}")))
      .send()
      .await
      .context("DELETE /jobs failed")?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(false);
    }
    check(resp, "DELETE /jobs").await?;
    Ok(true)
  }

  /// `POST /api/jobs/{id}/apply`. Returns the raw submission receipt.
  pub async fn apply(&self, job_id: &str, body: &Value) -> Result<Value> {
    let resp = self
      .client
      .post(self.url(&format!("/jobs/{job_id}/apply")))
      .json(body)
      .send()
      .await
      .context("POST /jobs/{id}/apply failed")?;
    decode(resp, "POST /jobs/{id}/apply").await
  }

  // ── Candidates ────────────────────────────────────────────────────────────

  /// `GET /api/candidates`, or `GET /api/public/candidates` for approved only.
  pub async fn list_candidates(
    &self,
    approved_only: bool,
  ) -> Result<Vec<Record<Candidate>>> {
    let path = if approved_only { "/public/candidates" } else { "/candidates" };
    let resp = self
      .client
      .get(self.url(path))
      .send()
      .await
      .context("GET /candidates failed")?;
    decode(resp, "GET /candidates").await
  }

  /// `PUT /api/candidates/{id}/approval`
  pub async fn set_approval(
    &self,
    id: &str,
    approval_status: &str,
  ) -> Result<Record<Candidate>> {
    let resp = self
      .client
      .put(self.url(&format!("/candidates/{id}/approval")))
      .json(&serde_json::json!({ "approvalStatus": approval_status }))
      .send()
      .await
      .context("PUT /candidates/{id}/approval failed")?;
    decode(resp, "PUT /candidates/{id}/approval").await
  }

  // ── Dashboard ─────────────────────────────────────────────────────────────

  /// `GET /api/stats`
  pub async fn stats(&self) -> Result<DashboardStats> {
    let resp = self
      .client
      .get(self.url("/stats"))
      .send()
      .await
      .context("GET /stats failed")?;
    decode(resp, "GET /stats").await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_joins_base_and_api_prefix() {
    let client = ApiClient::new(ApiConfig {
      base_url: "http://localhost:8080/".to_string(),
    })
    .unwrap();
    assert_eq!(client.url("/jobs"), "http://localhost:8080/api/jobs");
    assert_eq!(
      client.url("/jobs/JOB001/apply"),
      "http://localhost:8080/api/jobs/JOB001/apply"
    );
  }
}
