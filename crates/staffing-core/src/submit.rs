//! Job application submission.
//!
//! A submission touches three collections in sequence: the candidate is
//! upserted by email, the application is appended, and the job's application
//! counter is recomputed. The whole sequence runs under the repository's
//! write lock. Each step commits on its own; a failure part-way leaves the
//! earlier steps in place.

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::Utc;
use serde::Serialize;
use serde_json::Map;

use crate::{
  Error, Result,
  backend::Backend,
  entity::{Collection, Record},
  id::new_id,
  model::{Application, ApplicationStatus, Candidate, Job, normalize_email},
  repository::{Repository, WriteGuard},
};

// ─── Input ───────────────────────────────────────────────────────────────────

/// A resume attached to an application, inlined into the stored documents
/// as a `data:` URI.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
  pub file_name:  String,
  pub media_type: String,
  pub bytes:      Vec<u8>,
}

impl ResumeUpload {
  pub fn to_data_uri(&self) -> String {
    let media_type = if self.media_type.is_empty() {
      "application/octet-stream"
    } else {
      &self.media_type
    };
    format!("data:{media_type};base64,{}", B64.encode(&self.bytes))
  }
}

/// The fields of the public application form.
#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
  pub job_id:       String,
  pub name:         String,
  pub email:        String,
  pub phone:        Option<String>,
  pub cover_letter: Option<String>,
  pub resume:       Option<ResumeUpload>,
}

impl ApplicationForm {
  fn validate(&self) -> Result<()> {
    if self.job_id.trim().is_empty() {
      return Err(Error::Validation("job is required".to_owned()));
    }
    if self.name.trim().is_empty() {
      return Err(Error::Validation("name is required".to_owned()));
    }
    let email = self.email.trim();
    match email.split_once('@') {
      Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
      _ => Err(Error::Validation(format!("invalid email address: {email:?}"))),
    }
  }
}

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
  pub application:   Record<Application>,
  pub candidate:     Record<Candidate>,
  /// The job after its application counter was recomputed.
  pub job:           Record<Job>,
  /// Whether this submission created the candidate.
  pub new_candidate: bool,
}

// ─── Flow ────────────────────────────────────────────────────────────────────

impl<B: Backend> Repository<B> {
  /// Find a candidate by email, ignoring case and surrounding whitespace.
  pub async fn candidate_by_email(
    &self,
    email: &str,
  ) -> Result<Option<Record<Candidate>>> {
    let wanted = normalize_email(email);
    self
      .candidates()
      .find_one(|c| normalize_email(&c.data.email) == wanted)
      .await
  }

  /// Set a job's `applicationsCount` to the number of applications that
  /// reference it. Returns `None` if the job does not exist.
  pub async fn recount_applications(
    &self,
    job_id: &str,
  ) -> Result<Option<Record<Job>>> {
    let guard = self.write_lock().await;
    self.recount_applications_locked(&guard, job_id).await
  }

  async fn recount_applications_locked(
    &self,
    held: &WriteGuard<'_>,
    job_id: &str,
  ) -> Result<Option<Record<Job>>> {
    let count = self.applications().count(|a| a.data.job_id == job_id).await?;
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    self
      .jobs()
      .modify_locked(held, job_id, |j| j.applications_count = count)
      .await
  }

  /// Run the full submission flow for `form`.
  pub async fn submit_application(
    &self,
    form: ApplicationForm,
  ) -> Result<SubmissionReceipt> {
    form.validate()?;

    let guard = self.write_lock().await;
    let job = self
      .jobs()
      .get_by_id(&form.job_id)
      .await?
      .ok_or_else(|| Error::NotFound {
        collection: Collection::Jobs,
        id:         form.job_id.clone(),
      })?;

    let resume = form.resume.as_ref().map(ResumeUpload::to_data_uri);
    let resume_file_name = form.resume.as_ref().map(|r| r.file_name.clone());

    // Candidate upsert.
    let (candidate, new_candidate) =
      match self.candidate_by_email(&form.email).await? {
        Some(existing) => {
          let touched = self
            .candidates()
            .modify_locked(&guard, &existing.id, |c| {
              if !c.applied_jobs.contains(&job.id) {
                c.applied_jobs.push(job.id.clone());
              }
              if c.phone.is_none() {
                c.phone = form.phone.clone();
              }
              if resume.is_some() {
                c.resume = resume.clone();
              }
            })
            .await?
            .ok_or_else(|| Error::NotFound {
              collection: Collection::Candidates,
              id:         existing.id.clone(),
            })?;
          (touched, false)
        }
        None => {
          let mut fresh = Candidate::new(form.name.trim(), form.email.trim());
          fresh.phone = form.phone.clone();
          fresh.resume = resume.clone();
          fresh.applied_jobs.push(job.id.clone());
          (self.candidates().create_locked(&guard, new_id(), fresh).await?, true)
        }
      };

    let application = self
      .applications()
      .create_locked(&guard, new_id(), Application {
        job_id: job.id.clone(),
        candidate_id: Some(candidate.id.clone()),
        job_title: job.data.title.clone(),
        company: job.data.company.clone(),
        candidate_name: form.name.trim().to_owned(),
        email: form.email.trim().to_owned(),
        phone: form.phone,
        cover_letter: form.cover_letter,
        resume,
        resume_file_name,
        status: ApplicationStatus::Pending,
        stage: "Applied".to_owned(),
        score: None,
        last_updated: Some(Utc::now()),
        extra: Map::new(),
      })
      .await?;

    let job = self
      .recount_applications_locked(&guard, &job.id)
      .await?
      .ok_or_else(|| Error::NotFound {
        collection: Collection::Jobs,
        id:         job.id.clone(),
      })?;

    tracing::info!(
      application = %application.id,
      candidate = %candidate.id,
      job = %job.id,
      new_candidate,
      "application submitted"
    );

    Ok(SubmissionReceipt { application, candidate, job, new_candidate })
  }
}
