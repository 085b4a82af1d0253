//! Back-office workflows layered over the entity stores: the public job
//! board, candidate approval, application review and hiring, employer team
//! lookup, the schedule, and dashboard counters.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::{
  Error, Result,
  backend::Backend,
  entity::{Collection, Record},
  id::new_id,
  model::{
    Application, ApplicationStatus, ApprovalStatus, Candidate, CandidateStatus,
    Employee, EmployeeStatus, Job, JobStatus, ScheduleEvent, Team,
  },
  repository::{Repository, WriteGuard},
};

// ─── Job board ───────────────────────────────────────────────────────────────

/// Filters for the public job board. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
  /// Free text matched against title, company, location, category, and
  /// description.
  pub q:        Option<String>,
  #[serde(rename = "type")]
  pub job_type: Option<String>,
  pub category: Option<String>,
  pub location: Option<String>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
  s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl JobFilter {
  pub fn matches(&self, job: &Job) -> bool {
    if let Some(q) = non_empty(&self.q) {
      let q = q.to_lowercase();
      let hit = [
        &job.title,
        &job.company,
        &job.location,
        &job.category,
        &job.description,
      ]
      .iter()
      .any(|field| field.to_lowercase().contains(&q));
      if !hit {
        return false;
      }
    }
    let exact = |wanted: &Option<String>, actual: &str| {
      non_empty(wanted).is_none_or(|w| w.eq_ignore_ascii_case(actual.trim()))
    };
    exact(&self.job_type, &job.job_type)
      && exact(&self.category, &job.category)
      && exact(&self.location, &job.location)
  }
}

// ─── Receipts & stats ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HireReceipt {
  pub employee:    Record<Employee>,
  pub application: Record<Application>,
}

/// Counters for the back-office dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub jobs:                   usize,
  pub active_jobs:            usize,
  pub candidates:             usize,
  pub pending_approvals:      usize,
  pub applications:           usize,
  /// Applications keyed by status name.
  pub applications_by_status: BTreeMap<String, usize>,
  pub employees:              usize,
  pub teams:                  usize,
  pub events:                 usize,
}

// ─── Workflows ───────────────────────────────────────────────────────────────

impl<B: Backend> Repository<B> {
  /// Active jobs matching `filter`, in stored order.
  pub async fn public_jobs(&self, filter: &JobFilter) -> Result<Vec<Record<Job>>> {
    self
      .jobs()
      .find(|j| j.data.status == JobStatus::Active && filter.matches(&j.data))
      .await
  }

  pub async fn set_approval(
    &self,
    candidate_id: &str,
    status: ApprovalStatus,
  ) -> Result<Option<Record<Candidate>>> {
    self
      .candidates()
      .modify(candidate_id, |c| c.approval_status = status)
      .await
  }

  /// Candidates cleared for public listing.
  pub async fn approved_candidates(&self) -> Result<Vec<Record<Candidate>>> {
    self
      .candidates()
      .find(|c| c.data.approval_status == ApprovalStatus::Approved)
      .await
  }

  /// Move an application to `status`, optionally setting its pipeline stage.
  pub async fn set_application_status(
    &self,
    application_id: &str,
    status: ApplicationStatus,
    stage: Option<String>,
  ) -> Result<Option<Record<Application>>> {
    let guard = self.write_lock().await;
    self
      .set_application_status_locked(&guard, application_id, status, stage)
      .await
  }

  async fn set_application_status_locked(
    &self,
    held: &WriteGuard<'_>,
    application_id: &str,
    status: ApplicationStatus,
    stage: Option<String>,
  ) -> Result<Option<Record<Application>>> {
    self
      .applications()
      .modify_locked(held, application_id, move |a| {
        a.status = status;
        if let Some(stage) = stage {
          a.stage = stage;
        }
        a.last_updated = Some(Utc::now());
      })
      .await
  }

  /// Accept an application and create the matching employee record.
  ///
  /// The candidate (if still present) is marked `Placed`. Hiring the same
  /// application twice is a validation error. Every step runs under the
  /// write lock, so two concurrent hires of one application cannot both
  /// create an employee.
  pub async fn hire_applicant(
    &self,
    application_id: &str,
    department: &str,
    position: &str,
  ) -> Result<HireReceipt> {
    let missing = || Error::NotFound {
      collection: Collection::Applications,
      id:         application_id.to_owned(),
    };

    let guard = self.write_lock().await;
    let application = self
      .applications()
      .get_by_id(application_id)
      .await?
      .ok_or_else(missing)?;

    let already = self
      .employees()
      .find_one(|e| e.data.application_id.as_deref() == Some(application_id))
      .await?;
    if let Some(existing) = already {
      return Err(Error::Validation(format!(
        "application {application_id} was already hired as employee {}",
        existing.id
      )));
    }

    let position = if position.trim().is_empty() {
      application.data.job_title.clone()
    } else {
      position.trim().to_owned()
    };

    let employee = self
      .employees()
      .create_locked(&guard, new_id(), Employee {
        name: application.data.candidate_name.clone(),
        email: Some(application.data.email.clone()),
        phone: application.data.phone.clone(),
        department: department.trim().to_owned(),
        position,
        status: EmployeeStatus::Active,
        hire_date: Some(Utc::now().date_naive()),
        application_id: Some(application.id.clone()),
        candidate_id: application.data.candidate_id.clone(),
        extra: Map::new(),
      })
      .await?;

    let application = self
      .set_application_status_locked(
        &guard,
        application_id,
        ApplicationStatus::Accepted,
        Some("Hired".to_owned()),
      )
      .await?
      .ok_or_else(missing)?;

    if let Some(candidate_id) = &application.data.candidate_id {
      let placed = self
        .candidates()
        .modify_locked(&guard, candidate_id, |c| c.status = CandidateStatus::Placed)
        .await;
      match placed {
        Ok(_) => {}
        Err(Error::Unreadable { .. }) => {
          tracing::warn!(candidate = %candidate_id, "hired candidate record is unreadable; status left as stored");
        }
        Err(e) => return Err(e),
      }
    }

    Ok(HireReceipt { employee, application })
  }

  /// Teams whose contact email matches the employer's, ignoring case.
  pub async fn teams_for_employer(
    &self,
    employer_id: &str,
  ) -> Result<Vec<Record<Team>>> {
    let employer = self
      .employers()
      .get_by_id(employer_id)
      .await?
      .ok_or_else(|| Error::NotFound {
        collection: Collection::Employers,
        id:         employer_id.to_owned(),
      })?;
    let email = employer.data.email.trim().to_lowercase();
    if email.is_empty() {
      return Ok(Vec::new());
    }
    self
      .teams()
      .find(|t| t.data.email.trim().to_lowercase() == email)
      .await
  }

  /// Events on or after `from`, ordered by date then time. Undated events
  /// are skipped.
  pub async fn upcoming_events(
    &self,
    from: NaiveDate,
  ) -> Result<Vec<Record<ScheduleEvent>>> {
    let mut events = self
      .events()
      .find(|e| e.data.date.is_some_and(|d| d >= from))
      .await?;
    events.sort_by(|a, b| {
      (a.data.date, a.data.time.as_deref().unwrap_or(""))
        .cmp(&(b.data.date, b.data.time.as_deref().unwrap_or("")))
    });
    Ok(events)
  }

  pub async fn stats(&self) -> Result<DashboardStats> {
    let jobs = self.jobs().get_all().await?;
    let candidates = self.candidates().get_all().await?;
    let applications = self.applications().get_all().await?;

    let mut applications_by_status = BTreeMap::new();
    for a in &applications {
      *applications_by_status
        .entry(a.data.status.to_string())
        .or_insert(0) += 1;
    }

    Ok(DashboardStats {
      jobs: jobs.len(),
      active_jobs: jobs
        .iter()
        .filter(|j| j.data.status == JobStatus::Active)
        .count(),
      candidates: candidates.len(),
      pending_approvals: candidates
        .iter()
        .filter(|c| c.data.approval_status == ApprovalStatus::Pending)
        .count(),
      applications: applications.len(),
      applications_by_status,
      employees: self.employees().count(|_| true).await?,
      teams: self.teams().count(|_| true).await?,
      events: self.events().count(|_| true).await?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn job(title: &str, location: &str, job_type: &str) -> Job {
    let mut j = Job::new(title, "Acme");
    j.location = location.into();
    j.job_type = job_type.into();
    j.category = "Warehouse".into();
    j
  }

  #[test]
  fn filter_matches_free_text_case_insensitively() {
    let f = JobFilter { q: Some("forklift".into()), ..Default::default() };
    assert!(f.matches(&job("Forklift Operator", "Leeds", "Full-time")));
    assert!(!f.matches(&job("Data Analyst", "Leeds", "Full-time")));
  }

  #[test]
  fn filter_exact_fields_ignore_case_and_blank() {
    let f = JobFilter {
      job_type: Some("full-time".into()),
      location: Some("  ".into()),
      ..Default::default()
    };
    assert!(f.matches(&job("Picker", "York", "Full-Time")));
    assert!(!f.matches(&job("Picker", "York", "Contract")));
  }
}
