//! Entity payloads for the seven staffing collections.
//!
//! Every payload keeps unrecognised fields in `extra` so documents written by
//! other clients survive a read-modify-write cycle untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::{
  entity::{Collection, Entity},
  id::{de_id, de_id_list, de_opt_id},
};

fn require(field: &str, value: &str) -> Result<(), String> {
  if value.trim().is_empty() {
    Err(format!("{field} is required"))
  } else {
    Ok(())
  }
}

/// Decode a defaulted field, treating an explicit `null` like a missing key.
fn de_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de> + Default,
{
  Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Status enums travel as their display string. Parsing never fails: names
/// are matched ignoring ASCII case and anything else lands in `Other`.
macro_rules! open_status {
  ($($status:ident),+ $(,)?) => {$(
    impl From<String> for $status {
      fn from(raw: String) -> Self {
        raw.parse().unwrap_or(Self::Other(raw))
      }
    }

    impl From<$status> for String {
      fn from(status: $status) -> Self { status.to_string() }
    }
  )+};
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

/// Publication state of a job. Only `Active` jobs appear on the public board.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum JobStatus {
  #[default]
  Active,
  #[strum(to_string = "On Hold", serialize = "on_hold", serialize = "onhold")]
  OnHold,
  Closed,
  Draft,
  /// A status this build does not recognise, kept verbatim.
  #[strum(default)]
  Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
  #[serde(default, deserialize_with = "de_or_default")]
  pub title:              String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub company:            String,
  #[serde(default, deserialize_with = "de_opt_id")]
  pub employer_id:        Option<String>,
  #[serde(default, deserialize_with = "de_or_default")]
  pub location:           String,
  /// Full-time, part-time, contract, ...
  #[serde(default, rename = "type", deserialize_with = "de_or_default")]
  pub job_type:           String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub category:           String,
  #[serde(default)]
  pub salary:             Option<String>,
  #[serde(default, deserialize_with = "de_or_default")]
  pub description:        String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub requirements:       Vec<String>,
  #[serde(default, deserialize_with = "de_or_default")]
  pub status:             JobStatus,
  /// Recomputed from the applications collection on every submission.
  #[serde(default, deserialize_with = "de_or_default")]
  pub applications_count: u32,
  #[serde(flatten)]
  pub extra:              Map<String, Value>,
}

impl Job {
  pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
    Self {
      title:              title.into(),
      company:            company.into(),
      employer_id:        None,
      location:           String::new(),
      job_type:           String::new(),
      category:           String::new(),
      salary:             None,
      description:        String::new(),
      requirements:       Vec::new(),
      status:             JobStatus::default(),
      applications_count: 0,
      extra:              Map::new(),
    }
  }
}

impl Entity for Job {
  const COLLECTION: Collection = Collection::Jobs;

  fn validate(&self) -> Result<(), String> { require("title", &self.title) }
}

// ─── Candidates ──────────────────────────────────────────────────────────────

/// Availability of a candidate for placement.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum CandidateStatus {
  #[default]
  Available,
  Interviewing,
  Placed,
  Inactive,
  #[strum(default)]
  Other(String),
}

/// Review state controlling whether a candidate is publicly visible.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApprovalStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
  #[strum(default)]
  Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
  #[serde(default, deserialize_with = "de_or_default")]
  pub name:            String,
  /// Natural deduplication key, compared with [`normalize_email`].
  #[serde(default, deserialize_with = "de_or_default")]
  pub email:           String,
  #[serde(default)]
  pub phone:           Option<String>,
  #[serde(default)]
  pub location:        Option<String>,
  #[serde(default, deserialize_with = "de_or_default")]
  pub skills:          Vec<String>,
  #[serde(default)]
  pub experience:      Option<String>,
  #[serde(default, deserialize_with = "de_or_default")]
  pub status:          CandidateStatus,
  #[serde(default, deserialize_with = "de_or_default")]
  pub approval_status: ApprovalStatus,
  #[serde(default, deserialize_with = "de_id_list")]
  pub applied_jobs:    Vec<String>,
  /// Most recent resume as a `data:` URI.
  #[serde(default)]
  pub resume:          Option<String>,
  #[serde(flatten)]
  pub extra:           Map<String, Value>,
}

impl Candidate {
  pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      name:            name.into(),
      email:           email.into(),
      phone:           None,
      location:        None,
      skills:          Vec::new(),
      experience:      None,
      status:          CandidateStatus::default(),
      approval_status: ApprovalStatus::default(),
      applied_jobs:    Vec::new(),
      resume:          None,
      extra:           Map::new(),
    }
  }
}

impl Entity for Candidate {
  const COLLECTION: Collection = Collection::Candidates;

  fn validate(&self) -> Result<(), String> {
    require("name", &self.name)?;
    require("email", &self.email)
  }
}

/// Canonical form used when matching emails across records.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

// ─── Employers ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employer {
  #[serde(default, deserialize_with = "de_or_default")]
  pub company_name: String,
  /// Teams are linked to an employer by case-insensitive match on this.
  #[serde(default, deserialize_with = "de_or_default")]
  pub email:        String,
  #[serde(default)]
  pub phone:        Option<String>,
  #[serde(default)]
  pub industry:     Option<String>,
  #[serde(default)]
  pub location:     Option<String>,
  #[serde(default, deserialize_with = "de_id_list")]
  pub active_jobs:  Vec<String>,
  #[serde(default, deserialize_with = "de_id_list")]
  pub teams:        Vec<String>,
  #[serde(flatten)]
  pub extra:        Map<String, Value>,
}

impl Employer {
  pub fn new(company_name: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      company_name: company_name.into(),
      email:        email.into(),
      phone:        None,
      industry:     None,
      location:     None,
      active_jobs:  Vec::new(),
      teams:        Vec::new(),
      extra:        Map::new(),
    }
  }
}

impl Entity for Employer {
  const COLLECTION: Collection = Collection::Employers;

  fn validate(&self) -> Result<(), String> {
    require("companyName", &self.company_name)
  }
}

// ─── Applications ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum ApplicationStatus {
  #[default]
  Pending,
  Reviewing,
  Interview,
  Accepted,
  Rejected,
  /// Pipeline states added by other clients, e.g. `Shortlisted`.
  #[strum(default)]
  Other(String),
}

fn applied_stage() -> String { "Applied".to_owned() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
  #[serde(default, deserialize_with = "de_id")]
  pub job_id:           String,
  #[serde(default, deserialize_with = "de_opt_id")]
  pub candidate_id:     Option<String>,
  // Denormalised from the job at submission time.
  #[serde(default, deserialize_with = "de_or_default")]
  pub job_title:        String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub company:          String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub candidate_name:   String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub email:            String,
  #[serde(default)]
  pub phone:            Option<String>,
  #[serde(default)]
  pub cover_letter:     Option<String>,
  /// Inlined resume as a `data:` URI.
  #[serde(default)]
  pub resume:           Option<String>,
  #[serde(default)]
  pub resume_file_name: Option<String>,
  #[serde(default, deserialize_with = "de_or_default")]
  pub status:           ApplicationStatus,
  #[serde(default = "applied_stage", deserialize_with = "de_or_default")]
  pub stage:            String,
  #[serde(default)]
  pub score:            Option<u32>,
  #[serde(default)]
  pub last_updated:     Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra:            Map<String, Value>,
}

impl Entity for Application {
  const COLLECTION: Collection = Collection::Applications;

  fn validate(&self) -> Result<(), String> { require("jobId", &self.job_id) }
}

// ─── Employees ───────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum EmployeeStatus {
  #[default]
  Active,
  #[strum(to_string = "On Leave", serialize = "on_leave")]
  OnLeave,
  Terminated,
  #[strum(default)]
  Other(String),
}

open_status!(
  JobStatus,
  CandidateStatus,
  ApprovalStatus,
  ApplicationStatus,
  EmployeeStatus
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
  #[serde(default, deserialize_with = "de_or_default")]
  pub name:           String,
  #[serde(default)]
  pub email:          Option<String>,
  #[serde(default)]
  pub phone:          Option<String>,
  #[serde(default, deserialize_with = "de_or_default")]
  pub department:     String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub position:       String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub status:         EmployeeStatus,
  #[serde(default)]
  pub hire_date:      Option<NaiveDate>,
  /// Set when the employee was hired from an application.
  #[serde(default, deserialize_with = "de_opt_id")]
  pub application_id: Option<String>,
  #[serde(default, deserialize_with = "de_opt_id")]
  pub candidate_id:   Option<String>,
  #[serde(flatten)]
  pub extra:          Map<String, Value>,
}

impl Employee {
  pub fn new(
    name: impl Into<String>,
    department: impl Into<String>,
    position: impl Into<String>,
  ) -> Self {
    Self {
      name:           name.into(),
      email:          None,
      phone:          None,
      department:     department.into(),
      position:       position.into(),
      status:         EmployeeStatus::default(),
      hire_date:      None,
      application_id: None,
      candidate_id:   None,
      extra:          Map::new(),
    }
  }
}

impl Entity for Employee {
  const COLLECTION: Collection = Collection::Employees;

  fn validate(&self) -> Result<(), String> { require("name", &self.name) }
}

// ─── Teams ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
  #[serde(default, deserialize_with = "de_or_default")]
  pub team_name:   String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub department:  String,
  /// Contact email; equal (ignoring case) to the owning employer's email.
  #[serde(default, deserialize_with = "de_or_default")]
  pub email:       String,
  #[serde(default, deserialize_with = "de_or_default")]
  pub members:     Vec<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(flatten)]
  pub extra:       Map<String, Value>,
}

impl Team {
  pub fn new(team_name: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      team_name:   team_name.into(),
      department:  String::new(),
      email:       email.into(),
      members:     Vec::new(),
      description: None,
      extra:       Map::new(),
    }
  }
}

impl Entity for Team {
  const COLLECTION: Collection = Collection::Teams;

  fn validate(&self) -> Result<(), String> {
    require("teamName", &self.team_name)
  }
}

// ─── Schedule events ─────────────────────────────────────────────────────────

fn scheduled() -> String { "Scheduled".to_owned() }

/// An interview or meeting on the agency calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
  #[serde(default, deserialize_with = "de_or_default")]
  pub title:        String,
  #[serde(default)]
  pub date:         Option<NaiveDate>,
  /// Wall-clock time as entered, `HH:MM`.
  #[serde(default)]
  pub time:         Option<String>,
  /// Interview, meeting, ...
  #[serde(default, rename = "type", deserialize_with = "de_or_default")]
  pub event_type:   String,
  #[serde(default = "scheduled", deserialize_with = "de_or_default")]
  pub status:       String,
  #[serde(default, deserialize_with = "de_opt_id")]
  pub candidate_id: Option<String>,
  #[serde(default, deserialize_with = "de_opt_id")]
  pub job_id:       Option<String>,
  #[serde(default)]
  pub location:     Option<String>,
  #[serde(default)]
  pub notes:        Option<String>,
  #[serde(flatten)]
  pub extra:        Map<String, Value>,
}

impl ScheduleEvent {
  pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
    Self {
      title:        title.into(),
      date:         Some(date),
      time:         None,
      event_type:   "Interview".to_owned(),
      status:       scheduled(),
      candidate_id: None,
      job_id:       None,
      location:     None,
      notes:        None,
      extra:        Map::new(),
    }
  }
}

impl Entity for ScheduleEvent {
  const COLLECTION: Collection = Collection::Events;

  fn validate(&self) -> Result<(), String> {
    require("title", &self.title)?;
    if self.date.is_none() {
      return Err("date is required".to_owned());
    }
    Ok(())
  }
}
