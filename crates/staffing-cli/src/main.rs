//! `staffing`: command-line client for the staffing back-office API.
//!
//! # Usage
//!
//! ```
//! staffing --url http://localhost:8080 jobs list --public --q analyst
//! staffing apply JOB001 --name "Ada Lovelace" --email ada@example.com --resume cv.pdf
//! staffing --config ~/.config/staffing/config.toml stats
//! ```

mod client;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use serde_json::json;
use staffing_core::model::Job;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "staffing", about = "Command-line client for the staffing API")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the staffing server (default: http://localhost:8080).
  #[arg(long, env = "STAFFING_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Browse and manage job postings.
  #[command(subcommand)]
  Jobs(JobsCommand),

  /// Submit an application for a job.
  Apply {
    job_id:       String,
    #[arg(long)]
    name:         String,
    #[arg(long)]
    email:        String,
    #[arg(long)]
    phone:        Option<String>,
    #[arg(long)]
    cover_letter: Option<String>,
    /// Resume file to attach.
    #[arg(long, value_name = "FILE")]
    resume:       Option<PathBuf>,
  },

  /// Review candidates.
  #[command(subcommand)]
  Candidates(CandidatesCommand),

  /// Print dashboard counters.
  Stats,
}

#[derive(Subcommand, Debug)]
enum JobsCommand {
  /// List jobs; `--public` shows only the filtered public board.
  List {
    #[arg(long)]
    public:   bool,
    /// Free-text search (public board only).
    #[arg(long, requires = "public")]
    q:        Option<String>,
    #[arg(long = "type", requires = "public")]
    job_type: Option<String>,
    #[arg(long, requires = "public")]
    category: Option<String>,
    #[arg(long, requires = "public")]
    location: Option<String>,
  },

  /// Post a new job.
  Create {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    company:     String,
    #[arg(long, default_value = "")]
    location:    String,
    #[arg(long = "type", default_value = "")]
    job_type:    String,
    #[arg(long, default_value = "")]
    category:    String,
    #[arg(long)]
    salary:      Option<String>,
    #[arg(long, default_value = "")]
    description: String,
  },

  /// Delete a job by id.
  Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum CandidatesCommand {
  /// List candidates.
  List {
    /// Only candidates approved for public listing.
    #[arg(long)]
    approved: bool,
  },

  /// Approve (or, with `--reject`, reject) a candidate.
  Approve {
    id:     String,
    #[arg(long)]
    reject: bool,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

/// CLI flags override the config file, which overrides the default.
fn resolve_url(flag: Option<String>, file: &ConfigFile) -> String {
  flag
    .or_else(|| (!file.url.is_empty()).then(|| file.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string())
}

/// Media type for a resume, from its extension.
fn media_type_for(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("pdf") => "application/pdf",
    Some("doc") => "application/msword",
    Some("docx") => {
      "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    }
    Some("txt") => "text/plain",
    Some("rtf") => "application/rtf",
    _ => "application/octet-stream",
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let base_url = resolve_url(args.url, &file_cfg);
  tracing::debug!(%base_url, "using server");
  let client = ApiClient::new(ApiConfig { base_url })?;

  match args.command {
    Command::Jobs(cmd) => run_jobs(&client, cmd).await,
    Command::Apply { job_id, name, email, phone, cover_letter, resume } => {
      let resume = match resume {
        Some(path) => {
          let bytes = std::fs::read(&path)
            .with_context(|| format!("reading resume {}", path.display()))?;
          let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
          Some(json!({
            "fileName": file_name,
            "mediaType": media_type_for(&path),
            "data": B64.encode(bytes),
          }))
        }
        None => None,
      };
      let body = json!({
        "name": name,
        "email": email,
        "phone": phone,
        "coverLetter": cover_letter,
        "resume": resume,
      });
      let receipt = client.apply(&job_id, &body).await?;
      println!(
        "application {} submitted for {} ({} applications)",
        receipt["application"]["id"].as_str().unwrap_or("?"),
        receipt["job"]["title"].as_str().unwrap_or("?"),
        receipt["job"]["applicationsCount"],
      );
      if receipt["newCandidate"].as_bool().unwrap_or(false) {
        println!("new candidate {}", receipt["candidate"]["id"].as_str().unwrap_or("?"));
      }
      Ok(())
    }
    Command::Candidates(cmd) => run_candidates(&client, cmd).await,
    Command::Stats => {
      let stats = client.stats().await?;
      println!("jobs               {} ({} active)", stats.jobs, stats.active_jobs);
      println!(
        "candidates         {} ({} pending approval)",
        stats.candidates, stats.pending_approvals
      );
      println!("applications       {}", stats.applications);
      for (status, n) in &stats.applications_by_status {
        println!("  {status:<16} {n}");
      }
      println!("employees          {}", stats.employees);
      println!("teams              {}", stats.teams);
      println!("events             {}", stats.events);
      Ok(())
    }
  }
}

async fn run_jobs(client: &ApiClient, cmd: JobsCommand) -> Result<()> {
  match cmd {
    JobsCommand::List { public, q, job_type, category, location } => {
      let filter: Vec<(&str, String)> = [
        ("q", q),
        ("type", job_type),
        ("category", category),
        ("location", location),
      ]
      .into_iter()
      .filter_map(|(k, v)| v.map(|v| (k, v)))
      .collect();

      let jobs = client.list_jobs(public, &filter).await?;
      for job in &jobs {
        println!(
          "{:<38} {:<28} {:<20} {:<10} {:>3}",
          job.id,
          job.data.title,
          job.data.company,
          job.data.status.to_string(),
          job.data.applications_count,
        );
      }
      println!("{} job(s)", jobs.len());
      Ok(())
    }
    JobsCommand::Create {
      title,
      company,
      location,
      job_type,
      category,
      salary,
      description,
    } => {
      let mut job = Job::new(title, company);
      job.location = location;
      job.job_type = job_type;
      job.category = category;
      job.salary = salary;
      job.description = description;
      let created = client.create_job(&job).await?;
      println!("{}", created.id);
      Ok(())
    }
    JobsCommand::Delete { id } => {
      if client.delete_job(&id).await? {
        println!("deleted {id}");
      } else {
        println!("no job {id}");
      }
      Ok(())
    }
  }
}

async fn run_candidates(client: &ApiClient, cmd: CandidatesCommand) -> Result<()> {
  match cmd {
    CandidatesCommand::List { approved } => {
      let candidates = client.list_candidates(approved).await?;
      for c in &candidates {
        println!(
          "{:<38} {:<24} {:<30} {:<9} {}",
          c.id,
          c.data.name,
          c.data.email,
          c.data.approval_status.to_string(),
          c.data.applied_jobs.len(),
        );
      }
      println!("{} candidate(s)", candidates.len());
      Ok(())
    }
    CandidatesCommand::Approve { id, reject } => {
      let status = if reject { "rejected" } else { "approved" };
      let candidate = client.set_approval(&id, status).await?;
      println!("{} is now {}", candidate.data.name, candidate.data.approval_status);
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flag_beats_file_beats_default() {
    let file = ConfigFile { url: "http://file:1".into() };
    assert_eq!(resolve_url(Some("http://flag:2".into()), &file), "http://flag:2");
    assert_eq!(resolve_url(None, &file), "http://file:1");
    assert_eq!(resolve_url(None, &ConfigFile::default()), DEFAULT_URL);
  }

  #[test]
  fn media_types_follow_extension() {
    assert_eq!(media_type_for(Path::new("cv.PDF")), "application/pdf");
    assert_eq!(media_type_for(Path::new("cv.txt")), "text/plain");
    assert_eq!(media_type_for(Path::new("cv")), "application/octet-stream");
  }

  #[test]
  fn parses_job_listing_flags() {
    let args = Args::try_parse_from([
      "staffing", "jobs", "list", "--public", "--q", "rust", "--type", "Full-time",
    ])
    .unwrap();
    match args.command {
      Command::Jobs(JobsCommand::List { public, q, job_type, .. }) => {
        assert!(public);
        assert_eq!(q.as_deref(), Some("rust"));
        assert_eq!(job_type.as_deref(), Some("Full-time"));
      }
      other => panic!("unexpected command: {other:?}"),
    }
  }

  #[test]
  fn board_filters_need_public_flag() {
    for flag in ["--q", "--type", "--category", "--location"] {
      let err = Args::try_parse_from(["staffing", "jobs", "list", flag, "x"])
        .unwrap_err();
      assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
    assert!(Args::try_parse_from(["staffing", "jobs", "list"]).is_ok());
  }
}
