use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::video_summary::VideoSummary;

/// Opaque job identifier handed back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// How a job ended.
#[derive(Clone, Debug, PartialEq)]
pub enum JobOutcome {
    Completed(VideoSummary),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub result: Option<VideoSummary>,
    pub error: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl VideoJob {
    pub fn processing(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Processing,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Terminal copy of this job; `created_at` is carried over.
    pub fn finished(&self, outcome: JobOutcome) -> Self {
        let (status, result, error) = match outcome {
            JobOutcome::Completed(summary) => (JobStatus::Completed, Some(summary), None),
            JobOutcome::Failed(message) => (JobStatus::Failed, None, Some(message)),
        };
        Self {
            job_id: self.job_id,
            status,
            result,
            error,
            created_at: self.created_at,
            finished_at: Some(Utc::now()),
        }
    }
}
