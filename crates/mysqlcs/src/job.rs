//! Activity-log job status lookups
//!
//! Some management operations report a job id; this module reads the
//! corresponding activity-log entry and can wait for it to settle.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::MysqlcsClient;
use crate::error::{Error, Result};
use crate::poll::{PollOptions, ProgressCallback, poll_until};

/// Terminal and in-progress states of an activity-log job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeed,
    Failed,
    Running,
    New,
    Other(String),
}

impl JobStatus {
    /// Case-insensitive parse preserving unrecognized values
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("succeed") || s.eq_ignore_ascii_case("succeeded") {
            JobStatus::Succeed
        } else if s.eq_ignore_ascii_case("failed") {
            JobStatus::Failed
        } else if s.eq_ignore_ascii_case("running") {
            JobStatus::Running
        } else if s.eq_ignore_ascii_case("new") {
            JobStatus::New
        } else {
            JobStatus::Other(s.to_string())
        }
    }
}

/// One activity-log job entry
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Job {
    /// The job's status parsed into the known vocabulary
    #[must_use]
    pub fn parsed_status(&self) -> JobStatus {
        JobStatus::parse(self.status.as_deref().unwrap_or(""))
    }
}

/// Handler for activity-log job lookups
pub struct JobHandler {
    client: MysqlcsClient,
}

impl JobHandler {
    #[must_use]
    pub fn new(client: MysqlcsClient) -> Self {
        Self { client }
    }

    /// Fetch one job by id
    pub async fn get(&self, job_id: &str) -> Result<Job> {
        self.client.get_json(&self.client.job_path(job_id)).await
    }

    /// Wait until the job reports `SUCCEED` (done) or `FAILED` (fatal,
    /// carrying the job's message). Unrecognized statuses keep the loop
    /// running.
    pub async fn wait(
        &self,
        job_id: &str,
        opts: Option<PollOptions>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Job> {
        let opts = opts.unwrap_or(PollOptions::SERVICE_INSTANCE);
        let description = format!("job {job_id} to complete");
        poll_until(&description, opts, on_progress, async || {
            let job = self.get(job_id).await?;
            job_verdict(&job)
        })
        .await?;

        self.get(job_id).await
    }
}

fn job_verdict(job: &Job) -> Result<bool> {
    let status = job.parsed_status();
    debug!(job_id = %job.job_id, ?status, "job status");
    match status {
        JobStatus::Succeed => Ok(true),
        JobStatus::Failed => Err(Error::OperationFailed(
            job.message
                .clone()
                .unwrap_or_else(|| format!("job {} reported FAILED", job.job_id)),
        )),
        JobStatus::Running | JobStatus::New | JobStatus::Other(_) => Ok(false),
    }
}
