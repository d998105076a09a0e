//! Job domain types
//!
//! A job is a persisted unit of asynchronous work. The API layer enqueues
//! jobs; workers claim and execute them. The payload is a tagged union keyed
//! by job type so dispatch is exhaustiveness-checked at compile time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted unit of asynchronous work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Owning organization
    pub org_id: Uuid,
    /// Raw job kind as stored; derived from the payload at enqueue time.
    /// Kept as text so rows with unknown kinds can still be loaded and
    /// failed with a descriptive error.
    pub kind: String,
    pub status: JobStatus,
    /// Raw payload as stored. Decoded into [`JobPayload`] at dispatch time;
    /// a decode failure is a configuration error and fails the job.
    pub payload: serde_json::Value,
    /// Set only when the job failed
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Job {
    /// Decodes the stored payload into its typed form
    pub fn decode_payload(&self) -> Result<JobPayload, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Job lifecycle status
///
/// Transitions are monotonic: pending -> processing -> {completed | failed}.
/// A job never moves backward and is never revived once terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Job kind, derived from the payload variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Deployment,
    GitServerInstall,
    GitServerStop,
    RunnerDeploy,
    RunnerStop,
    PipelineRun,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Deployment => "deployment",
            JobKind::GitServerInstall => "git_server_install",
            JobKind::GitServerStop => "git_server_stop",
            JobKind::RunnerDeploy => "runner_deploy",
            JobKind::RunnerStop => "runner_stop",
            JobKind::PipelineRun => "pipeline_run",
        }
    }
}

/// Type-specific job payload
///
/// Tagged by job type; the dispatcher matches on this enum so adding a kind
/// without a handler is a compile error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    Deployment { release_id: Uuid },
    GitServerInstall { git_server_id: Uuid },
    GitServerStop { git_server_id: Uuid },
    RunnerDeploy { runner_id: Uuid },
    RunnerStop { runner_id: Uuid },
    PipelineRun { pipeline_id: Uuid },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Deployment { .. } => JobKind::Deployment,
            JobPayload::GitServerInstall { .. } => JobKind::GitServerInstall,
            JobPayload::GitServerStop { .. } => JobKind::GitServerStop,
            JobPayload::RunnerDeploy { .. } => JobKind::RunnerDeploy,
            JobPayload::RunnerStop { .. } => JobKind::RunnerStop,
            JobPayload::PipelineRun { .. } => JobKind::PipelineRun,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let payload = JobPayload::Deployment {
            release_id: Uuid::new_v4(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "deployment");

        let back: JobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_unknown_payload_type_is_rejected() {
        let value = serde_json::json!({ "type": "mystery", "id": Uuid::new_v4() });
        assert!(serde_json::from_value::<JobPayload>(value).is_err());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
