//! Pipeline domain types
//!
//! A pipeline is an ordered execution of named steps for one commit of one
//! application. Steps run strictly in declaration order; the first failure
//! halts the remainder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Default step list used when the pipeline metadata declares none
pub const DEFAULT_STEPS: [&str; 4] = ["checkout", "build", "test", "deploy"];

/// An ordered CI execution for one commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub application_id: Uuid,
    pub repository_id: Uuid,
    pub commit_ref: String,
    pub status: PipelineStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub meta: PipelineMeta,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Pipeline {
    /// The ordered step names to execute, falling back to [`DEFAULT_STEPS`]
    pub fn step_names(&self) -> Vec<String> {
        if self.meta.steps.is_empty() {
            DEFAULT_STEPS.iter().map(|s| s.to_string()).collect()
        } else {
            self.meta.steps.clone()
        }
    }
}

/// Pipeline lifecycle status (monotonic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl PipelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PipelineStatus::Pending),
            "running" => Some(PipelineStatus::Running),
            "success" => Some(PipelineStatus::Success),
            "failed" => Some(PipelineStatus::Failed),
            "cancelled" => Some(PipelineStatus::Cancelled),
            _ => None,
        }
    }
}

/// Free-form pipeline metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineMeta {
    /// Ordered step names; empty means use the default step list
    #[serde(default)]
    pub steps: Vec<String>,
    /// Environment passed to step execution
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// One named stage of a pipeline
///
/// Created immediately before it runs and finalized immediately after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub name: String,
    pub status: StepStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Captured log text, recorded regardless of outcome
    pub log: Option<String>,
}

/// Step lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
    Cancelled,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StepStatus::Pending),
            "running" => Some(StepStatus::Running),
            "success" => Some(StepStatus::Success),
            "failed" => Some(StepStatus::Failed),
            "skipped" => Some(StepStatus::Skipped),
            "cancelled" => Some(StepStatus::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline_with_steps(steps: Vec<String>) -> Pipeline {
        Pipeline {
            id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            repository_id: Uuid::new_v4(),
            commit_ref: "abc123".to_string(),
            status: PipelineStatus::Pending,
            started_at: None,
            finished_at: None,
            meta: PipelineMeta {
                steps,
                env: BTreeMap::new(),
            },
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_step_names_default() {
        let pipeline = pipeline_with_steps(vec![]);
        assert_eq!(pipeline.step_names(), DEFAULT_STEPS.to_vec());
    }

    #[test]
    fn test_step_names_declared_order_preserved() {
        let pipeline = pipeline_with_steps(vec!["lint".to_string(), "build".to_string()]);
        assert_eq!(pipeline.step_names(), vec!["lint", "build"]);
    }
}
