//! Step execution strategy
//!
//! Pipeline steps go through an injectable [`StepRunner`] so the state
//! machine never depends on how a step actually executes. The default
//! [`DryRunStepRunner`] is a deliberate safety boundary: it never shells out
//! or executes untrusted content; real execution belongs to an external
//! sandboxed runner substituted through this seam.

use std::time::Duration;

use async_trait::async_trait;
use gantry_core::domain::pipeline::Pipeline;

/// Result of executing one step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub success: bool,
    /// Produced log text, captured regardless of outcome
    pub log: String,
}

/// Strategy for executing a single named step of a pipeline
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step(&self, pipeline: &Pipeline, step_name: &str) -> StepOutcome;
}

/// Safe default runner: synthesizes deterministic, step-name-keyed log text
/// and simulates elapsed time instead of executing anything.
pub struct DryRunStepRunner {
    simulated_duration: Duration,
}

impl DryRunStepRunner {
    pub fn new() -> Self {
        Self {
            simulated_duration: Duration::from_millis(250),
        }
    }

    pub fn with_simulated_duration(simulated_duration: Duration) -> Self {
        Self { simulated_duration }
    }
}

impl Default for DryRunStepRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepRunner for DryRunStepRunner {
    async fn run_step(&self, pipeline: &Pipeline, step_name: &str) -> StepOutcome {
        tokio::time::sleep(self.simulated_duration).await;

        StepOutcome {
            success: true,
            log: format!(
                "[dry-run] step '{step_name}' for commit {commit}\n\
                 [dry-run] execution is disabled; no commands were run\n\
                 [dry-run] step '{step_name}' finished successfully\n",
                commit = pipeline.commit_ref,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::pipeline::{PipelineMeta, PipelineStatus};
    use uuid::Uuid;

    fn pipeline() -> Pipeline {
        Pipeline {
            id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            repository_id: Uuid::new_v4(),
            commit_ref: "abc123".to_string(),
            status: PipelineStatus::Pending,
            started_at: None,
            finished_at: None,
            meta: PipelineMeta::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dry_run_always_succeeds_with_keyed_log() {
        let runner = DryRunStepRunner::with_simulated_duration(Duration::ZERO);
        let outcome = runner.run_step(&pipeline(), "build").await;

        assert!(outcome.success);
        assert!(outcome.log.contains("step 'build'"));
        assert!(outcome.log.contains("abc123"));
    }

    #[tokio::test]
    async fn test_dry_run_log_is_deterministic() {
        let runner = DryRunStepRunner::with_simulated_duration(Duration::ZERO);
        let pipeline = pipeline();
        let first = runner.run_step(&pipeline, "test").await;
        let second = runner.run_step(&pipeline, "test").await;
        assert_eq!(first.log, second.log);
    }
}
