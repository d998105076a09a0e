//! Pipeline step execution state machine
//!
//! Runs the ordered step list for one pipeline: each step row is created
//! immediately before it runs and finalized immediately after, with its log
//! captured regardless of outcome. The first failing step halts processing
//! of all subsequent steps; they are never created.
//!
//! Step-row persistence goes through [`StepTracker`] so the halt logic is
//! testable without a database.

use async_trait::async_trait;
use gantry_core::domain::pipeline::{Pipeline, StepStatus};
use gantry_store::repository::pipeline_repository;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::steps::StepRunner;

/// Persistence seam for step rows
#[async_trait]
pub trait StepTracker: Send {
    async fn step_created(&mut self, pipeline_id: Uuid, name: &str) -> anyhow::Result<Uuid>;
    async fn step_running(&mut self, step_id: Uuid) -> anyhow::Result<()>;
    async fn step_finished(
        &mut self,
        step_id: Uuid,
        status: StepStatus,
        log: &str,
    ) -> anyhow::Result<()>;
}

/// Terminal outcome of a step sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepsOutcome {
    Completed,
    Failed { step: String },
}

/// Executes the pipeline's steps in declared order, halting on the first
/// failure. Returns how the sequence ended; the caller maps this onto the
/// pipeline's own terminal status.
pub async fn run_steps(
    tracker: &mut dyn StepTracker,
    runner: &dyn StepRunner,
    pipeline: &Pipeline,
    steps: &[String],
) -> anyhow::Result<StepsOutcome> {
    for step_name in steps {
        let step_id = tracker.step_created(pipeline.id, step_name).await?;
        tracker.step_running(step_id).await?;

        info!(pipeline = %pipeline.id, step = %step_name, "executing step");
        let outcome = runner.run_step(pipeline, step_name).await;

        let status = if outcome.success {
            StepStatus::Success
        } else {
            StepStatus::Failed
        };
        tracker.step_finished(step_id, status, &outcome.log).await?;

        if !outcome.success {
            warn!(pipeline = %pipeline.id, step = %step_name, "step failed, halting pipeline");
            return Ok(StepsOutcome::Failed {
                step: step_name.clone(),
            });
        }
    }

    Ok(StepsOutcome::Completed)
}

/// Postgres-backed tracker used by the pipeline handler
pub struct PgStepTracker {
    pool: PgPool,
}

impl PgStepTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StepTracker for PgStepTracker {
    async fn step_created(&mut self, pipeline_id: Uuid, name: &str) -> anyhow::Result<Uuid> {
        let step = pipeline_repository::create_step(&self.pool, pipeline_id, name).await?;
        Ok(step.id)
    }

    async fn step_running(&mut self, step_id: Uuid) -> anyhow::Result<()> {
        pipeline_repository::mark_step_running(&self.pool, step_id).await?;
        Ok(())
    }

    async fn step_finished(
        &mut self,
        step_id: Uuid,
        status: StepStatus,
        log: &str,
    ) -> anyhow::Result<()> {
        pipeline_repository::finish_step(&self.pool, step_id, status, log).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StepOutcome;
    use gantry_core::domain::pipeline::{PipelineMeta, PipelineStatus};

    struct RecordingTracker {
        steps: Vec<(Uuid, String, StepStatus, Option<String>)>,
    }

    impl RecordingTracker {
        fn new() -> Self {
            Self { steps: Vec::new() }
        }
    }

    #[async_trait]
    impl StepTracker for RecordingTracker {
        async fn step_created(&mut self, _pipeline_id: Uuid, name: &str) -> anyhow::Result<Uuid> {
            let id = Uuid::new_v4();
            self.steps
                .push((id, name.to_string(), StepStatus::Pending, None));
            Ok(id)
        }

        async fn step_running(&mut self, step_id: Uuid) -> anyhow::Result<()> {
            let step = self.steps.iter_mut().find(|s| s.0 == step_id).unwrap();
            step.2 = StepStatus::Running;
            Ok(())
        }

        async fn step_finished(
            &mut self,
            step_id: Uuid,
            status: StepStatus,
            log: &str,
        ) -> anyhow::Result<()> {
            let step = self.steps.iter_mut().find(|s| s.0 == step_id).unwrap();
            step.2 = status;
            step.3 = Some(log.to_string());
            Ok(())
        }
    }

    /// Runner that fails exactly the named step
    struct FailOn(&'static str);

    #[async_trait]
    impl StepRunner for FailOn {
        async fn run_step(&self, _pipeline: &Pipeline, step_name: &str) -> StepOutcome {
            StepOutcome {
                success: step_name != self.0,
                log: format!("ran {step_name}"),
            }
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline {
            id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            repository_id: Uuid::new_v4(),
            commit_ref: "abc123".to_string(),
            status: PipelineStatus::Running,
            started_at: None,
            finished_at: None,
            meta: PipelineMeta::default(),
            created_at: chrono::Utc::now(),
        }
    }

    fn step_list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_all_steps_succeed() {
        let mut tracker = RecordingTracker::new();
        let outcome = run_steps(
            &mut tracker,
            &FailOn("never"),
            &pipeline(),
            &step_list(&["a", "b", "c"]),
        )
        .await
        .unwrap();

        assert_eq!(outcome, StepsOutcome::Completed);
        assert_eq!(tracker.steps.len(), 3);
        assert!(tracker.steps.iter().all(|s| s.2 == StepStatus::Success));
        assert!(tracker.steps.iter().all(|s| s.3.is_some()));
    }

    #[tokio::test]
    async fn test_first_failure_halts_subsequent_steps() {
        let mut tracker = RecordingTracker::new();
        let outcome = run_steps(
            &mut tracker,
            &FailOn("b"),
            &pipeline(),
            &step_list(&["a", "b", "c"]),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            StepsOutcome::Failed {
                step: "b".to_string()
            }
        );
        // c is never created
        assert_eq!(tracker.steps.len(), 2);
        assert_eq!(tracker.steps[0].1, "a");
        assert_eq!(tracker.steps[0].2, StepStatus::Success);
        assert_eq!(tracker.steps[1].1, "b");
        assert_eq!(tracker.steps[1].2, StepStatus::Failed);
        // The failing step's log is still captured
        assert_eq!(tracker.steps[1].3.as_deref(), Some("ran b"));
    }

    #[tokio::test]
    async fn test_empty_step_list_completes() {
        let mut tracker = RecordingTracker::new();
        let outcome = run_steps(&mut tracker, &FailOn("never"), &pipeline(), &[])
            .await
            .unwrap();

        assert_eq!(outcome, StepsOutcome::Completed);
        assert!(tracker.steps.is_empty());
    }
}
