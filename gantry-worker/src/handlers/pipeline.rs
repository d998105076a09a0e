//! Pipeline handler
//!
//! Runs the step state machine for one pipeline. The source repository must
//! resolve before the pipeline leaves `pending`; a missing repository fails
//! the job while the pipeline stays untouched.

use anyhow::Context;
use gantry_core::domain::pipeline::PipelineStatus;
use gantry_store::repository::{pipeline_repository, source_repo_repository};
use tracing::info;
use uuid::Uuid;

use crate::dispatch::HandlerContext;
use crate::pipeline_exec::{PgStepTracker, StepsOutcome, run_steps};

pub async fn run(ctx: &HandlerContext, pipeline_id: Uuid) -> anyhow::Result<()> {
    let pipeline = pipeline_repository::find_by_id(&ctx.pool, pipeline_id)
        .await?
        .with_context(|| format!("pipeline not found: {pipeline_id}"))?;

    // Resolve the repository before any state transition
    let repo = source_repo_repository::find_by_id(&ctx.pool, pipeline.repository_id)
        .await?
        .with_context(|| format!("repository not found: {}", pipeline.repository_id))?;

    pipeline_repository::mark_running(&ctx.pool, pipeline.id).await?;
    info!(
        pipeline = %pipeline.id,
        repository = %repo.url,
        commit = %pipeline.commit_ref,
        "pipeline started"
    );

    let steps = pipeline.step_names();
    let mut tracker = PgStepTracker::new(ctx.pool.clone());
    let result = run_steps(&mut tracker, ctx.step_runner.as_ref(), &pipeline, &steps).await;

    match result {
        Ok(StepsOutcome::Completed) => {
            pipeline_repository::mark_finished(&ctx.pool, pipeline.id, PipelineStatus::Success)
                .await?;
            info!(pipeline = %pipeline.id, "pipeline succeeded");
            Ok(())
        }
        Ok(StepsOutcome::Failed { step }) => {
            pipeline_repository::mark_finished(&ctx.pool, pipeline.id, PipelineStatus::Failed)
                .await?;
            anyhow::bail!("pipeline step '{step}' failed")
        }
        Err(e) => {
            pipeline_repository::mark_finished(&ctx.pool, pipeline.id, PipelineStatus::Failed)
                .await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use gantry_core::domain::pipeline::{PipelineMeta, StepStatus};
    use gantry_store::repository::{application_repository, cluster_repository};
    use tokio_util::sync::CancellationToken;

    use crate::config::Config;
    use crate::crypto::IdentityCipher;
    use crate::provision::HelmProvisioner;
    use crate::steps::DryRunStepRunner;

    async fn test_ctx() -> HandlerContext {
        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let pool = gantry_store::db::create_pool(&url).await.expect("connect");
        gantry_store::db::run_migrations(&pool).await.expect("migrate");

        HandlerContext {
            pool,
            config: Config::default(),
            cipher: Arc::new(IdentityCipher),
            provisioner: Arc::new(HelmProvisioner::new("helm")),
            step_runner: Arc::new(DryRunStepRunner::with_simulated_duration(Duration::ZERO)),
            shutdown: CancellationToken::new(),
        }
    }

    async fn test_application(pool: &sqlx::PgPool) -> Uuid {
        let org_id = Uuid::new_v4();
        let cluster = cluster_repository::create(pool, org_id, "test-cluster", b"kubeconfig")
            .await
            .unwrap();
        application_repository::create(pool, org_id, cluster.id, "test-app", &[])
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn missing_repository_leaves_pipeline_pending() {
        let ctx = test_ctx().await;
        let app_id = test_application(&ctx.pool).await;
        let pipeline = pipeline_repository::create(
            &ctx.pool,
            app_id,
            Uuid::new_v4(),
            "abc123",
            PipelineMeta::default(),
        )
        .await
        .unwrap();

        let err = run(&ctx, pipeline.id).await.unwrap_err();
        assert!(format!("{err:#}").contains("repository not found"));

        // The job fails but the pipeline never leaves pending
        let reloaded = pipeline_repository::find_by_id(&ctx.pool, pipeline.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, PipelineStatus::Pending);
        assert!(reloaded.started_at.is_none());

        let steps = pipeline_repository::list_steps(&ctx.pool, pipeline.id)
            .await
            .unwrap();
        assert!(steps.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn dry_run_pipeline_records_default_steps() {
        let ctx = test_ctx().await;
        let app_id = test_application(&ctx.pool).await;
        let repo = source_repo_repository::create(
            &ctx.pool,
            app_id,
            "https://git.example.com/shop.git",
            "main",
        )
        .await
        .unwrap();
        let pipeline = pipeline_repository::create(
            &ctx.pool,
            app_id,
            repo.id,
            "abc123",
            PipelineMeta::default(),
        )
        .await
        .unwrap();

        run(&ctx, pipeline.id).await.unwrap();

        let reloaded = pipeline_repository::find_by_id(&ctx.pool, pipeline.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, PipelineStatus::Success);

        let steps = pipeline_repository::list_steps(&ctx.pool, pipeline.id)
            .await
            .unwrap();
        let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["checkout", "build", "test", "deploy"]);
        assert!(steps.iter().all(|s| s.status == StepStatus::Success));
        assert!(steps.iter().all(|s| s.log.is_some()));
    }
}
