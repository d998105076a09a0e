//! CI runner handlers
//!
//! Deploy and stop of CI runner agents, symmetric to the git server
//! handlers but without generated credentials.

use anyhow::Context;
use gantry_core::domain::component::{ComponentStatus, release_name};
use gantry_store::repository::runner_agent_repository;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatch::HandlerContext;
use crate::handlers::Teardown;

const RELEASE_PREFIX: &str = "runner";

pub async fn deploy(ctx: &HandlerContext, runner_id: Uuid) -> anyhow::Result<()> {
    let runner = runner_agent_repository::find_by_id(&ctx.pool, runner_id)
        .await?
        .with_context(|| format!("runner not found: {runner_id}"))?;

    runner_agent_repository::update_status(&ctx.pool, runner.id, ComponentStatus::Installing)
        .await?;

    let release = release_name(RELEASE_PREFIX, runner.id);
    info!(runner = %runner.id, release = %release, "deploying runner");

    let values = serde_json::json!({
        "name": runner.name,
        "runnerType": runner.runner_type,
    });

    match ctx
        .provisioner
        .install(&ctx.config.runner_chart, &release, &release, values)
        .await
    {
        Ok(()) => {
            runner_agent_repository::update_status(&ctx.pool, runner.id, ComponentStatus::Running)
                .await?;
            info!(runner = %runner.id, "runner running");
            Ok(())
        }
        Err(e) => {
            runner_agent_repository::update_status(&ctx.pool, runner.id, ComponentStatus::Failed)
                .await?;
            Err(e).context("chart install failed")
        }
    }
}

/// Stops a runner agent; remote uninstall is best-effort, as for git servers.
pub async fn stop(ctx: &HandlerContext, runner_id: Uuid) -> anyhow::Result<Teardown> {
    let runner = runner_agent_repository::find_by_id(&ctx.pool, runner_id)
        .await?
        .with_context(|| format!("runner not found: {runner_id}"))?;

    runner_agent_repository::update_status(&ctx.pool, runner.id, ComponentStatus::Stopping).await?;

    let release = release_name(RELEASE_PREFIX, runner.id);
    let teardown = match ctx.provisioner.uninstall(&release, &release).await {
        Ok(()) => Teardown::clean(),
        Err(e) => {
            warn!(runner = %runner.id, error = %e, "uninstall failed, continuing stop");
            Teardown::partial(e.to_string())
        }
    };

    runner_agent_repository::update_status(&ctx.pool, runner.id, ComponentStatus::Stopped).await?;
    info!(runner = %runner.id, clean = teardown.is_clean(), "runner stopped");

    Ok(teardown)
}
