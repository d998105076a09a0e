//! Job dispatcher
//!
//! Routes a claimed job to exactly one handler based on its typed payload.
//! The match is exhaustive over [`JobPayload`], so a payload kind without a
//! handler cannot compile; an unknown or malformed payload is a
//! configuration error and fails the job immediately, never retried.

use std::sync::Arc;

use gantry_core::domain::job::{Job, JobPayload};
use gantry_deploy::ApplyError;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::crypto::CredentialCipher;
use crate::handlers;
use crate::provision::ChartProvisioner;
use crate::steps::StepRunner;

/// Capabilities and shared state injected into every handler
pub struct HandlerContext {
    pub pool: PgPool,
    pub config: Config,
    pub cipher: Arc<dyn CredentialCipher>,
    pub provisioner: Arc<dyn ChartProvisioner>,
    pub step_runner: Arc<dyn StepRunner>,
    pub shutdown: CancellationToken,
}

/// Dispatches one claimed job. An `Err` here becomes the job's failure
/// message; `Ok` completes the job.
pub async fn dispatch(ctx: &HandlerContext, job: &Job) -> anyhow::Result<()> {
    let payload = job.decode_payload().map_err(|e| {
        anyhow::anyhow!("unknown or malformed payload for job kind '{}': {e}", job.kind)
    })?;

    match payload {
        JobPayload::Deployment { release_id } => handlers::deployment::run(ctx, release_id).await,
        JobPayload::GitServerInstall { git_server_id } => {
            handlers::git_server::install(ctx, git_server_id).await
        }
        JobPayload::GitServerStop { git_server_id } => {
            let teardown = handlers::git_server::stop(ctx, git_server_id).await?;
            if let Some(error) = teardown.uninstall_error {
                warn!(job = %job.id, %error, "git server stop completed with partial teardown");
            }
            Ok(())
        }
        JobPayload::RunnerDeploy { runner_id } => {
            handlers::runner_agent::deploy(ctx, runner_id).await
        }
        JobPayload::RunnerStop { runner_id } => {
            let teardown = handlers::runner_agent::stop(ctx, runner_id).await?;
            if let Some(error) = teardown.uninstall_error {
                warn!(job = %job.id, %error, "runner stop completed with partial teardown");
            }
            Ok(())
        }
        JobPayload::PipelineRun { pipeline_id } => handlers::pipeline::run(ctx, pipeline_id).await,
    }
}

/// True when an error chain bottoms out in shutdown cancellation rather than
/// a real failure. Cancelled work must not be reported terminal: the job
/// stays `processing` (an orphan, reconciled operationally), and the owning
/// record keeps its in-flight status.
pub fn is_cancellation(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ApplyError>(), Some(ApplyError::Cancelled))
}
