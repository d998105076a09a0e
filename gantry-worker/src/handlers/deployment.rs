//! Deployment handler
//!
//! Drives one release onto its application's cluster: generate manifests,
//! apply them, wait for the workload to report ready. The release record is
//! the user-visible state: running on entry, succeeded/failed on exit.

use anyhow::Context;
use gantry_core::domain::release::ReleaseStatus;
use gantry_deploy::{DeploymentConfig, apply, generator};
use gantry_store::repository::{application_repository, cluster_repository, release_repository};
use tracing::info;
use uuid::Uuid;

use crate::dispatch::{HandlerContext, is_cancellation};

pub async fn run(ctx: &HandlerContext, release_id: Uuid) -> anyhow::Result<()> {
    let release = release_repository::find_by_id(&ctx.pool, release_id)
        .await?
        .with_context(|| format!("release not found: {release_id}"))?;

    let app = application_repository::find_by_id(&ctx.pool, release.application_id)
        .await?
        .with_context(|| format!("application not found: {}", release.application_id))?;

    let cluster = cluster_repository::find_by_id(&ctx.pool, app.cluster_id)
        .await?
        .with_context(|| format!("cluster not found: {}", app.cluster_id))?;

    release_repository::mark_running(&ctx.pool, release.id).await?;
    info!(release = %release.id, app = %app.name, image = %release.image_ref(), "deploying release");

    let result = async {
        let kubeconfig = ctx
            .cipher
            .decrypt(&cluster.kubeconfig_enc)
            .context("failed to decrypt cluster credential")?;
        let client = apply::client_from_kubeconfig(&kubeconfig).await?;

        let config = DeploymentConfig::from_application_release(&app, &release);
        let manifests = generator::generate_all(&config)?;
        let namespace = config.namespace.clone().unwrap_or_else(|| "default".to_string());

        apply::deploy(
            &client,
            &namespace,
            &config.app_name,
            config.replicas.unwrap_or(1),
            &manifests,
            &ctx.shutdown,
        )
        .await?;

        anyhow::Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            release_repository::mark_finished(&ctx.pool, release.id, ReleaseStatus::Succeeded)
                .await?;
            info!(release = %release.id, "release succeeded");
            Ok(())
        }
        // Shutdown interruption is not a deployment failure: the release
        // stays `running` and the job stays `processing` (orphaned).
        Err(e) if is_cancellation(&e) => {
            info!(release = %release.id, "deployment interrupted by shutdown");
            Err(e)
        }
        Err(e) => {
            release_repository::mark_finished(&ctx.pool, release.id, ReleaseStatus::Failed).await?;
            Err(e)
        }
    }
}
