//! Git server handlers
//!
//! Install and stop of self-hosted git server instances through the chart
//! provisioner. Install generates admin credentials and persists them
//! encrypted; stop is best-effort on the remote side.

use anyhow::Context;
use gantry_core::domain::component::{ComponentStatus, release_name};
use gantry_store::repository::git_server_repository;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatch::HandlerContext;
use crate::handlers::Teardown;

const RELEASE_PREFIX: &str = "gitserver";
const ADMIN_USERNAME: &str = "gitadmin";

pub async fn install(ctx: &HandlerContext, git_server_id: Uuid) -> anyhow::Result<()> {
    let server = git_server_repository::find_by_id(&ctx.pool, git_server_id)
        .await?
        .with_context(|| format!("git server not found: {git_server_id}"))?;

    git_server_repository::update_status(&ctx.pool, server.id, ComponentStatus::Installing).await?;

    let release = release_name(RELEASE_PREFIX, server.id);
    info!(git_server = %server.id, release = %release, "installing git server");

    let result = async {
        let admin_password = generate_password();
        let values = serde_json::json!({
            "domain": server.domain,
            "persistence": { "size": server.storage },
            "admin": { "username": ADMIN_USERNAME, "password": admin_password },
        });

        ctx.provisioner
            .install(&ctx.config.git_server_chart, &release, &release, values)
            .await
            .context("chart install failed")?;

        let password_enc = ctx.cipher.encrypt(admin_password.as_bytes())?;
        git_server_repository::store_admin_credentials(
            &ctx.pool,
            server.id,
            ADMIN_USERNAME,
            &password_enc,
        )
        .await?;

        anyhow::Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            git_server_repository::update_status(&ctx.pool, server.id, ComponentStatus::Running)
                .await?;
            info!(git_server = %server.id, "git server running");
            Ok(())
        }
        Err(e) => {
            git_server_repository::update_status(&ctx.pool, server.id, ComponentStatus::Failed)
                .await?;
            Err(e)
        }
    }
}

/// Stops a git server. The remote uninstall is best-effort: the record is
/// marked stopped even when the provisioner fails, and the failure is
/// surfaced through the returned [`Teardown`].
pub async fn stop(ctx: &HandlerContext, git_server_id: Uuid) -> anyhow::Result<Teardown> {
    let server = git_server_repository::find_by_id(&ctx.pool, git_server_id)
        .await?
        .with_context(|| format!("git server not found: {git_server_id}"))?;

    git_server_repository::update_status(&ctx.pool, server.id, ComponentStatus::Stopping).await?;

    let release = release_name(RELEASE_PREFIX, server.id);
    let teardown = match ctx.provisioner.uninstall(&release, &release).await {
        Ok(()) => Teardown::clean(),
        Err(e) => {
            warn!(git_server = %server.id, error = %e, "uninstall failed, continuing stop");
            Teardown::partial(e.to_string())
        }
    };

    git_server_repository::update_status(&ctx.pool, server.id, ComponentStatus::Stopped).await?;
    info!(git_server = %server.id, clean = teardown.is_clean(), "git server stopped");

    Ok(teardown)
}

fn generate_password() -> String {
    // 64 hex chars from two v4 uuids; stored encrypted immediately
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_passwords_are_unique() {
        assert_ne!(generate_password(), generate_password());
        assert_eq!(generate_password().len(), 64);
    }
}
