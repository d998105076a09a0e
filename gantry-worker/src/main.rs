//! Gantry Worker
//!
//! A stateless worker that executes control-plane jobs from the shared
//! Postgres queue.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Dispatch: Route claimed jobs to handlers by typed payload
//! - Handlers: Deployments, git server lifecycle, runners, pipelines
//! - Scheduler: Job polling, claiming, and lifecycle management
//!
//! Any number of workers run against the same database; the atomic claim
//! in the store guarantees each job executes exactly once.

mod config;
mod crypto;
mod dispatch;
mod handlers;
mod pipeline_exec;
mod provision;
mod scheduler;
mod steps;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::crypto::IdentityCipher;
use crate::dispatch::HandlerContext;
use crate::provision::HelmProvisioner;
use crate::scheduler::JobPoller;
use crate::steps::DryRunStepRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gantry_worker=info,gantry_store=info,gantry_deploy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gantry Worker");

    // Load configuration
    let config = load_config()?;
    info!(
        "Loaded configuration: worker_id={}, poll_interval={:?}, max_parallel_jobs={}",
        config.worker_id, config.poll_interval, config.max_parallel_jobs
    );

    // Initialize database
    let pool = gantry_store::db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    gantry_store::db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Database initialized");

    // Shutdown signal
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_token.cancel();
        }
    });

    // Assemble handler capabilities
    let helm_bin = config.helm_bin.clone();
    let ctx = Arc::new(HandlerContext {
        pool,
        config,
        cipher: Arc::new(IdentityCipher),
        provisioner: Arc::new(HelmProvisioner::new(helm_bin)),
        step_runner: Arc::new(DryRunStepRunner::new()),
        shutdown,
    });

    info!("Worker initialized successfully");

    // Start polling loop
    let poller = JobPoller::new(ctx);
    if let Err(e) = poller.run().await {
        error!("Poller error: {:#}", e);
        return Err(e);
    }

    info!("Worker stopped");
    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    let config = Config::from_env();
    config.validate()?;
    Ok(config)
}
