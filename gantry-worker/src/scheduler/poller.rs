//! Job poller
//!
//! The top-level scheduling loop. Any number of worker processes run this
//! loop concurrently against the same queue; the atomic claim in the store
//! is the only synchronization between them. A job another worker claimed
//! first is simply skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as AnyhowContext, Result};
use gantry_store::repository::job_repository::{self, ClaimOutcome};
use tokio::sync::Semaphore;
use tokio::time;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dispatch::{HandlerContext, dispatch, is_cancellation};

/// Job poller that continuously claims and executes pending jobs
pub struct JobPoller {
    ctx: Arc<HandlerContext>,
    poll_interval: Duration,
    semaphore: Arc<Semaphore>,
}

impl JobPoller {
    /// Creates a new job poller
    pub fn new(ctx: Arc<HandlerContext>) -> Self {
        let semaphore = Arc::new(Semaphore::new(ctx.config.max_parallel_jobs));
        let poll_interval = ctx.config.poll_interval;
        Self {
            ctx,
            poll_interval,
            semaphore,
        }
    }

    /// Starts the polling loop; returns when shutdown is signalled.
    ///
    /// Jobs in flight at shutdown are abandoned mid-execution and stay
    /// `processing` in the queue; there is no lease/heartbeat recovery.
    pub async fn run(&self) -> Result<()> {
        info!(
            worker = %self.ctx.config.worker_id,
            "Starting job poller (interval: {:?})",
            self.poll_interval
        );

        let mut interval = time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.ctx.shutdown.cancelled() => {
                    info!("Shutdown signalled, stopping poller");
                    return Ok(());
                }
            }

            debug!("Polling for pending jobs");

            match self.poll_once().await {
                Ok(spawned) => {
                    if spawned > 0 {
                        info!("Claimed {} job(s) this cycle", spawned);
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    /// Performs a single poll cycle.
    ///
    /// Job tasks are not awaited here: a deployment's readiness wait can
    /// block for minutes and must not stall the next tick. The semaphore
    /// bounds how many run at once.
    async fn poll_once(&self) -> Result<usize> {
        let jobs = job_repository::list_pending(&self.ctx.pool)
            .await
            .context("Failed to list pending jobs")?;

        if jobs.is_empty() {
            debug!("No pending jobs");
            return Ok(0);
        }

        let mut spawned = 0;

        for job in jobs {
            if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
                self.spawn_job_task(job.id, permit);
                spawned += 1;
            } else {
                debug!("Max parallel jobs reached, leaving job {} for later", job.id);
                break;
            }
        }

        Ok(spawned)
    }

    /// Spawns a task to claim and execute a single job
    fn spawn_job_task(
        &self,
        job_id: Uuid,
        _permit: tokio::sync::OwnedSemaphorePermit,
    ) -> tokio::task::JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);

        tokio::spawn(async move {
            if let Err(e) = Self::execute_job(ctx, job_id).await {
                error!("Failed to execute job {}: {:#}", job_id, e);
            }
            // Permit is released when dropped
        })
    }

    /// Claims a job, dispatches it, and reports the terminal status back to
    /// the queue. The worker that claims a job is the one that terminates it.
    ///
    /// A job interrupted by shutdown is never reported terminal: it keeps its
    /// `processing` status as an orphan for operators to reconcile.
    async fn execute_job(ctx: Arc<HandlerContext>, job_id: Uuid) -> Result<()> {
        let job = match job_repository::claim(&ctx.pool, job_id)
            .await
            .context("Failed to claim job")?
        {
            ClaimOutcome::Claimed(job) => job,
            ClaimOutcome::NotClaimed => {
                debug!("Job {} already claimed elsewhere, skipping", job_id);
                return Ok(());
            }
        };

        info!("Claimed job {} (kind: {})", job.id, job.kind);

        match dispatch(&ctx, &job).await {
            Ok(()) => {
                job_repository::complete(&ctx.pool, job.id)
                    .await
                    .context("Failed to mark job completed")?;
                info!("Job {} completed", job.id);
            }
            Err(e) => {
                if is_cancellation(&e) || ctx.shutdown.is_cancelled() {
                    info!("Job {} interrupted by shutdown, leaving it processing", job.id);
                    return Ok(());
                }

                let message = format!("{e:#}");
                warn!("Job {} failed: {}", job.id, message);
                job_repository::fail(&ctx.pool, job.id, &message)
                    .await
                    .context("Failed to mark job failed")?;
            }
        }

        Ok(())
    }
}
