//! Queue claim contract tests
//!
//! These exercise the atomic claim against a real Postgres instance. They
//! are ignored by default; point DATABASE_URL at a scratch database and run
//! with `cargo test -p gantry-store -- --ignored`.

use gantry_core::domain::job::{JobPayload, JobStatus};
use gantry_core::dto::NewJob;
use gantry_store::repository::job_repository::{self, ClaimOutcome};
use uuid::Uuid;

async fn test_pool() -> sqlx::PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = gantry_store::db::create_pool(&url).await.expect("connect");
    gantry_store::db::run_migrations(&pool).await.expect("migrate");
    pool
}

fn deployment_job() -> NewJob {
    NewJob {
        org_id: Uuid::new_v4(),
        payload: JobPayload::Deployment {
            release_id: Uuid::new_v4(),
        },
    }
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn claim_is_mutually_exclusive_under_races() {
    let pool = test_pool().await;
    let job = job_repository::enqueue(&pool, deployment_job()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let job_id = job.id;
        handles.push(tokio::spawn(async move {
            job_repository::claim(&pool, job_id).await.unwrap()
        }));
    }

    let mut claimed = 0;
    for handle in handles {
        if let ClaimOutcome::Claimed(job) = handle.await.unwrap() {
            claimed += 1;
            assert_eq!(job.status, JobStatus::Processing);
            assert!(job.started_at.is_some());
        }
    }

    assert_eq!(claimed, 1, "exactly one of the racing claims must win");
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn claim_on_missing_job_is_not_claimed() {
    let pool = test_pool().await;

    match job_repository::claim(&pool, Uuid::new_v4()).await.unwrap() {
        ClaimOutcome::NotClaimed => {}
        ClaimOutcome::Claimed(_) => panic!("claimed a job that does not exist"),
    }
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn terminal_job_is_never_revived() {
    let pool = test_pool().await;
    let job = job_repository::enqueue(&pool, deployment_job()).await.unwrap();

    let ClaimOutcome::Claimed(_) = job_repository::claim(&pool, job.id).await.unwrap() else {
        panic!("fresh pending job must be claimable");
    };

    job_repository::complete(&pool, job.id).await.unwrap();

    // Late fail report must not overwrite the terminal status
    job_repository::fail(&pool, job.id, "late failure").await.unwrap();
    let reloaded = job_repository::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, JobStatus::Completed);
    assert!(reloaded.error_message.is_none());

    // And a terminal job can never be claimed again
    match job_repository::claim(&pool, job.id).await.unwrap() {
        ClaimOutcome::NotClaimed => {}
        ClaimOutcome::Claimed(_) => panic!("re-claimed a completed job"),
    }
}

#[tokio::test]
#[ignore = "requires a Postgres instance via DATABASE_URL"]
async fn list_pending_returns_oldest_first() {
    let pool = test_pool().await;
    let first = job_repository::enqueue(&pool, deployment_job()).await.unwrap();
    let second = job_repository::enqueue(&pool, deployment_job()).await.unwrap();

    let pending = job_repository::list_pending(&pool).await.unwrap();
    let pos_first = pending.iter().position(|j| j.id == first.id).unwrap();
    let pos_second = pending.iter().position(|j| j.id == second.id).unwrap();
    assert!(pos_first < pos_second);
}
