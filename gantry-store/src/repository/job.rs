//! Job Repository
//!
//! The durable job queue. `claim` is the sole synchronization primitive in
//! the system: a single conditional write so that under concurrent workers
//! racing on the same job id, exactly one succeeds.

use gantry_core::domain::job::{Job, JobStatus};
use gantry_core::dto::NewJob;
use sqlx::PgPool;
use uuid::Uuid;

const JOB_COLUMNS: &str =
    "id, org_id, kind, status, payload, error_message, created_at, started_at, completed_at";

/// Outcome of a claim attempt
///
/// `NotClaimed` means another worker won the race (or the job is already
/// terminal); callers skip the job rather than treating this as an error.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Job),
    NotClaimed,
}

/// Enqueue a new job in `pending`
pub async fn enqueue(pool: &PgPool, req: NewJob) -> Result<Job, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();
    let kind = req.payload.kind().as_str();
    let payload = serde_json::to_value(&req.payload)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO jobs (id, org_id, kind, status, payload, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(req.org_id)
    .bind(kind)
    .bind(JobStatus::Pending.as_str())
    .bind(&payload)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Job {
        id,
        org_id: req.org_id,
        kind: kind.to_string(),
        status: JobStatus::Pending,
        payload,
        error_message: None,
        created_at: now,
        started_at: None,
        completed_at: None,
    })
}

/// Find a job by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all pending jobs, oldest first
///
/// No locking: a job returned here may already be claimed by another worker
/// by the time `claim` runs.
pub async fn list_pending(pool: &PgPool) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE status = 'pending' ORDER BY created_at ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Atomically claim a pending job for execution
///
/// Transitions pending -> processing and records `started_at` in one
/// conditional write. If the job is missing, already processing, or
/// terminal, no row matches and the outcome is `NotClaimed`.
pub async fn claim(pool: &PgPool, job_id: Uuid) -> Result<ClaimOutcome, sqlx::Error> {
    let now = chrono::Utc::now();

    let row = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        UPDATE jobs
        SET status = 'processing', started_at = $2
        WHERE id = $1 AND status = 'pending'
        RETURNING {JOB_COLUMNS}
        "#
    ))
    .bind(job_id)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(r) => ClaimOutcome::Claimed(r.into()),
        None => ClaimOutcome::NotClaimed,
    })
}

/// Mark a processing job completed
///
/// Guarded by `status = 'processing'` so a terminal job is never revived;
/// calling this on an already-terminal job is a no-op.
pub async fn complete(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'completed', completed_at = $2
        WHERE id = $1 AND status = 'processing'
        "#,
    )
    .bind(job_id)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a processing job failed, recording the error message
pub async fn fail(pool: &PgPool, job_id: Uuid, message: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'failed', completed_at = $2, error_message = $3
        WHERE id = $1 AND status = 'processing'
        "#,
    )
    .bind(job_id)
    .bind(chrono::Utc::now())
    .bind(message)
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    org_id: Uuid,
    kind: String,
    status: String,
    payload: serde_json::Value,
    error_message: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            org_id: row.org_id,
            kind: row.kind,
            status: JobStatus::parse(&row.status).unwrap_or(JobStatus::Pending),
            payload: row.payload,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}
