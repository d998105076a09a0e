//! Pipeline Repository
//!
//! Handles pipelines and their step rows. Step rows are created immediately
//! before they run and finalized immediately after.

use gantry_core::domain::pipeline::{
    Pipeline, PipelineMeta, PipelineStatus, PipelineStep, StepStatus,
};
use sqlx::PgPool;
use uuid::Uuid;

const PIPELINE_COLUMNS: &str = "id, application_id, repository_id, commit_ref, status, \
                                started_at, finished_at, meta, created_at";

/// Create a new pipeline in `pending`
pub async fn create(
    pool: &PgPool,
    application_id: Uuid,
    repository_id: Uuid,
    commit_ref: &str,
    meta: PipelineMeta,
) -> Result<Pipeline, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();
    let meta_value = serde_json::to_value(&meta).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO pipelines (id, application_id, repository_id, commit_ref, status, meta, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(application_id)
    .bind(repository_id)
    .bind(commit_ref)
    .bind(PipelineStatus::Pending.as_str())
    .bind(&meta_value)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Pipeline {
        id,
        application_id,
        repository_id,
        commit_ref: commit_ref.to_string(),
        status: PipelineStatus::Pending,
        started_at: None,
        finished_at: None,
        meta,
        created_at: now,
    })
}

/// Find a pipeline by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Pipeline>, sqlx::Error> {
    let row = sqlx::query_as::<_, PipelineRow>(&format!(
        "SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Mark a pipeline running, recording `started_at` once
///
/// Guarded so a terminal pipeline is never pulled back to `running`.
pub async fn mark_running(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipelines
        SET status = 'running', started_at = COALESCE(started_at, $2)
        WHERE id = $1 AND status NOT IN ('success', 'failed', 'cancelled')
        "#,
    )
    .bind(id)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a pipeline terminal, recording `finished_at` once
///
/// A pipeline that is already terminal keeps its first terminal status.
pub async fn mark_finished(
    pool: &PgPool,
    id: Uuid,
    status: PipelineStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipelines
        SET status = $2, finished_at = COALESCE(finished_at, $3)
        WHERE id = $1 AND status NOT IN ('success', 'failed', 'cancelled')
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Pipeline Steps
// =============================================================================

/// Create a step row in `pending`
pub async fn create_step(
    pool: &PgPool,
    pipeline_id: Uuid,
    name: &str,
) -> Result<PipelineStep, sqlx::Error> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO pipeline_steps (id, pipeline_id, name, status)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(pipeline_id)
    .bind(name)
    .bind(StepStatus::Pending.as_str())
    .execute(pool)
    .await?;

    Ok(PipelineStep {
        id,
        pipeline_id,
        name: name.to_string(),
        status: StepStatus::Pending,
        started_at: None,
        finished_at: None,
        log: None,
    })
}

/// Mark a step running, recording `started_at`
pub async fn mark_step_running(pool: &PgPool, step_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipeline_steps
        SET status = 'running', started_at = $2
        WHERE id = $1
        "#,
    )
    .bind(step_id)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Finalize a step with its terminal status and captured log text
pub async fn finish_step(
    pool: &PgPool,
    step_id: Uuid,
    status: StepStatus,
    log: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipeline_steps
        SET status = $2, finished_at = $3, log = $4
        WHERE id = $1
        "#,
    )
    .bind(step_id)
    .bind(status.as_str())
    .bind(chrono::Utc::now())
    .bind(log)
    .execute(pool)
    .await?;

    Ok(())
}

/// List a pipeline's steps in execution order
pub async fn list_steps(pool: &PgPool, pipeline_id: Uuid) -> Result<Vec<PipelineStep>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StepRow>(
        r#"
        SELECT id, pipeline_id, name, status, started_at, finished_at, log
        FROM pipeline_steps
        WHERE pipeline_id = $1
        ORDER BY started_at ASC NULLS LAST
        "#,
    )
    .bind(pipeline_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    application_id: Uuid,
    repository_id: Uuid,
    commit_ref: String,
    status: String,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
    meta: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: row.id,
            application_id: row.application_id,
            repository_id: row.repository_id,
            commit_ref: row.commit_ref,
            status: PipelineStatus::parse(&row.status).unwrap_or(PipelineStatus::Pending),
            started_at: row.started_at,
            finished_at: row.finished_at,
            meta: serde_json::from_value(row.meta).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: Uuid,
    pipeline_id: Uuid,
    name: String,
    status: String,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
    log: Option<String>,
}

impl From<StepRow> for PipelineStep {
    fn from(row: StepRow) -> Self {
        PipelineStep {
            id: row.id,
            pipeline_id: row.pipeline_id,
            name: row.name,
            status: StepStatus::parse(&row.status).unwrap_or(StepStatus::Pending),
            started_at: row.started_at,
            finished_at: row.finished_at,
            log: row.log,
        }
    }
}
