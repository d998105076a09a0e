//! Release Repository
//!
//! Handles all database operations related to releases. Status mutation is
//! exclusively driven by the deployment handler.

use gantry_core::domain::release::{Release, ReleaseMeta, ReleaseStatus};
use sqlx::PgPool;
use uuid::Uuid;

const RELEASE_COLUMNS: &str =
    "id, application_id, image, tag, status, started_at, finished_at, meta, created_at";

/// Create a new release in `pending`
pub async fn create(
    pool: &PgPool,
    application_id: Uuid,
    image: &str,
    tag: &str,
    meta: ReleaseMeta,
) -> Result<Release, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();
    let meta_value = serde_json::to_value(&meta).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO releases (id, application_id, image, tag, status, meta, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(application_id)
    .bind(image)
    .bind(tag)
    .bind(ReleaseStatus::Pending.as_str())
    .bind(&meta_value)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Release {
        id,
        application_id,
        image: image.to_string(),
        tag: tag.to_string(),
        status: ReleaseStatus::Pending,
        started_at: None,
        finished_at: None,
        meta,
        created_at: now,
    })
}

/// Find a release by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Release>, sqlx::Error> {
    let row = sqlx::query_as::<_, ReleaseRow>(&format!(
        "SELECT {RELEASE_COLUMNS} FROM releases WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Mark a release running
///
/// `started_at` is set exactly once; re-running the statement preserves the
/// original timestamp. Guarded so a terminal release is never pulled back to
/// `running`; on a terminal row the call is a no-op.
pub async fn mark_running(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE releases
        SET status = 'running', started_at = COALESCE(started_at, $2)
        WHERE id = $1 AND status NOT IN ('succeeded', 'failed')
        "#,
    )
    .bind(id)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a release terminal (succeeded or failed), recording `finished_at` once
///
/// A release that is already terminal keeps its first terminal status.
pub async fn mark_finished(
    pool: &PgPool,
    id: Uuid,
    status: ReleaseStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE releases
        SET status = $2, finished_at = COALESCE(finished_at, $3)
        WHERE id = $1 AND status NOT IN ('succeeded', 'failed')
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
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: Uuid,
    application_id: Uuid,
    image: String,
    tag: String,
    status: String,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
    meta: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Release {
            id: row.id,
            application_id: row.application_id,
            image: row.image,
            tag: row.tag,
            status: ReleaseStatus::parse(&row.status).unwrap_or(ReleaseStatus::Pending),
            started_at: row.started_at,
            finished_at: row.finished_at,
            meta: serde_json::from_value(row.meta).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}
