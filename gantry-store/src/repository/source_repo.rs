//! Source Repository Repository
//!
//! Persistence for the source repositories pipelines build from.

use gantry_core::domain::app::Repository;
use sqlx::PgPool;
use uuid::Uuid;

/// Attach a source repository to an application
pub async fn create(
    pool: &PgPool,
    application_id: Uuid,
    url: &str,
    default_branch: &str,
) -> Result<Repository, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO repositories (id, application_id, url, default_branch, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(application_id)
    .bind(url)
    .bind(default_branch)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Repository {
        id,
        application_id,
        url: url.to_string(),
        default_branch: default_branch.to_string(),
        created_at: now,
    })
}

/// Find a source repository by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Repository>, sqlx::Error> {
    let row = sqlx::query_as::<_, RepositoryRow>(
        r#"
        SELECT id, application_id, url, default_branch, created_at
        FROM repositories
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

#[derive(sqlx::FromRow)]
struct RepositoryRow {
    id: Uuid,
    application_id: Uuid,
    url: String,
    default_branch: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<RepositoryRow> for Repository {
    fn from(row: RepositoryRow) -> Self {
        Repository {
            id: row.id,
            application_id: row.application_id,
            url: row.url,
            default_branch: row.default_branch,
            created_at: row.created_at,
        }
    }
}
