//! Application Repository

use gantry_core::domain::app::Application;
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new application
pub async fn create(
    pool: &PgPool,
    org_id: Uuid,
    cluster_id: Uuid,
    name: &str,
    domains: &[String],
) -> Result<Application, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO applications (id, org_id, cluster_id, name, domains, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(org_id)
    .bind(cluster_id)
    .bind(name)
    .bind(domains)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Application {
        id,
        org_id,
        cluster_id,
        name: name.to_string(),
        domains: domains.to_vec(),
        created_at: now,
    })
}

/// Find an application by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Application>, sqlx::Error> {
    let row = sqlx::query_as::<_, ApplicationRow>(
        r#"
        SELECT id, org_id, cluster_id, name, domains, created_at
        FROM applications
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    org_id: Uuid,
    cluster_id: Uuid,
    name: String,
    domains: Vec<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Application {
            id: row.id,
            org_id: row.org_id,
            cluster_id: row.cluster_id,
            name: row.name,
            domains: row.domains,
            created_at: row.created_at,
        }
    }
}
