//! Git Server Repository

use gantry_core::domain::component::{ComponentStatus, GitServer};
use sqlx::PgPool;
use uuid::Uuid;

const GIT_SERVER_COLUMNS: &str =
    "id, org_id, name, domain, storage, status, admin_username, admin_password_enc, created_at";

/// Create a new git server record in `pending`
pub async fn create(
    pool: &PgPool,
    org_id: Uuid,
    name: &str,
    domain: &str,
    storage: &str,
) -> Result<GitServer, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO git_servers (id, org_id, name, domain, storage, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(org_id)
    .bind(name)
    .bind(domain)
    .bind(storage)
    .bind(ComponentStatus::Pending.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(GitServer {
        id,
        org_id,
        name: name.to_string(),
        domain: domain.to_string(),
        storage: storage.to_string(),
        status: ComponentStatus::Pending,
        admin_username: None,
        admin_password_enc: None,
        created_at: now,
    })
}

/// Find a git server by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<GitServer>, sqlx::Error> {
    let row = sqlx::query_as::<_, GitServerRow>(&format!(
        "SELECT {GIT_SERVER_COLUMNS} FROM git_servers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Update a git server's status
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: ComponentStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE git_servers SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

    Ok(())
}

/// Persist generated admin credentials (password stored encrypted)
pub async fn store_admin_credentials(
    pool: &PgPool,
    id: Uuid,
    username: &str,
    password_enc: &[u8],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE git_servers
        SET admin_username = $2, admin_password_enc = $3
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(password_enc)
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct GitServerRow {
    id: Uuid,
    org_id: Uuid,
    name: String,
    domain: String,
    storage: String,
    status: String,
    admin_username: Option<String>,
    admin_password_enc: Option<Vec<u8>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<GitServerRow> for GitServer {
    fn from(row: GitServerRow) -> Self {
        GitServer {
            id: row.id,
            org_id: row.org_id,
            name: row.name,
            domain: row.domain,
            storage: row.storage,
            status: ComponentStatus::parse(&row.status).unwrap_or(ComponentStatus::Pending),
            admin_username: row.admin_username,
            admin_password_enc: row.admin_password_enc,
            created_at: row.created_at,
        }
    }
}
