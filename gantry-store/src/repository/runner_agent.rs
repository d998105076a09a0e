//! Runner Agent Repository

use gantry_core::domain::component::{ComponentStatus, RunnerAgent};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new runner agent record in `pending`
pub async fn create(
    pool: &PgPool,
    org_id: Uuid,
    name: &str,
    runner_type: &str,
) -> Result<RunnerAgent, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO runner_agents (id, org_id, name, runner_type, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(org_id)
    .bind(name)
    .bind(runner_type)
    .bind(ComponentStatus::Pending.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(RunnerAgent {
        id,
        org_id,
        name: name.to_string(),
        runner_type: runner_type.to_string(),
        status: ComponentStatus::Pending,
        created_at: now,
    })
}

/// Find a runner agent by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RunnerAgent>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunnerAgentRow>(
        r#"
        SELECT id, org_id, name, runner_type, status, created_at
        FROM runner_agents
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Update a runner agent's status
pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: ComponentStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE runner_agents SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct RunnerAgentRow {
    id: Uuid,
    org_id: Uuid,
    name: String,
    runner_type: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<RunnerAgentRow> for RunnerAgent {
    fn from(row: RunnerAgentRow) -> Self {
        RunnerAgent {
            id: row.id,
            org_id: row.org_id,
            name: row.name,
            runner_type: row.runner_type,
            status: ComponentStatus::parse(&row.status).unwrap_or(ComponentStatus::Pending),
            created_at: row.created_at,
        }
    }
}
