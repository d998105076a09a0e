use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create clusters table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clusters (
            id UUID PRIMARY KEY,
            org_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL,
            kubeconfig_enc BYTEA NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create applications table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id UUID PRIMARY KEY,
            org_id UUID NOT NULL,
            cluster_id UUID NOT NULL REFERENCES clusters(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            domains TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create releases table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS releases (
            id UUID PRIMARY KEY,
            application_id UUID NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            image VARCHAR(512) NOT NULL,
            tag VARCHAR(255) NOT NULL,
            status VARCHAR(50) NOT NULL,
            started_at TIMESTAMPTZ,
            finished_at TIMESTAMPTZ,
            meta JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            org_id UUID NOT NULL,
            kind VARCHAR(50) NOT NULL,
            status VARCHAR(50) NOT NULL,
            payload JSONB NOT NULL DEFAULT '{}',
            error_message TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create repositories table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS repositories (
            id UUID PRIMARY KEY,
            application_id UUID NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            default_branch VARCHAR(255) NOT NULL DEFAULT 'main',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            application_id UUID NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            repository_id UUID NOT NULL,
            commit_ref VARCHAR(255) NOT NULL,
            status VARCHAR(50) NOT NULL,
            started_at TIMESTAMPTZ,
            finished_at TIMESTAMPTZ,
            meta JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create pipeline_steps table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_steps (
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            status VARCHAR(50) NOT NULL,
            started_at TIMESTAMPTZ,
            finished_at TIMESTAMPTZ,
            log TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create git_servers table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS git_servers (
            id UUID PRIMARY KEY,
            org_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL,
            domain VARCHAR(255) NOT NULL,
            storage VARCHAR(50) NOT NULL DEFAULT '10Gi',
            status VARCHAR(50) NOT NULL,
            admin_username VARCHAR(255),
            admin_password_enc BYTEA,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create runner_agents table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runner_agents (
            id UUID PRIMARY KEY,
            org_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL,
            runner_type VARCHAR(50) NOT NULL,
            status VARCHAR(50) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for queue scans and status lookups
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at ASC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_releases_application_id ON releases(application_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipelines_application_id ON pipelines(application_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipeline_steps_pipeline_id ON pipeline_steps(pipeline_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
