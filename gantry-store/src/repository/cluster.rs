//! Cluster Repository
//!
//! The kubeconfig column holds opaque encrypted bytes; decryption happens in
//! the worker via the injected cipher capability.

use gantry_core::domain::app::Cluster;
use sqlx::PgPool;
use uuid::Uuid;

/// Register a new cluster with its encrypted kubeconfig
pub async fn create(
    pool: &PgPool,
    org_id: Uuid,
    name: &str,
    kubeconfig_enc: &[u8],
) -> Result<Cluster, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    sqlx::query(
        r#"
        INSERT INTO clusters (id, org_id, name, kubeconfig_enc, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(org_id)
    .bind(name)
    .bind(kubeconfig_enc)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Cluster {
        id,
        org_id,
        name: name.to_string(),
        kubeconfig_enc: kubeconfig_enc.to_vec(),
        created_at: now,
    })
}

/// Find a cluster by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Cluster>, sqlx::Error> {
    let row = sqlx::query_as::<_, ClusterRow>(
        r#"
        SELECT id, org_id, name, kubeconfig_enc, created_at
        FROM clusters
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

#[derive(sqlx::FromRow)]
struct ClusterRow {
    id: Uuid,
    org_id: Uuid,
    name: String,
    kubeconfig_enc: Vec<u8>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ClusterRow> for Cluster {
    fn from(row: ClusterRow) -> Self {
        Cluster {
            id: row.id,
            org_id: row.org_id,
            name: row.name,
            kubeconfig_enc: row.kubeconfig_enc,
            created_at: row.created_at,
        }
    }
}
