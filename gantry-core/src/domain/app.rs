//! Application, cluster and repository domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A target container-orchestration cluster owned by an organization
///
/// The kubeconfig is stored encrypted and decrypted per job invocation via
/// the injected cipher capability; it is never cached across jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// Encrypted kubeconfig blob (opaque bytes)
    #[serde(skip_serializing)]
    pub kubeconfig_enc: Vec<u8>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A tenant application deployed onto a cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub org_id: Uuid,
    pub cluster_id: Uuid,
    pub name: String,
    /// External hostnames routed to the application, if any
    pub domains: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A source repository attached to an application, used by pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: Uuid,
    pub application_id: Uuid,
    pub url: String,
    pub default_branch: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
