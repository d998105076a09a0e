//! Error types for manifest generation and cluster apply

use thiserror::Error;

/// Errors from the pure manifest generators
#[derive(Debug, Error)]
pub enum GenerateError {
    /// A required field of the deployment config is empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Routing requires at least one external hostname
    #[error("routing manifest requires at least one domain")]
    NoDomains,

    /// Manifest serialization failed
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Errors from the cluster apply engine
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The decrypted credential is not a usable kubeconfig
    #[error("invalid cluster credential: {0}")]
    InvalidCredential(String),

    /// A manifest could not be parsed back into a resource object
    #[error("invalid manifest {name}: {reason}")]
    InvalidManifest { name: String, reason: String },

    /// Both create and update failed for a resource
    #[error("failed to apply {name}: create failed ({create}), update failed ({update})")]
    CreateOrUpdateFailed {
        name: String,
        create: String,
        update: String,
    },

    /// The workload did not reach the desired ready-replica count in time
    #[error("workload {name} not ready after {waited_secs}s ({ready}/{desired} replicas)")]
    ReadyTimeout {
        name: String,
        waited_secs: u64,
        ready: i32,
        desired: i32,
    },

    /// The operation was interrupted by shutdown
    #[error("apply cancelled by shutdown")]
    Cancelled,

    /// Cluster API call failed
    #[error("cluster API error: {0}")]
    Kube(#[from] kube::Error),
}
