//! Turnkey component domain types
//!
//! Components (self-hosted git server, CI runner agent) are installed onto
//! clusters through the external chart provisioner.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status shared by chart-installed components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Pending,
    Installing,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl ComponentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentStatus::Pending => "pending",
            ComponentStatus::Installing => "installing",
            ComponentStatus::Running => "running",
            ComponentStatus::Stopping => "stopping",
            ComponentStatus::Stopped => "stopped",
            ComponentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ComponentStatus::Pending),
            "installing" => Some(ComponentStatus::Installing),
            "running" => Some(ComponentStatus::Running),
            "stopping" => Some(ComponentStatus::Stopping),
            "stopped" => Some(ComponentStatus::Stopped),
            "failed" => Some(ComponentStatus::Failed),
            _ => None,
        }
    }
}

/// A self-hosted git server instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitServer {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub domain: String,
    /// Persistent volume size, e.g. "10Gi"
    pub storage: String,
    pub status: ComponentStatus,
    /// Generated at install time
    pub admin_username: Option<String>,
    /// Generated at install time, stored encrypted
    #[serde(skip_serializing)]
    pub admin_password_enc: Option<Vec<u8>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A CI runner agent instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerAgent {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// Runner flavor, e.g. "docker" or "kubernetes"
    pub runner_type: String,
    pub status: ComponentStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Helm-style release/namespace name for a component instance:
/// `<prefix>-<first 8 hex chars of id>`
pub fn release_name(prefix: &str, id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("{}-{}", prefix, &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_name_uses_first_eight_hex_chars() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(release_name("gitserver", id), "gitserver-a1b2c3d4");
    }

    #[test]
    fn test_release_name_is_stable_per_id() {
        let id = Uuid::new_v4();
        assert_eq!(release_name("runner", id), release_name("runner", id));
    }
}
