//! Release domain types
//!
//! A release is one deploy attempt of a specific image/tag for an
//! application. Mutated exclusively by the deployment handler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One deploy attempt of a specific image/tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: Uuid,
    pub application_id: Uuid,
    pub image: String,
    pub tag: String,
    pub status: ReleaseStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub meta: ReleaseMeta,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Release {
    /// Full container image reference, `image:tag`
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Release lifecycle status (monotonic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl ReleaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseStatus::Pending => "pending",
            ReleaseStatus::Running => "running",
            ReleaseStatus::Succeeded => "succeeded",
            ReleaseStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReleaseStatus::Pending),
            "running" => Some(ReleaseStatus::Running),
            "succeeded" => Some(ReleaseStatus::Succeeded),
            "failed" => Some(ReleaseStatus::Failed),
            _ => None,
        }
    }
}

/// Free-form release metadata used to parameterize manifest generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseMeta {
    /// Environment variables injected into the workload
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Configuration key/values, also materialized as a config manifest
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref() {
        let release = Release {
            id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            image: "myapp".to_string(),
            tag: "v1".to_string(),
            status: ReleaseStatus::Pending,
            started_at: None,
            finished_at: None,
            meta: ReleaseMeta::default(),
            created_at: chrono::Utc::now(),
        };
        assert_eq!(release.image_ref(), "myapp:v1");
    }

    #[test]
    fn test_meta_defaults_when_fields_missing() {
        let meta: ReleaseMeta = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(meta.environment.is_empty());
        assert!(meta.config.is_empty());
    }
}
