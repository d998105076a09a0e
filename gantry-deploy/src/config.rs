//! Deployment configuration
//!
//! In-memory input to the manifest generators, produced once per deployment
//! attempt from an application plus a release and its metadata.

use std::collections::BTreeMap;

use gantry_core::domain::app::Application;
use gantry_core::domain::release::Release;

/// Default probe paths applied when mapping from an application/release
pub const DEFAULT_LIVENESS_PATH: &str = "/health";
pub const DEFAULT_READINESS_PATH: &str = "/ready";

/// The generator's input: everything needed to render one deployment
#[derive(Debug, Clone, Default)]
pub struct DeploymentConfig {
    pub app_name: String,
    /// Target namespace; `None` renders as "default"
    pub namespace: Option<String>,
    pub image: String,
    pub tag: String,
    /// Desired replica count; `None` renders as 1
    pub replicas: Option<i32>,
    /// Container port; `None` renders as 8080
    pub container_port: Option<i32>,
    /// Environment variables injected into the workload
    pub environment: BTreeMap<String, String>,
    /// Config key/values; also rendered as the config manifest when non-empty
    pub config: BTreeMap<String, String>,
    /// Optional resource request/limit hints
    pub resources: Option<ResourceHints>,
    /// Optional health-check paths; probes are emitted only when set
    pub health_check: Option<HealthCheck>,
    /// External hostnames; the routing manifest is emitted only when non-empty
    pub domains: Vec<String>,
}

/// CPU/memory request and limit hints
#[derive(Debug, Clone)]
pub struct ResourceHints {
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
}

impl Default for ResourceHints {
    fn default() -> Self {
        Self {
            cpu_request: "100m".to_string(),
            cpu_limit: "500m".to_string(),
            memory_request: "128Mi".to_string(),
            memory_limit: "512Mi".to_string(),
        }
    }
}

/// Liveness/readiness probe paths
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub liveness_path: String,
    pub readiness_path: String,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            liveness_path: DEFAULT_LIVENESS_PATH.to_string(),
            readiness_path: DEFAULT_READINESS_PATH.to_string(),
        }
    }
}

impl DeploymentConfig {
    /// Maps an application plus a release into a deployment config.
    ///
    /// Namespace defaults to the application name, replicas to 1, port to
    /// 8080; environment and config come from the release metadata; default
    /// probes and resource hints are always attached.
    pub fn from_application_release(app: &Application, release: &Release) -> Self {
        Self {
            app_name: app.name.clone(),
            namespace: Some(app.name.clone()),
            image: release.image.clone(),
            tag: release.tag.clone(),
            replicas: Some(1),
            container_port: Some(8080),
            environment: release.meta.environment.clone(),
            config: release.meta.config.clone(),
            resources: Some(ResourceHints::default()),
            health_check: Some(HealthCheck::default()),
            domains: app.domains.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::domain::release::{ReleaseMeta, ReleaseStatus};
    use uuid::Uuid;

    fn fixture() -> (Application, Release) {
        let app = Application {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            cluster_id: Uuid::new_v4(),
            name: "shop".to_string(),
            domains: vec!["shop.example.com".to_string()],
            created_at: chrono::Utc::now(),
        };
        let release = Release {
            id: Uuid::new_v4(),
            application_id: app.id,
            image: "myapp".to_string(),
            tag: "v1".to_string(),
            status: ReleaseStatus::Pending,
            started_at: None,
            finished_at: None,
            meta: ReleaseMeta {
                environment: [("RUST_LOG".to_string(), "info".to_string())].into(),
                config: Default::default(),
            },
            created_at: chrono::Utc::now(),
        };
        (app, release)
    }

    #[test]
    fn test_from_application_release_defaults() {
        let (app, release) = fixture();
        let cfg = DeploymentConfig::from_application_release(&app, &release);

        assert_eq!(cfg.app_name, "shop");
        assert_eq!(cfg.namespace.as_deref(), Some("shop"));
        assert_eq!(cfg.image, "myapp");
        assert_eq!(cfg.tag, "v1");
        assert_eq!(cfg.replicas, Some(1));
        assert_eq!(cfg.container_port, Some(8080));
        assert_eq!(cfg.environment.get("RUST_LOG").unwrap(), "info");
        assert_eq!(cfg.domains, vec!["shop.example.com"]);

        let health = cfg.health_check.unwrap();
        assert_eq!(health.liveness_path, "/health");
        assert_eq!(health.readiness_path, "/ready");

        let resources = cfg.resources.unwrap();
        assert_eq!(resources.cpu_request, "100m");
        assert_eq!(resources.cpu_limit, "500m");
        assert_eq!(resources.memory_request, "128Mi");
        assert_eq!(resources.memory_limit, "512Mi");
    }
}
