//! Deployment manifest generators
//!
//! Pure functions mapping a [`DeploymentConfig`] to named YAML manifests.
//! Manifest names are stable keys consumed by the apply engine:
//! `deployment.yaml`, `service.yaml`, `configmap.yaml`, `ingress.yaml`.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec, Probe,
    ResourceRequirements, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;

use crate::config::DeploymentConfig;
use crate::error::GenerateError;

/// Stable manifest names, usable for logging and debugging
pub const WORKLOAD_MANIFEST: &str = "deployment.yaml";
pub const EXPOSURE_MANIFEST: &str = "service.yaml";
pub const CONFIG_MANIFEST: &str = "configmap.yaml";
pub const ROUTING_MANIFEST: &str = "ingress.yaml";

/// Exposure port routed to the container port
pub const EXPOSURE_PORT: i32 = 80;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_REPLICAS: i32 = 1;
const DEFAULT_CONTAINER_PORT: i32 = 8080;

/// Generates the workload manifest.
///
/// Requires a non-empty app name, image and tag. Namespace, replicas and
/// container port fall back to "default", 1 and 8080 when unset.
pub fn generate_workload(cfg: &DeploymentConfig) -> Result<String, GenerateError> {
    validate_workload(cfg)?;

    let namespace = effective_namespace(cfg);
    let port = cfg.container_port.unwrap_or(DEFAULT_CONTAINER_PORT);
    let labels = app_labels(&cfg.app_name);

    // Environment block merges the environment and config maps; iteration
    // order is not semantically significant.
    let mut env_entries: BTreeMap<&String, &String> = cfg.environment.iter().collect();
    env_entries.extend(cfg.config.iter());
    let env: Vec<EnvVar> = env_entries
        .into_iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            ..Default::default()
        })
        .collect();

    let resources = cfg.resources.as_ref().map(|hints| ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(hints.cpu_request.clone())),
            ("memory".to_string(), Quantity(hints.memory_request.clone())),
        ])),
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(hints.cpu_limit.clone())),
            ("memory".to_string(), Quantity(hints.memory_limit.clone())),
        ])),
        ..Default::default()
    });

    let liveness_probe = cfg.health_check.as_ref().map(|health| Probe {
        http_get: Some(HTTPGetAction {
            path: Some(health.liveness_path.clone()),
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(30),
        period_seconds: Some(10),
        ..Default::default()
    });
    let readiness_probe = cfg.health_check.as_ref().map(|health| Probe {
        http_get: Some(HTTPGetAction {
            path: Some(health.readiness_path.clone()),
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        initial_delay_seconds: Some(5),
        period_seconds: Some(5),
        ..Default::default()
    });

    let deployment = Deployment {
        metadata: ObjectMeta {
            name: Some(cfg.app_name.clone()),
            namespace: Some(namespace),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(cfg.replicas.unwrap_or(DEFAULT_REPLICAS)),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: cfg.app_name.clone(),
                        image: Some(format!("{}:{}", cfg.image, cfg.tag)),
                        ports: Some(vec![ContainerPort {
                            container_port: port,
                            ..Default::default()
                        }]),
                        env: if env.is_empty() { None } else { Some(env) },
                        resources,
                        liveness_probe,
                        readiness_probe,
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    to_manifest("apps/v1", "Deployment", &deployment)
}

/// Generates the cluster-internal exposure manifest routing port 80 to the
/// container port.
pub fn generate_exposure(cfg: &DeploymentConfig) -> Result<String, GenerateError> {
    validate_workload(cfg)?;

    let port = cfg.container_port.unwrap_or(DEFAULT_CONTAINER_PORT);
    let service = Service {
        metadata: ObjectMeta {
            name: Some(cfg.app_name.clone()),
            namespace: Some(effective_namespace(cfg)),
            labels: Some(app_labels(&cfg.app_name)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(app_labels(&cfg.app_name)),
            ports: Some(vec![ServicePort {
                port: EXPOSURE_PORT,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    };

    to_manifest("v1", "Service", &service)
}

/// Generates the config manifest from the config map only.
///
/// Returns `None` when the config map is empty; callers skip applying it.
pub fn generate_config(cfg: &DeploymentConfig) -> Result<Option<String>, GenerateError> {
    if cfg.config.is_empty() {
        return Ok(None);
    }

    let config_map = ConfigMap {
        metadata: ObjectMeta {
            name: Some(format!("{}-config", cfg.app_name)),
            namespace: Some(effective_namespace(cfg)),
            labels: Some(app_labels(&cfg.app_name)),
            ..Default::default()
        },
        data: Some(cfg.config.clone()),
        ..Default::default()
    };

    to_manifest("v1", "ConfigMap", &config_map).map(Some)
}

/// Generates the routing manifest with one host entry per domain, all
/// pointing at the exposure manifest's port 80. Fails with no domains.
pub fn generate_routing(cfg: &DeploymentConfig) -> Result<String, GenerateError> {
    if cfg.domains.is_empty() {
        return Err(GenerateError::NoDomains);
    }

    let rules: Vec<IngressRule> = cfg
        .domains
        .iter()
        .map(|domain| IngressRule {
            host: Some(domain.clone()),
            http: Some(HTTPIngressRuleValue {
                paths: vec![HTTPIngressPath {
                    path: Some("/".to_string()),
                    path_type: "Prefix".to_string(),
                    backend: IngressBackend {
                        service: Some(IngressServiceBackend {
                            name: cfg.app_name.clone(),
                            port: Some(ServiceBackendPort {
                                number: Some(EXPOSURE_PORT),
                                ..Default::default()
                            }),
                        }),
                        ..Default::default()
                    },
                }],
            }),
        })
        .collect();

    let ingress = Ingress {
        metadata: ObjectMeta {
            name: Some(cfg.app_name.clone()),
            namespace: Some(effective_namespace(cfg)),
            labels: Some(app_labels(&cfg.app_name)),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(rules),
            ..Default::default()
        }),
        ..Default::default()
    };

    to_manifest("networking.k8s.io/v1", "Ingress", &ingress)
}

/// Generates all manifests for a deployment.
///
/// Workload and exposure are always present; config only when the config map
/// is non-empty; routing only when at least one domain is supplied.
pub fn generate_all(cfg: &DeploymentConfig) -> Result<BTreeMap<String, String>, GenerateError> {
    let mut manifests = BTreeMap::new();

    manifests.insert(WORKLOAD_MANIFEST.to_string(), generate_workload(cfg)?);
    manifests.insert(EXPOSURE_MANIFEST.to_string(), generate_exposure(cfg)?);

    if let Some(config_manifest) = generate_config(cfg)? {
        manifests.insert(CONFIG_MANIFEST.to_string(), config_manifest);
    }

    if !cfg.domains.is_empty() {
        manifests.insert(ROUTING_MANIFEST.to_string(), generate_routing(cfg)?);
    }

    Ok(manifests)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn validate_workload(cfg: &DeploymentConfig) -> Result<(), GenerateError> {
    if cfg.app_name.is_empty() {
        return Err(GenerateError::MissingField("app_name"));
    }
    if cfg.image.is_empty() {
        return Err(GenerateError::MissingField("image"));
    }
    if cfg.tag.is_empty() {
        return Err(GenerateError::MissingField("tag"));
    }
    Ok(())
}

fn effective_namespace(cfg: &DeploymentConfig) -> String {
    cfg.namespace
        .clone()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

fn app_labels(app_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app_name.to_string())])
}

// k8s-openapi resources do not serialize their type metadata, so it is
// injected here; the apply engine needs apiVersion/kind to route resources.
fn to_manifest<T: Serialize>(
    api_version: &str,
    kind: &str,
    resource: &T,
) -> Result<String, GenerateError> {
    let mut value = serde_yaml::to_value(resource)?;
    if let serde_yaml::Value::Mapping(map) = &mut value {
        map.insert("apiVersion".into(), api_version.into());
        map.insert("kind".into(), kind.into());
    }
    Ok(serde_yaml::to_string(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HealthCheck, ResourceHints};

    fn base_config() -> DeploymentConfig {
        DeploymentConfig {
            app_name: "shop".to_string(),
            image: "myapp".to_string(),
            tag: "v1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_workload_requires_app_image_tag() {
        for field in ["app_name", "image", "tag"] {
            let mut cfg = base_config();
            match field {
                "app_name" => cfg.app_name.clear(),
                "image" => cfg.image.clear(),
                _ => cfg.tag.clear(),
            }
            match generate_workload(&cfg) {
                Err(GenerateError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("expected MissingField({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_workload_default_substitution() {
        let manifest = generate_workload(&base_config()).unwrap();
        let deployment: Deployment = serde_yaml::from_str(&manifest).unwrap();

        assert_eq!(deployment.metadata.namespace.as_deref(), Some("default"));
        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        let container = &spec.template.spec.unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some("myapp:v1"));
        assert_eq!(container.ports.as_ref().unwrap()[0].container_port, 8080);
        // No probes or resources unless hints are supplied
        assert!(container.liveness_probe.is_none());
        assert!(container.readiness_probe.is_none());
        assert!(container.resources.is_none());
    }

    #[test]
    fn test_workload_merges_environment_and_config() {
        let mut cfg = base_config();
        cfg.environment.insert("A".to_string(), "1".to_string());
        cfg.config.insert("B".to_string(), "2".to_string());

        let manifest = generate_workload(&cfg).unwrap();
        let deployment: Deployment = serde_yaml::from_str(&manifest).unwrap();
        let container = &deployment.spec.unwrap().template.spec.unwrap().containers[0];
        let env = container.env.as_ref().unwrap();

        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"A"));
        assert!(names.contains(&"B"));
    }

    #[test]
    fn test_workload_probes_and_resources() {
        let mut cfg = base_config();
        cfg.health_check = Some(HealthCheck::default());
        cfg.resources = Some(ResourceHints::default());

        let manifest = generate_workload(&cfg).unwrap();
        let deployment: Deployment = serde_yaml::from_str(&manifest).unwrap();
        let container = deployment.spec.unwrap().template.spec.unwrap().containers[0].clone();

        let liveness = container.liveness_probe.unwrap();
        assert_eq!(liveness.initial_delay_seconds, Some(30));
        assert_eq!(liveness.period_seconds, Some(10));
        assert_eq!(liveness.http_get.unwrap().path.as_deref(), Some("/health"));

        let readiness = container.readiness_probe.unwrap();
        assert_eq!(readiness.initial_delay_seconds, Some(5));
        assert_eq!(readiness.period_seconds, Some(5));
        assert_eq!(readiness.http_get.unwrap().path.as_deref(), Some("/ready"));

        let resources = container.resources.unwrap();
        assert_eq!(resources.requests.unwrap()["cpu"].0, "100m");
        assert_eq!(resources.limits.unwrap()["memory"].0, "512Mi");
    }

    #[test]
    fn test_exposure_routes_port_80_to_container_port() {
        let mut cfg = base_config();
        cfg.container_port = Some(3000);

        let manifest = generate_exposure(&cfg).unwrap();
        let service: Service = serde_yaml::from_str(&manifest).unwrap();
        let port = &service.spec.unwrap().ports.unwrap()[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.target_port, Some(IntOrString::Int(3000)));
    }

    #[test]
    fn test_config_absent_when_map_empty() {
        assert!(generate_config(&base_config()).unwrap().is_none());
    }

    #[test]
    fn test_config_present_when_map_non_empty() {
        let mut cfg = base_config();
        cfg.config.insert("KEY".to_string(), "value".to_string());

        let manifest = generate_config(&cfg).unwrap().unwrap();
        let config_map: ConfigMap = serde_yaml::from_str(&manifest).unwrap();
        assert_eq!(config_map.metadata.name.as_deref(), Some("shop-config"));
        assert_eq!(config_map.data.unwrap()["KEY"], "value");
    }

    #[test]
    fn test_routing_requires_domains() {
        match generate_routing(&base_config()) {
            Err(GenerateError::NoDomains) => {}
            other => panic!("expected NoDomains, got {other:?}"),
        }
    }

    #[test]
    fn test_routing_one_rule_per_domain() {
        let mut cfg = base_config();
        cfg.domains = vec!["a.example.com".to_string(), "b.example.com".to_string()];

        let manifest = generate_routing(&cfg).unwrap();
        let ingress: Ingress = serde_yaml::from_str(&manifest).unwrap();
        let rules = ingress.spec.unwrap().rules.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].host.as_deref(), Some("a.example.com"));

        let path = &rules[1].http.as_ref().unwrap().paths[0];
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "shop");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(80));
    }

    #[test]
    fn test_generate_all_minimal_set() {
        let manifests = generate_all(&base_config()).unwrap();
        let keys: Vec<&str> = manifests.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec![WORKLOAD_MANIFEST, EXPOSURE_MANIFEST]);
    }

    #[test]
    fn test_generate_all_full_set() {
        let mut cfg = base_config();
        cfg.config.insert("KEY".to_string(), "value".to_string());
        cfg.domains = vec!["shop.example.com".to_string()];

        let manifests = generate_all(&cfg).unwrap();
        assert_eq!(manifests.len(), 4);
        assert!(manifests.contains_key(CONFIG_MANIFEST));
        assert!(manifests.contains_key(ROUTING_MANIFEST));
    }
}
