//! Cluster apply engine
//!
//! Given generated manifests and a decrypted cluster credential: ensure the
//! target namespace, create-or-update each resource, and poll until the
//! workload reports the desired ready-replica count or a timeout elapses.
//!
//! A deployment either fully succeeds or is reported failed; no
//! partial-success state is surfaced even if some manifests were applied
//! before the failing step.

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DynamicObject, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Client, Config, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ApplyError;

/// How often the readiness wait polls the workload status
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Hard cap on the readiness wait
pub const READY_TIMEOUT: Duration = Duration::from_secs(300);

/// Builds a cluster client from decrypted kubeconfig bytes.
///
/// Malformed content is a fatal, job-failing error; it is never retried.
pub async fn client_from_kubeconfig(kubeconfig: &[u8]) -> Result<Client, ApplyError> {
    let parsed: Kubeconfig = serde_yaml::from_slice(kubeconfig)
        .map_err(|e| ApplyError::InvalidCredential(format!("not a kubeconfig: {e}")))?;

    let config = Config::from_custom_kubeconfig(parsed, &KubeConfigOptions::default())
        .await
        .map_err(|e| ApplyError::InvalidCredential(format!("unusable kubeconfig: {e}")))?;

    Ok(Client::try_from(config)?)
}

/// Ensures the target namespace exists.
///
/// Idempotent: an existing namespace is a no-op, and a concurrent create
/// racing this one (409) is tolerated.
pub async fn ensure_namespace(client: &Client, name: &str) -> Result<(), ApplyError> {
    let api: Api<Namespace> = Api::all(client.clone());

    match api.get(name).await {
        Ok(_) => {
            debug!(namespace = %name, "namespace already exists");
            return Ok(());
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => {}
        Err(e) => return Err(e.into()),
    }

    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(std::collections::BTreeMap::from([(
                "app.kubernetes.io/managed-by".to_string(),
                "gantry".to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    };

    match api.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            info!(namespace = %name, "namespace created");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            debug!(namespace = %name, "namespace created concurrently");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Applies each named manifest to the namespace, create-or-update.
///
/// An update replaces the object rather than merging. A failure of both
/// create and update is fatal for the deployment attempt.
pub async fn apply_manifests(
    client: &Client,
    namespace: &str,
    manifests: &BTreeMap<String, String>,
) -> Result<(), ApplyError> {
    for (manifest_name, manifest) in manifests {
        apply_manifest(client, namespace, manifest_name, manifest).await?;
    }
    Ok(())
}

async fn apply_manifest(
    client: &Client,
    namespace: &str,
    manifest_name: &str,
    manifest: &str,
) -> Result<(), ApplyError> {
    let mut object: DynamicObject =
        serde_yaml::from_str(manifest).map_err(|e| ApplyError::InvalidManifest {
            name: manifest_name.to_string(),
            reason: e.to_string(),
        })?;

    let types = object
        .types
        .clone()
        .ok_or_else(|| ApplyError::InvalidManifest {
            name: manifest_name.to_string(),
            reason: "missing apiVersion/kind".to_string(),
        })?;

    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), types.api_version.clone()),
    };
    let gvk = GroupVersionKind::gvk(&group, &version, &types.kind);
    let resource = ApiResource::from_gvk_with_plural(&gvk, &collection_for_kind(&types.kind));

    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, &resource);
    let name = object.name_any();

    match api.create(&PostParams::default(), &object).await {
        Ok(_) => {
            info!(manifest = %manifest_name, resource = %name, "resource created");
            Ok(())
        }
        Err(create_err) => {
            // Create-or-update: fetch the live object for its resourceVersion
            // and replace it wholesale.
            debug!(
                manifest = %manifest_name,
                error = %create_err,
                "create failed, attempting update"
            );

            let update_result = async {
                let existing = api.get(&name).await?;
                object.metadata.resource_version = existing.metadata.resource_version.clone();
                api.replace(&name, &PostParams::default(), &object).await
            }
            .await;

            match update_result {
                Ok(_) => {
                    info!(manifest = %manifest_name, resource = %name, "resource updated");
                    Ok(())
                }
                Err(update_err) => Err(ApplyError::CreateOrUpdateFailed {
                    name: manifest_name.to_string(),
                    create: create_err.to_string(),
                    update: update_err.to_string(),
                }),
            }
        }
    }
}

/// Polls the workload status until the ready-replica count matches the
/// desired count, the timeout elapses, or shutdown is signalled.
pub async fn wait_for_workload_ready(
    client: &Client,
    namespace: &str,
    name: &str,
    desired: i32,
    shutdown: &CancellationToken,
) -> Result<(), ApplyError> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let started = tokio::time::Instant::now();
    let mut last_ready = 0;

    loop {
        if shutdown.is_cancelled() {
            return Err(ApplyError::Cancelled);
        }

        match api.get(name).await {
            Ok(deployment) => {
                last_ready = deployment
                    .status
                    .as_ref()
                    .and_then(|s| s.ready_replicas)
                    .unwrap_or(0);

                if last_ready >= desired {
                    info!(
                        workload = %name,
                        ready = last_ready,
                        desired,
                        "workload ready"
                    );
                    return Ok(());
                }

                debug!(workload = %name, ready = last_ready, desired, "waiting for workload");
            }
            // The workload may not be observable immediately after apply
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(workload = %name, "workload not visible yet");
            }
            Err(e) => return Err(e.into()),
        }

        if started.elapsed() >= READY_TIMEOUT {
            return Err(ApplyError::ReadyTimeout {
                name: name.to_string(),
                waited_secs: started.elapsed().as_secs(),
                ready: last_ready,
                desired,
            });
        }

        tokio::select! {
            _ = tokio::time::sleep(READY_POLL_INTERVAL) => {}
            _ = shutdown.cancelled() => return Err(ApplyError::Cancelled),
        }
    }
}

/// Full apply protocol: ensure namespace, apply manifests, wait for the
/// workload to become ready.
pub async fn deploy(
    client: &Client,
    namespace: &str,
    workload_name: &str,
    desired_replicas: i32,
    manifests: &BTreeMap<String, String>,
    shutdown: &CancellationToken,
) -> Result<(), ApplyError> {
    ensure_namespace(client, namespace).await?;
    apply_manifests(client, namespace, manifests).await?;
    wait_for_workload_ready(client, namespace, workload_name, desired_replicas, shutdown).await
}

// =============================================================================
// Helper Functions
// =============================================================================

// Kind -> collection mapping for the resources the generator emits; anything
// else falls back to naive pluralization.
fn collection_for_kind(kind: &str) -> String {
    match kind {
        "Deployment" => "deployments".to_string(),
        "Service" => "services".to_string(),
        "ConfigMap" => "configmaps".to_string(),
        "Ingress" => "ingresses".to_string(),
        other => {
            warn!(kind = %other, "unknown kind, using naive pluralization");
            format!("{}s", other.to_ascii_lowercase())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_for_known_kinds() {
        assert_eq!(collection_for_kind("Deployment"), "deployments");
        assert_eq!(collection_for_kind("Service"), "services");
        assert_eq!(collection_for_kind("ConfigMap"), "configmaps");
        assert_eq!(collection_for_kind("Ingress"), "ingresses");
    }

    #[test]
    fn test_collection_for_unknown_kind_pluralizes() {
        assert_eq!(collection_for_kind("Widget"), "widgets");
    }

    #[tokio::test]
    async fn test_ready_wait_aborts_on_shutdown_without_touching_cluster() {
        // The cluster URL is unreachable; a cancelled token must win before
        // any request is attempted.
        let config = Config::new("http://127.0.0.1:1".parse().unwrap());
        let client = Client::try_from(config).unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = wait_for_workload_ready(&client, "default", "shop", 1, &shutdown).await;
        assert!(matches!(result, Err(ApplyError::Cancelled)));
    }

    #[test]
    fn test_generated_manifests_parse_as_dynamic_objects() {
        let cfg = crate::config::DeploymentConfig {
            app_name: "shop".to_string(),
            image: "myapp".to_string(),
            tag: "v1".to_string(),
            domains: vec!["shop.example.com".to_string()],
            ..Default::default()
        };
        let manifests = crate::generator::generate_all(&cfg).unwrap();

        for (name, manifest) in &manifests {
            let object: DynamicObject = serde_yaml::from_str(manifest)
                .unwrap_or_else(|e| panic!("manifest {name} is not a valid object: {e}"));
            assert!(object.types.is_some(), "manifest {name} lacks type metadata");
            assert_eq!(object.metadata.namespace.as_deref(), Some("default"));
        }
    }
}
