//! Cluster custom-resource contract for deploying helix service graphs.
//!
//! Workers never call this API; deployment tooling does.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{Error, Result};

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// API group of the deploy custom resource.
pub const API_GROUP: &str = "helix.dev";

/// API version of the deploy custom resource.
pub const API_VERSION: &str = "v1alpha1";

/// Plural resource name under the API group.
pub const RESOURCE_PLURAL: &str = "helixdeployments";

/// Environment variable naming the namespace deploy resources are managed
/// in when none is given explicitly.
pub const NAMESPACE_ENV: &str = "HELIX_DEPLOY_NAMESPACE";

static DEFAULT_NAMESPACE: &str = "default";

/// The namespace to manage deploy resources in: `HELIX_DEPLOY_NAMESPACE`
/// when set and non-empty, otherwise `default`.
#[must_use]
pub fn default_namespace() -> String {
    std::env::var(NAMESPACE_ENV)
        .ok()
        .filter(|namespace| !namespace.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

/// One environment variable entry of a deploy spec.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// Desired state of one deployed service graph.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeploySpec {
    /// Service locator the workers are launched with.
    #[serde(rename = "serviceLocator")]
    pub service_locator: String,

    /// Names of the services to run, one worker group per entry.
    #[serde(default)]
    pub services: Vec<String>,

    /// Environment applied to every launched worker.
    #[serde(default)]
    pub envs: Vec<EnvVar>,
}

/// A deploy custom resource.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeployResource {
    /// Resource name, unique within the namespace.
    pub name: String,

    /// Namespace the resource lives in.
    pub namespace: String,

    /// Resource labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Desired state.
    pub spec: DeploySpec,
}

/// CRUD surface of the cluster deploy API.
#[async_trait]
pub trait DeployApi: Send + Sync + 'static {
    /// Creates the resource.
    async fn create(&self, resource: DeployResource) -> Result<()>;

    /// Fetches the named resource.
    ///
    /// Returns [`Error::NotFound`] when it does not exist; callers check
    /// [`Error::is_not_found`] to distinguish absence from API failure.
    async fn get(&self, namespace: &str, name: &str) -> Result<DeployResource>;

    /// Lists all resources in the namespace.
    async fn list(&self, namespace: &str) -> Result<Vec<DeployResource>>;

    /// Deletes the named resource.
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_fields_use_manifest_casing() {
        let resource = DeployResource {
            name: "graph-a".to_string(),
            namespace: "default".to_string(),
            labels: BTreeMap::new(),
            spec: DeploySpec {
                service_locator: "pkgs.graph:Frontend".to_string(),
                services: vec!["Frontend".to_string(), "Planner".to_string()],
                envs: vec![EnvVar {
                    name: "HELIX_WORKER_ID".to_string(),
                    value: "1".to_string(),
                }],
            },
        };

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["spec"]["serviceLocator"], "pkgs.graph:Frontend");

        let back: DeployResource = serde_json::from_value(json).unwrap();
        assert_eq!(back, resource);
    }

    #[test]
    fn omitted_spec_lists_default_to_empty() {
        let resource: DeployResource = serde_json::from_str(
            r#"{
                "name": "graph-a",
                "namespace": "default",
                "spec": { "serviceLocator": "pkgs.graph:Frontend" }
            }"#,
        )
        .unwrap();

        assert!(resource.spec.services.is_empty());
        assert!(resource.spec.envs.is_empty());
        assert!(resource.labels.is_empty());
    }

    #[test]
    fn not_found_is_distinguishable() {
        let err = Error::NotFound {
            namespace: "default".to_string(),
            name: "graph-a".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!Error::Api("boom".to_string()).is_not_found());
    }
}
