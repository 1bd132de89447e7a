//! # ProviderConfig
//!
//! Cluster-scoped credentials for the upstream API, referenced by every managed resource
//! through `spec.providerConfigRef`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: edge.octopilot.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: edge-system
///       name: edge-api-token
///       key: token
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "edge.octopilot.io",
    version = "v1alpha1",
    shortname = "edgepc"
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    pub credentials: CredentialsSource,
    /// Base URL of the upstream API, overrides the controller default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Where the API token comes from
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "source", rename_all_fields = "camelCase")]
pub enum CredentialsSource {
    /// A key of a Kubernetes Secret
    Secret { secret_ref: SecretKeySelector },
    /// An environment variable of the controller process
    Environment { variable: String },
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    pub namespace: String,
    pub name: String,
    pub key: String,
}
