//! # WorkerScript
//!
//! Account scoped edge script and its bindings.

use crate::crd::common::{DeletionPolicy, ManagedStatus, ProviderConfigReference};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// WorkerScript Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: edge.octopilot.io/v1alpha1
/// kind: WorkerScript
/// metadata:
///   name: redirector
/// spec:
///   forProvider:
///     accountId: 0123456789abcdef
///     scriptName: redirector
///     content: |
///       export default { fetch() { return Response.redirect("https://example.com") } }
///     bindings:
///       - type: PlainText
///         name: TARGET
///         text: https://example.com
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "WorkerScript",
    group = "edge.octopilot.io",
    version = "v1alpha1",
    status = "WorkerScriptStatus",
    shortname = "edgews",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.edge\\.octopilot\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WorkerScriptSpec {
    pub for_provider: WorkerScriptParameters,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// A resource made available to the script under `name`
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ScriptBinding {
    /// Plain text environment value
    PlainText { name: String, text: String },
    /// Key-value namespace
    KvNamespace { name: String, namespace_id: String },
    /// Another script, optionally pinned to an environment
    Service {
        name: String,
        service: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<String>,
    },
    /// Object storage bucket
    R2Bucket { name: String, bucket_name: String },
}

impl ScriptBinding {
    /// Variable name the binding is exposed under
    pub fn name(&self) -> &str {
        match self {
            Self::PlainText { name, .. }
            | Self::KvNamespace { name, .. }
            | Self::Service { name, .. }
            | Self::R2Bucket { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerScriptParameters {
    pub account_id: String,
    /// Script name, also the upstream identifier
    pub script_name: String,
    /// ES module source
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Vec<ScriptBinding>>,
    /// Runtime compatibility date (YYYY-MM-DD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_date: Option<String>,
    /// bundled, unbound or standard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logpush: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerScriptObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Hex SHA-256 of the deployed source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Vec<ScriptBinding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logpush: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<String>,
}

pub type WorkerScriptStatus = ManagedStatus<WorkerScriptObservation>;
