//! # Pool
//!
//! Account scoped origin pool. The health monitor can be given inline, by reference to a
//! `Monitor` or by label selector over `Monitor` resources.

use crate::crd::common::{DeletionPolicy, ManagedStatus, ProviderConfigReference, Reference, Selector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pool Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: edge.octopilot.io/v1alpha1
/// kind: Pool
/// metadata:
///   name: eu-origins
/// spec:
///   forProvider:
///     accountId: 0123456789abcdef
///     name: eu-origins
///     origins:
///       - name: eu-1
///         address: 203.0.113.10
///     monitorRef:
///       name: http-health
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Pool",
    group = "edge.octopilot.io",
    version = "v1alpha1",
    status = "PoolStatus",
    shortname = "edgepool",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.edge\\.octopilot\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PoolSpec {
    pub for_provider: PoolParameters,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// A single origin server inside a pool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolOrigin {
    pub name: String,
    /// IP address or hostname
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Relative traffic weight between 0 and 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolParameters {
    pub account_id: String,
    /// Pool name, unique within the account
    pub name: String,
    #[serde(default)]
    pub origins: Vec<PoolOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Healthy origins required for the pool to serve traffic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_origins: Option<u32>,
    /// Monitor ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,
    /// Monitor resource supplying `monitor`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_ref: Option<Reference>,
    /// Selects a ready Monitor resource supplying `monitor`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_selector: Option<Selector>,
    /// Regions health checks run from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_regions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub origins: Vec<PoolOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_origins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_regions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<String>,
}

pub type PoolStatus = ManagedStatus<PoolObservation>;
