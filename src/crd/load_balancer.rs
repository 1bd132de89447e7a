//! # LoadBalancer
//!
//! Zone scoped load-balanced hostname. Default pools form an ordered failover list and the
//! fallback pool serves when every default pool is unhealthy. Both can be set inline, by
//! reference to `Pool` resources or by label selector.

use crate::crd::common::{DeletionPolicy, ManagedStatus, ProviderConfigReference, Reference, Selector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// LoadBalancer Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: edge.octopilot.io/v1alpha1
/// kind: LoadBalancer
/// metadata:
///   name: www
/// spec:
///   forProvider:
///     zoneId: 9a7806061c88ada191ed06f989cc3dac
///     name: www.example.com
///     defaultPoolSelector:
///       matchLabels:
///         site: www
///     fallbackPoolRef:
///       name: eu-origins
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "LoadBalancer",
    group = "edge.octopilot.io",
    version = "v1alpha1",
    status = "LoadBalancerStatus",
    shortname = "edgelb",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.edge\\.octopilot\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    pub for_provider: LoadBalancerParameters,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerParameters {
    /// Zone the hostname belongs to
    pub zone_id: String,
    /// DNS hostname served by the load balancer
    pub name: String,
    /// Pool IDs in failover order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pool_refs: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pool_selector: Option<Selector>,
    /// Pool ID used when every default pool is unhealthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_pool_ref: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_pool_selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// DNS TTL in seconds, only used when not proxied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// off, geo, dynamic_latency, random, proximity, least_outstanding_requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steering_policy: Option<String>,
    /// none, cookie, ip_cookie, header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<String>,
    /// Region code to pool IDs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_pools: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steering_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_pools: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<String>,
}

pub type LoadBalancerStatus = ManagedStatus<LoadBalancerObservation>;
