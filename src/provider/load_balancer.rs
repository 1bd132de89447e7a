//! Load balancer client
//!
//! Load balancers are zone scoped: `zones/{zone}/load_balancers`.

use crate::crd::{LoadBalancerObservation, LoadBalancerParameters};
use crate::provider::{RestClient, UpstreamClient, UpstreamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LoadBalancerWire {
    #[serde(default, skip_serializing)]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_pools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    steering_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_affinity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    region_pools: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing)]
    created_on: Option<String>,
    #[serde(default, skip_serializing)]
    modified_on: Option<String>,
}

impl From<&LoadBalancerParameters> for LoadBalancerWire {
    fn from(params: &LoadBalancerParameters) -> Self {
        Self {
            name: Some(params.name.clone()),
            default_pools: params.default_pools.clone(),
            fallback_pool: params.fallback_pool.clone(),
            description: params.description.clone(),
            ttl: params.ttl,
            proxied: params.proxied,
            enabled: params.enabled,
            steering_policy: params.steering_policy.clone(),
            session_affinity: params.session_affinity.clone(),
            region_pools: params.region_pools.clone(),
            ..Self::default()
        }
    }
}

impl From<LoadBalancerWire> for LoadBalancerObservation {
    fn from(wire: LoadBalancerWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            default_pools: wire.default_pools,
            fallback_pool: wire.fallback_pool,
            description: wire.description,
            ttl: wire.ttl,
            proxied: wire.proxied,
            enabled: wire.enabled,
            steering_policy: wire.steering_policy,
            session_affinity: wire.session_affinity,
            region_pools: wire.region_pools,
            created_on: wire.created_on,
            modified_on: wire.modified_on,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadBalancerClient {
    rest: RestClient,
}

impl LoadBalancerClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    fn collection(zone_id: &str) -> String {
        format!("zones/{zone_id}/load_balancers")
    }
}

#[async_trait]
impl UpstreamClient for LoadBalancerClient {
    type Parameters = LoadBalancerParameters;
    type Observation = LoadBalancerObservation;

    async fn create(
        &self,
        params: &LoadBalancerParameters,
    ) -> Result<LoadBalancerObservation, UpstreamError> {
        let wire: LoadBalancerWire = self
            .rest
            .post(&Self::collection(&params.zone_id), &LoadBalancerWire::from(params))
            .await?;
        Ok(wire.into())
    }

    async fn get(
        &self,
        id: &str,
        params: &LoadBalancerParameters,
    ) -> Result<LoadBalancerObservation, UpstreamError> {
        let wire: LoadBalancerWire = self
            .rest
            .get(&format!("{}/{id}", Self::collection(&params.zone_id)))
            .await?;
        Ok(wire.into())
    }

    async fn update(
        &self,
        id: &str,
        params: &LoadBalancerParameters,
    ) -> Result<LoadBalancerObservation, UpstreamError> {
        let wire: LoadBalancerWire = self
            .rest
            .put(
                &format!("{}/{id}", Self::collection(&params.zone_id)),
                &LoadBalancerWire::from(params),
            )
            .await?;
        Ok(wire.into())
    }

    async fn delete(&self, id: &str, params: &LoadBalancerParameters) -> Result<(), UpstreamError> {
        self.rest
            .delete(&format!("{}/{id}", Self::collection(&params.zone_id)))
            .await
    }

    async fn list(
        &self,
        params: &LoadBalancerParameters,
    ) -> Result<Vec<LoadBalancerObservation>, UpstreamError> {
        let wires: Vec<LoadBalancerWire> =
            self.rest.list(&Self::collection(&params.zone_id)).await?;
        Ok(wires.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_uses_snake_case() {
        let params = LoadBalancerParameters {
            zone_id: "zone".to_string(),
            name: "lb.example.com".to_string(),
            default_pools: Some(vec!["p1".to_string()]),
            fallback_pool: Some("p1".to_string()),
            steering_policy: Some("geo".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(LoadBalancerWire::from(&params)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "lb.example.com",
                "default_pools": ["p1"],
                "fallback_pool": "p1",
                "steering_policy": "geo"
            })
        );
    }
}
