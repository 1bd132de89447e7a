//! Pool client
//!
//! Pools live under `accounts/{account}/load_balancers/pools`.

use crate::crd::{PoolObservation, PoolOrigin, PoolParameters};
use crate::provider::{RestClient, UpstreamClient, UpstreamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PoolWire {
    #[serde(default, skip_serializing)]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    origins: Vec<PoolOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_origins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    monitor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    check_regions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification_email: Option<String>,
    #[serde(default, skip_serializing)]
    created_on: Option<String>,
    #[serde(default, skip_serializing)]
    modified_on: Option<String>,
}

impl From<&PoolParameters> for PoolWire {
    fn from(params: &PoolParameters) -> Self {
        Self {
            name: Some(params.name.clone()),
            origins: params.origins.clone(),
            description: params.description.clone(),
            enabled: params.enabled,
            minimum_origins: params.minimum_origins,
            monitor: params.monitor.clone(),
            check_regions: params.check_regions.clone(),
            notification_email: params.notification_email.clone(),
            ..Self::default()
        }
    }
}

impl From<PoolWire> for PoolObservation {
    fn from(wire: PoolWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            origins: wire.origins,
            description: wire.description,
            enabled: wire.enabled,
            minimum_origins: wire.minimum_origins,
            monitor: wire.monitor,
            check_regions: wire.check_regions,
            notification_email: wire.notification_email,
            created_on: wire.created_on,
            modified_on: wire.modified_on,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolClient {
    rest: RestClient,
}

impl PoolClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    fn collection(account_id: &str) -> String {
        format!("accounts/{account_id}/load_balancers/pools")
    }
}

#[async_trait]
impl UpstreamClient for PoolClient {
    type Parameters = PoolParameters;
    type Observation = PoolObservation;

    async fn create(&self, params: &PoolParameters) -> Result<PoolObservation, UpstreamError> {
        let wire: PoolWire = self
            .rest
            .post(&Self::collection(&params.account_id), &PoolWire::from(params))
            .await?;
        Ok(wire.into())
    }

    async fn get(&self, id: &str, params: &PoolParameters) -> Result<PoolObservation, UpstreamError> {
        let wire: PoolWire = self
            .rest
            .get(&format!("{}/{id}", Self::collection(&params.account_id)))
            .await?;
        Ok(wire.into())
    }

    async fn update(
        &self,
        id: &str,
        params: &PoolParameters,
    ) -> Result<PoolObservation, UpstreamError> {
        let wire: PoolWire = self
            .rest
            .put(
                &format!("{}/{id}", Self::collection(&params.account_id)),
                &PoolWire::from(params),
            )
            .await?;
        Ok(wire.into())
    }

    async fn delete(&self, id: &str, params: &PoolParameters) -> Result<(), UpstreamError> {
        self.rest
            .delete(&format!("{}/{id}", Self::collection(&params.account_id)))
            .await
    }

    async fn list(&self, params: &PoolParameters) -> Result<Vec<PoolObservation>, UpstreamError> {
        let wires: Vec<PoolWire> = self.rest.list(&Self::collection(&params.account_id)).await?;
        Ok(wires.into_iter().map(Into::into).collect())
    }
}
