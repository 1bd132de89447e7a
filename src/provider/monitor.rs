//! Monitor client
//!
//! - POST   accounts/{account}/load_balancers/monitors
//! - GET    accounts/{account}/load_balancers/monitors/{id}
//! - PUT    accounts/{account}/load_balancers/monitors/{id}
//! - DELETE accounts/{account}/load_balancers/monitors/{id}
//! - GET    accounts/{account}/load_balancers/monitors

use crate::crd::{MonitorObservation, MonitorParameters};
use crate::provider::{RestClient, UpstreamClient, UpstreamError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire representation, shared by requests and responses
#[derive(Debug, Default, Serialize, Deserialize)]
struct MonitorWire {
    #[serde(default, skip_serializing)]
    id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_codes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    follow_redirects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_insecure: Option<bool>,
    #[serde(default, skip_serializing)]
    created_on: Option<String>,
    #[serde(default, skip_serializing)]
    modified_on: Option<String>,
}

impl From<&MonitorParameters> for MonitorWire {
    fn from(params: &MonitorParameters) -> Self {
        Self {
            kind: params.r#type.clone(),
            description: params.description.clone(),
            method: params.method.clone(),
            path: params.path.clone(),
            header: params.header.clone(),
            port: params.port,
            timeout: params.timeout,
            retries: params.retries,
            interval: params.interval,
            expected_body: params.expected_body.clone(),
            expected_codes: params.expected_codes.clone(),
            follow_redirects: params.follow_redirects,
            allow_insecure: params.allow_insecure,
            ..Self::default()
        }
    }
}

impl From<MonitorWire> for MonitorObservation {
    fn from(wire: MonitorWire) -> Self {
        Self {
            id: wire.id,
            r#type: wire.kind,
            description: wire.description,
            method: wire.method,
            path: wire.path,
            header: wire.header,
            port: wire.port,
            timeout: wire.timeout,
            retries: wire.retries,
            interval: wire.interval,
            expected_body: wire.expected_body,
            expected_codes: wire.expected_codes,
            follow_redirects: wire.follow_redirects,
            allow_insecure: wire.allow_insecure,
            created_on: wire.created_on,
            modified_on: wire.modified_on,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorClient {
    rest: RestClient,
}

impl MonitorClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    fn collection(account_id: &str) -> String {
        format!("accounts/{account_id}/load_balancers/monitors")
    }
}

#[async_trait]
impl UpstreamClient for MonitorClient {
    type Parameters = MonitorParameters;
    type Observation = MonitorObservation;

    async fn create(&self, params: &MonitorParameters) -> Result<MonitorObservation, UpstreamError> {
        let wire: MonitorWire = self
            .rest
            .post(&Self::collection(&params.account_id), &MonitorWire::from(params))
            .await?;
        Ok(wire.into())
    }

    async fn get(
        &self,
        id: &str,
        params: &MonitorParameters,
    ) -> Result<MonitorObservation, UpstreamError> {
        let wire: MonitorWire = self
            .rest
            .get(&format!("{}/{id}", Self::collection(&params.account_id)))
            .await?;
        Ok(wire.into())
    }

    async fn update(
        &self,
        id: &str,
        params: &MonitorParameters,
    ) -> Result<MonitorObservation, UpstreamError> {
        let wire: MonitorWire = self
            .rest
            .put(
                &format!("{}/{id}", Self::collection(&params.account_id)),
                &MonitorWire::from(params),
            )
            .await?;
        Ok(wire.into())
    }

    async fn delete(&self, id: &str, params: &MonitorParameters) -> Result<(), UpstreamError> {
        self.rest
            .delete(&format!("{}/{id}", Self::collection(&params.account_id)))
            .await
    }

    async fn list(
        &self,
        params: &MonitorParameters,
    ) -> Result<Vec<MonitorObservation>, UpstreamError> {
        let wires: Vec<MonitorWire> = self
            .rest
            .list(&Self::collection(&params.account_id))
            .await?;
        Ok(wires.into_iter().map(Into::into).collect())
    }
}
