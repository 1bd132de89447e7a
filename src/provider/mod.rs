//! # Provider Modules
//!
//! Upstream API access for every managed kind.
//!
//! Each kind has a client implementing [`UpstreamClient`] over the shared [`rest::RestClient`].
//! A [`Connector`] builds a client from the credentials resolved by a
//! [`config::ConfigResolver`].

use crate::controller::retry::{is_rate_limit_error, RateLimitClassify};
use async_trait::async_trait;
use thiserror::Error;

pub mod config;
pub mod load_balancer;
pub mod monitor;
pub mod pool;
pub mod rest;
pub mod worker_script;

pub use config::{ConfigError, ConfigResolver, KubeConfigResolver, ProviderCredentials};
pub use load_balancer::LoadBalancerClient;
pub use monitor::MonitorClient;
pub use pool::PoolClient;
pub use rest::{RestClient, RestConnector};
pub use worker_script::WorkerScriptClient;

/// Errors returned by upstream clients
///
/// `NotFound` and `RateLimited` are the two classes the engine acts on. Everything else is
/// surfaced to the scheduler.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limit exceeded (429 Too Many Requests): {0}")]
    RateLimited(String),
    #[error("upstream API error on {path} (status {status}): {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

impl RateLimitClassify for UpstreamError {
    /// Paths and identifiers are excluded from the text check
    fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Api { status, message, .. } => *status == 429 || is_rate_limit_error(message),
            Self::NotFound(_) | Self::Transport(_) | Self::Decode(_) => false,
        }
    }
}

/// Create/Get/Update/Delete/List against the remote API for one resource kind
///
/// `id` is the upstream identifier recorded in the external-name annotation. Parameters are
/// always the full desired set; updates replace rather than patch.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    type Parameters: Send + Sync;
    type Observation: Send + Sync;

    async fn create(&self, params: &Self::Parameters) -> Result<Self::Observation, UpstreamError>;

    async fn get(
        &self,
        id: &str,
        params: &Self::Parameters,
    ) -> Result<Self::Observation, UpstreamError>;

    async fn update(
        &self,
        id: &str,
        params: &Self::Parameters,
    ) -> Result<Self::Observation, UpstreamError>;

    async fn delete(&self, id: &str, params: &Self::Parameters) -> Result<(), UpstreamError>;

    async fn list(&self, params: &Self::Parameters)
        -> Result<Vec<Self::Observation>, UpstreamError>;
}

/// Builds an upstream client from resolved credentials
pub trait Connector: Send + Sync {
    type Client: UpstreamClient;

    fn connect(&self, credentials: &ProviderCredentials) -> Result<Self::Client, UpstreamError>;
}
