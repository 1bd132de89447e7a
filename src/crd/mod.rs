//! # Custom Resource Definitions
//!
//! CRD types for every managed kind plus `ProviderConfig`.
//!
//! ## Module Structure
//!
//! - `common.rs` - References, selectors, conditions and the status envelope
//! - `monitor.rs` - Health check monitors
//! - `pool.rs` - Origin pools
//! - `load_balancer.rs` - Load-balanced hostnames
//! - `worker_script.rs` - Edge scripts and their bindings
//! - `provider_config.rs` - Upstream credentials

mod common;
mod load_balancer;
mod monitor;
mod pool;
mod provider_config;
mod worker_script;

pub use common::{
    Condition, DeletionPolicy, ManagedStatus, ProviderConfigReference, Reference, Selector,
    CONDITION_READY, CONDITION_SYNCED,
};
pub use load_balancer::{
    LoadBalancer, LoadBalancerObservation, LoadBalancerParameters, LoadBalancerSpec,
    LoadBalancerStatus,
};
pub use monitor::{Monitor, MonitorObservation, MonitorParameters, MonitorSpec, MonitorStatus};
pub use pool::{Pool, PoolObservation, PoolOrigin, PoolParameters, PoolSpec, PoolStatus};
pub use provider_config::{CredentialsSource, ProviderConfig, ProviderConfigSpec, SecretKeySelector};
pub use worker_script::{
    ScriptBinding, WorkerScript, WorkerScriptObservation, WorkerScriptParameters,
    WorkerScriptSpec, WorkerScriptStatus,
};
