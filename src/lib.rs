//! Edge Provider Controller Library
//!
//! Reconciles declared edge load-balancing resources (monitors, pools, load balancers and
//! worker scripts) against a remote, rate-limited, eventually-consistent provider API.
//!
//! ## Quick Start
//!
//! ```rust
//! use edge_provider_controller::prelude::*;
//! ```
//!
//! ## Module Structure
//!
//! - `crd` - Custom resource types for every managed kind and `ProviderConfig`
//! - `managed` - The generic Observe/Create/Update/Delete engine
//! - `controller` - Response cache, rate-limit retry, reference resolution, diff helpers
//!   and the per-kind diff/reference logic
//! - `provider` - Upstream API clients, credential resolution and error taxonomy
//! - `runtime` - Controller registry, error policy, probes and initialization
//! - `observability` - Prometheus metrics

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod managed;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
