//! # Runtime
//!
//! Process wiring around the reconcile engine.
//!
//! - `registry` - [`ControllerRegistry`], one `kube_runtime::Controller` per kind
//! - `error_policy` - Per-resource Fibonacci requeue back-off
//! - `server` - `/metrics`, `/healthz` and `/readyz`
//! - `initialization` - Crypto provider, logging, metrics and client start-up

pub mod error_policy;
pub mod initialization;
pub mod registry;
pub mod server;

pub use registry::ControllerRegistry;
pub use server::{start_server, ServerState};
