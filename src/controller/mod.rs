//! # Controller
//!
//! Building blocks of the reconcile loop and the per-kind rules plugged into it.
//!
//! - `cache`: short-TTL memo of upstream reads
//! - `retry`: rate-limit retry with exponential back-off and jitter
//! - `reference`: cross-resource reference resolution
//! - `diff`: adopt/enforce field comparison helpers
//! - `backoff`: Fibonacci requeue delays after failed reconciles
//! - `monitor`, `pool`, `load_balancer`, `worker_script`: diff, late-init, reference and
//!   validation rules for each kind

pub mod backoff;
pub mod cache;
pub mod diff;
pub mod reference;
pub mod retry;

mod load_balancer;
mod monitor;
mod pool;
mod worker_script;
