//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config::ControllerConfig`]).

/// API group for every custom resource owned by this controller
pub const API_GROUP: &str = "edge.octopilot.io";

/// Annotation holding the upstream identifier of a managed resource
pub const EXTERNAL_NAME_ANNOTATION: &str = "edge.octopilot.io/external-name";

/// Annotation set (to an RFC 3339 timestamp) while an upstream Create is in flight
///
/// Left behind when the outcome of a Create could not be recorded. While it is set and no
/// external-name exists, the engine refuses to create again.
pub const CREATE_PENDING_ANNOTATION: &str = "edge.octopilot.io/external-create-pending";

/// Finalizer guarding upstream deletion
pub const FINALIZER: &str = "edge.octopilot.io/finalizer";

/// Field manager used for server-side patches
pub const FIELD_MANAGER: &str = "edge-provider-controller";

/// Name of the `ProviderConfig` used when a resource does not set `providerConfigRef`
pub const DEFAULT_PROVIDER_CONFIG_NAME: &str = "default";

/// Default upstream API endpoint
pub const DEFAULT_UPSTREAM_ENDPOINT: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default response cache TTL (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

/// Default number of retries for rate-limited upstream calls
pub const DEFAULT_RATE_LIMIT_MAX_RETRIES: u32 = 3;

/// Default base delay for rate-limit back-off (milliseconds)
pub const DEFAULT_RATE_LIMIT_BASE_DELAY_MS: u64 = 1000;

/// Fraction of the back-off delay applied as random jitter in either direction
pub const RATE_LIMIT_JITTER_FRACTION: f64 = 0.10;

/// Default upper bound on concurrent reconciles of one resource kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 10;

/// Default interval between reconciles of a converged resource (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default deadline for a single reconcile tick (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

/// Error back-off bounds for the scheduler (minutes)
pub const ERROR_BACKOFF_MIN_MINUTES: u64 = 1;
pub const ERROR_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default delay before restarting a controller stream that ended (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
