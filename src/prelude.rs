//! Common imports for working with the controller library.

pub use crate::config::ControllerConfig;
pub use crate::controller::cache::{CacheKey, ResponseCache};
pub use crate::controller::reference::{ReferenceError, ReferenceResolver, ReferenceTarget};
pub use crate::controller::retry::{RetryError, RetryPolicy};
pub use crate::crd::{
    Condition, DeletionPolicy, LoadBalancer, Monitor, Pool, ProviderConfig,
    ProviderConfigReference, Reference, ScriptBinding, Selector, WorkerScript,
};
pub use crate::managed::{
    ExternalObservation, ForProvider, ManagedReconciler, ManagedResource, ReconcileError,
};
pub use crate::provider::{Connector, UpstreamClient, UpstreamError};
