//! # Reconcile Errors
//!
//! Every failure of a reconcile tick, prefixed with the operation that failed so the
//! Synced condition and logs say where it happened.

use crate::controller::reference::ReferenceError;
use crate::controller::retry::RetryError;
use crate::managed::store::StoreError;
use crate::provider::{ConfigError, UpstreamError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cannot resolve references of {kind} {name}: {source}")]
    ResolveReferences {
        kind: &'static str,
        name: String,
        #[source]
        source: ReferenceError,
    },
    #[error("cannot get provider config for {kind} {name}: {source}")]
    ProviderConfig {
        kind: &'static str,
        name: String,
        #[source]
        source: ConfigError,
    },
    #[error("cannot connect to upstream API for {kind} {name}: {source}")]
    Connect {
        kind: &'static str,
        name: String,
        #[source]
        source: UpstreamError,
    },
    #[error("cannot observe {kind} {name}: {source}")]
    Observe {
        kind: &'static str,
        name: String,
        #[source]
        source: RetryError<UpstreamError>,
    },
    #[error("cannot create {kind} {name}: {source}")]
    Create {
        kind: &'static str,
        name: String,
        #[source]
        source: RetryError<UpstreamError>,
    },
    #[error("cannot update {kind} {name}: {source}")]
    Update {
        kind: &'static str,
        name: String,
        #[source]
        source: RetryError<UpstreamError>,
    },
    #[error("cannot delete {kind} {name}: {source}")]
    Delete {
        kind: &'static str,
        name: String,
        #[source]
        source: RetryError<UpstreamError>,
    },
    #[error(
        "cannot create {kind} {name}: a create started at {since} may have succeeded without \
         recording its external-name; remove annotation {annotation} once no duplicate exists"
    )]
    CreatePending {
        kind: &'static str,
        name: String,
        since: String,
        annotation: &'static str,
    },
    #[error("invalid {kind} {name}: {message}")]
    Validation {
        kind: &'static str,
        name: String,
        message: String,
    },
    #[error("cannot {what} for {kind} {name}: {source}")]
    Store {
        what: &'static str,
        kind: &'static str,
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("reconcile of {kind} {name} timed out after {timeout:?}")]
    Timeout {
        kind: &'static str,
        name: String,
        timeout: Duration,
    },
}

impl ReconcileError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ResolveReferences { source, .. } => match source {
                ReferenceError::DependencyNotReady { .. } => "dependency_not_ready",
                _ => "references",
            },
            Self::ProviderConfig { .. } => "provider_config",
            Self::Connect { .. } => "connect",
            Self::Observe { source, .. }
            | Self::Create { source, .. }
            | Self::Update { source, .. }
            | Self::Delete { source, .. } => match source {
                RetryError::MaxRetriesExceeded { .. } => "max_retries_exceeded",
                RetryError::Cancelled { .. } => "cancelled",
                RetryError::Failed(_) => "upstream",
            },
            Self::CreatePending { .. } => "create_pending",
            Self::Validation { .. } => "validation",
            Self::Store { .. } => "store",
            Self::Timeout { .. } => "timeout",
        }
    }
}
