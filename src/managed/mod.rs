//! # Managed Resources
//!
//! The generic Observe/Create/Update/Delete engine and the traits every managed kind
//! implements to plug into it.
//!
//! - `engine` - [`ManagedReconciler`], one per kind
//! - `external` - Observation results handed from Observe to the reconcile loop
//! - `store` - Persistence of annotations, finalizers, spec and status
//! - `error` - Operation-prefixed reconcile errors

use crate::constants::{CREATE_PENDING_ANNOTATION, EXTERNAL_NAME_ANNOTATION};
use crate::controller::reference::{ReferenceError, ReferenceResolver};
use crate::crd::{DeletionPolicy, ManagedStatus, ProviderConfigReference};
use async_trait::async_trait;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

pub mod engine;
pub mod error;
pub mod external;
pub mod store;

pub use engine::ManagedReconciler;
pub use error::ReconcileError;
pub use external::ExternalObservation;
pub use store::{KubeStore, ResourceStore, StoreError};

/// Observed upstream state carrying the upstream identifier
pub trait ProviderObservation {
    /// Upstream identifier, `None` until the object exists
    fn id(&self) -> Option<&str>;
}

/// Desired parameters of one managed kind (`spec.forProvider`)
#[async_trait]
pub trait ForProvider: Clone + Debug + Serialize + Send + Sync + 'static {
    type Observation: ProviderObservation + Send + Sync;

    /// Fill reference-backed fields in this in-memory copy
    async fn resolve_references(
        &mut self,
        _resolver: &ReferenceResolver,
    ) -> Result<(), ReferenceError> {
        Ok(())
    }

    /// Whether the observed object matches these parameters
    fn is_up_to_date(&self, observed: &Self::Observation) -> bool;

    /// Copy observed values into unset adoptable fields, returning whether anything changed
    fn late_initialize(&mut self, observed: &Self::Observation) -> bool;

    /// Checks that need resolved references, run before Create and Update
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A cluster-scoped custom resource converged against the upstream API
pub trait ManagedResource:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Parameters: ForProvider<Observation = Self::Observation>;
    type Observation: ProviderObservation
        + Clone
        + Debug
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Kind name used in logs, errors and metric labels
    const KIND: &'static str;

    fn for_provider(&self) -> &Self::Parameters;
    fn for_provider_mut(&mut self) -> &mut Self::Parameters;
    fn provider_config_ref(&self) -> &ProviderConfigReference;
    fn deletion_policy(&self) -> DeletionPolicy;
    fn managed_status(&self) -> Option<&ManagedStatus<Self::Observation>>;
    fn managed_status_mut(&mut self) -> &mut Option<ManagedStatus<Self::Observation>>;

    /// Upstream identifier from the external-name annotation
    fn external_name(&self) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(EXTERNAL_NAME_ANNOTATION))
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// When a Create whose outcome was never recorded started
    fn create_pending(&self) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(CREATE_PENDING_ANNOTATION))
            .map(String::as_str)
    }

    /// `status.atProvider.id`, the value other resources resolve references to
    fn upstream_id(&self) -> Option<&str> {
        self.managed_status()
            .and_then(|status| status.at_provider.as_ref())
            .and_then(ProviderObservation::id)
    }
}

macro_rules! managed_resource {
    ($kind:ty, $params:ty, $observation:ty) => {
        impl ProviderObservation for $observation {
            fn id(&self) -> Option<&str> {
                self.id.as_deref().filter(|id| !id.is_empty())
            }
        }

        impl ManagedResource for $kind {
            type Parameters = $params;
            type Observation = $observation;

            const KIND: &'static str = stringify!($kind);

            fn for_provider(&self) -> &Self::Parameters {
                &self.spec.for_provider
            }

            fn for_provider_mut(&mut self) -> &mut Self::Parameters {
                &mut self.spec.for_provider
            }

            fn provider_config_ref(&self) -> &ProviderConfigReference {
                &self.spec.provider_config_ref
            }

            fn deletion_policy(&self) -> DeletionPolicy {
                self.spec.deletion_policy
            }

            fn managed_status(&self) -> Option<&ManagedStatus<Self::Observation>> {
                self.status.as_ref()
            }

            fn managed_status_mut(&mut self) -> &mut Option<ManagedStatus<Self::Observation>> {
                &mut self.status
            }
        }
    };
}

use crate::crd::{
    LoadBalancer, LoadBalancerObservation, LoadBalancerParameters, Monitor, MonitorObservation,
    MonitorParameters, Pool, PoolObservation, PoolParameters, WorkerScript,
    WorkerScriptObservation, WorkerScriptParameters,
};

managed_resource!(Monitor, MonitorParameters, MonitorObservation);
managed_resource!(Pool, PoolParameters, PoolObservation);
managed_resource!(LoadBalancer, LoadBalancerParameters, LoadBalancerObservation);
managed_resource!(WorkerScript, WorkerScriptParameters, WorkerScriptObservation);
