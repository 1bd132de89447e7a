//! # Declared-State Store
//!
//! Persistence for everything the engine writes back: the external-name and
//! create-pending annotations, finalizers, late-initialized `spec.forProvider` and status.

use crate::constants::{CREATE_PENDING_ANNOTATION, EXTERNAL_NAME_ANNOTATION, FIELD_MANAGER};
use crate::crd::ManagedStatus;
use crate::managed::ManagedResource;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("failed to serialize patch: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("resource {0} not found")]
    NotFound(String),
}

/// Write access to managed resources of one kind
#[async_trait]
pub trait ResourceStore<K: ManagedResource>: Send + Sync {
    /// Set or (with `None`) remove the external-name annotation
    async fn set_external_name(&self, name: &str, external_name: Option<&str>)
        -> Result<(), StoreError>;

    /// Set or (with `None`) remove the create-pending annotation
    async fn set_create_pending(&self, name: &str, since: Option<&str>) -> Result<(), StoreError>;

    /// Replace the finalizer list
    async fn set_finalizers(&self, name: &str, finalizers: Vec<String>) -> Result<(), StoreError>;

    /// Merge late-initialized parameters into `spec.forProvider`
    async fn patch_for_provider(&self, name: &str, params: &K::Parameters)
        -> Result<(), StoreError>;

    async fn patch_status(
        &self,
        name: &str,
        status: &ManagedStatus<K::Observation>,
    ) -> Result<(), StoreError>;
}

/// [`ResourceStore`] over the Kubernetes API using JSON merge patches
pub struct KubeStore<K: ManagedResource> {
    api: Api<K>,
}

impl<K: ManagedResource> std::fmt::Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("kind", &K::KIND)
            .finish_non_exhaustive()
    }
}

impl<K: ManagedResource> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }

    fn params() -> PatchParams {
        PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        }
    }
}

#[async_trait]
impl<K: ManagedResource> ResourceStore<K> for KubeStore<K> {
    async fn set_external_name(
        &self,
        name: &str,
        external_name: Option<&str>,
    ) -> Result<(), StoreError> {
        let patch = json!({
            "metadata": { "annotations": { EXTERNAL_NAME_ANNOTATION: external_name } }
        });
        self.api
            .patch(name, &Self::params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn set_create_pending(&self, name: &str, since: Option<&str>) -> Result<(), StoreError> {
        let patch = json!({
            "metadata": { "annotations": { CREATE_PENDING_ANNOTATION: since } }
        });
        self.api
            .patch(name, &Self::params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn set_finalizers(&self, name: &str, finalizers: Vec<String>) -> Result<(), StoreError> {
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        self.api
            .patch(name, &Self::params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn patch_for_provider(
        &self,
        name: &str,
        params: &K::Parameters,
    ) -> Result<(), StoreError> {
        let patch = json!({ "spec": { "forProvider": serde_json::to_value(params)? } });
        self.api
            .patch(name, &Self::params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn patch_status(
        &self,
        name: &str,
        status: &ManagedStatus<K::Observation>,
    ) -> Result<(), StoreError> {
        let patch = json!({ "status": serde_json::to_value(status)? });
        self.api
            .patch_status(name, &Self::params(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
