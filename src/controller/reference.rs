//! # Reference Resolution
//!
//! Turns cross-resource references into upstream identifiers before an upstream call.
//!
//! For each reference-backed field:
//! 1. an inline value wins and nothing is looked up;
//! 2. a named reference must point at a resource whose `status.atProvider.id` is set,
//!    otherwise the operation fails with [`ReferenceError::DependencyNotReady`];
//! 3. a selector lists matching resources. A singular field takes the first one with an id,
//!    a list field takes every id. Resources without an id are skipped.
//!
//! Resolved values only ever land in the in-memory copy used for the current operation.
//! Ordering between dependent resources comes from the dependent failing and requeueing
//! until its dependency reports an id.

use crate::crd::{Monitor, Pool, Reference, Selector};
use crate::managed::ManagedResource;
use crate::observability::metrics;
use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Kinds that can be referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceTarget {
    Monitor,
    Pool,
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monitor => f.write_str(Monitor::KIND),
            Self::Pool => f.write_str(Pool::KIND),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("dependency not ready: {target} {name} has no upstream id yet")]
    DependencyNotReady {
        target: ReferenceTarget,
        name: String,
    },
    #[error("referenced {target} {name} does not exist")]
    TargetNotFound {
        target: ReferenceTarget,
        name: String,
    },
    #[error("cannot look up {target} resources: {source}")]
    Lookup {
        target: ReferenceTarget,
        #[source]
        source: kube::Error,
    },
}

/// Name and upstream id of a referenced resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedObject {
    pub name: String,
    pub id: Option<String>,
}

impl ReferencedObject {
    pub fn from_resource<K: ManagedResource>(resource: &K) -> Self {
        Self {
            name: resource.name_any(),
            id: resource.upstream_id().map(str::to_string),
        }
    }
}

/// Read access to the resources references point at
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn get(
        &self,
        target: ReferenceTarget,
        name: &str,
    ) -> Result<Option<ReferencedObject>, ReferenceError>;

    /// Matching resources in a stable order
    async fn list(
        &self,
        target: ReferenceTarget,
        selector: &Selector,
    ) -> Result<Vec<ReferencedObject>, ReferenceError>;
}

/// [`ReferenceLookup`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeReferenceLookup {
    client: Client,
}

impl fmt::Debug for KubeReferenceLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeReferenceLookup").finish_non_exhaustive()
    }
}

impl KubeReferenceLookup {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_as<K: ManagedResource>(
        &self,
        target: ReferenceTarget,
        name: &str,
    ) -> Result<Option<ReferencedObject>, ReferenceError> {
        let api: Api<K> = Api::all(self.client.clone());
        let resource = api
            .get_opt(name)
            .await
            .map_err(|source| ReferenceError::Lookup { target, source })?;
        Ok(resource.as_ref().map(ReferencedObject::from_resource))
    }

    async fn list_as<K: ManagedResource>(
        &self,
        target: ReferenceTarget,
        selector: &Selector,
    ) -> Result<Vec<ReferencedObject>, ReferenceError> {
        let api: Api<K> = Api::all(self.client.clone());
        let params = ListParams::default().labels(&selector.to_label_selector());
        let list = api
            .list(&params)
            .await
            .map_err(|source| ReferenceError::Lookup { target, source })?;
        let mut objects: Vec<ReferencedObject> =
            list.items.iter().map(ReferencedObject::from_resource).collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }
}

#[async_trait]
impl ReferenceLookup for KubeReferenceLookup {
    async fn get(
        &self,
        target: ReferenceTarget,
        name: &str,
    ) -> Result<Option<ReferencedObject>, ReferenceError> {
        match target {
            ReferenceTarget::Monitor => self.get_as::<Monitor>(target, name).await,
            ReferenceTarget::Pool => self.get_as::<Pool>(target, name).await,
        }
    }

    async fn list(
        &self,
        target: ReferenceTarget,
        selector: &Selector,
    ) -> Result<Vec<ReferencedObject>, ReferenceError> {
        match target {
            ReferenceTarget::Monitor => self.list_as::<Monitor>(target, selector).await,
            ReferenceTarget::Pool => self.list_as::<Pool>(target, selector).await,
        }
    }
}

/// Resolves reference-backed fields for one referencing kind
#[derive(Clone)]
pub struct ReferenceResolver {
    lookup: Arc<dyn ReferenceLookup>,
    kind: &'static str,
}

impl fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ReferenceResolver {
    pub fn new(kind: &'static str, lookup: Arc<dyn ReferenceLookup>) -> Self {
        Self { lookup, kind }
    }

    async fn named_id(
        &self,
        target: ReferenceTarget,
        reference: &Reference,
    ) -> Result<String, ReferenceError> {
        let object = self
            .lookup
            .get(target, &reference.name)
            .await?
            .ok_or_else(|| ReferenceError::TargetNotFound {
                target,
                name: reference.name.clone(),
            })?;
        object.id.ok_or_else(|| ReferenceError::DependencyNotReady {
            target,
            name: reference.name.clone(),
        })
    }

    /// Resolve a singular field
    ///
    /// A selector with no ready match leaves the field unset.
    pub async fn resolve_single(
        &self,
        target: ReferenceTarget,
        value: &mut Option<String>,
        reference: Option<&Reference>,
        selector: Option<&Selector>,
    ) -> Result<(), ReferenceError> {
        if value.as_deref().is_some_and(|v| !v.is_empty()) {
            return Ok(());
        }

        if let Some(reference) = reference {
            let id = self
                .named_id(target, reference)
                .await
                .inspect_err(|_| metrics::increment_reference_failures(self.kind))?;
            debug!(kind = self.kind, %target, reference = %reference.name, id = %id, "resolved reference");
            *value = Some(id);
            return Ok(());
        }

        if let Some(selector) = selector {
            let objects = self
                .lookup
                .list(target, selector)
                .await
                .inspect_err(|_| metrics::increment_reference_failures(self.kind))?;
            match objects.into_iter().find_map(|object| object.id) {
                Some(id) => {
                    debug!(kind = self.kind, %target, id = %id, "resolved selector");
                    *value = Some(id);
                }
                None => debug!(kind = self.kind, %target, "selector matched no ready resource"),
            }
        }

        Ok(())
    }

    /// Resolve a list field
    ///
    /// Every named reference must be ready. A selector keeps the ready matches in order and
    /// yields an empty list when none is ready.
    pub async fn resolve_list(
        &self,
        target: ReferenceTarget,
        values: &mut Option<Vec<String>>,
        references: Option<&[Reference]>,
        selector: Option<&Selector>,
    ) -> Result<(), ReferenceError> {
        if values.as_ref().is_some_and(|v| !v.is_empty()) {
            return Ok(());
        }

        if let Some(references) = references.filter(|r| !r.is_empty()) {
            let mut ids = Vec::with_capacity(references.len());
            for reference in references {
                let id = self
                    .named_id(target, reference)
                    .await
                    .inspect_err(|_| metrics::increment_reference_failures(self.kind))?;
                ids.push(id);
            }
            debug!(kind = self.kind, %target, count = ids.len(), "resolved references");
            *values = Some(ids);
            return Ok(());
        }

        if let Some(selector) = selector {
            let ids: Vec<String> = self
                .lookup
                .list(target, selector)
                .await
                .inspect_err(|_| metrics::increment_reference_failures(self.kind))?
                .into_iter()
                .filter_map(|object| object.id)
                .collect();
            debug!(kind = self.kind, %target, count = ids.len(), "resolved selector");
            *values = Some(ids);
        }

        Ok(())
    }
}
