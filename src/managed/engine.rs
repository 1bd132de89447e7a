//! # Reconciliation Engine
//!
//! Drives one managed kind through Observe → Create | Update, and through Delete when the
//! resource is being removed. Each tick:
//!
//! 1. Deletion requested: run Delete (unless `Orphan`) and drop the finalizer
//! 2. Add the finalizer if missing
//! 3. Resolve credentials and connect
//! 4. Observe; create when absent, update when drifted. A Create is bracketed by the
//!    create-pending annotation so an upstream object whose identifier was never recorded
//!    blocks further Creates instead of being duplicated
//! 5. Write `status.atProvider` and the Ready/Synced conditions when they changed
//!
//! Failures are wrapped with the operation that failed and handed to the scheduler. The
//! engine's only retrying is the rate-limit back-off in [`RetryPolicy`].

use crate::config::ControllerConfig;
use crate::constants::{CREATE_PENDING_ANNOTATION, FINALIZER};
use crate::controller::cache::{CacheKey, ResponseCache};
use crate::controller::reference::{ReferenceLookup, ReferenceResolver};
use crate::controller::retry::{RetryError, RetryPolicy};
use crate::crd::{Condition, DeletionPolicy, ManagedStatus};
use crate::managed::error::ReconcileError;
use crate::managed::external::{ExternalObservation, ReconcileOutcome};
use crate::managed::store::{ResourceStore, StoreError};
use crate::managed::{ForProvider, ManagedResource, ProviderObservation};
use crate::observability::metrics;
use crate::provider::{ConfigResolver, Connector, UpstreamClient, UpstreamError};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Observe/Create/Update/Delete for one managed kind
pub struct ManagedReconciler<K, C>
where
    K: ManagedResource,
    C: Connector,
{
    store: Arc<dyn ResourceStore<K>>,
    references: ReferenceResolver,
    configs: Arc<dyn ConfigResolver>,
    connector: C,
    cache: ResponseCache<K::Observation>,
    retry: RetryPolicy,
    cancel: CancellationToken,
    poll_interval: Duration,
    reconcile_timeout: Duration,
}

impl<K, C> std::fmt::Debug for ManagedReconciler<K, C>
where
    K: ManagedResource,
    C: Connector,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedReconciler")
            .field("kind", &K::KIND)
            .field("retry", &self.retry)
            .field("poll_interval", &self.poll_interval)
            .field("reconcile_timeout", &self.reconcile_timeout)
            .finish_non_exhaustive()
    }
}

impl<K, C> ManagedReconciler<K, C>
where
    K: ManagedResource,
    C: Connector,
    C::Client: UpstreamClient<Parameters = K::Parameters, Observation = K::Observation>,
{
    pub fn new(
        store: Arc<dyn ResourceStore<K>>,
        lookup: Arc<dyn ReferenceLookup>,
        configs: Arc<dyn ConfigResolver>,
        connector: C,
        config: &ControllerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            references: ReferenceResolver::new(K::KIND, lookup),
            configs,
            connector,
            cache: ResponseCache::new(K::KIND, config.cache_ttl()),
            retry: RetryPolicy::new(
                K::KIND,
                config.rate_limit_max_retries,
                config.rate_limit_base_delay(),
            ),
            cancel,
            poll_interval: config.poll_interval(),
            reconcile_timeout: config.reconcile_timeout(),
        }
    }

    /// Upstream reads memoised for this kind
    pub fn cache(&self) -> &ResponseCache<K::Observation> {
        &self.cache
    }

    /// Parameters with every reference resolved, for the current operation only
    async fn resolved_parameters(&self, resource: &K) -> Result<K::Parameters, ReconcileError> {
        let mut params = resource.for_provider().clone();
        params
            .resolve_references(&self.references)
            .await
            .map_err(|source| ReconcileError::ResolveReferences {
                kind: K::KIND,
                name: resource.name_any(),
                source,
            })?;
        Ok(params)
    }

    fn validated(resource: &K, params: &K::Parameters) -> Result<(), ReconcileError> {
        params
            .validate()
            .map_err(|message| ReconcileError::Validation {
                kind: K::KIND,
                name: resource.name_any(),
                message,
            })
    }

    fn store_error(what: &'static str, resource: &K) -> impl FnOnce(StoreError) -> ReconcileError {
        let name = resource.name_any();
        move |source| ReconcileError::Store {
            what,
            kind: K::KIND,
            name,
            source,
        }
    }

    /// Get through the response cache and the rate-limit retry
    ///
    /// Entries are keyed by the managed resource, since upstream ids are only unique within
    /// an account or zone. A cached payload for a different id reads as a miss.
    async fn get_cached(
        &self,
        client: &C::Client,
        resource: &K,
        id: &str,
        params: &K::Parameters,
    ) -> Result<K::Observation, RetryError<UpstreamError>> {
        let key = CacheKey::get(resource.name_any());
        if let Some(observed) = self.cache.get(&key).await {
            if observed.id() == Some(id) {
                debug!(kind = K::KIND, id, "response cache hit");
                return Ok(observed);
            }
            debug!(kind = K::KIND, id, "cached payload is for another upstream id");
        }

        let observed = self
            .retry
            .retry(&self.cancel, || client.get(id, params))
            .await?;
        let purged = self.cache.purge_expired().await;
        if purged > 0 {
            debug!(kind = K::KIND, purged, "dropped expired cache entries");
        }
        self.cache.set(key, observed.clone()).await;
        Ok(observed)
    }

    /// Build an upstream client from the resource's `ProviderConfig`
    pub async fn connect(&self, resource: &K) -> Result<C::Client, ReconcileError> {
        let credentials = self
            .configs
            .get_config(resource.provider_config_ref())
            .await
            .map_err(|source| ReconcileError::ProviderConfig {
                kind: K::KIND,
                name: resource.name_any(),
                source,
            })?;
        self.connector
            .connect(&credentials)
            .map_err(|source| ReconcileError::Connect {
                kind: K::KIND,
                name: resource.name_any(),
                source,
            })
    }

    /// Report whether the upstream object exists and matches the spec
    ///
    /// Without an external-name nothing is fetched. A `NotFound` from the upstream is
    /// reported as absent. Observed defaults are late-initialized into the declared spec
    /// and persisted.
    pub async fn observe(
        &self,
        client: &C::Client,
        resource: &K,
    ) -> Result<ExternalObservation<K::Observation>, ReconcileError> {
        let Some(external_name) = resource.external_name() else {
            debug!(kind = K::KIND, "no external-name, upstream object not created yet");
            return Ok(ExternalObservation::absent());
        };

        let params = self.resolved_parameters(resource).await?;

        let observed = match self.get_cached(client, resource, external_name, &params).await {
            Ok(observed) => observed,
            Err(RetryError::Failed(error)) if error.is_not_found() => {
                info!(kind = K::KIND, external_name, "upstream object not found");
                return Ok(ExternalObservation::absent());
            }
            Err(source) => {
                return Err(ReconcileError::Observe {
                    kind: K::KIND,
                    name: resource.name_any(),
                    source,
                })
            }
        };

        let up_to_date = params.is_up_to_date(&observed);

        let mut declared = resource.for_provider().clone();
        let late_initialized = declared.late_initialize(&observed);
        if late_initialized {
            info!(kind = K::KIND, "late-initializing spec from observed defaults");
            self.store
                .patch_for_provider(&resource.name_any(), &declared)
                .await
                .map_err(Self::store_error("late-initialize spec", resource))?;
        }

        Ok(ExternalObservation::present(
            observed,
            up_to_date,
            late_initialized,
        ))
    }

    /// Create the upstream object and record its identifier as the external-name
    ///
    /// The create-pending annotation is written before the upstream call and removed once
    /// the external-name is recorded, or once the upstream has rejected the Create. It stays
    /// when the outcome is unknown, and a resource carrying it without an external-name is
    /// never created again.
    pub async fn create(
        &self,
        client: &C::Client,
        resource: &K,
    ) -> Result<K::Observation, ReconcileError> {
        let name = resource.name_any();
        if resource.external_name().is_none() {
            if let Some(since) = resource.create_pending() {
                warn!(kind = K::KIND, since, "previous create outcome unknown, not creating");
                return Err(ReconcileError::CreatePending {
                    kind: K::KIND,
                    name,
                    since: since.to_string(),
                    annotation: CREATE_PENDING_ANNOTATION,
                });
            }
        }

        let params = self.resolved_parameters(resource).await?;
        Self::validated(resource, &params)?;

        let create_error = |source| ReconcileError::Create {
            kind: K::KIND,
            name: resource.name_any(),
            source,
        };

        let since = chrono::Utc::now().to_rfc3339();
        self.store
            .set_create_pending(&name, Some(&since))
            .await
            .map_err(Self::store_error("mark create pending", resource))?;

        let created = match self
            .retry
            .retry(&self.cancel, || client.create(&params))
            .await
        {
            Ok(created) => created,
            Err(source) => {
                if create_outcome_known(&source) {
                    self.clear_create_pending(&name).await;
                }
                return Err(create_error(source));
            }
        };

        let id = created.id().ok_or_else(|| {
            create_error(RetryError::Failed(UpstreamError::Decode(
                "create response carries no identifier".to_string(),
            )))
        })?;

        info!(kind = K::KIND, external_name = id, "created upstream object");
        self.store
            .set_external_name(&name, Some(id))
            .await
            .map_err(Self::store_error("set external-name", resource))?;
        self.clear_create_pending(&name).await;
        Ok(created)
    }

    /// Best effort; a stale marker only matters once the external-name is gone again
    async fn clear_create_pending(&self, name: &str) {
        if let Err(e) = self.store.set_create_pending(name, None).await {
            warn!(kind = K::KIND, error = %e, "failed to clear create-pending annotation");
        }
    }

    /// Replace the upstream object's parameters with the full desired set
    pub async fn update(
        &self,
        client: &C::Client,
        resource: &K,
    ) -> Result<K::Observation, ReconcileError> {
        let id = resource
            .external_name()
            .ok_or_else(|| ReconcileError::Validation {
                kind: K::KIND,
                name: resource.name_any(),
                message: "external-name is not set".to_string(),
            })?;

        let params = self.resolved_parameters(resource).await?;
        Self::validated(resource, &params)?;

        let updated = self
            .retry
            .retry(&self.cancel, || client.update(id, &params))
            .await
            .map_err(|source| ReconcileError::Update {
                kind: K::KIND,
                name: resource.name_any(),
                source,
            })?;

        info!(kind = K::KIND, external_name = id, "updated upstream object");
        Ok(updated)
    }

    /// Delete the upstream object; an object that is already gone counts as deleted
    pub async fn delete(&self, client: &C::Client, resource: &K) -> Result<(), ReconcileError> {
        let Some(id) = resource.external_name() else {
            return Ok(());
        };
        let params = resource.for_provider();

        match self
            .retry
            .retry(&self.cancel, || client.delete(id, params))
            .await
        {
            Ok(()) => {
                info!(kind = K::KIND, external_name = id, "deleted upstream object");
                Ok(())
            }
            Err(RetryError::Failed(error)) if error.is_not_found() => {
                info!(kind = K::KIND, external_name = id, "upstream object already gone");
                Ok(())
            }
            Err(source) => Err(ReconcileError::Delete {
                kind: K::KIND,
                name: resource.name_any(),
                source,
            }),
        }
    }

    /// One reconcile tick under the reconcile deadline
    ///
    /// # Errors
    /// Any failure of the tick, after a best-effort Synced=False status write
    pub async fn reconcile(&self, resource: Arc<K>) -> Result<Action, ReconcileError> {
        let name = resource.name_any();
        let span = info_span!("reconcile", resource.kind = K::KIND, resource.name = %name);
        let start = Instant::now();

        let result = async {
            match tokio::time::timeout(self.reconcile_timeout, self.reconcile_inner(&resource))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ReconcileError::Timeout {
                    kind: K::KIND,
                    name: name.clone(),
                    timeout: self.reconcile_timeout,
                }),
            }
        }
        .instrument(span.clone())
        .await;

        metrics::observe_reconciliation_duration(K::KIND, start.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                metrics::increment_reconciliations(K::KIND, outcome.as_str());
                debug!(parent: &span, outcome = outcome.as_str(), "reconcile complete");
                Ok(match outcome {
                    ReconcileOutcome::Deleted | ReconcileOutcome::Orphaned => Action::await_change(),
                    _ => Action::requeue(self.poll_interval),
                })
            }
            Err(error) => {
                metrics::increment_reconciliation_errors(K::KIND, error.reason());
                self.record_failure(&resource, &error)
                    .instrument(span)
                    .await;
                Err(error)
            }
        }
    }

    async fn reconcile_inner(&self, resource: &K) -> Result<ReconcileOutcome, ReconcileError> {
        if resource.meta().deletion_timestamp.is_some() {
            return self.finalize(resource).await;
        }

        self.ensure_finalizer(resource).await?;

        let client = self.connect(resource).await?;
        let observation = self.observe(&client, resource).await?;
        let mut status = resource.managed_status().cloned().unwrap_or_default();

        let outcome = if !observation.resource_exists {
            if resource.external_name().is_some() {
                self.store
                    .set_external_name(&resource.name_any(), None)
                    .await
                    .map_err(Self::store_error("clear external-name", resource))?;
                if resource.create_pending().is_some() {
                    self.clear_create_pending(&resource.name_any()).await;
                }
            }
            status.at_provider = Some(self.create(&client, resource).await?);
            status.set_condition(Condition::creating());
            ReconcileOutcome::Created
        } else if !observation.resource_up_to_date {
            status.at_provider = Some(self.update(&client, resource).await?);
            status.set_condition(Condition::available());
            ReconcileOutcome::Updated
        } else {
            status.at_provider = observation.observation;
            status.set_condition(Condition::available());
            ReconcileOutcome::UpToDate
        };

        status.set_condition(Condition::reconcile_success());
        status.observed_generation = resource.meta().generation;
        self.write_status(resource, status).await?;
        Ok(outcome)
    }

    /// Deletion path: Delete upstream (unless orphaned), then release the finalizer
    async fn finalize(&self, resource: &K) -> Result<ReconcileOutcome, ReconcileError> {
        if !resource.finalizers().iter().any(|f| f == FINALIZER) {
            return Ok(ReconcileOutcome::Deleted);
        }

        let outcome = match resource.deletion_policy() {
            DeletionPolicy::Orphan => {
                info!(kind = K::KIND, "deletion policy Orphan, leaving upstream object");
                ReconcileOutcome::Orphaned
            }
            DeletionPolicy::Delete => {
                if let (None, Some(since)) = (resource.external_name(), resource.create_pending())
                {
                    warn!(
                        kind = K::KIND,
                        since,
                        "create outcome unknown, upstream object may need manual removal"
                    );
                }
                if resource.external_name().is_some() {
                    let mut status = resource.managed_status().cloned().unwrap_or_default();
                    status.set_condition(Condition::deleting());
                    self.write_status(resource, status).await?;

                    let client = self.connect(resource).await?;
                    self.delete(&client, resource).await?;
                }
                ReconcileOutcome::Deleted
            }
        };

        let finalizers: Vec<String> = resource
            .finalizers()
            .iter()
            .filter(|f| f.as_str() != FINALIZER)
            .cloned()
            .collect();
        self.store
            .set_finalizers(&resource.name_any(), finalizers)
            .await
            .map_err(Self::store_error("remove finalizer", resource))?;
        Ok(outcome)
    }

    async fn ensure_finalizer(&self, resource: &K) -> Result<(), ReconcileError> {
        if resource.finalizers().iter().any(|f| f == FINALIZER) {
            return Ok(());
        }
        let mut finalizers = resource.finalizers().to_vec();
        finalizers.push(FINALIZER.to_string());
        self.store
            .set_finalizers(&resource.name_any(), finalizers)
            .await
            .map_err(Self::store_error("add finalizer", resource))
    }

    /// Patch status only when it differs from what the resource already carries
    async fn write_status(
        &self,
        resource: &K,
        status: ManagedStatus<K::Observation>,
    ) -> Result<(), ReconcileError> {
        if resource.managed_status() == Some(&status) {
            return Ok(());
        }
        self.store
            .patch_status(&resource.name_any(), &status)
            .await
            .map_err(Self::store_error("update status", resource))
    }

    async fn record_failure(&self, resource: &K, error: &ReconcileError) {
        let mut status = resource.managed_status().cloned().unwrap_or_default();
        status.set_condition(Condition::reconcile_error(error.to_string()));
        if resource.managed_status() == Some(&status) {
            return;
        }
        if let Err(e) = self.store.patch_status(&resource.name_any(), &status).await {
            warn!(error = %e, "failed to record reconcile error in status");
        }
    }
}

/// Whether a failed Create certainly left nothing behind upstream
///
/// A response that could not be decoded may belong to an object that was created.
fn create_outcome_known(error: &RetryError<UpstreamError>) -> bool {
    !matches!(error, RetryError::Failed(UpstreamError::Decode(_)))
}
