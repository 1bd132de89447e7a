//! Common test utilities
//!
//! In-memory stand-ins for the Kubernetes store, reference lookups, provider configs and the
//! upstream API, plus rustls crypto provider setup for the Pact tests.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use async_trait::async_trait;
use edge_provider_controller::config::ControllerConfig;
use edge_provider_controller::constants::{CREATE_PENDING_ANNOTATION, EXTERNAL_NAME_ANNOTATION};
use edge_provider_controller::controller::reference::{
    ReferenceError, ReferenceLookup, ReferenceTarget, ReferencedObject,
};
use edge_provider_controller::crd::{
    LoadBalancer, LoadBalancerObservation, LoadBalancerParameters, ManagedStatus, Monitor,
    MonitorObservation, MonitorParameters, Selector,
};
use edge_provider_controller::managed::{
    ManagedReconciler, ManagedResource, ResourceStore, StoreError,
};
use edge_provider_controller::provider::{
    ConfigError, ConfigResolver, Connector, ProviderCredentials, UpstreamClient, UpstreamError,
};
use kube::Resource;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Writes the engine made, per resource name
#[derive(Debug)]
pub struct StoreState<K: ManagedResource> {
    pub external_names: HashMap<String, Option<String>>,
    pub create_pending: HashMap<String, Option<String>>,
    /// External-name writes that fail before the store accepts them again
    pub failing_external_name_writes: u32,
    pub finalizers: HashMap<String, Vec<String>>,
    pub for_provider: HashMap<String, K::Parameters>,
    pub statuses: HashMap<String, ManagedStatus<K::Observation>>,
}

impl<K: ManagedResource> Default for StoreState<K> {
    fn default() -> Self {
        Self {
            external_names: HashMap::new(),
            create_pending: HashMap::new(),
            failing_external_name_writes: 0,
            finalizers: HashMap::new(),
            for_provider: HashMap::new(),
            statuses: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct InMemoryStore<K: ManagedResource> {
    pub state: Mutex<StoreState<K>>,
}

impl<K: ManagedResource> InMemoryStore<K> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StoreState::default()),
        })
    }

    pub fn external_name(&self, name: &str) -> Option<Option<String>> {
        self.state.lock().unwrap().external_names.get(name).cloned()
    }

    pub fn create_pending(&self, name: &str) -> Option<Option<String>> {
        self.state.lock().unwrap().create_pending.get(name).cloned()
    }

    /// Make the next `count` external-name writes fail
    pub fn fail_external_name_writes(&self, count: u32) {
        self.state.lock().unwrap().failing_external_name_writes = count;
    }

    pub fn finalizers(&self, name: &str) -> Option<Vec<String>> {
        self.state.lock().unwrap().finalizers.get(name).cloned()
    }

    pub fn for_provider(&self, name: &str) -> Option<K::Parameters> {
        self.state.lock().unwrap().for_provider.get(name).cloned()
    }

    pub fn status(&self, name: &str) -> Option<ManagedStatus<K::Observation>> {
        self.state.lock().unwrap().statuses.get(name).cloned()
    }
}

#[async_trait]
impl<K: ManagedResource> ResourceStore<K> for InMemoryStore<K> {
    async fn set_external_name(
        &self,
        name: &str,
        external_name: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_external_name_writes > 0 {
            state.failing_external_name_writes -= 1;
            return Err(StoreError::NotFound(name.to_string()));
        }
        state
            .external_names
            .insert(name.to_string(), external_name.map(str::to_string));
        Ok(())
    }

    async fn set_create_pending(&self, name: &str, since: Option<&str>) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .create_pending
            .insert(name.to_string(), since.map(str::to_string));
        Ok(())
    }

    async fn set_finalizers(&self, name: &str, finalizers: Vec<String>) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .finalizers
            .insert(name.to_string(), finalizers);
        Ok(())
    }

    async fn patch_for_provider(
        &self,
        name: &str,
        params: &K::Parameters,
    ) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .for_provider
            .insert(name.to_string(), params.clone());
        Ok(())
    }

    async fn patch_status(
        &self,
        name: &str,
        status: &ManagedStatus<K::Observation>,
    ) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(name.to_string(), status.clone());
        Ok(())
    }
}

/// Referenceable resources: (target, name) -> (labels, upstream id)
#[derive(Debug, Default)]
pub struct FakeLookup {
    objects: Vec<(ReferenceTarget, String, BTreeMap<String, String>, Option<String>)>,
}

impl FakeLookup {
    pub fn with(
        mut self,
        target: ReferenceTarget,
        name: &str,
        labels: &[(&str, &str)],
        id: Option<&str>,
    ) -> Self {
        let labels = labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.objects
            .push((target, name.to_string(), labels, id.map(str::to_string)));
        self
    }
}

#[async_trait]
impl ReferenceLookup for FakeLookup {
    async fn get(
        &self,
        target: ReferenceTarget,
        name: &str,
    ) -> Result<Option<ReferencedObject>, ReferenceError> {
        Ok(self
            .objects
            .iter()
            .find(|(t, n, _, _)| *t == target && n == name)
            .map(|(_, n, _, id)| ReferencedObject {
                name: n.clone(),
                id: id.clone(),
            }))
    }

    async fn list(
        &self,
        target: ReferenceTarget,
        selector: &Selector,
    ) -> Result<Vec<ReferencedObject>, ReferenceError> {
        let mut objects: Vec<ReferencedObject> = self
            .objects
            .iter()
            .filter(|(t, _, labels, _)| *t == target && selector.matches(labels))
            .map(|(_, n, _, id)| ReferencedObject {
                name: n.clone(),
                id: id.clone(),
            })
            .collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }
}

/// Returns fixed credentials, or fails when `missing` is set
#[derive(Debug, Default)]
pub struct StaticConfig {
    pub missing: bool,
}

#[async_trait]
impl ConfigResolver for StaticConfig {
    async fn get_config(
        &self,
        reference: &edge_provider_controller::crd::ProviderConfigReference,
    ) -> Result<ProviderCredentials, ConfigError> {
        if self.missing {
            return Err(ConfigError::NotFound(reference.name.clone()));
        }
        Ok(ProviderCredentials {
            api_token: "test-token".to_string(),
            endpoint: "http://upstream.invalid".to_string(),
        })
    }
}

/// Upstream call counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub create: u32,
    pub get: u32,
    pub update: u32,
    pub delete: u32,
    pub list: u32,
}

#[derive(Debug)]
pub struct UpstreamState<P, O> {
    pub objects: HashMap<String, O>,
    /// Errors returned, in order, before Get falls back to `objects`
    pub get_errors: VecDeque<UpstreamError>,
    pub create_errors: VecDeque<UpstreamError>,
    pub update_errors: VecDeque<UpstreamError>,
    pub delete_errors: VecDeque<UpstreamError>,
    pub calls: Calls,
    /// Parameters of every Create/Update, in order
    pub writes: Vec<P>,
    next_id: u32,
}

/// Scripted upstream API over an in-memory object map
#[derive(Debug)]
pub struct FakeUpstream<P, O> {
    pub state: Arc<Mutex<UpstreamState<P, O>>>,
    prefix: &'static str,
    observe: fn(&str, &P) -> O,
}

impl<P, O> Clone for FakeUpstream<P, O> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            prefix: self.prefix,
            observe: self.observe,
        }
    }
}

impl<P, O> FakeUpstream<P, O> {
    pub fn new(prefix: &'static str, observe: fn(&str, &P) -> O) -> Self {
        Self {
            state: Arc::new(Mutex::new(UpstreamState {
                objects: HashMap::new(),
                get_errors: VecDeque::new(),
                create_errors: VecDeque::new(),
                update_errors: VecDeque::new(),
                delete_errors: VecDeque::new(),
                calls: Calls::default(),
                writes: Vec::new(),
                next_id: 0,
            })),
            prefix,
            observe,
        }
    }

    /// Seed an existing upstream object built from `params`
    pub fn insert(&self, id: &str, params: &P) {
        let observation = (self.observe)(id, params);
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(id.to_string(), observation);
    }

    pub fn insert_observation(&self, id: &str, observation: O) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(id.to_string(), observation);
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn script_get_error(&self, error: UpstreamError) {
        self.state.lock().unwrap().get_errors.push_back(error);
    }

    pub fn script_delete_error(&self, error: UpstreamError) {
        self.state.lock().unwrap().delete_errors.push_back(error);
    }

    pub fn script_create_error(&self, error: UpstreamError) {
        self.state.lock().unwrap().create_errors.push_back(error);
    }
}

impl<P: Clone, O: Clone> FakeUpstream<P, O> {
    pub fn object(&self, id: &str) -> Option<O> {
        self.state.lock().unwrap().objects.get(id).cloned()
    }

    pub fn writes(&self) -> Vec<P> {
        self.state.lock().unwrap().writes.clone()
    }
}

#[async_trait]
impl<P, O> UpstreamClient for FakeUpstream<P, O>
where
    P: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    type Parameters = P;
    type Observation = O;

    async fn create(&self, params: &P) -> Result<O, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create += 1;
        if let Some(error) = state.create_errors.pop_front() {
            return Err(error);
        }
        state.next_id += 1;
        let id = format!("{}-{}", self.prefix, state.next_id);
        let observation = (self.observe)(&id, params);
        state.objects.insert(id, observation.clone());
        state.writes.push(params.clone());
        Ok(observation)
    }

    async fn get(&self, id: &str, _params: &P) -> Result<O, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.get += 1;
        if let Some(error) = state.get_errors.pop_front() {
            return Err(error);
        }
        state
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| UpstreamError::NotFound(format!("{}: {id}", self.prefix)))
    }

    async fn update(&self, id: &str, params: &P) -> Result<O, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.update += 1;
        if let Some(error) = state.update_errors.pop_front() {
            return Err(error);
        }
        if !state.objects.contains_key(id) {
            return Err(UpstreamError::NotFound(format!("{}: {id}", self.prefix)));
        }
        let observation = (self.observe)(id, params);
        state.objects.insert(id.to_string(), observation.clone());
        state.writes.push(params.clone());
        Ok(observation)
    }

    async fn delete(&self, id: &str, _params: &P) -> Result<(), UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;
        if let Some(error) = state.delete_errors.pop_front() {
            return Err(error);
        }
        state
            .objects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| UpstreamError::NotFound(format!("{}: {id}", self.prefix)))
    }

    async fn list(&self, _params: &P) -> Result<Vec<O>, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.list += 1;
        Ok(state.objects.values().cloned().collect())
    }
}

/// Hands out clones of one shared fake
#[derive(Debug, Clone)]
pub struct FakeConnector<P, O> {
    pub upstream: FakeUpstream<P, O>,
}

impl<P, O> Connector for FakeConnector<P, O>
where
    P: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    type Client = FakeUpstream<P, O>;

    fn connect(&self, _credentials: &ProviderCredentials) -> Result<Self::Client, UpstreamError> {
        Ok(self.upstream.clone())
    }
}

pub type MonitorUpstream = FakeUpstream<MonitorParameters, MonitorObservation>;
pub type LoadBalancerUpstream = FakeUpstream<LoadBalancerParameters, LoadBalancerObservation>;

/// What the upstream reports for a monitor created from `params`
pub fn monitor_observation(id: &str, params: &MonitorParameters) -> MonitorObservation {
    MonitorObservation {
        id: Some(id.to_string()),
        r#type: params.r#type.clone().or_else(|| Some("http".to_string())),
        description: params.description.clone(),
        method: params.method.clone().or_else(|| Some("GET".to_string())),
        path: params.path.clone().or_else(|| Some("/".to_string())),
        header: params.header.clone(),
        port: params.port,
        timeout: params.timeout.or(Some(5)),
        retries: params.retries.or(Some(2)),
        interval: params.interval.or(Some(60)),
        expected_body: params.expected_body.clone(),
        expected_codes: params.expected_codes.clone().or_else(|| Some("200".to_string())),
        follow_redirects: params.follow_redirects,
        allow_insecure: params.allow_insecure,
        created_on: Some("2024-01-01T00:00:00Z".to_string()),
        modified_on: None,
    }
}

pub fn load_balancer_observation(
    id: &str,
    params: &LoadBalancerParameters,
) -> LoadBalancerObservation {
    LoadBalancerObservation {
        id: Some(id.to_string()),
        name: Some(params.name.clone()),
        default_pools: params.default_pools.clone(),
        fallback_pool: params.fallback_pool.clone(),
        description: params.description.clone(),
        ttl: params.ttl.or(Some(30)),
        proxied: params.proxied,
        enabled: params.enabled.or(Some(true)),
        steering_policy: params.steering_policy.clone(),
        session_affinity: params.session_affinity.clone(),
        region_pools: params.region_pools.clone(),
        created_on: Some("2024-01-01T00:00:00Z".to_string()),
        modified_on: None,
    }
}

pub fn monitor_upstream() -> MonitorUpstream {
    FakeUpstream::new("mon", monitor_observation)
}

pub fn load_balancer_upstream() -> LoadBalancerUpstream {
    FakeUpstream::new("lb", load_balancer_observation)
}

/// Controller configuration with a short rate-limit base delay
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        rate_limit_base_delay_ms: 10,
        ..ControllerConfig::default()
    }
}

pub fn reconciler<K, P, O>(
    store: Arc<InMemoryStore<K>>,
    lookup: FakeLookup,
    upstream: &FakeUpstream<P, O>,
) -> ManagedReconciler<K, FakeConnector<P, O>>
where
    K: ManagedResource<Parameters = P, Observation = O>,
    P: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    reconciler_with(store, lookup, upstream, &test_config(), StaticConfig::default())
}

pub fn reconciler_with<K, P, O>(
    store: Arc<InMemoryStore<K>>,
    lookup: FakeLookup,
    upstream: &FakeUpstream<P, O>,
    config: &ControllerConfig,
    configs: StaticConfig,
) -> ManagedReconciler<K, FakeConnector<P, O>>
where
    K: ManagedResource<Parameters = P, Observation = O>,
    P: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    ManagedReconciler::new(
        store,
        Arc::new(lookup),
        Arc::new(configs),
        FakeConnector {
            upstream: upstream.clone(),
        },
        config,
        CancellationToken::new(),
    )
}

/// Set the external-name annotation
pub fn with_external_name<K: Resource>(mut resource: K, external_name: &str) -> K {
    resource
        .meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(EXTERNAL_NAME_ANNOTATION.to_string(), external_name.to_string());
    resource
}

/// Set the create-pending annotation
pub fn with_create_pending<K: Resource>(mut resource: K, since: &str) -> K {
    resource
        .meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(CREATE_PENDING_ANNOTATION.to_string(), since.to_string());
    resource
}

pub fn monitor(name: &str, params: MonitorParameters) -> Monitor {
    Monitor::new(
        name,
        edge_provider_controller::crd::MonitorSpec {
            for_provider: params,
            provider_config_ref: Default::default(),
            deletion_policy: Default::default(),
        },
    )
}

pub fn load_balancer(name: &str, params: LoadBalancerParameters) -> LoadBalancer {
    LoadBalancer::new(
        name,
        edge_provider_controller::crd::LoadBalancerSpec {
            for_provider: params,
            provider_config_ref: Default::default(),
            deletion_policy: Default::default(),
        },
    )
}

pub const TTL_PLUS: Duration = Duration::from_secs(31);
