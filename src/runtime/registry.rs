//! # Controller Registry
//!
//! Built once in `main` and handed everything it needs. Each registered kind gets its own
//! `kube_runtime::Controller` with a fixed concurrency limit, its own response cache and its
//! own error back-off.

use crate::config::ControllerConfig;
use crate::controller::reference::{KubeReferenceLookup, ReferenceLookup};
use crate::crd::{LoadBalancer, Monitor, Pool, WorkerScript};
use crate::managed::{KubeStore, ManagedReconciler, ManagedResource, ReconcileError};
use crate::observability::metrics;
use crate::provider::{
    ConfigResolver, Connector, KubeConfigResolver, LoadBalancerClient, MonitorClient, PoolClient,
    RestConnector, UpstreamClient, WorkerScriptClient,
};
use crate::runtime::error_policy::ErrorBackoff;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::{Api, Client, ResourceExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reconciler plus scheduler state for one kind
#[derive(Debug)]
pub struct KindContext<K, C>
where
    K: ManagedResource,
    C: Connector,
{
    pub reconciler: ManagedReconciler<K, C>,
    pub backoff: ErrorBackoff,
}

async fn reconcile<K, C>(
    resource: Arc<K>,
    ctx: Arc<KindContext<K, C>>,
) -> Result<Action, ReconcileError>
where
    K: ManagedResource,
    C: Connector,
    C::Client: UpstreamClient<Parameters = K::Parameters, Observation = K::Observation>,
{
    let name = resource.name_any();
    let action = ctx.reconciler.reconcile(resource).await?;
    if ctx.backoff.reset(&name) {
        info!(kind = K::KIND, name = %name, "reconcile recovered, back-off reset");
    }
    Ok(action)
}

fn error_policy<K, C>(resource: Arc<K>, error: &ReconcileError, ctx: Arc<KindContext<K, C>>) -> Action
where
    K: ManagedResource,
    C: Connector,
{
    let name = resource.name_any();
    let (delay, error_count) = ctx.backoff.next_delay(&name);
    metrics::increment_requeues(K::KIND);
    warn!(
        kind = K::KIND,
        name = %name,
        error = %error,
        error_count,
        requeue_secs = delay.as_secs(),
        "reconcile failed, requeueing"
    );
    Action::requeue(delay)
}

/// Every controller the process runs
pub struct ControllerRegistry {
    client: Client,
    config: ControllerConfig,
    shutdown: CancellationToken,
    controllers: Vec<(&'static str, BoxFuture<'static, ()>)>,
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("kinds", &self.kinds())
            .finish_non_exhaustive()
    }
}

impl ControllerRegistry {
    pub fn new(client: Client, config: ControllerConfig, shutdown: CancellationToken) -> Self {
        Self {
            client,
            config,
            shutdown,
            controllers: Vec::new(),
        }
    }

    /// Registry with every managed kind wired to the Kubernetes API and the REST upstream
    pub fn with_all_kinds(client: Client, config: ControllerConfig, shutdown: CancellationToken) -> Self {
        let lookup: Arc<dyn ReferenceLookup> = Arc::new(KubeReferenceLookup::new(client.clone()));
        let configs: Arc<dyn ConfigResolver> = Arc::new(KubeConfigResolver::new(
            client.clone(),
            config.upstream_endpoint.clone(),
        ));

        let mut registry = Self::new(client, config, shutdown);
        registry.register_rest::<Monitor, _>(&lookup, &configs, MonitorClient::new);
        registry.register_rest::<Pool, _>(&lookup, &configs, PoolClient::new);
        registry.register_rest::<LoadBalancer, _>(&lookup, &configs, LoadBalancerClient::new);
        registry.register_rest::<WorkerScript, _>(&lookup, &configs, WorkerScriptClient::new);
        registry
    }

    fn register_rest<K, U>(
        &mut self,
        lookup: &Arc<dyn ReferenceLookup>,
        configs: &Arc<dyn ConfigResolver>,
        make: fn(crate::provider::RestClient) -> U,
    ) where
        K: ManagedResource,
        U: UpstreamClient<Parameters = K::Parameters, Observation = K::Observation> + 'static,
    {
        let reconciler = ManagedReconciler::new(
            Arc::new(KubeStore::<K>::new(self.client.clone())),
            Arc::clone(lookup),
            Arc::clone(configs),
            RestConnector::new(K::KIND, make),
            &self.config,
            self.shutdown.clone(),
        );
        self.register(reconciler);
    }

    /// Add a controller for kind `K`
    pub fn register<K, C>(&mut self, reconciler: ManagedReconciler<K, C>)
    where
        K: ManagedResource,
        C: Connector + 'static,
        C::Client: UpstreamClient<Parameters = K::Parameters, Observation = K::Observation> + 'static,
    {
        let ctx = Arc::new(KindContext {
            reconciler,
            backoff: ErrorBackoff::new(),
        });
        let api: Api<K> = Api::all(self.client.clone());
        let concurrency = self.config.max_concurrent_reconciles;
        let restart_delay = self.config.watch_restart_delay();
        let shutdown = self.shutdown.clone();

        let run = run_controller(api, ctx, concurrency, restart_delay, shutdown).boxed();
        self.controllers.push((K::KIND, run));
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.controllers.iter().map(|(kind, _)| *kind).collect()
    }

    /// Run every controller until shutdown
    pub async fn run(self) {
        info!(kinds = ?self.kinds(), "starting controllers");
        futures::future::join_all(self.controllers.into_iter().map(|(_, run)| run)).await;
        info!("all controllers stopped");
    }
}

/// Drive one kind's controller, restarting its stream if it ends before shutdown
async fn run_controller<K, C>(
    api: Api<K>,
    ctx: Arc<KindContext<K, C>>,
    concurrency: u16,
    restart_delay: Duration,
    shutdown: CancellationToken,
) where
    K: ManagedResource,
    C: Connector + 'static,
    C::Client: UpstreamClient<Parameters = K::Parameters, Observation = K::Observation> + 'static,
{
    loop {
        info!(kind = K::KIND, concurrency, "controller starting");
        Controller::new(api.clone(), watcher::Config::default())
            .with_config(controller::Config::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(reconcile::<K, C>, error_policy::<K, C>, Arc::clone(&ctx))
            .for_each(|result| async move {
                match result {
                    Ok((object, _)) => debug!(kind = K::KIND, name = %object.name, "reconciled"),
                    Err(e) => debug!(kind = K::KIND, error = %e, "controller event error"),
                }
            })
            .await;

        if shutdown.is_cancelled() {
            break;
        }
        warn!(
            kind = K::KIND,
            restart_secs = restart_delay.as_secs(),
            "controller stream ended, restarting"
        );
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(restart_delay) => {}
        }
    }
    info!(kind = K::KIND, "controller stopped");
}
