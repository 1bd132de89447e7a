//! LoadBalancer diff rules and references
//!
//! Adopted: `defaultPools` (order sensitive, it is the failover order), `fallbackPool`,
//! `ttl`, `enabled`, `steeringPolicy`, `sessionAffinity`. Enforced: `description`,
//! `proxied`, `regionPools` (key presence).

use crate::controller::diff::{late_init, ordered_eq, same_keys, Drift};
use crate::controller::reference::{ReferenceError, ReferenceResolver, ReferenceTarget};
use crate::crd::{LoadBalancer, LoadBalancerObservation, LoadBalancerParameters};
use crate::managed::{ForProvider, ManagedResource};
use async_trait::async_trait;
use std::collections::BTreeMap;

impl LoadBalancerParameters {
    fn default_pools_referenced(&self) -> bool {
        self.default_pool_refs.is_some() || self.default_pool_selector.is_some()
    }

    fn fallback_pool_referenced(&self) -> bool {
        self.fallback_pool_ref.is_some() || self.fallback_pool_selector.is_some()
    }
}

#[async_trait]
impl ForProvider for LoadBalancerParameters {
    type Observation = LoadBalancerObservation;

    async fn resolve_references(
        &mut self,
        resolver: &ReferenceResolver,
    ) -> Result<(), ReferenceError> {
        resolver
            .resolve_list(
                ReferenceTarget::Pool,
                &mut self.default_pools,
                self.default_pool_refs.as_deref(),
                self.default_pool_selector.as_ref(),
            )
            .await?;
        resolver
            .resolve_single(
                ReferenceTarget::Pool,
                &mut self.fallback_pool,
                self.fallback_pool_ref.as_ref(),
                self.fallback_pool_selector.as_ref(),
            )
            .await
    }

    fn is_up_to_date(&self, observed: &LoadBalancerObservation) -> bool {
        let mut drift = Drift::new(LoadBalancer::KIND);
        drift
            .check(
                "name",
                observed
                    .name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(&self.name)),
            )
            .adopt_with(
                "defaultPools",
                self.default_pools.as_ref(),
                observed.default_pools.as_ref(),
                |a, b| ordered_eq(a, b),
            )
            .adopt(
                "fallbackPool",
                self.fallback_pool.as_ref(),
                observed.fallback_pool.as_ref(),
            )
            .adopt("ttl", self.ttl.as_ref(), observed.ttl.as_ref())
            .adopt("enabled", self.enabled.as_ref(), observed.enabled.as_ref())
            .adopt(
                "steeringPolicy",
                self.steering_policy.as_ref(),
                observed.steering_policy.as_ref(),
            )
            .adopt(
                "sessionAffinity",
                self.session_affinity.as_ref(),
                observed.session_affinity.as_ref(),
            )
            .enforce(
                "description",
                self.description.as_ref(),
                observed.description.as_ref(),
            )
            .enforce("proxied", self.proxied.as_ref(), observed.proxied.as_ref())
            .enforce_with(
                "regionPools",
                self.region_pools.as_ref(),
                observed.region_pools.as_ref(),
                same_keys,
                BTreeMap::is_empty,
            );
        drift.is_up_to_date()
    }

    fn late_initialize(&mut self, observed: &LoadBalancerObservation) -> bool {
        let mut changed = false;
        if !self.default_pools_referenced() {
            changed |= late_init(&mut self.default_pools, observed.default_pools.as_ref());
        }
        if !self.fallback_pool_referenced() {
            changed |= late_init(&mut self.fallback_pool, observed.fallback_pool.as_ref());
        }
        changed |= late_init(&mut self.ttl, observed.ttl.as_ref());
        changed |= late_init(&mut self.enabled, observed.enabled.as_ref());
        changed |= late_init(&mut self.steering_policy, observed.steering_policy.as_ref());
        changed |= late_init(&mut self.session_affinity, observed.session_affinity.as_ref());
        changed
    }

    fn validate(&self) -> Result<(), String> {
        if self.zone_id.trim().is_empty() {
            return Err("zoneId must be set".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must be set".to_string());
        }
        if self.default_pools.as_ref().is_none_or(Vec::is_empty) {
            return Err("defaultPools must contain at least one pool".to_string());
        }
        if self.fallback_pool.as_deref().is_none_or(str::is_empty) {
            return Err("fallbackPool must be set".to_string());
        }
        Ok(())
    }
}
