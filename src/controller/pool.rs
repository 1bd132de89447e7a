//! Pool diff rules and references
//!
//! Adopted: `enabled`, `minimumOrigins`, `monitor`. Enforced: `description`,
//! `checkRegions` (order insensitive), `notificationEmail`. `origins` compare by length.

use crate::controller::diff::{late_init, same_len, unordered_eq, Drift};
use crate::controller::reference::{ReferenceError, ReferenceResolver, ReferenceTarget};
use crate::crd::{Pool, PoolObservation, PoolParameters};
use crate::managed::{ForProvider, ManagedResource};
use async_trait::async_trait;

#[async_trait]
impl ForProvider for PoolParameters {
    type Observation = PoolObservation;

    async fn resolve_references(
        &mut self,
        resolver: &ReferenceResolver,
    ) -> Result<(), ReferenceError> {
        resolver
            .resolve_single(
                ReferenceTarget::Monitor,
                &mut self.monitor,
                self.monitor_ref.as_ref(),
                self.monitor_selector.as_ref(),
            )
            .await
    }

    fn is_up_to_date(&self, observed: &PoolObservation) -> bool {
        let mut drift = Drift::new(Pool::KIND);
        drift
            .check("name", observed.name.as_deref() == Some(self.name.as_str()))
            .check("origins", same_len(&self.origins, &observed.origins))
            .adopt("enabled", self.enabled.as_ref(), observed.enabled.as_ref())
            .adopt(
                "minimumOrigins",
                self.minimum_origins.as_ref(),
                observed.minimum_origins.as_ref(),
            )
            .adopt("monitor", self.monitor.as_ref(), observed.monitor.as_ref())
            .enforce(
                "description",
                self.description.as_ref(),
                observed.description.as_ref(),
            )
            .enforce_with(
                "checkRegions",
                self.check_regions.as_ref(),
                observed.check_regions.as_ref(),
                |a, b| unordered_eq(a, b),
                Vec::is_empty,
            )
            .enforce(
                "notificationEmail",
                self.notification_email.as_ref(),
                observed.notification_email.as_ref(),
            );
        drift.is_up_to_date()
    }

    fn late_initialize(&mut self, observed: &PoolObservation) -> bool {
        let mut changed = false;
        changed |= late_init(&mut self.enabled, observed.enabled.as_ref());
        changed |= late_init(&mut self.minimum_origins, observed.minimum_origins.as_ref());
        if self.monitor_ref.is_none() && self.monitor_selector.is_none() {
            changed |= late_init(&mut self.monitor, observed.monitor.as_ref());
        }
        changed
    }

    fn validate(&self) -> Result<(), String> {
        if self.account_id.trim().is_empty() {
            return Err("accountId must be set".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must be set".to_string());
        }
        if self.origins.is_empty() {
            return Err("origins must contain at least one origin".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reference::tests::StaticLookup;
    use crate::crd::{PoolOrigin, Reference};

    fn origin(name: &str) -> PoolOrigin {
        PoolOrigin {
            name: name.to_string(),
            address: format!("{name}.example.com"),
            ..Default::default()
        }
    }

    fn params() -> PoolParameters {
        PoolParameters {
            account_id: "acc".to_string(),
            name: "eu".to_string(),
            origins: vec![origin("a"), origin("b")],
            ..Default::default()
        }
    }

    fn observed() -> PoolObservation {
        PoolObservation {
            id: Some("pool-1".to_string()),
            name: Some("eu".to_string()),
            origins: vec![origin("a"), origin("b")],
            enabled: Some(true),
            minimum_origins: Some(1),
            monitor: Some("mon-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_matching_pool_is_up_to_date() {
        assert!(params().is_up_to_date(&observed()));
    }

    #[test]
    fn test_origins_compare_by_length_only() {
        let mut remote = observed();
        remote.origins[0].address = "changed.example.com".to_string();
        assert!(params().is_up_to_date(&remote));
        remote.origins.pop();
        assert!(!params().is_up_to_date(&remote));
    }

    #[test]
    fn test_check_regions_are_order_insensitive() {
        let mut desired = params();
        desired.check_regions = Some(vec!["WEU".to_string(), "EEU".to_string()]);
        let mut remote = observed();
        remote.check_regions = Some(vec!["EEU".to_string(), "WEU".to_string()]);
        assert!(desired.is_up_to_date(&remote));
        remote.check_regions = Some(vec!["EEU".to_string()]);
        assert!(!desired.is_up_to_date(&remote));
    }

    #[test]
    fn test_unset_check_regions_drift_when_customised_upstream() {
        let mut remote = observed();
        remote.check_regions = Some(vec!["WNAM".to_string()]);
        assert!(!params().is_up_to_date(&remote));
    }

    #[test]
    fn test_late_initialize_skips_monitor_when_referenced() {
        let mut desired = params();
        desired.monitor_ref = Some(Reference::new("health"));
        assert!(desired.late_initialize(&observed()));
        assert_eq!(desired.monitor, None);
        assert_eq!(desired.minimum_origins, Some(1));

        let mut desired = params();
        desired.late_initialize(&observed());
        assert_eq!(desired.monitor.as_deref(), Some("mon-1"));
    }

    #[tokio::test]
    async fn test_monitor_reference_resolves_to_monitor_id() {
        let resolver = StaticLookup::default()
            .with(ReferenceTarget::Monitor, "health", &[], Some("mon-9"))
            .resolver();
        let mut desired = params();
        desired.monitor_ref = Some(Reference::new("health"));
        desired.resolve_references(&resolver).await.unwrap();
        assert_eq!(desired.monitor.as_deref(), Some("mon-9"));
    }

    #[test]
    fn test_validation() {
        assert!(params().validate().is_ok());
        let mut desired = params();
        desired.origins.clear();
        assert!(desired.validate().is_err());
    }
}
