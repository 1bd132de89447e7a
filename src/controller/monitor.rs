//! Monitor diff rules
//!
//! Adopted: `type`, `method`, `path`, `port`, `timeout`, `retries`, `interval`,
//! `expectedCodes`. Enforced: `description`, `header` (key presence), `expectedBody`,
//! `followRedirects`, `allowInsecure`.

use crate::controller::diff::{late_init, same_keys, Drift};
use crate::crd::{Monitor, MonitorObservation, MonitorParameters};
use crate::managed::{ForProvider, ManagedResource};
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
impl ForProvider for MonitorParameters {
    type Observation = MonitorObservation;

    fn is_up_to_date(&self, observed: &MonitorObservation) -> bool {
        let mut drift = Drift::new(Monitor::KIND);
        drift
            .adopt("type", self.r#type.as_ref(), observed.r#type.as_ref())
            .adopt("method", self.method.as_ref(), observed.method.as_ref())
            .adopt("path", self.path.as_ref(), observed.path.as_ref())
            .adopt("port", self.port.as_ref(), observed.port.as_ref())
            .adopt("timeout", self.timeout.as_ref(), observed.timeout.as_ref())
            .adopt("retries", self.retries.as_ref(), observed.retries.as_ref())
            .adopt("interval", self.interval.as_ref(), observed.interval.as_ref())
            .adopt(
                "expectedCodes",
                self.expected_codes.as_ref(),
                observed.expected_codes.as_ref(),
            )
            .enforce(
                "description",
                self.description.as_ref(),
                observed.description.as_ref(),
            )
            .enforce_with(
                "header",
                self.header.as_ref(),
                observed.header.as_ref(),
                same_keys,
                BTreeMap::is_empty,
            )
            .enforce(
                "expectedBody",
                self.expected_body.as_ref(),
                observed.expected_body.as_ref(),
            )
            .enforce(
                "followRedirects",
                self.follow_redirects.as_ref(),
                observed.follow_redirects.as_ref(),
            )
            .enforce(
                "allowInsecure",
                self.allow_insecure.as_ref(),
                observed.allow_insecure.as_ref(),
            );
        drift.is_up_to_date()
    }

    fn late_initialize(&mut self, observed: &MonitorObservation) -> bool {
        let mut changed = false;
        changed |= late_init(&mut self.r#type, observed.r#type.as_ref());
        changed |= late_init(&mut self.method, observed.method.as_ref());
        changed |= late_init(&mut self.path, observed.path.as_ref());
        changed |= late_init(&mut self.port, observed.port.as_ref());
        changed |= late_init(&mut self.timeout, observed.timeout.as_ref());
        changed |= late_init(&mut self.retries, observed.retries.as_ref());
        changed |= late_init(&mut self.interval, observed.interval.as_ref());
        changed |= late_init(&mut self.expected_codes, observed.expected_codes.as_ref());
        changed
    }

    fn validate(&self) -> Result<(), String> {
        if self.account_id.trim().is_empty() {
            return Err("accountId must be set".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MonitorParameters {
        MonitorParameters {
            account_id: "acc".to_string(),
            r#type: Some("https".to_string()),
            path: Some("/healthz".to_string()),
            ..Default::default()
        }
    }

    fn observed() -> MonitorObservation {
        MonitorObservation {
            id: Some("mon-1".to_string()),
            r#type: Some("https".to_string()),
            method: Some("GET".to_string()),
            path: Some("/healthz".to_string()),
            timeout: Some(5),
            retries: Some(2),
            interval: Some(60),
            expected_codes: Some("2xx".to_string()),
            follow_redirects: Some(false),
            allow_insecure: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn test_server_defaults_do_not_drift() {
        assert!(params().is_up_to_date(&observed()));
    }

    #[test]
    fn test_set_field_differing_drifts() {
        let mut desired = params();
        desired.path = Some("/ready".to_string());
        assert!(!desired.is_up_to_date(&observed()));
    }

    #[test]
    fn test_unset_enforced_field_with_customised_value_drifts() {
        let mut remote = observed();
        remote.allow_insecure = Some(true);
        assert!(!params().is_up_to_date(&remote));

        let mut remote = observed();
        remote.header = Some(BTreeMap::from([("Host".to_string(), vec!["a".to_string()])]));
        assert!(!params().is_up_to_date(&remote));
    }

    #[test]
    fn test_headers_compare_by_key_presence() {
        let mut desired = params();
        desired.header = Some(BTreeMap::from([("Host".to_string(), vec!["a".to_string()])]));
        let mut remote = observed();
        remote.header = Some(BTreeMap::from([("Host".to_string(), vec!["b".to_string()])]));
        assert!(desired.is_up_to_date(&remote));
    }

    #[test]
    fn test_late_initialize_adopts_server_defaults_only() {
        let mut desired = params();
        let mut remote = observed();
        remote.allow_insecure = Some(true);
        assert!(desired.late_initialize(&remote));
        assert_eq!(desired.interval, Some(60));
        assert_eq!(desired.expected_codes.as_deref(), Some("2xx"));
        assert_eq!(desired.allow_insecure, None);
        assert!(!desired.late_initialize(&remote));
    }

    #[test]
    fn test_validation_requires_account() {
        let mut desired = params();
        assert!(desired.validate().is_ok());
        desired.account_id = " ".to_string();
        assert!(desired.validate().is_err());
    }
}
