//! WorkerScript diff rules
//!
//! Content drift is detected through the SHA-256 of the deployed module. Adopted:
//! `compatibilityDate`, `usageModel`. Enforced: `bindings` (order insensitive, matched by
//! name), `logpush`.

use crate::controller::diff::{late_init, Drift};
use crate::crd::{ScriptBinding, WorkerScript, WorkerScriptObservation, WorkerScriptParameters};
use crate::managed::{ForProvider, ManagedResource};
use crate::provider::worker_script::content_digest;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Same bindings regardless of order
fn bindings_eq(desired: &[ScriptBinding], observed: &[ScriptBinding]) -> bool {
    desired.len() == observed.len()
        && desired.iter().all(|binding| {
            observed
                .iter()
                .find(|candidate| candidate.name() == binding.name())
                .is_some_and(|candidate| candidate == binding)
        })
}

#[async_trait]
impl ForProvider for WorkerScriptParameters {
    type Observation = WorkerScriptObservation;

    fn is_up_to_date(&self, observed: &WorkerScriptObservation) -> bool {
        let desired_digest = content_digest(&self.content);
        let mut drift = Drift::new(WorkerScript::KIND);
        drift
            .check(
                "content",
                observed.content_sha256.as_deref() == Some(desired_digest.as_str()),
            )
            .adopt(
                "compatibilityDate",
                self.compatibility_date.as_ref(),
                observed.compatibility_date.as_ref(),
            )
            .adopt(
                "usageModel",
                self.usage_model.as_ref(),
                observed.usage_model.as_ref(),
            )
            .enforce_with(
                "bindings",
                self.bindings.as_ref(),
                observed.bindings.as_ref(),
                |a, b| bindings_eq(a, b),
                Vec::is_empty,
            )
            .enforce("logpush", self.logpush.as_ref(), observed.logpush.as_ref());
        drift.is_up_to_date()
    }

    fn late_initialize(&mut self, observed: &WorkerScriptObservation) -> bool {
        let mut changed = false;
        changed |= late_init(
            &mut self.compatibility_date,
            observed.compatibility_date.as_ref(),
        );
        changed |= late_init(&mut self.usage_model, observed.usage_model.as_ref());
        changed
    }

    fn validate(&self) -> Result<(), String> {
        if self.account_id.trim().is_empty() {
            return Err("accountId must be set".to_string());
        }
        if self.script_name.trim().is_empty() {
            return Err("scriptName must be set".to_string());
        }
        if self.content.trim().is_empty() {
            return Err("content must not be empty".to_string());
        }
        let mut seen = BTreeSet::new();
        for binding in self.bindings.iter().flatten() {
            if binding.name().trim().is_empty() {
                return Err("binding names must not be empty".to_string());
            }
            if !seen.insert(binding.name()) {
                return Err(format!("duplicate binding name {}", binding.name()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "export default { fetch() { return new Response('ok') } }";

    fn plain(name: &str, text: &str) -> ScriptBinding {
        ScriptBinding::PlainText {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    fn params() -> WorkerScriptParameters {
        WorkerScriptParameters {
            account_id: "acc".to_string(),
            script_name: "hello".to_string(),
            content: SOURCE.to_string(),
            bindings: Some(vec![plain("A", "1"), plain("B", "2")]),
            ..Default::default()
        }
    }

    fn observed() -> WorkerScriptObservation {
        WorkerScriptObservation {
            id: Some("hello".to_string()),
            content_sha256: Some(content_digest(SOURCE)),
            bindings: Some(vec![plain("B", "2"), plain("A", "1")]),
            compatibility_date: Some("2024-09-23".to_string()),
            usage_model: Some("standard".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_bindings_compare_regardless_of_order() {
        assert!(params().is_up_to_date(&observed()));
    }

    #[test]
    fn test_changed_binding_value_drifts() {
        let mut remote = observed();
        remote.bindings = Some(vec![plain("B", "2"), plain("A", "changed")]);
        assert!(!params().is_up_to_date(&remote));
    }

    #[test]
    fn test_content_change_drifts() {
        let mut desired = params();
        desired.content.push_str("\n// v2");
        assert!(!desired.is_up_to_date(&observed()));
    }

    #[test]
    fn test_unset_bindings_drift_when_upstream_has_some() {
        let mut desired = params();
        desired.bindings = None;
        assert!(!desired.is_up_to_date(&observed()));
        let mut remote = observed();
        remote.bindings = Some(Vec::new());
        assert!(desired.is_up_to_date(&remote));
    }

    #[test]
    fn test_late_initialize_adopts_runtime_settings() {
        let mut desired = params();
        assert!(desired.late_initialize(&observed()));
        assert_eq!(desired.compatibility_date.as_deref(), Some("2024-09-23"));
        assert_eq!(desired.usage_model.as_deref(), Some("standard"));
    }

    #[test]
    fn test_duplicate_binding_names_are_rejected() {
        let mut desired = params();
        desired.bindings = Some(vec![
            plain("A", "1"),
            ScriptBinding::KvNamespace {
                name: "A".to_string(),
                namespace_id: "ns".to_string(),
            },
        ]);
        assert!(desired.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_empty_binding_name_is_rejected() {
        let mut desired = params();
        desired.bindings = Some(vec![plain("", "1")]);
        assert!(desired.validate().is_err());
        assert!(params().validate().is_ok());
    }
}
