//! # Common Managed Resource Types
//!
//! Types shared by every managed kind: provider config references, cross-resource
//! references and selectors, deletion policy, conditions and the status envelope.

use crate::constants::DEFAULT_PROVIDER_CONFIG_NAME;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to the `ProviderConfig` holding the credentials for a managed resource
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    /// Name of the cluster-scoped `ProviderConfig`
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER_CONFIG_NAME.to_string(),
        }
    }
}

/// What happens upstream when the managed resource is deleted
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Delete the upstream object (default)
    #[default]
    Delete,
    /// Leave the upstream object in place
    Orphan,
}

/// Named pointer to another managed resource
///
/// The referenced resource's `status.atProvider.id` supplies the value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Name of the referenced managed resource
    pub name: String,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Label query over managed resources of the referenced kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Labels that must all be present with equal values
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

impl Selector {
    /// Whether `labels` satisfies every `matchLabels` entry
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    /// Render as a Kubernetes label selector string (`a=b,c=d`)
    pub fn to_label_selector(&self) -> String {
        self.match_labels
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_SYNCED: &str = "Synced";

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (Ready, Synced)
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    fn new(r#type: &str, status: bool, reason: &str, message: Option<String>) -> Self {
        Self {
            r#type: r#type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message,
        }
    }

    /// The upstream object exists and matches the spec
    pub fn available() -> Self {
        Self::new(CONDITION_READY, true, "Available", None)
    }

    /// The upstream object is being created
    pub fn creating() -> Self {
        Self::new(CONDITION_READY, false, "Creating", None)
    }

    /// The upstream object is being deleted
    pub fn deleting() -> Self {
        Self::new(CONDITION_READY, false, "Deleting", None)
    }

    /// The last reconcile tick completed
    pub fn reconcile_success() -> Self {
        Self::new(CONDITION_SYNCED, true, "ReconcileSuccess", None)
    }

    /// The last reconcile tick failed
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(CONDITION_SYNCED, false, "ReconcileError", Some(message.into()))
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    /// Same type, status, reason and message (transition time ignored)
    fn same_state(&self, other: &Self) -> bool {
        self.r#type == other.r#type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Status envelope shared by every managed kind
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedStatus<O> {
    /// Last observed upstream state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<O>,
    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation of the spec the conditions describe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl<O> Default for ManagedStatus<O> {
    fn default() -> Self {
        Self {
            at_provider: None,
            conditions: Vec::new(),
            observed_generation: None,
        }
    }
}

impl<O> ManagedStatus<O> {
    /// Look up a condition by type
    pub fn condition(&self, r#type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == r#type)
    }

    /// Insert or replace a condition, keeping the transition time when nothing changed
    pub fn set_condition(&mut self, condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            Some(existing) if existing.same_state(&condition) => {}
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }
}
