//! Worker script client
//!
//! Scripts are addressed by name. Uploads are multipart: a `metadata` JSON part carrying
//! bindings and runtime settings, and a single ES module part. Reads combine the settings
//! endpoint with the raw module content, which is reduced to a SHA-256 digest.

use crate::crd::{ScriptBinding, WorkerScriptObservation, WorkerScriptParameters};
use crate::provider::{RestClient, UpstreamClient, UpstreamError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const MAIN_MODULE: &str = "worker.js";

/// Hex SHA-256 of script source
pub fn content_digest(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BindingWire {
    PlainText {
        name: String,
        text: String,
    },
    KvNamespace {
        name: String,
        namespace_id: String,
    },
    Service {
        name: String,
        service: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<String>,
    },
    R2Bucket {
        name: String,
        bucket_name: String,
    },
    /// Binding kinds this controller does not manage
    #[serde(other)]
    Unsupported,
}

impl From<&ScriptBinding> for BindingWire {
    fn from(binding: &ScriptBinding) -> Self {
        match binding.clone() {
            ScriptBinding::PlainText { name, text } => Self::PlainText { name, text },
            ScriptBinding::KvNamespace { name, namespace_id } => {
                Self::KvNamespace { name, namespace_id }
            }
            ScriptBinding::Service {
                name,
                service,
                environment,
            } => Self::Service {
                name,
                service,
                environment,
            },
            ScriptBinding::R2Bucket { name, bucket_name } => Self::R2Bucket { name, bucket_name },
        }
    }
}

impl BindingWire {
    fn into_binding(self) -> Option<ScriptBinding> {
        match self {
            Self::PlainText { name, text } => Some(ScriptBinding::PlainText { name, text }),
            Self::KvNamespace { name, namespace_id } => {
                Some(ScriptBinding::KvNamespace { name, namespace_id })
            }
            Self::Service {
                name,
                service,
                environment,
            } => Some(ScriptBinding::Service {
                name,
                service,
                environment,
            }),
            Self::R2Bucket { name, bucket_name } => {
                Some(ScriptBinding::R2Bucket { name, bucket_name })
            }
            Self::Unsupported => None,
        }
    }
}

/// `metadata` part of an upload
#[derive(Debug, Serialize)]
struct UploadMetadata {
    main_module: &'static str,
    bindings: Vec<BindingWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compatibility_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logpush: Option<bool>,
}

/// Script summary returned by uploads and listings
#[derive(Debug, Deserialize)]
struct ScriptWire {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    etag: Option<String>,
    #[serde(default)]
    compatibility_date: Option<String>,
    #[serde(default)]
    usage_model: Option<String>,
    #[serde(default)]
    logpush: Option<bool>,
    #[serde(default)]
    created_on: Option<String>,
    #[serde(default)]
    modified_on: Option<String>,
}

/// Response of the settings endpoint
#[derive(Debug, Deserialize)]
struct SettingsWire {
    #[serde(default)]
    bindings: Vec<BindingWire>,
    #[serde(default)]
    compatibility_date: Option<String>,
    #[serde(default)]
    usage_model: Option<String>,
    #[serde(default)]
    logpush: Option<bool>,
}

fn bindings_from_wire(wires: Vec<BindingWire>) -> Vec<ScriptBinding> {
    wires
        .into_iter()
        .filter_map(BindingWire::into_binding)
        .collect()
}

#[derive(Debug, Clone)]
pub struct WorkerScriptClient {
    rest: RestClient,
}

impl WorkerScriptClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    fn script_path(account_id: &str, script_name: &str) -> String {
        format!("accounts/{account_id}/workers/scripts/{script_name}")
    }

    fn upload_form(params: &WorkerScriptParameters) -> Result<Form, UpstreamError> {
        let metadata = UploadMetadata {
            main_module: MAIN_MODULE,
            bindings: params
                .bindings
                .iter()
                .flatten()
                .map(BindingWire::from)
                .collect(),
            compatibility_date: params.compatibility_date.clone(),
            usage_model: params.usage_model.clone(),
            logpush: params.logpush,
        };
        let metadata = serde_json::to_string(&metadata)
            .map_err(|e| UpstreamError::Decode(format!("script metadata: {e}")))?;

        Ok(Form::new()
            .part("metadata", Part::text(metadata).mime_str("application/json")?)
            .part(
                MAIN_MODULE,
                Part::text(params.content.clone())
                    .file_name(MAIN_MODULE)
                    .mime_str("application/javascript+module")?,
            ))
    }

    async fn upload(
        &self,
        script_name: &str,
        params: &WorkerScriptParameters,
    ) -> Result<WorkerScriptObservation, UpstreamError> {
        let wire: ScriptWire = self
            .rest
            .put_multipart(
                &Self::script_path(&params.account_id, script_name),
                Self::upload_form(params)?,
            )
            .await?;

        Ok(WorkerScriptObservation {
            id: wire.id.or_else(|| Some(script_name.to_string())),
            etag: wire.etag,
            content_sha256: Some(content_digest(&params.content)),
            bindings: params.bindings.clone(),
            compatibility_date: wire
                .compatibility_date
                .or_else(|| params.compatibility_date.clone()),
            usage_model: wire.usage_model.or_else(|| params.usage_model.clone()),
            logpush: wire.logpush.or(params.logpush),
            created_on: wire.created_on,
            modified_on: wire.modified_on,
        })
    }
}

#[async_trait]
impl UpstreamClient for WorkerScriptClient {
    type Parameters = WorkerScriptParameters;
    type Observation = WorkerScriptObservation;

    async fn create(
        &self,
        params: &WorkerScriptParameters,
    ) -> Result<WorkerScriptObservation, UpstreamError> {
        self.upload(&params.script_name, params).await
    }

    async fn get(
        &self,
        id: &str,
        params: &WorkerScriptParameters,
    ) -> Result<WorkerScriptObservation, UpstreamError> {
        let path = Self::script_path(&params.account_id, id);
        let settings: SettingsWire = self.rest.get(&format!("{path}/settings")).await?;
        let content = self.rest.get_text(&format!("{path}/content/v2")).await?;

        Ok(WorkerScriptObservation {
            id: Some(id.to_string()),
            etag: None,
            content_sha256: Some(content_digest(&content)),
            bindings: Some(bindings_from_wire(settings.bindings)),
            compatibility_date: settings.compatibility_date,
            usage_model: settings.usage_model,
            logpush: settings.logpush,
            created_on: None,
            modified_on: None,
        })
    }

    async fn update(
        &self,
        id: &str,
        params: &WorkerScriptParameters,
    ) -> Result<WorkerScriptObservation, UpstreamError> {
        self.upload(id, params).await
    }

    async fn delete(&self, id: &str, params: &WorkerScriptParameters) -> Result<(), UpstreamError> {
        self.rest
            .delete(&Self::script_path(&params.account_id, id))
            .await
    }

    async fn list(
        &self,
        params: &WorkerScriptParameters,
    ) -> Result<Vec<WorkerScriptObservation>, UpstreamError> {
        let wires: Vec<ScriptWire> = self
            .rest
            .list(&format!("accounts/{}/workers/scripts", params.account_id))
            .await?;
        Ok(wires
            .into_iter()
            .map(|wire| WorkerScriptObservation {
                id: wire.id,
                etag: wire.etag,
                compatibility_date: wire.compatibility_date,
                usage_model: wire.usage_model,
                logpush: wire.logpush,
                created_on: wire.created_on,
                modified_on: wire.modified_on,
                ..Default::default()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_digest_is_hex_sha256() {
        assert_eq!(
            content_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_unknown_upstream_bindings_are_dropped() {
        let settings: SettingsWire = serde_json::from_value(serde_json::json!({
            "bindings": [
                { "type": "plain_text", "name": "MODE", "text": "prod" },
                { "type": "durable_object_namespace", "name": "ROOMS", "class_name": "Room" },
                { "type": "r2_bucket", "name": "ASSETS", "bucket_name": "assets" }
            ],
            "usage_model": "standard"
        }))
        .unwrap();
        let bindings = bindings_from_wire(settings.bindings);
        assert_eq!(
            bindings,
            vec![
                ScriptBinding::PlainText {
                    name: "MODE".to_string(),
                    text: "prod".to_string()
                },
                ScriptBinding::R2Bucket {
                    name: "ASSETS".to_string(),
                    bucket_name: "assets".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_binding_wire_tags_are_snake_case() {
        let wire = BindingWire::from(&ScriptBinding::KvNamespace {
            name: "CACHE".to_string(),
            namespace_id: "ns".to_string(),
        });
        assert_eq!(
            serde_json::to_value(wire).unwrap(),
            serde_json::json!({ "type": "kv_namespace", "name": "CACHE", "namespace_id": "ns" })
        );
    }
}
