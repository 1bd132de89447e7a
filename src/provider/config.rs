//! # Provider Credentials
//!
//! Resolves a `providerConfigRef` into the token and endpoint an upstream client needs.

use crate::crd::{CredentialsSource, ProviderConfig, ProviderConfigReference};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use thiserror::Error;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ProviderConfig {0} not found")]
    NotFound(String),
    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },
    #[error("secret {namespace}/{name} has no key {key}")]
    MissingKey {
        namespace: String,
        name: String,
        key: String,
    },
    #[error("environment variable {0} is not set")]
    MissingEnv(String),
    #[error("credential is not valid UTF-8 or is empty: {0}")]
    Invalid(String),
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Token and endpoint for one `ProviderConfig`
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ProviderCredentials {
    pub api_token: String,
    #[zeroize(skip)]
    pub endpoint: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// `GetConfig`: failures are fatal for the current reconcile tick
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn get_config(
        &self,
        reference: &ProviderConfigReference,
    ) -> Result<ProviderCredentials, ConfigError>;
}

/// Reads `ProviderConfig` resources and the Secrets they point at
#[derive(Clone)]
pub struct KubeConfigResolver {
    client: Client,
    default_endpoint: String,
}

impl std::fmt::Debug for KubeConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeConfigResolver")
            .field("default_endpoint", &self.default_endpoint)
            .finish_non_exhaustive()
    }
}

impl KubeConfigResolver {
    pub fn new(client: Client, default_endpoint: impl Into<String>) -> Self {
        Self {
            client,
            default_endpoint: default_endpoint.into(),
        }
    }

    async fn secret_token(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, ConfigError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets
            .get_opt(name)
            .await?
            .ok_or_else(|| ConfigError::SecretNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .map(|value| value.0.clone())
            .ok_or_else(|| ConfigError::MissingKey {
                namespace: namespace.to_string(),
                name: name.to_string(),
                key: key.to_string(),
            })?;

        token_from_bytes(bytes, &format!("{namespace}/{name}[{key}]"))
    }
}

/// Trim and validate a raw token
fn token_from_bytes(bytes: Vec<u8>, origin: &str) -> Result<String, ConfigError> {
    let mut token =
        String::from_utf8(bytes).map_err(|_| ConfigError::Invalid(origin.to_string()))?;
    let trimmed = token.trim().to_string();
    token.zeroize();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(origin.to_string()));
    }
    Ok(trimmed)
}

#[async_trait]
impl ConfigResolver for KubeConfigResolver {
    async fn get_config(
        &self,
        reference: &ProviderConfigReference,
    ) -> Result<ProviderCredentials, ConfigError> {
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        let config = configs
            .get_opt(&reference.name)
            .await?
            .ok_or_else(|| ConfigError::NotFound(reference.name.clone()))?;

        let api_token = match &config.spec.credentials {
            CredentialsSource::Secret { secret_ref } => {
                self.secret_token(&secret_ref.namespace, &secret_ref.name, &secret_ref.key)
                    .await?
            }
            CredentialsSource::Environment { variable } => {
                let value = std::env::var(variable)
                    .map_err(|_| ConfigError::MissingEnv(variable.clone()))?;
                token_from_bytes(value.into_bytes(), variable)?
            }
        };

        let endpoint = config
            .spec
            .endpoint
            .clone()
            .unwrap_or_else(|| self.default_endpoint.clone());
        debug!(provider_config = %reference.name, endpoint = %endpoint, "resolved provider credentials");

        Ok(ProviderCredentials {
            api_token,
            endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let credentials = ProviderCredentials {
            api_token: "super-secret".to_string(),
            endpoint: "https://api.example.test".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("api.example.test"));
    }

    #[test]
    fn test_token_is_trimmed() {
        let token = token_from_bytes(b"  abc123\n".to_vec(), "test").unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_blank_token_is_rejected() {
        assert!(matches!(
            token_from_bytes(b" \n".to_vec(), "test"),
            Err(ConfigError::Invalid(_))
        ));
    }
}
