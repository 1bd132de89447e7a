//! Upstream REST Client
//!
//! Thin reqwest wrapper shared by every kind-specific client. Responses use the
//! `{ success, errors, result }` envelope. Status codes are mapped onto [`UpstreamError`]:
//! 404 is `NotFound`, 429 is `RateLimited`, any other failure is `Api`.

use crate::observability::metrics;
use crate::provider::{Connector, ProviderCredentials, UpstreamClient, UpstreamError};
use reqwest::{multipart::Form, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response envelope used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Error-only view of the envelope, used when a request failed
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

fn join_messages(errors: &[ApiMessage]) -> String {
    errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Map a non-success status to the error taxonomy
fn error_for_status(status: StatusCode, body: &str, what: &str) -> UpstreamError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .filter(|envelope| !envelope.errors.is_empty())
        .map(|envelope| join_messages(&envelope.errors))
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::NOT_FOUND => UpstreamError::NotFound(format!("{what}: {message}")),
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited(format!("{what}: {message}")),
        _ => UpstreamError::Api {
            status: status.as_u16(),
            path: what.to_string(),
            message,
        },
    }
}

/// Authenticated HTTP client for the upstream API
#[derive(Clone)]
pub struct RestClient {
    http_client: Client,
    base_url: String,
    api_token: String,
    kind: &'static str,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a client for the endpoint and token in `credentials`
    ///
    /// # Errors
    /// Returns `Transport` if the HTTP client cannot be built
    pub fn new(credentials: &ProviderCredentials) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .user_agent(concat!("edge-provider-controller/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url: credentials.endpoint.trim_end_matches('/').to_string(),
            api_token: credentials.api_token.clone(),
            kind: "unknown",
        })
    }

    /// Label requests made through this client with a resource kind
    pub fn for_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(method = %method, url = %url, kind = self.kind, "upstream request");
        self.http_client
            .request(method, url)
            .bearer_auth(&self.api_token)
    }

    /// Send a request and decode the envelope's `result`
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, UpstreamError> {
        let start = Instant::now();
        let outcome = self.execute_inner(request, what).await;
        metrics::record_upstream_operation(
            self.kind,
            operation,
            start.elapsed().as_secs_f64(),
            outcome.is_ok(),
        );
        outcome
    }

    async fn execute_inner<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, UpstreamError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_for_status(status, &body, what));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Decode(format!("{what}: {e}")))?;

        if !envelope.success {
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                path: what.to_string(),
                message: join_messages(&envelope.errors),
            });
        }

        envelope
            .result
            .ok_or_else(|| UpstreamError::Decode(format!("{what}: response has no result")))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
        self.execute("get", self.request(Method::GET, path), path)
            .await
    }

    pub async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, UpstreamError> {
        self.execute("list", self.request(Method::GET, path), path)
            .await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, UpstreamError> {
        self.execute("create", self.request(Method::POST, path).json(body), path)
            .await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, UpstreamError> {
        self.execute("update", self.request(Method::PUT, path).json(body), path)
            .await
    }

    /// PUT a multipart form (script uploads)
    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, UpstreamError> {
        self.execute("upload", self.request(Method::PUT, path).multipart(form), path)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), UpstreamError> {
        self.execute::<serde_json::Value>("delete", self.request(Method::DELETE, path), path)
            .await
            .map(|_| ())
    }

    /// GET a raw, non-enveloped body
    pub async fn get_text(&self, path: &str) -> Result<String, UpstreamError> {
        let start = Instant::now();
        let outcome = async {
            let response = self.request(Method::GET, path).send().await?;
            let status = response.status();
            let body = response.text().await?;
            if status.is_success() {
                Ok(body)
            } else {
                Err(error_for_status(status, &body, path))
            }
        }
        .await;
        metrics::record_upstream_operation(
            self.kind,
            "download",
            start.elapsed().as_secs_f64(),
            outcome.is_ok(),
        );
        outcome
    }
}

/// [`Connector`] building a kind-specific client over a fresh [`RestClient`]
pub struct RestConnector<C> {
    kind: &'static str,
    make: fn(RestClient) -> C,
}

impl<C> RestConnector<C> {
    pub fn new(kind: &'static str, make: fn(RestClient) -> C) -> Self {
        Self { kind, make }
    }
}

impl<C> std::fmt::Debug for RestConnector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnector")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<C: UpstreamClient> Connector for RestConnector<C> {
    type Client = C;

    fn connect(&self, credentials: &ProviderCredentials) -> Result<C, UpstreamError> {
        let rest = RestClient::new(credentials)?.for_kind(self.kind);
        Ok((self.make)(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404_maps_to_not_found() {
        let body = r#"{"success":false,"errors":[{"code":1002,"message":"Pool not found"}],"result":null}"#;
        let error = error_for_status(StatusCode::NOT_FOUND, body, "accounts/a/load_balancers/pools/p");
        assert!(error.is_not_found());
        assert!(error.to_string().contains("Pool not found"));
    }

    #[test]
    fn test_429_maps_to_rate_limited() {
        let error = error_for_status(StatusCode::TOO_MANY_REQUESTS, "slow down", "zones/z");
        assert!(error.is_rate_limited());
    }

    #[test]
    fn test_other_status_keeps_code_and_raw_body() {
        let error = error_for_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>", "zones/z");
        match error {
            UpstreamError::Api { status, message, .. } => {
                assert_eq!(status, 502);
                assert!(message.contains("bad gateway"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
