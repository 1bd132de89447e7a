//! Pact contract tests for the upstream edge provider API
//!
//! These tests define the contract between the controller's REST clients and the upstream
//! API. Pact starts a mock server and the real clients are pointed at it.

mod common;

use common::init_rustls;
use edge_provider_controller::controller::retry::RateLimitClassify;
use edge_provider_controller::crd::{LoadBalancerParameters, MonitorParameters, PoolParameters};
use edge_provider_controller::provider::{
    LoadBalancerClient, MonitorClient, PoolClient, ProviderCredentials, RestClient,
    UpstreamClient,
};
use pact_consumer::prelude::*;
use serde_json::json;

fn rest_client(base_url: String, kind: &'static str) -> RestClient {
    let credentials = ProviderCredentials {
        api_token: "test-token".to_string(),
        endpoint: base_url,
    };
    RestClient::new(&credentials)
        .expect("Failed to build REST client")
        .for_kind(kind)
}

#[tokio::test]
async fn test_create_monitor_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Edge-Provider-Controller", "Edge-Provider-API");

    pact_builder.interaction("create a health check monitor", "", |mut i| {
        i.given("an account exists");
        i.request
            .method("POST")
            .path("/accounts/acc/load_balancers/monitors")
            .header("authorization", "Bearer test-token")
            .json_body(json!({
                "type": "https",
                "path": "/health",
                "interval": 60
            }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "success": true,
                "errors": [],
                "result": {
                    "id": "mon-1",
                    "type": "https",
                    "method": "GET",
                    "path": "/health",
                    "interval": 60,
                    "timeout": 5,
                    "retries": 2,
                    "expected_codes": "200",
                    "created_on": "2024-01-01T00:00:00Z"
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = MonitorClient::new(rest_client(mock_server.url().to_string(), "Monitor"));

    let params = MonitorParameters {
        account_id: "acc".to_string(),
        r#type: Some("https".to_string()),
        path: Some("/health".to_string()),
        interval: Some(60),
        ..Default::default()
    };
    let created = client.create(&params).await.expect("Failed to create monitor");

    assert_eq!(created.id.as_deref(), Some("mon-1"));
    assert_eq!(created.method.as_deref(), Some("GET"));
    assert_eq!(created.expected_codes.as_deref(), Some("200"));
}

#[tokio::test]
async fn test_get_missing_pool_maps_to_not_found_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Edge-Provider-Controller", "Edge-Provider-API");

    pact_builder.interaction("get a pool that does not exist", "", |mut i| {
        i.given("pool 4291bc does not exist");
        i.request
            .method("GET")
            .path("/accounts/acc/load_balancers/pools/4291bc")
            .header("authorization", "Bearer test-token");
        i.response
            .status(404)
            .header("content-type", "application/json")
            .json_body(json!({
                "success": false,
                "errors": [{ "code": 1002, "message": "Pool not found" }],
                "result": null
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = PoolClient::new(rest_client(mock_server.url().to_string(), "Pool"));

    let params = PoolParameters {
        account_id: "acc".to_string(),
        name: "eu".to_string(),
        ..Default::default()
    };
    let error = client
        .get("4291bc", &params)
        .await
        .expect_err("pool should be missing");

    assert!(error.is_not_found());
    assert!(!error.is_rate_limit(), "identifiers containing 429 are not rate limits");
}

#[tokio::test]
async fn test_rate_limited_response_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Edge-Provider-Controller", "Edge-Provider-API");

    pact_builder.interaction("list monitors while rate limited", "", |mut i| {
        i.given("the account has exceeded its request quota");
        i.request
            .method("GET")
            .path("/accounts/acc/load_balancers/monitors")
            .header("authorization", "Bearer test-token");
        i.response
            .status(429)
            .header("content-type", "application/json")
            .json_body(json!({
                "success": false,
                "errors": [{ "code": 10000, "message": "Rate limited. Please wait and consider throttling your request speed" }],
                "result": null
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = MonitorClient::new(rest_client(mock_server.url().to_string(), "Monitor"));

    let params = MonitorParameters {
        account_id: "acc".to_string(),
        ..Default::default()
    };
    let error = client
        .list(&params)
        .await
        .expect_err("request should be rate limited");

    assert!(error.is_rate_limited());
    assert!(error.is_rate_limit());
}

#[tokio::test]
async fn test_delete_load_balancer_contract() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("Edge-Provider-Controller", "Edge-Provider-API");

    pact_builder.interaction("delete a load balancer", "", |mut i| {
        i.given("load balancer lb-1 exists in zone zone");
        i.request
            .method("DELETE")
            .path("/zones/zone/load_balancers/lb-1")
            .header("authorization", "Bearer test-token");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "success": true,
                "errors": [],
                "result": { "id": "lb-1" }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = LoadBalancerClient::new(rest_client(mock_server.url().to_string(), "LoadBalancer"));

    let params = LoadBalancerParameters {
        zone_id: "zone".to_string(),
        name: "www.example.com".to_string(),
        ..Default::default()
    };
    client
        .delete("lb-1", &params)
        .await
        .expect("Failed to delete load balancer");
}
