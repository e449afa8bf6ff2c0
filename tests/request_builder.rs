mod common;

use common::ENV_LOCK;
use reqwest::header::AUTHORIZATION;
use sandbox::catalog::{endpoint_by_id, EndpointDescriptor};
use sandbox::errors::SandboxErrorKind;
use sandbox::managers::sandbox::{OutcomeKind, SandboxManager};
use sandbox::services::identity::{ChannelType, IdentityProvider, StubIdentityProvider};
use sandbox::services::logger::Logger;
use sandbox::services::token_store::{
    bootstrap_tokens, default_credentials, TokenClient, TokenStore,
};
use serde_json::json;
use std::sync::Arc;

fn manager() -> (SandboxManager, Arc<TokenStore>) {
    let store = Arc::new(TokenStore::new());
    let manager = SandboxManager::new(
        Logger::new("test"),
        Arc::clone(&store),
        Arc::new(StubIdentityProvider),
    )
    .expect("manager builds");
    (manager, store)
}

fn unreachable_endpoint() -> EndpointDescriptor {
    serde_json::from_value(json!({
        "id": "unreachable",
        "name": "Unreachable",
        "description": "Nothing listens on this port",
        "method": "POST",
        "url": "http://127.0.0.1:9/echo",
        "parameters": []
    }))
    .expect("descriptor parses")
}

#[test]
fn empty_query_values_are_omitted() {
    let (manager, _store) = manager();
    let endpoint = endpoint_by_id("reqres-users").expect("reqres-users in catalog");
    let identity = StubIdentityProvider.identity(ChannelType::Web);

    let tree = json!({"page": 2, "per_page": ""});
    let plan = manager
        .plan_request(endpoint, &tree, None, &identity)
        .expect("plan builds");
    assert!(plan.url.contains("page=2"));
    assert!(!plan.url.contains("per_page"));
    assert!(plan.body.is_none());
}

#[test]
fn path_param_uses_its_value_and_falls_back_to_its_default() {
    let (manager, _store) = manager();
    let endpoint = endpoint_by_id("biller-details").expect("biller-details in catalog");
    let identity = StubIdentityProvider.identity(ChannelType::Web);

    let plan = manager
        .plan_request(endpoint, &json!({"billerId": "AIRTEL00PREP02"}), None, &identity)
        .expect("plan builds");
    assert!(plan.url.contains("/billers/AIRTEL00PREP02"));

    let plan = manager
        .plan_request(endpoint, &json!({"billerId": ""}), None, &identity)
        .expect("plan builds");
    assert!(plan.url.contains("/billers/VODAFONE00POST01"));
}

#[test]
fn channel_placeholder_resolves_for_fetch_and_payment_only() {
    let (manager, _store) = manager();
    let identity = StubIdentityProvider.identity(ChannelType::Agent);

    let fetch = endpoint_by_id("bill-fetch").expect("bill-fetch in catalog");
    let plan = manager
        .plan_request(fetch, &json!({}), None, &identity)
        .expect("plan builds");
    assert!(plan.url.contains("/bills/agent/fetch"));

    let other: EndpointDescriptor = serde_json::from_value(json!({
        "id": "placeholder-other",
        "name": "Placeholder outside fetch/payment",
        "description": "Placeholder must survive untouched",
        "method": "GET",
        "url": "https://api.example.test/v1/{channel}/ping",
        "parameters": []
    }))
    .expect("descriptor parses");
    let plan = manager
        .plan_request(&other, &json!({}), None, &identity)
        .expect("plan builds");
    assert!(!plan.url.contains("/agent/"));
}

#[test]
fn bearer_token_is_attached_when_present() {
    let (manager, store) = manager();
    let endpoint = endpoint_by_id("bill-fetch").expect("bill-fetch in catalog");
    let identity = StubIdentityProvider.identity(ChannelType::Mobile);

    let plan = manager
        .plan_request(endpoint, &json!({}), None, &identity)
        .expect("plan builds");
    assert!(plan.headers.get(AUTHORIZATION).is_none());

    store.set(ChannelType::Mobile, "token-123".to_string());
    let plan = manager
        .plan_request(endpoint, &json!({}), None, &identity)
        .expect("plan builds");
    let auth = plan
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    assert_eq!(auth, Some("Bearer token-123"));
}

#[test]
fn header_params_are_injected_after_endpoint_headers() {
    let (manager, _store) = manager();
    let endpoint: EndpointDescriptor = serde_json::from_value(json!({
        "id": "header-params",
        "name": "Header parameters",
        "description": "Correlation id travels as a header",
        "method": "GET",
        "url": "https://api.example.test/v1/status",
        "parameters": [
            {
                "name": "X-Correlation-Id",
                "type": "string",
                "required": false,
                "description": "Correlation id",
                "location": "header"
            },
            {
                "name": "X-Tenant",
                "type": "string",
                "required": false,
                "description": "Tenant id",
                "location": "header"
            }
        ],
        "headers": { "Content-Type": "application/json" }
    }))
    .expect("descriptor parses");
    let identity = StubIdentityProvider.identity(ChannelType::Web);

    let tree = json!({"X-Correlation-Id": "corr-42", "X-Tenant": ""});
    let plan = manager
        .plan_request(&endpoint, &tree, None, &identity)
        .expect("plan builds");
    let correlation = plan
        .headers
        .get("X-Correlation-Id")
        .and_then(|value| value.to_str().ok());
    assert_eq!(correlation, Some("corr-42"));
    assert!(plan.headers.get("X-Tenant").is_none());
    assert!(plan.headers.get("Content-Type").is_some());
}

#[tokio::test]
async fn second_execute_while_one_is_in_flight_is_rejected() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener binds");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                .await;
        }
    });

    let (manager, _store) = manager();
    let manager = Arc::new(manager);
    let endpoint: EndpointDescriptor = serde_json::from_value(json!({
        "id": "slow",
        "name": "Slow endpoint",
        "description": "Responds after a delay",
        "method": "GET",
        "url": format!("http://{}/slow", addr),
        "parameters": []
    }))
    .expect("descriptor parses");
    let identity = StubIdentityProvider.identity(ChannelType::Web);

    let first = tokio::spawn({
        let manager = Arc::clone(&manager);
        let endpoint = endpoint.clone();
        let identity = identity.clone();
        async move { manager.execute(&endpoint, &json!({}), None, &identity).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let err = manager
        .execute(&endpoint, &json!({}), None, &identity)
        .await
        .expect_err("second call is rejected while the first is pending");
    assert_eq!(err.kind, SandboxErrorKind::Busy);

    let outcome = first
        .await
        .expect("first task completes")
        .expect("first call yields an outcome");
    assert_eq!(outcome.http_status, 200);

    let outcome = manager
        .execute(&unreachable_endpoint(), &json!({}), Some(r#"{"a":1}"#), &identity)
        .await
        .expect("manager accepts calls again");
    assert_eq!(outcome.kind, OutcomeKind::TransportFailure);
}

#[test]
fn invalid_body_text_fails_planning() {
    let (manager, _store) = manager();
    let endpoint = endpoint_by_id("bill-fetch").expect("bill-fetch in catalog");
    let identity = StubIdentityProvider.identity(ChannelType::Web);

    let err = manager
        .plan_request(endpoint, &json!({}), Some("{oops"), &identity)
        .expect_err("invalid JSON body is rejected");
    assert_eq!(err.kind, SandboxErrorKind::InvalidPayload);
}

#[tokio::test]
async fn invalid_payload_terminates_in_an_outcome() {
    let (manager, _store) = manager();
    let endpoint = endpoint_by_id("bill-fetch").expect("bill-fetch in catalog");
    let identity = StubIdentityProvider.identity(ChannelType::Web);

    let outcome = manager
        .execute(endpoint, &json!({}), Some("{oops"), &identity)
        .await
        .expect("outcome even for a bad payload");
    assert_eq!(outcome.http_status, 0);
    assert_eq!(outcome.kind, OutcomeKind::InvalidPayload);
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn transport_failure_terminates_in_an_outcome() {
    let (manager, _store) = manager();
    let endpoint = unreachable_endpoint();
    let identity = StubIdentityProvider.identity(ChannelType::Web);

    let outcome = manager
        .execute(&endpoint, &json!({}), Some(r#"{"a":1}"#), &identity)
        .await
        .expect("outcome even without a connection");
    assert_eq!(outcome.http_status, 0);
    assert_eq!(outcome.kind, OutcomeKind::TransportFailure);
    assert!(!outcome.status_text.is_empty());
}

#[tokio::test]
async fn token_bootstrap_failures_are_not_fatal() {
    let _env = ENV_LOCK.lock().await;
    std::env::set_var("SANDBOX_AUTH_URL", "http://127.0.0.1:9/token");

    let store = TokenStore::new();
    let logger = Logger::new("test");
    let client = TokenClient::new(logger.child("auth")).expect("client builds");
    bootstrap_tokens(&client, &store, &default_credentials(), &logger).await;
    for channel in ChannelType::ALL {
        assert_eq!(store.get(channel), None);
    }

    std::env::remove_var("SANDBOX_AUTH_URL");
}
