// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! ADK agent runtime client against a mock runtime

use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

use testgen_core::domain::agent::{AgentGateway, GatewayError, TEST_CASE_GENERATOR};
use testgen_core::infrastructure::agent::AdkAgentClient;

fn client(url: &str) -> AdkAgentClient {
    AdkAgentClient::new(url, "svc", Duration::from_secs(5)).unwrap()
}

fn session_path(agent: &str) -> Matcher {
    Matcher::Regex(format!(r"^/apps/{agent}/users/svc/sessions/svc_{agent}_\d+$"))
}

#[tokio::test]
async fn test_run_creates_session_then_posts_prompt() {
    let mut server = mockito::Server::new_async().await;
    let session = server
        .mock("POST", session_path(TEST_CASE_GENERATOR))
        .match_body(Matcher::Json(json!({"state": {}})))
        .with_status(200)
        .with_body(r#"{"id": "ignored"}"#)
        .create_async()
        .await;
    let events = json!([
        {"author": "test_case_generator_agent", "content": {"parts": [{"text": "TC_LOGIN_001: Valid login"}]}}
    ]);
    let run = server
        .mock("POST", "/run")
        .match_body(Matcher::PartialJson(json!({
            "app_name": TEST_CASE_GENERATOR,
            "user_id": "svc",
            "new_message": {"role": "user", "parts": [{"text": "Generate tests for login"}]}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(events.to_string())
        .create_async()
        .await;

    let response = client(&server.url())
        .run(TEST_CASE_GENERATOR, "Generate tests for login")
        .await
        .unwrap();

    session.assert_async().await;
    run.assert_async().await;
    assert_eq!(response.as_value(), &events);
    assert_eq!(response.text(), "TC_LOGIN_001: Valid login");
}

#[tokio::test]
async fn test_runtime_error_status_is_upstream_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", session_path("sequential_workflow"))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("POST", "/run")
        .with_status(500)
        .with_body("agent crashed")
        .create_async()
        .await;

    let err = client(&server.url())
        .run("sequential_workflow", "hello")
        .await
        .unwrap_err();
    match err {
        GatewayError::Upstream { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "agent crashed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_session_failure_stops_before_run() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", session_path("sequential_workflow"))
        .with_status(404)
        .with_body("unknown app")
        .create_async()
        .await;
    let run = server.mock("POST", "/run").expect(0).create_async().await;

    let err = client(&server.url())
        .run("sequential_workflow", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Upstream { status: 404, .. }));
    run.assert_async().await;
}

#[tokio::test]
async fn test_null_body_is_empty_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", session_path("sequential_workflow"))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("POST", "/run")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("null")
        .create_async()
        .await;

    let err = client(&server.url())
        .run("sequential_workflow", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::EmptyResponse));
}

#[tokio::test]
async fn test_health_check_accepts_client_errors() {
    let mut server = mockito::Server::new_async().await;
    let list_apps = server
        .mock("GET", "/list-apps")
        .with_status(404)
        .create_async()
        .await;
    assert!(client(&server.url()).health_check().await.is_ok());
    list_apps.assert_async().await;

    let mut failing = mockito::Server::new_async().await;
    failing
        .mock("GET", "/list-apps")
        .with_status(503)
        .create_async()
        .await;
    assert!(client(&failing.url()).health_check().await.is_err());
}

#[tokio::test]
async fn test_unreachable_runtime_is_network_error() {
    // Nothing listens on port 9 (discard) in the test environment
    let err = client("http://127.0.0.1:9")
        .run("sequential_workflow", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Network(_) | GatewayError::Timeout(_)));
}
