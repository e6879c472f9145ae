// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Azure DevOps client against a mock REST API

use mockito::Matcher;
use serde_json::json;

use testgen_core::domain::alm::{AlmClient, AlmError};
use testgen_core::domain::test_case::{TestCase, TestStep};
use testgen_core::infrastructure::alm::AzureDevOpsClient;

// base64(":pat")
const AUTH: &str = "Basic OnBhdA==";

fn client(url: &str) -> AzureDevOpsClient {
    AzureDevOpsClient::new(url, "contoso", "Billing", "pat")
}

fn login_test_case() -> TestCase {
    TestCase {
        title: "Valid login".to_string(),
        description: "Log in with valid credentials".to_string(),
        steps: vec![TestStep {
            action: "Submit the login form".to_string(),
            expected: "Dashboard is shown".to_string(),
        }],
        priority: 1,
    }
}

#[tokio::test]
async fn test_connection_reads_project() {
    let mut server = mockito::Server::new_async().await;
    let project = server
        .mock("GET", "/contoso/_apis/projects/Billing")
        .match_header("authorization", AUTH)
        .match_query(Matcher::UrlEncoded("api-version".into(), "7.1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": "p-1", "name": "Billing", "url": "https://dev.azure.com/contoso/_apis/projects/p-1"}).to_string())
        .create_async()
        .await;

    let info = client(&server.url()).test_connection().await.unwrap();
    project.assert_async().await;
    assert_eq!(info.id.as_deref(), Some("p-1"));
    assert_eq!(info.name.as_deref(), Some("Billing"));
}

#[tokio::test]
async fn test_bad_token_is_authentication_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/contoso/_apis/projects/Billing")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let err = client(&server.url()).test_connection().await.unwrap_err();
    assert!(matches!(err, AlmError::Authentication(_)));
}

#[tokio::test]
async fn test_fetch_user_story_collects_linked_test_cases() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/contoso/Billing/_apis/wit/workitems/42")
        .match_query(Matcher::UrlEncoded("$expand".into(), "relations".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": 42,
                "fields": {
                    "System.Title": "Login",
                    "System.State": "Active",
                    "System.WorkItemType": "User Story",
                    "System.AssignedTo": {"displayName": "Dana"},
                    "Microsoft.VSTS.Common.AcceptanceCriteria": "Users can log in"
                },
                "relations": [
                    {"rel": "Microsoft.VSTS.Common.TestedBy-Forward", "url": "https://dev.azure.com/contoso/_apis/wit/workItems/77"},
                    {"rel": "System.LinkTypes.Related", "url": "https://dev.azure.com/contoso/_apis/wit/workItems/99"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let story = client(&server.url()).fetch_user_story(42).await.unwrap();
    assert_eq!(story.title.as_deref(), Some("Login"));
    assert_eq!(story.assigned_to.as_deref(), Some("Dana"));
    assert_eq!(story.acceptance_criteria, "Users can log in");
    assert_eq!(story.linked_test_case_ids, vec![77]);
}

#[tokio::test]
async fn test_missing_user_story_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/contoso/Billing/_apis/wit/workitems/404")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let err = client(&server.url()).fetch_user_story(404).await.unwrap_err();
    assert!(matches!(err, AlmError::NotFound(_)));
}

#[tokio::test]
async fn test_create_test_case_links_to_story() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("PATCH", Matcher::Regex(r"/contoso/Billing/_apis/wit/workitems/\$Test(%20| )Case$".into()))
        .match_query(Matcher::Any)
        .match_header("content-type", "application/json-patch+json")
        .match_body(Matcher::Regex(r#""path":"/fields/System.Title","value":"Valid login""#.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": 501, "fields": {"System.Title": "Valid login"}, "url": "https://dev.azure.com/contoso/_apis/wit/workItems/501"}).to_string())
        .create_async()
        .await;
    let link = server
        .mock("PATCH", "/contoso/Billing/_apis/wit/workitems/501")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": 501}).to_string())
        .create_async()
        .await;

    let created = client(&server.url())
        .create_test_case(42, &login_test_case())
        .await
        .unwrap();

    create.assert_async().await;
    link.assert_async().await;
    assert_eq!(created.test_case_id, 501);
    assert_eq!(created.user_story_id, 42);
    assert!(created.link_success);
    assert!(created.link_warning.is_none());
}

#[tokio::test]
async fn test_link_failure_still_reports_created_test_case() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PATCH", Matcher::Regex(r"\$Test(%20| )Case$".into()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": 502}).to_string())
        .create_async()
        .await;
    server
        .mock("PATCH", "/contoso/Billing/_apis/wit/workitems/502")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body("relation rejected")
        .create_async()
        .await;

    let created = client(&server.url())
        .create_test_case(42, &login_test_case())
        .await
        .unwrap();
    assert_eq!(created.test_case_id, 502);
    assert!(!created.link_success);
    assert!(created.link_warning.unwrap().contains("relation rejected"));
}

#[tokio::test]
async fn test_search_work_items_posts_wiql() {
    let mut server = mockito::Server::new_async().await;
    let search = server
        .mock("POST", "/contoso/Billing/_apis/wit/wiql")
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex(r"CONTAINS 'O''Brien'".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"workItems": [{"id": 1, "url": "u1"}, {"id": 2}]}).to_string())
        .create_async()
        .await;

    let items = client(&server.url())
        .search_work_items("O'Brien", &["User Story".to_string()])
        .await
        .unwrap();

    search.assert_async().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].url.as_deref(), Some("u1"));
    assert_eq!(items[1].url, None);
}
