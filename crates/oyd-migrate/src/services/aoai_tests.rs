//! Tests for OpenAI discovery.

use super::*;
use crate::azure::credential::StaticTokenProvider;
use crate::retry::RetryConfig;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUB: &str = "sub-1";
const ACCOUNT_ID: &str =
    "/subscriptions/sub-1/resourceGroups/rg-ai/providers/Microsoft.CognitiveServices/accounts/contoso-aoai";

fn discovery(server: &MockServer) -> AoaiDiscovery {
    let credential: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::new("t"));
    let arm = RestClient::management(credential.clone())
        .with_base_url(&server.uri())
        .with_retry(RetryConfig::no_retry());
    AoaiDiscovery::new(credential, arm, SUB)
}

async fn mount_accounts(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/providers/Microsoft.CognitiveServices/accounts"))
        .and(query_param("api-version", "2023-05-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "name": "contoso-aoai",
                    "id": ACCOUNT_ID,
                    "kind": "OpenAI",
                    "properties": {"endpoint": format!("{}/", server.uri())}
                },
                {
                    "name": "contoso-speech",
                    "id": "/subscriptions/sub-1/resourceGroups/rg-ai/providers/Microsoft.CognitiveServices/accounts/contoso-speech",
                    "kind": "SpeechServices"
                }
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_deployments(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{ACCOUNT_ID}/deployments")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"name": "chat", "properties": {"model": {"name": "gpt-4o", "version": "2024-08-06"}}},
                {"name": "plain", "properties": {"model": {"name": "gpt-4o-mini"}}}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_extensions(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/openai/deployments/chat/extensions"))
        .and(query_param("api-version", "2024-10-21"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data_sources": [{
                "type": "azure_search",
                "parameters": {
                    "endpoint": "https://contoso-search.search.windows.net",
                    "index_name": "products",
                    "query_type": "vector_semantic_hybrid",
                    "role_information": "You answer product questions."
                }
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/openai/deployments/plain/extensions"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

// ==================== Account Tests ====================

#[tokio::test]
async fn test_list_accounts_filters_openai_kind() {
    // Arrange
    let server = MockServer::start().await;
    mount_accounts(&server).await;

    // Act
    let accounts = discovery(&server).list_accounts(None).await.unwrap();

    // Assert
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "contoso-aoai");
    assert_eq!(accounts[0].resource_group, "rg-ai");
    assert_eq!(accounts[0].endpoint, server.uri());
}

#[tokio::test]
async fn test_list_accounts_failure_is_discovery_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = discovery(&server).list_accounts(None).await.unwrap_err();

    assert!(matches!(err, Error::Discovery { .. }));
    assert!(err.to_string().starts_with("Failed to discover AOAI resources"));
    assert_eq!(err.details().unwrap()["subscription_id"], "sub-1");
}

#[tokio::test]
async fn test_list_accounts_scoped_to_resource_group() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/subscriptions/sub-1/resourceGroups/rg-ai/providers/Microsoft.CognitiveServices/accounts",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(1)
        .mount(&server)
        .await;

    let accounts = discovery(&server).list_accounts(Some("rg-ai")).await.unwrap();

    assert!(accounts.is_empty());
}

// ==================== Discovery Tests ====================

#[tokio::test]
async fn test_discover_keeps_only_oyd_deployments() {
    // Arrange
    let server = MockServer::start().await;
    mount_accounts(&server).await;
    mount_deployments(&server).await;
    mount_extensions(&server).await;

    // Act
    let found = discovery(&server).discover_oyd_deployments(None).await.unwrap();

    // Assert
    assert_eq!(found.len(), 1);
    let dep = &found[0];
    assert_eq!(dep.deployment_name, "chat");
    assert_eq!(dep.model_name, "gpt-4o");
    assert_eq!(dep.model_version.as_deref(), Some("2024-08-06"));
    let source = dep.oyd_config.as_ref().unwrap().primary_search_source().unwrap();
    assert_eq!(source.index_name, "products");
}

#[tokio::test]
async fn test_discover_skips_failing_account() {
    let server = MockServer::start().await;
    mount_accounts(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("{ACCOUNT_ID}/deployments")))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let found = discovery(&server).discover_oyd_deployments(None).await.unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_get_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/subscriptions/sub-1/resourceGroups/rg-ai/providers/Microsoft.CognitiveServices/accounts",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "name": "contoso-aoai",
                "id": ACCOUNT_ID,
                "kind": "OpenAI",
                "properties": {"endpoint": server.uri()}
            }]
        })))
        .mount(&server)
        .await;
    mount_deployments(&server).await;
    mount_extensions(&server).await;
    let d = discovery(&server);

    let found = d.get_deployment("rg-ai", "contoso-aoai", "chat").await.unwrap();
    let missing = d.get_deployment("rg-ai", "contoso-aoai", "nope").await.unwrap();
    let plain = d.get_deployment("rg-ai", "contoso-aoai", "plain").await.unwrap();

    assert!(found.unwrap().has_oyd());
    assert!(missing.is_none());
    assert!(!plain.unwrap().has_oyd());
}
