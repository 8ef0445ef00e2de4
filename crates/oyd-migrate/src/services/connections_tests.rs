//! Tests for project connections.

use super::*;
use crate::azure::credential::StaticTokenProvider;
use crate::constants::scopes;
use crate::retry::RetryConfig;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager(server: &MockServer) -> ConnectionManager {
    let client = RestClient::bearer(
        Arc::new(StaticTokenProvider::new("t")),
        &server.uri(),
        scopes::AI_FOUNDRY,
    )
    .with_retry(RetryConfig::no_retry());
    ConnectionManager::new(client)
}

fn listed(name: &str, target: &str) -> Value {
    json!({
        "name": name,
        "id": format!("/projects/p/connections/{name}"),
        "properties": {
            "category": "AzureAISearch",
            "target": target,
            "authType": "ManagedIdentity",
            "isSharedToAll": true
        }
    })
}

// ==================== Endpoint Tests ====================

#[test]
fn test_parse_endpoint() {
    assert_eq!(
        parse_endpoint("https://acct.services.ai.azure.com/api/projects/p"),
        ("acct".to_string(), "p".to_string())
    );
    assert_eq!(
        parse_endpoint("https://res.cognitiveservices.azure.com/"),
        ("res".to_string(), String::new())
    );
    assert_eq!(
        parse_endpoint("https://other.example.com/api/projects"),
        ("other".to_string(), String::new())
    );
}

// ==================== Creation Tests ====================

#[tokio::test]
async fn test_create_search_connection_managed_identity() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/connections/svc-connection"))
        .and(query_param("api-version", "2025-10-01-preview"))
        .and(body_partial_json(json!({
            "name": "svc-connection",
            "properties": {
                "category": "AzureAISearch",
                "target": "https://svc.search.windows.net",
                "isSharedToAll": true,
                "authType": "ManagedIdentity"
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "conn-id-1"})))
        .expect(1)
        .mount(&server)
        .await;

    // Act
    let conn = manager(&server)
        .create_search_connection("svc-connection", "https://svc.search.windows.net", None, false)
        .await
        .unwrap();

    // Assert
    assert_eq!(conn.auth_type, "ManagedIdentity");
    assert_eq!(conn.connection_id.as_deref(), Some("conn-id-1"));
    assert!(conn.is_shared);
}

#[tokio::test]
async fn test_create_search_connection_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(body_partial_json(json!({
            "properties": {"authType": "ApiKey", "credentials": {"key": "secret"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c"})))
        .expect(1)
        .mount(&server)
        .await;

    let conn = manager(&server)
        .create_search_connection("c", "https://svc.search.windows.net", Some("secret"), false)
        .await
        .unwrap();

    assert_eq!(conn.auth_type, "ApiKey");
}

#[tokio::test]
async fn test_managed_identity_wins_over_key() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(body_partial_json(json!({"properties": {"authType": "ManagedIdentity"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let conn = manager(&server)
        .create_search_connection("c", "https://svc.search.windows.net", Some("secret"), true)
        .await
        .unwrap();

    assert_eq!(conn.auth_type, "ManagedIdentity");
    assert_eq!(conn.connection_id, None);
}

#[tokio::test]
async fn test_create_mcp_connection() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/connections/kb-conn"))
        .and(body_partial_json(json!({
            "properties": {
                "authType": "ProjectManagedIdentity",
                "category": "RemoteTool",
                "audience": "https://search.azure.com/",
                "metadata": {"ApiType": "Azure"}
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "kb-id"})))
        .expect(1)
        .mount(&server)
        .await;

    let conn = manager(&server)
        .create_mcp_connection("kb-conn", "https://svc.search.windows.net/knowledgebases/kb/mcp", None)
        .await
        .unwrap();

    assert_eq!(conn.connection_type, "RemoteTool");
}

#[tokio::test]
async fn test_create_connection_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "bad target"}
        })))
        .mount(&server)
        .await;

    let err = manager(&server)
        .create_search_connection("c", "nope", None, false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection { .. }));
    assert!(err.to_string().contains("bad target"));
}

// ==================== Lookup Tests ====================

#[tokio::test]
async fn test_list_and_get_connections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [listed("a", "https://a"), listed("b", "https://b")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/connections/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listed("a", "https://a")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/connections/zzz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let m = manager(&server);

    let all = m.list_connections().await.unwrap();
    let a = m.get_connection("a").await.unwrap();
    let missing = m.get_connection("zzz").await.unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(a.unwrap().target, "https://a");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_delete_connection() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/connections/a"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert!(manager(&server).delete_connection("a").await.unwrap());
}

// ==================== Validation Tests ====================

#[tokio::test]
async fn test_validate_reachable_target() {
    // Arrange
    let server = MockServer::start().await;
    let target = format!("{}/search-target", server.uri());
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [listed("svc-connection", &target)]
        })))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/search-target"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    // Act
    let result = manager(&server).validate_connection("svc-connection").await;

    // Assert
    assert!(result.is_valid, "{:?}", result.issues);
    assert_eq!(result.connection_type, "AzureAISearch");
    assert_eq!(result.auth_type, "ManagedIdentity");
}

#[tokio::test]
async fn test_validate_bad_status() {
    let server = MockServer::start().await;
    let target = format!("{}/search-target", server.uri());
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [listed("c", &target)]
        })))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/search-target"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let result = manager(&server).validate_connection("c").await;

    assert!(!result.is_valid);
    assert_eq!(result.issues, vec!["Target returned status 502".to_string()]);
}

#[tokio::test]
async fn test_validate_unreachable_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [listed("c", "http://127.0.0.1:1/")]
        })))
        .mount(&server)
        .await;

    let result = manager(&server).validate_connection("c").await;

    assert!(!result.is_valid);
    assert_eq!(result.issues, vec!["Could not connect to target endpoint".to_string()]);
}

#[tokio::test]
async fn test_validate_missing_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let result = manager(&server).validate_connection("ghost").await;

    assert_eq!(result.issues, vec!["Connection 'ghost' not found".to_string()]);
}

#[tokio::test]
async fn test_validate_listing_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let result = manager(&server).validate_connection("c").await;

    assert!(result.issues[0].starts_with("Validation error:"));
}

// ==================== Propagation Tests ====================

#[tokio::test]
async fn test_wait_until_readable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/slow"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/connections/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listed("slow", "https://x")))
        .mount(&server)
        .await;

    let ready = manager(&server)
        .wait_until_readable("slow", Duration::from_secs(5), Duration::from_millis(10))
        .await;

    assert!(ready);
}

#[tokio::test]
async fn test_wait_until_readable_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ready = manager(&server)
        .wait_until_readable("never", Duration::from_millis(50), Duration::from_millis(10))
        .await;

    assert!(!ready);
}
