//! Tests for the search inventory.

use super::*;
use crate::azure::credential::StaticTokenProvider;
use crate::retry::RetryConfig;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE_ID: &str =
    "/subscriptions/sub-1/resourceGroups/rg-search/providers/Microsoft.Search/searchServices/contoso-search";

fn inventory(server: &MockServer) -> SearchInventory {
    let arm = RestClient::management(Arc::new(StaticTokenProvider::new("t")))
        .with_base_url(&server.uri())
        .with_retry(RetryConfig::no_retry());
    SearchInventory::new(arm, "sub-1")
}

fn service(server: &MockServer) -> SearchService {
    SearchService {
        name: "contoso-search".to_string(),
        resource_group: "rg-search".to_string(),
        subscription_id: "sub-1".to_string(),
        location: "eastus".to_string(),
        endpoint: server.uri(),
        sku: "standard".to_string(),
        replica_count: 1,
        partition_count: 1,
        public_network_access: "enabled".to_string(),
        private_endpoint_connections: vec![],
        disable_local_auth: false,
    }
}

async fn mount_admin_key(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{SERVICE_ID}/listAdminKeys")))
        .and(query_param("api-version", "2024-06-01-preview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "primaryKey": "admin-key",
            "secondaryKey": "other"
        })))
        .mount(server)
        .await;
}

fn products_index() -> Value {
    json!({
        "name": "products",
        "fields": [
            {"name": "id", "type": "Edm.String", "key": true},
            {"name": "content", "type": "Edm.String", "searchable": true},
            {"name": "embedding", "type": "Collection(Edm.Single)", "searchable": true, "dimensions": 1536}
        ],
        "semantic": {"configurations": [{"name": "default", "prioritizedFields": {}}]}
    })
}

// ==================== Service Tests ====================

#[test]
fn test_service_name_from_endpoint() {
    assert_eq!(
        service_name_from_endpoint("https://contoso-search.search.windows.net"),
        Some("contoso-search")
    );
    assert_eq!(service_name_from_endpoint("https://svc.search.windows.net/"), Some("svc"));
    assert_eq!(service_name_from_endpoint(""), None);
}

#[tokio::test]
async fn test_list_services() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/providers/Microsoft.Search/searchServices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "name": "contoso-search",
                "id": SERVICE_ID,
                "location": "eastus",
                "sku": {"name": "standard"},
                "properties": {"replicaCount": 2, "disableLocalAuth": true}
            }]
        })))
        .mount(&server)
        .await;

    // Act
    let services = inventory(&server).list_services(None).await.unwrap();

    // Assert
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].resource_group, "rg-search");
    assert_eq!(services[0].replica_count, 2);
    assert!(services[0].requires_managed_identity());
}

#[tokio::test]
async fn test_list_services_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = inventory(&server).list_services(Some("rg")).await.unwrap_err();

    assert!(err.to_string().starts_with("Failed to list search services"));
}

#[tokio::test]
async fn test_service_by_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "contoso-search", "id": SERVICE_ID}]
        })))
        .mount(&server)
        .await;
    let inv = inventory(&server);

    let found = inv
        .service_by_endpoint("https://contoso-search.search.windows.net")
        .await
        .unwrap();
    let missing = inv
        .service_by_endpoint("https://other.search.windows.net")
        .await
        .unwrap();

    assert_eq!(found.unwrap().name, "contoso-search");
    assert!(missing.is_none());
}

// ==================== Index Tests ====================

#[tokio::test]
async fn test_list_indexes_with_counts() {
    // Arrange
    let server = MockServer::start().await;
    mount_admin_key(&server).await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .and(header("api-key", "admin-key"))
        .and(query_param("api-version", "2025-11-01-preview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [products_index()]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/products/docs/$count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\u{feff}42"))
        .mount(&server)
        .await;

    // Act
    let indexes = inventory(&server).list_indexes(&service(&server)).await;

    // Assert
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "products");
    assert_eq!(indexes[0].document_count, Some(42));
    assert_eq!(indexes[0].service_name, "contoso-search");
}

#[tokio::test]
async fn test_list_indexes_failure_is_empty() {
    let server = MockServer::start().await;
    mount_admin_key(&server).await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let indexes = inventory(&server).list_indexes(&service(&server)).await;

    assert!(indexes.is_empty());
}

#[tokio::test]
async fn test_analyze_indexes() {
    let server = MockServer::start().await;
    mount_admin_key(&server).await;
    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [products_index()]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/indexes/products/docs/$count"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let analyzed = inventory(&server).analyze_indexes(&service(&server)).await;

    assert_eq!(analyzed.len(), 1);
    let (index, analysis) = &analyzed[0];
    assert_eq!(index.document_count, None);
    assert!(analysis.supports_hybrid);
    assert_eq!(analysis.recommended_query_type, "vector_semantic_hybrid");
}

#[tokio::test]
async fn test_get_index_not_found() {
    let server = MockServer::start().await;
    mount_admin_key(&server).await;
    Mock::given(method("GET"))
        .and(path("/indexes/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = inventory(&server)
        .get_index(&service(&server), "missing")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ResourceNotFound { .. }));
    assert_eq!(err.to_string(), "Index 'missing' not found");
}
