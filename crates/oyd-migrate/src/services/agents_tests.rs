//! Tests for agent creation.

use super::*;
use crate::azure::credential::StaticTokenProvider;
use crate::constants::scopes;
use crate::retry::RetryConfig;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn builder(server: &MockServer, project_path: &str) -> AgentBuilder {
    let client = RestClient::bearer(
        Arc::new(StaticTokenProvider::new("t")),
        &format!("{}{project_path}", server.uri()),
        scopes::AI_FOUNDRY,
    )
    .with_retry(RetryConfig::no_retry());
    AgentBuilder::new(client)
}

fn search_connection() -> ProjectConnection {
    ProjectConnection {
        name: "contoso-search-connection".to_string(),
        connection_type: "AzureAISearch".to_string(),
        target: "https://contoso-search.search.windows.net".to_string(),
        auth_type: "ManagedIdentity".to_string(),
        is_shared: true,
        connection_id: Some("/conn/contoso-search-connection".to_string()),
    }
}

// ==================== Naming Tests ====================

#[test]
fn test_extract_index_name() {
    assert_eq!(extract_index_name("products-connection"), "products-index");
    assert_eq!(extract_index_name("plain"), "plain");
}

#[test]
fn test_project_name() {
    assert_eq!(
        project_name("https://acct.services.ai.azure.com/api/projects/support"),
        "support"
    );
    assert_eq!(project_name("https://acct.services.ai.azure.com"), "acct");
}

// ==================== Request Body Tests ====================

#[test]
fn test_search_tool_body() {
    // Arrange
    let request = AgentRequest::new("chat-migrated", "gpt-4.1", "Be helpful.", MigrationPath::SearchTool)
        .with_connection(search_connection())
        .with_query_type("semantic");

    // Act
    let body = request.body();

    // Assert
    assert_eq!(body["tools"], json!([{"type": "azure_ai_search"}]));
    let idx = &body["tool_resources"]["azure_ai_search"]["indexes"][0];
    assert_eq!(idx["index_connection_id"], "/conn/contoso-search-connection");
    assert_eq!(idx["index_name"], "contoso-search-index");
    assert_eq!(idx["query_type"], "semantic");
    assert_eq!(idx["top_k"], 5);
}

#[test]
fn test_search_tool_body_uses_given_index() {
    let request = AgentRequest::new("a", "m", "i", MigrationPath::SearchTool)
        .with_connection(search_connection())
        .with_index(Some("products".to_string()));

    let body = request.body();

    assert_eq!(body["tool_resources"]["azure_ai_search"]["indexes"][0]["index_name"], "products");
}

#[test]
fn test_knowledge_base_body() {
    let request = AgentRequest::new("a", "m", "i", MigrationPath::KnowledgeBase)
        .with_connection(search_connection());

    let body = request.body();

    let tool = &body["tools"][0];
    assert_eq!(tool["type"], "mcp");
    assert_eq!(tool["server_label"], "kb_contoso_search_connection");
    assert_eq!(
        tool["server_url"],
        "https://contoso-search.search.windows.net/knowledgebases/kb-contoso-search-connection/mcp?api-version=2025-11-01-preview"
    );
    assert_eq!(tool["require_approval"], "never");
    assert_eq!(tool["allowed_tools"], json!(["knowledge_base_retrieve"]));
    assert_eq!(tool["project_connection_id"], "/conn/contoso-search-connection");
    assert!(body.get("tool_resources").is_none());
}

// ==================== Service Tests ====================

#[tokio::test]
async fn test_create_agent() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/support/assistants"))
        .and(query_param("api-version", "2025-05-01"))
        .and(body_partial_json(json!({"name": "chat-migrated", "model": "gpt-4.1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "asst_123"})))
        .expect(1)
        .mount(&server)
        .await;
    let request = AgentRequest::new("chat-migrated", "gpt-4.1", "Be helpful.", MigrationPath::SearchTool)
        .with_connection(search_connection());

    // Act
    let agent = builder(&server, "/api/projects/support")
        .create_agent(&request)
        .await
        .unwrap();

    // Assert
    assert_eq!(agent.agent_id.as_deref(), Some("asst_123"));
    assert_eq!(agent.project_name, "support");
    assert_eq!(agent.search_tools().len(), 1);
    assert!(agent.created_at.is_some());
}

#[tokio::test]
async fn test_create_agent_failure_carries_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Model not found"}
        })))
        .mount(&server)
        .await;
    let request = AgentRequest::new("a", "gpt-x", "i", MigrationPath::SearchTool);

    let err = builder(&server, "").create_agent(&request).await.unwrap_err();

    assert!(matches!(err, Error::AgentCreation { .. }));
    assert!(err.to_string().contains("Model not found"));
    let details = err.details().unwrap();
    assert_eq!(details["name"], "a");
    assert_eq!(details["model"], "gpt-x");
}

#[tokio::test]
async fn test_list_and_find_agents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {
                    "id": "asst_1",
                    "name": "search-agent",
                    "model": "gpt-4.1",
                    "created_at": 1_700_000_000,
                    "tools": [{"type": "azure_ai_search"}],
                    "tool_resources": {"azure_ai_search": {"indexes": [
                        {"index_connection_id": "c", "index_name": "i", "query_type": "simple", "top_k": 3}
                    ]}}
                },
                {
                    "id": "asst_2",
                    "name": "kb-agent",
                    "tools": [{"type": "mcp", "server_label": "kb", "server_url": "https://x", "allowed_tools": ["knowledge_base_retrieve"]}]
                }
            ]
        })))
        .mount(&server)
        .await;
    let b = builder(&server, "");

    let agents = b.list_agents().await.unwrap();
    let found = b.find_by_name("kb-agent").await.unwrap();
    let missing = b.find_by_name("nobody").await.unwrap();

    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].migration_path, MigrationPath::SearchTool);
    assert_eq!(agents[0].search_tools()[0].top_k, 3);
    assert!(agents[0].created_at.is_some());
    let kb = found.unwrap();
    assert_eq!(kb.migration_path, MigrationPath::KnowledgeBase);
    assert_eq!(kb.mcp_tools()[0].allowed_tools, vec!["knowledge_base_retrieve"]);
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_ensure_agent_reuses_existing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "asst_9", "name": "chat-migrated"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new"})))
        .expect(0)
        .mount(&server)
        .await;
    let request = AgentRequest::new("chat-migrated", "gpt-4.1", "i", MigrationPath::SearchTool);

    let (agent, created) = builder(&server, "").ensure_agent(&request).await.unwrap();

    assert!(!created);
    assert_eq!(agent.agent_id.as_deref(), Some("asst_9"));
}

#[tokio::test]
async fn test_ensure_agent_creates_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "asst_new"})))
        .expect(1)
        .mount(&server)
        .await;
    let request = AgentRequest::new("chat-migrated", "gpt-4.1", "i", MigrationPath::SearchTool);

    let (agent, created) = builder(&server, "").ensure_agent(&request).await.unwrap();

    assert!(created);
    assert_eq!(agent.agent_id.as_deref(), Some("asst_new"));
}

#[tokio::test]
async fn test_get_and_delete_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants/asst_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "asst_1", "name": "a"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assistants/asst_x"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/assistants/asst_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .mount(&server)
        .await;
    let b = builder(&server, "");

    assert_eq!(b.get_agent("asst_1").await.unwrap().unwrap().name, "a");
    assert!(b.get_agent("asst_x").await.unwrap().is_none());
    assert!(b.delete_agent("asst_1").await.unwrap());
}

#[tokio::test]
async fn test_out_of_range_top_k_uses_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants/asst_big"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asst_big",
            "name": "big",
            "tools": [{"type": "azure_ai_search"}],
            "tool_resources": {"azure_ai_search": {"indexes": [
                {"index_connection_id": "c", "index_name": "i", "top_k": 4_294_967_301_u64}
            ]}}
        })))
        .mount(&server)
        .await;

    let agent = builder(&server, "").get_agent("asst_big").await.unwrap().unwrap();

    assert_eq!(agent.search_tools()[0].top_k, 5);
}
