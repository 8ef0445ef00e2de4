//! Tests for the migration pipeline.

use super::*;
use crate::azure::credential::StaticTokenProvider;
use crate::config::{MigrationPath, SearchConfig};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "/api/projects/support";

fn context(server: &MockServer) -> AzureContext {
    AzureContext::new(Arc::new(StaticTokenProvider::new("t")), "sub-1").with_management_url(&server.uri())
}

fn pipeline(server: &MockServer) -> MigrationPipeline {
    MigrationPipeline::new(context(server))
        .with_poll_interval(Duration::from_millis(10))
        .with_propagation_timeout(Duration::from_millis(200))
        .with_test_pause(Duration::ZERO)
}

fn configured_session(server: &MockServer) -> MigrationSession {
    let mut session = MigrationSession::new();
    session.aoai_configs.push(AoaiConfig {
        resource_name: "contoso-aoai".to_string(),
        resource_group: "rg".to_string(),
        endpoint: "https://contoso-aoai.openai.azure.com".to_string(),
        deployment_name: "chat".to_string(),
        api_key: None,
        role_information: Some("You answer questions about products.".to_string()),
        query_type: Some("semantic".to_string()),
    });
    session.search_configs.push(SearchConfig {
        service_name: "contoso-search".to_string(),
        resource_group: "rg".to_string(),
        endpoint: "https://contoso-search.search.windows.net".to_string(),
        api_key: None,
        use_managed_identity: true,
        index_name: Some("products".to_string()),
    });
    session.foundry_config = Some(FoundryConfig {
        project_name: "support".to_string(),
        resource_group: "rg".to_string(),
        project_endpoint: format!("{}{PROJECT}", server.uri()),
        model_deployment: "gpt-4.1".to_string(),
        location: "eastus".to_string(),
        hub_resource_id: None,
    });
    session
}

fn connection_body(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "id": format!("/conn/{name}"),
        "properties": {
            "category": "AzureAISearch",
            "target": "https://contoso-search.search.windows.net",
            "authType": "ManagedIdentity"
        }
    })
}

async fn mount_connection(server: &MockServer, project: &str) {
    Mock::given(method("PUT"))
        .and(path(format!("{project}/connections/contoso-search-connection")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "/conn/contoso-search-connection"})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{project}/connections/contoso-search-connection")))
        .respond_with(ResponseTemplate::new(200).set_body_json(connection_body("contoso-search-connection")))
        .mount(server)
        .await;
}

async fn mount_agents(server: &MockServer, project: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{project}/assistants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{project}/assistants")))
        .and(body_partial_json(json!({
            "name": "chat-migrated",
            "model": "gpt-4.1",
            "tool_resources": {"azure_ai_search": {"indexes": [{
                "index_connection_id": "/conn/contoso-search-connection",
                "index_name": "products",
                "query_type": "semantic"
            }]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "asst_1"})))
        .expect(1)
        .mount(server)
        .await;
}

// ==================== Naming Tests ====================

#[test]
fn test_names() {
    assert_eq!(connection_name("contoso-search"), "contoso-search-connection");
    assert_eq!(agent_name("chat"), "chat-migrated");
    assert_eq!(
        test_key("chat-migrated", "What information do you have available?"),
        "chat-migrated:What information do "
    );
    assert_eq!(test_key("a", "short"), "a:short");
}

#[test]
fn test_build_instructions() {
    let mut aoai = AoaiConfig {
        role_information: Some("Only discuss warranties.".to_string()),
        ..Default::default()
    };

    let with_role = build_instructions(&aoai, true);
    let without_role = build_instructions(&aoai, false);
    aoai.role_information = Some("   ".to_string());
    let blank_role = build_instructions(&aoai, true);

    assert!(with_role.starts_with(BASE_INSTRUCTIONS));
    assert!(with_role.ends_with("Only discuss warranties."));
    assert_eq!(without_role, BASE_INSTRUCTIONS);
    assert_eq!(blank_role, BASE_INSTRUCTIONS);
}

#[test]
fn test_agent_request_query_type() {
    let aoai = AoaiConfig {
        deployment_name: "chat".to_string(),
        query_type: Some("vector_simple_hybrid".to_string()),
        ..Default::default()
    };
    let mut options = crate::config::MigrationOptions::default();

    let preserved = agent_request(&aoai, "gpt-4.1", &options, &[], None);
    options.preserve_query_type = false;
    let replaced = agent_request(&aoai, "gpt-4.1", &options, &[], None);

    assert_eq!(preserved.name, "chat-migrated");
    assert_eq!(preserved.query_type, "vector_simple_hybrid");
    assert_eq!(replaced.query_type, "vector_semantic_hybrid");
}

// ==================== Execution Tests ====================

#[tokio::test]
async fn test_execute_search_tool_migration() {
    // Arrange
    let server = MockServer::start().await;
    mount_connection(&server, PROJECT).await;
    mount_agents(&server, PROJECT).await;
    Mock::given(method("POST"))
        .and(path(format!("{PROJECT}/openai/conversations")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "conv_1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{PROJECT}/openai/responses")))
        .and(body_partial_json(json!({"agent": {"name": "asst_1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output_text": "ok"})))
        .expect(2)
        .mount(&server)
        .await;
    let samples = tempfile::tempdir().unwrap();
    let mut session = configured_session(&server);

    // Act
    let result = pipeline(&server)
        .with_sample_dir(Some(samples.path().to_path_buf()))
        .execute(&mut session)
        .await;

    // Assert
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.plan_id, session.session_id);
    assert_eq!(result.result_id.len(), 8);
    assert_eq!(result.connections_created.len(), 1);
    assert_eq!(result.agents_created[0].agent_id.as_deref(), Some("asst_1"));
    assert!(result.all_tests_passed());
    assert_eq!(result.test_results.len(), 2);
    assert!(result.completed_at.is_some());

    assert_eq!(session.created_connections, vec!["contoso-search-connection"]);
    assert_eq!(session.created_agents, vec!["chat-migrated"]);
    assert_eq!(session.tests_passed(), 2);
    assert_eq!(session.test_results.get("chat-migrated:What information do "), Some(&true));

    assert_eq!(
        result.artifacts.get("chat-migrated_sample.py").map(String::as_str),
        Some("python")
    );
    let sample = std::fs::read_to_string(samples.path().join("chat-migrated_sample.py")).unwrap();
    assert!(sample.contains("AzureAISearchAgentTool"));
}

#[tokio::test]
async fn test_execute_records_connection_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"message": "caller lacks permission"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let mut session = configured_session(&server);

    let result = pipeline(&server).execute(&mut session).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.agents_created.is_empty());
    assert!(session.created_connections.is_empty());
}

#[tokio::test]
async fn test_execute_without_project_config() {
    let server = MockServer::start().await;
    let mut session = configured_session(&server);
    session.foundry_config = None;

    let result = pipeline(&server).execute(&mut session).await;

    assert!(!result.success);
    assert!(result.errors[0].contains("No Foundry project configured"));
}

#[tokio::test]
async fn test_slow_propagation_is_a_warning() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "/conn/contoso-search-connection"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{PROJECT}/connections/contoso-search-connection")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{PROJECT}/assistants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "asst_old", "name": "chat-migrated", "model": "gpt-4.1"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let mut session = configured_session(&server);
    session.migration_options.test_after_migration = false;
    session.migration_options.generate_samples = false;

    // Act
    let result = pipeline(&server)
        .with_propagation_timeout(Duration::from_millis(50))
        .execute(&mut session)
        .await;

    // Assert
    assert!(result.success, "{:?}", result.errors);
    assert!(result.warnings.iter().any(|w| w.contains("not readable")));
    assert!(result.warnings.iter().any(|w| w.contains("reused")));
    assert_eq!(result.agents_created[0].agent_id.as_deref(), Some("asst_old"));
    assert!(result.test_results.is_empty());
    assert!(result.artifacts.is_empty());
    assert_eq!(session.created_agents, vec!["chat-migrated"]);
}

#[tokio::test]
async fn test_execute_creates_new_project() {
    // Arrange
    let server = MockServer::start().await;
    let workspace = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.MachineLearningServices/workspaces/support";
    Mock::given(method("GET"))
        .and(path(workspace))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(workspace))
        .and(body_partial_json(json!({"location": "eastus", "kind": "Project"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "support"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{workspace}/connections")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"properties": {"category": "AIServices", "target": format!("{}/new", server.uri())}}]
        })))
        .mount(&server)
        .await;
    mount_connection(&server, "/new").await;
    mount_agents(&server, "/new").await;
    let mut session = configured_session(&server);
    session.migration_options.create_new_project = true;
    session.migration_options.test_after_migration = false;
    if let Some(foundry) = session.foundry_config.as_mut() {
        foundry.project_endpoint.clear();
    }

    // Act
    let result = pipeline(&server).execute(&mut session).await;

    // Assert
    assert!(result.success, "{:?}", result.errors);
    let endpoint = &session.foundry_config.as_ref().unwrap().project_endpoint;
    assert_eq!(endpoint, &format!("{}/new", server.uri()));
    assert_eq!(result.migration_path, MigrationPath::SearchTool);
    assert_eq!(result.artifacts.len(), 1);
}
