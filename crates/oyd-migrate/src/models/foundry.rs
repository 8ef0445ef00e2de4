//! Foundry projects, connections and agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MigrationPath;
use crate::models::search::str_at;

/// A Foundry project able to host agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundryProject {
    /// Project name.
    pub name: String,
    /// Parent account or hub.
    pub resource_name: String,
    /// Resource group.
    pub resource_group: String,
    /// Subscription id.
    pub subscription_id: String,
    /// Azure region.
    pub location: String,
    /// Project data plane endpoint.
    pub endpoint: String,
    /// Agent service is available.
    #[serde(default = "default_true")]
    pub has_agent_service: bool,
}

fn default_true() -> bool {
    true
}

impl FoundryProject {
    /// Endpoint of a CognitiveServices account project.
    pub fn endpoint_for(account: &str, project: &str) -> String {
        format!("https://{account}.services.ai.azure.com/api/projects/{project}")
    }
}

/// A connection from a project to an external resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConnection {
    /// Connection name.
    pub name: String,
    /// Category, e.g. `AzureAISearch` or `RemoteTool`.
    pub connection_type: String,
    /// Target URL.
    pub target: String,
    /// Authentication type.
    #[serde(default)]
    pub auth_type: String,
    /// Shared with all project users.
    #[serde(default)]
    pub is_shared: bool,
    /// Full resource id of the connection.
    #[serde(default)]
    pub connection_id: Option<String>,
}

impl ProjectConnection {
    /// Parses a connection resource returned by the connections API.
    pub fn from_rest(data: &Value) -> Self {
        let props = data.get("properties").cloned().unwrap_or(Value::Null);
        Self {
            name: str_at(data, "name").unwrap_or_default(),
            connection_type: str_at(&props, "category").unwrap_or_default(),
            target: str_at(&props, "target").unwrap_or_default(),
            auth_type: str_at(&props, "authType").unwrap_or_default(),
            is_shared: props
                .get("isSharedToAll")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            connection_id: str_at(data, "id"),
        }
    }

    /// Id used when binding the connection to a tool.
    pub fn reference(&self) -> &str {
        self.connection_id.as_deref().unwrap_or(&self.name)
    }
}

/// Azure AI Search tool binding of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchToolConfig {
    /// Connection id.
    pub connection_id: String,
    /// Index name.
    pub index_name: String,
    /// Query type.
    #[serde(default = "default_query_type")]
    pub query_type: String,
    /// Documents retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

fn default_query_type() -> String {
    crate::constants::DEFAULT_SEARCH_TOOL_QUERY_TYPE.to_string()
}

fn default_top_k() -> u32 {
    5
}

/// MCP tool binding of an agent to a knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolConfig {
    /// Tool label.
    pub server_label: String,
    /// MCP endpoint.
    pub server_url: String,
    /// Connection id used for authentication.
    pub connection_id: String,
    /// Tools the agent may call.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
}

/// A tool attached to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentTool {
    /// Azure AI Search tool.
    AzureAiSearch(SearchToolConfig),
    /// MCP tool.
    Mcp(McpToolConfig),
}

/// An agent created by the migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundryAgent {
    /// Agent name.
    pub name: String,
    /// Id assigned by the service.
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Project name.
    pub project_name: String,
    /// Project endpoint.
    pub project_endpoint: String,
    /// Model deployment.
    pub model: String,
    /// Instructions.
    pub instructions: String,
    /// Path the agent was built for.
    pub migration_path: MigrationPath,
    /// Attached tools.
    #[serde(default)]
    pub tools: Vec<AgentTool>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl FoundryAgent {
    /// Search tool bindings.
    pub fn search_tools(&self) -> Vec<&SearchToolConfig> {
        self.tools
            .iter()
            .filter_map(|t| match t {
                AgentTool::AzureAiSearch(c) => Some(c),
                AgentTool::Mcp(_) => None,
            })
            .collect()
    }

    /// MCP bindings.
    pub fn mcp_tools(&self) -> Vec<&McpToolConfig> {
        self.tools
            .iter()
            .filter_map(|t| match t {
                AgentTool::Mcp(c) => Some(c),
                AgentTool::AzureAiSearch(_) => None,
            })
            .collect()
    }

    /// Reference used by the responses API: the id when known.
    pub fn reference(&self) -> &str {
        self.agent_id.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn agent_with_tools(tools: Vec<AgentTool>) -> FoundryAgent {
        FoundryAgent {
            name: "a".to_string(),
            agent_id: None,
            project_name: "p".to_string(),
            project_endpoint: "https://ep".to_string(),
            model: "gpt-4.1".to_string(),
            instructions: "i".to_string(),
            migration_path: MigrationPath::SearchTool,
            tools,
            created_at: None,
        }
    }

    #[test]
    fn test_tool_filters() {
        let search = |c: &str, i: &str| {
            AgentTool::AzureAiSearch(SearchToolConfig {
                connection_id: c.to_string(),
                index_name: i.to_string(),
                query_type: "simple".to_string(),
                top_k: 5,
            })
        };
        let agent = agent_with_tools(vec![
            search("c1", "idx1"),
            AgentTool::Mcp(McpToolConfig {
                server_label: "kb".to_string(),
                server_url: "https://kb.example.com".to_string(),
                connection_id: "c2".to_string(),
                allowed_tools: vec![],
            }),
            search("c3", "idx2"),
        ]);

        assert_eq!(agent.search_tools().len(), 2);
        assert_eq!(agent.mcp_tools().len(), 1);
    }

    #[test]
    fn test_agent_reference_prefers_id() {
        let mut agent = agent_with_tools(vec![]);
        assert_eq!(agent.reference(), "a");
        agent.agent_id = Some("asst_123".to_string());
        assert_eq!(agent.reference(), "asst_123");
    }

    #[test]
    fn test_connection_from_rest() {
        let data = json!({
            "id": "/subscriptions/s/.../connections/products-connection",
            "name": "products-connection",
            "properties": {
                "category": "AzureAISearch",
                "target": "https://svc.search.windows.net",
                "authType": "ApiKey",
                "isSharedToAll": true
            }
        });
        let conn = ProjectConnection::from_rest(&data);
        assert_eq!(conn.name, "products-connection");
        assert_eq!(conn.connection_type, "AzureAISearch");
        assert_eq!(conn.auth_type, "ApiKey");
        assert!(conn.is_shared);
        assert!(conn.reference().ends_with("products-connection"));
    }

    #[test]
    fn test_project_endpoint_format() {
        assert_eq!(
            FoundryProject::endpoint_for("acct", "proj"),
            "https://acct.services.ai.azure.com/api/projects/proj"
        );
    }
}
