//! Agent creation and lookup in a Foundry project.
//!
//! Agents are created through the assistants API. The shape of the tool
//! definition depends on the migration path:
//!
//! - search tool: one `azure_ai_search` tool, with one index binding per
//!   connection under `tool_resources`;
//! - knowledge base: one `mcp` tool per connection, pointing at the
//!   knowledge base's MCP endpoint on the search service.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::connections::parse_endpoint;
use crate::azure::RestClient;
use crate::config::MigrationPath;
use crate::constants::{api_versions, DEFAULT_SEARCH_TOOL_QUERY_TYPE};
use crate::error::{Error, Result};
use crate::models::foundry::{AgentTool, FoundryAgent, McpToolConfig, ProjectConnection, SearchToolConfig};
use crate::models::search::{array_at, str_at};

/// Tool the knowledge base MCP server exposes.
pub const KNOWLEDGE_BASE_TOOL: &str = "knowledge_base_retrieve";

/// Everything needed to create one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    /// Agent name.
    pub name: String,
    /// Model deployment.
    pub model: String,
    /// Instructions.
    pub instructions: String,
    /// Tool shape.
    pub path: MigrationPath,
    /// Connections to bind.
    pub connections: Vec<ProjectConnection>,
    /// Index for search tool bindings; derived from the connection otherwise.
    pub index_name: Option<String>,
    /// Search tool query type.
    pub query_type: String,
    /// Documents per query.
    pub top_k: u32,
    /// Knowledge base name; `kb-{connection}` otherwise.
    pub knowledge_base: Option<String>,
}

impl AgentRequest {
    /// A request with default search settings.
    pub fn new(name: &str, model: &str, instructions: &str, path: MigrationPath) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            instructions: instructions.to_string(),
            path,
            connections: Vec::new(),
            index_name: None,
            query_type: DEFAULT_SEARCH_TOOL_QUERY_TYPE.to_string(),
            top_k: 5,
            knowledge_base: None,
        }
    }

    /// Binds a connection.
    #[must_use]
    pub fn with_connection(mut self, connection: ProjectConnection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Index for the search tool.
    #[must_use]
    pub fn with_index(mut self, index_name: Option<String>) -> Self {
        self.index_name = index_name;
        self
    }

    /// Query type for the search tool.
    #[must_use]
    pub fn with_query_type(mut self, query_type: &str) -> Self {
        self.query_type = query_type.to_string();
        self
    }

    /// Tool configurations for this request.
    pub fn tools(&self) -> Vec<AgentTool> {
        self.connections
            .iter()
            .map(|conn| match self.path {
                MigrationPath::SearchTool => AgentTool::AzureAiSearch(SearchToolConfig {
                    connection_id: conn.reference().to_string(),
                    index_name: self
                        .index_name
                        .clone()
                        .unwrap_or_else(|| extract_index_name(&conn.name)),
                    query_type: self.query_type.clone(),
                    top_k: self.top_k,
                }),
                MigrationPath::KnowledgeBase => {
                    let kb = self
                        .knowledge_base
                        .clone()
                        .unwrap_or_else(|| format!("kb-{}", conn.name));
                    AgentTool::Mcp(McpToolConfig {
                        server_label: kb.replace('-', "_"),
                        server_url: knowledge_base_mcp_url(&conn.target, &kb),
                        connection_id: conn.connection_id.clone().unwrap_or_default(),
                        allowed_tools: vec![KNOWLEDGE_BASE_TOOL.to_string()],
                    })
                }
            })
            .collect()
    }

    /// Body of the assistants create call.
    pub fn body(&self) -> Value {
        let tools = self.tools();
        let mut body = json!({
            "name": self.name,
            "model": self.model,
            "instructions": self.instructions,
        });

        match self.path {
            MigrationPath::SearchTool => {
                let indexes: Vec<Value> = tools
                    .iter()
                    .filter_map(|t| match t {
                        AgentTool::AzureAiSearch(c) => Some(json!({
                            "index_connection_id": c.connection_id,
                            "index_name": c.index_name,
                            "query_type": c.query_type,
                            "top_k": c.top_k,
                        })),
                        AgentTool::Mcp(_) => None,
                    })
                    .collect();
                body["tools"] = json!([{ "type": "azure_ai_search" }]);
                body["tool_resources"] = json!({ "azure_ai_search": { "indexes": indexes } });
            }
            MigrationPath::KnowledgeBase => {
                let defs: Vec<Value> = tools
                    .iter()
                    .filter_map(|t| match t {
                        AgentTool::Mcp(c) => Some(json!({
                            "type": "mcp",
                            "server_label": c.server_label,
                            "server_url": c.server_url,
                            "require_approval": "never",
                            "allowed_tools": c.allowed_tools,
                            "project_connection_id": c.connection_id,
                        })),
                        AgentTool::AzureAiSearch(_) => None,
                    })
                    .collect();
                body["tools"] = Value::Array(defs);
            }
        }
        body
    }
}

/// `{name}-connection` → `{name}-index`.
pub fn extract_index_name(connection_name: &str) -> String {
    connection_name.replace("-connection", "-index")
}

/// MCP endpoint of a knowledge base on a search service.
pub fn knowledge_base_mcp_url(search_endpoint: &str, knowledge_base: &str) -> String {
    format!(
        "{}/knowledgebases/{knowledge_base}/mcp?api-version={}",
        search_endpoint.trim_end_matches('/'),
        api_versions::SEARCH_DATA_PLANE
    )
}

/// Project name from the endpoint path, or its first host label.
pub fn project_name(endpoint: &str) -> String {
    let (resource, project) = parse_endpoint(endpoint);
    if project.is_empty() {
        resource
    } else {
        project
    }
}

/// Creates and finds agents in one project.
pub struct AgentBuilder {
    client: RestClient,
}

impl AgentBuilder {
    /// Builder over a project-endpoint client.
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    fn endpoint(&self) -> &str {
        self.client.base_url()
    }

    /// Creates an agent.
    ///
    /// # Errors
    ///
    /// Returns an agent-creation error carrying the agent name and model.
    pub async fn create_agent(&self, request: &AgentRequest) -> Result<FoundryAgent> {
        let data = self
            .client
            .post_json(
                "/assistants",
                api_versions::FOUNDRY_AGENTS,
                Some(&request.body()),
                Error::agent_creation,
            )
            .await
            .map_err(|e| {
                Error::agent_creation(format!("Failed to create agent: {e}"))
                    .with_detail("name", request.name.as_str())
                    .with_detail("model", request.model.as_str())
            })?;

        info!("Created {} agent: {}", request.path, request.name);
        Ok(FoundryAgent {
            name: request.name.clone(),
            agent_id: Some(str_at(&data, "id").unwrap_or_else(|| request.name.clone())),
            project_name: project_name(self.endpoint()),
            project_endpoint: self.endpoint().to_string(),
            model: request.model.clone(),
            instructions: request.instructions.clone(),
            migration_path: request.path,
            tools: request.tools(),
            created_at: Some(Utc::now()),
        })
    }

    /// Returns the existing agent of that name, or creates it.
    ///
    /// The flag is `true` when the agent was created by this call.
    ///
    /// # Errors
    ///
    /// Returns the lookup or creation error.
    pub async fn ensure_agent(&self, request: &AgentRequest) -> Result<(FoundryAgent, bool)> {
        if let Some(existing) = self.find_by_name(&request.name).await? {
            info!("Reusing existing agent: {}", request.name);
            return Ok((existing, false));
        }
        Ok((self.create_agent(request).await?, true))
    }

    /// All agents of the project.
    ///
    /// # Errors
    ///
    /// Returns an agent-creation error if the listing fails.
    pub async fn list_agents(&self) -> Result<Vec<FoundryAgent>> {
        let items = self
            .client
            .list("/assistants", api_versions::FOUNDRY_AGENTS, Error::agent_creation)
            .await?;
        debug!("Found {} agent(s)", items.len());
        Ok(items.iter().map(|a| self.agent_from_rest(a)).collect())
    }

    /// First agent with this name.
    ///
    /// # Errors
    ///
    /// Returns an agent-creation error if the listing fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<FoundryAgent>> {
        Ok(self.list_agents().await?.into_iter().find(|a| a.name == name))
    }

    /// One agent by id.
    ///
    /// # Errors
    ///
    /// Returns an agent-creation error for failures other than 404.
    pub async fn get_agent(&self, agent_id: &str) -> Result<Option<FoundryAgent>> {
        match self
            .client
            .get_json(
                &format!("/assistants/{agent_id}"),
                api_versions::FOUNDRY_AGENTS,
                Error::agent_creation,
            )
            .await
        {
            Ok(data) => Ok(Some(self.agent_from_rest(&data))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deletes an agent. `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an agent-creation error if the service rejects the request.
    pub async fn delete_agent(&self, agent_id: &str) -> Result<bool> {
        let deleted = self
            .client
            .delete(
                &format!("/assistants/{agent_id}"),
                api_versions::FOUNDRY_AGENTS,
                Error::agent_creation,
            )
            .await?;
        if deleted {
            info!("Deleted agent: {}", agent_id);
        }
        Ok(deleted)
    }

    fn agent_from_rest(&self, data: &Value) -> FoundryAgent {
        let mut tools: Vec<AgentTool> = data
            .pointer("/tool_resources/azure_ai_search/indexes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(|idx| {
                AgentTool::AzureAiSearch(SearchToolConfig {
                    connection_id: str_at(idx, "index_connection_id").unwrap_or_default(),
                    index_name: str_at(idx, "index_name").unwrap_or_default(),
                    query_type: str_at(idx, "query_type")
                        .unwrap_or_else(|| DEFAULT_SEARCH_TOOL_QUERY_TYPE.to_string()),
                    top_k: idx
                        .get("top_k")
                        .and_then(Value::as_u64)
                        .and_then(|n| u32::try_from(n).ok())
                        .unwrap_or(5),
                })
            })
            .collect();

        tools.extend(
            array_at(data, "tools")
                .iter()
                .filter(|t| t.get("type").and_then(Value::as_str) == Some("mcp"))
                .map(|t| {
                    AgentTool::Mcp(McpToolConfig {
                        server_label: str_at(t, "server_label").unwrap_or_default(),
                        server_url: str_at(t, "server_url").unwrap_or_default(),
                        connection_id: str_at(t, "project_connection_id").unwrap_or_default(),
                        allowed_tools: array_at(t, "allowed_tools")
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    })
                }),
        );

        let migration_path = if tools.iter().any(|t| matches!(t, AgentTool::Mcp(_))) {
            MigrationPath::KnowledgeBase
        } else {
            MigrationPath::SearchTool
        };

        FoundryAgent {
            name: str_at(data, "name").unwrap_or_default(),
            agent_id: str_at(data, "id"),
            project_name: project_name(self.endpoint()),
            project_endpoint: self.endpoint().to_string(),
            model: str_at(data, "model").unwrap_or_default(),
            instructions: str_at(data, "instructions").unwrap_or_default(),
            migration_path,
            tools,
            created_at: data
                .get("created_at")
                .and_then(Value::as_i64)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
