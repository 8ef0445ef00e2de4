//! Project connections to search services and knowledge bases.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::azure::RestClient;
use crate::constants::{api_versions, SEARCH_AUDIENCE};
use crate::error::{Error, Result};
use crate::models::foundry::ProjectConnection;

/// Category of AI Search connections.
pub const SEARCH_CATEGORY: &str = "AzureAISearch";

/// Category of MCP (knowledge base) connections.
pub const REMOTE_TOOL_CATEGORY: &str = "RemoteTool";

const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of [`ConnectionManager::validate_connection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionValidation {
    /// Found and its target answered.
    pub is_valid: bool,
    /// Connection category.
    pub connection_type: String,
    /// Target URL.
    pub target: String,
    /// Authentication type.
    pub auth_type: String,
    /// Problems found.
    pub issues: Vec<String>,
}

/// Splits a project endpoint into (resource, project).
///
/// The resource is the first host label; the project is the path segment
/// after `projects`, or empty.
pub fn parse_endpoint(endpoint: &str) -> (String, String) {
    let rest = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    let resource = host.split(['.', ':']).next().unwrap_or_default().to_string();

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let project = segments
        .iter()
        .position(|s| *s == "projects")
        .and_then(|i| segments.get(i + 1))
        .map(|s| (*s).to_string())
        .unwrap_or_default();

    (resource, project)
}

/// Manages the connections of one project.
pub struct ConnectionManager {
    client: RestClient,
    http: Client,
}

impl ConnectionManager {
    /// Manager over a project-endpoint client.
    pub fn new(client: RestClient) -> Self {
        Self {
            client,
            http: Client::builder()
                .timeout(HEAD_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Project endpoint.
    pub fn project_endpoint(&self) -> &str {
        self.client.base_url()
    }

    async fn put_connection(&self, name: &str, body: &Value) -> Result<Value> {
        self.client
            .put_json(
                &format!("/connections/{name}"),
                api_versions::FOUNDRY_CONNECTIONS,
                body,
                Error::connection,
            )
            .await
    }

    /// Creates or updates an AI Search connection.
    ///
    /// Uses the API key only when one is given and managed identity is not
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the service rejects the request.
    pub async fn create_search_connection(
        &self,
        name: &str,
        endpoint: &str,
        api_key: Option<&str>,
        use_managed_identity: bool,
    ) -> Result<ProjectConnection> {
        let mut properties = json!({
            "category": SEARCH_CATEGORY,
            "target": endpoint,
            "isSharedToAll": true,
            "authType": "ManagedIdentity",
        });
        if let (false, Some(key)) = (use_managed_identity, api_key) {
            properties["authType"] = json!("ApiKey");
            properties["credentials"] = json!({ "key": key });
        }
        let auth_type = properties["authType"].as_str().unwrap_or_default().to_string();
        let body = json!({ "name": name, "properties": properties });

        let data = self.put_connection(name, &body).await.map_err(|e| match e {
            Error::Connection { .. } | Error::PermissionDenied { .. } => e,
            other => Error::connection(format!("Failed to create search connection: {other}"))
                .with_detail("name", name)
                .with_detail("endpoint", endpoint),
        })?;

        info!("Created search connection: {}", name);
        Ok(ProjectConnection {
            name: name.to_string(),
            connection_type: SEARCH_CATEGORY.to_string(),
            target: endpoint.to_string(),
            auth_type,
            is_shared: true,
            connection_id: data.get("id").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Creates or updates an MCP connection to a knowledge base.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the service rejects the request.
    pub async fn create_mcp_connection(
        &self,
        name: &str,
        mcp_endpoint: &str,
        audience: Option<&str>,
    ) -> Result<ProjectConnection> {
        let body = json!({
            "name": name,
            "properties": {
                "authType": "ProjectManagedIdentity",
                "category": REMOTE_TOOL_CATEGORY,
                "target": mcp_endpoint,
                "isSharedToAll": true,
                "audience": audience.unwrap_or(SEARCH_AUDIENCE),
                "metadata": { "ApiType": "Azure" },
            }
        });

        let data = self.put_connection(name, &body).await.map_err(|e| match e {
            Error::Connection { .. } | Error::PermissionDenied { .. } => e,
            other => Error::connection(format!("Failed to create MCP connection: {other}"))
                .with_detail("name", name)
                .with_detail("mcp_endpoint", mcp_endpoint),
        })?;

        info!("Created MCP connection: {}", name);
        Ok(ProjectConnection {
            name: name.to_string(),
            connection_type: REMOTE_TOOL_CATEGORY.to_string(),
            target: mcp_endpoint.to_string(),
            auth_type: "ProjectManagedIdentity".to_string(),
            is_shared: true,
            connection_id: data.get("id").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// All connections of the project.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the listing fails.
    pub async fn list_connections(&self) -> Result<Vec<ProjectConnection>> {
        let items = self
            .client
            .list("/connections", api_versions::FOUNDRY_CONNECTIONS, Error::connection)
            .await?;
        Ok(items.iter().map(ProjectConnection::from_rest).collect())
    }

    /// One connection by name.
    ///
    /// # Errors
    ///
    /// Returns a connection error for failures other than 404.
    pub async fn get_connection(&self, name: &str) -> Result<Option<ProjectConnection>> {
        match self
            .client
            .get_json(
                &format!("/connections/{name}"),
                api_versions::FOUNDRY_CONNECTIONS,
                Error::connection,
            )
            .await
        {
            Ok(data) => Ok(Some(ProjectConnection::from_rest(&data))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Looks the connection up and probes its target.
    ///
    /// 200, 401 and 403 from the target all count as reachable.
    pub async fn validate_connection(&self, name: &str) -> ConnectionValidation {
        let mut result = ConnectionValidation::default();

        let connections = match self.list_connections().await {
            Ok(c) => c,
            Err(e) => {
                result.issues.push(format!("Validation error: {e}"));
                return result;
            }
        };
        let Some(connection) = connections.into_iter().find(|c| c.name == name) else {
            result.issues.push(format!("Connection '{name}' not found"));
            return result;
        };

        result.connection_type = connection.connection_type;
        result.target = connection.target;
        result.auth_type = connection.auth_type;

        match self.http.head(&result.target).send().await {
            Ok(response) => match response.status().as_u16() {
                200 | 401 | 403 => result.is_valid = true,
                code => result.issues.push(format!("Target returned status {code}")),
            },
            Err(e) if e.is_connect() => {
                result.issues.push("Could not connect to target endpoint".to_string());
            }
            Err(e) => result.issues.push(format!("Connection test failed: {e}")),
        }

        result
    }

    /// Deletes a connection. `false` when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the service rejects the request.
    pub async fn delete_connection(&self, name: &str) -> Result<bool> {
        let deleted = self
            .client
            .delete(
                &format!("/connections/{name}"),
                api_versions::FOUNDRY_CONNECTIONS,
                Error::connection,
            )
            .await?;
        if deleted {
            info!("Deleted connection: {}", name);
        }
        Ok(deleted)
    }

    /// Polls until the connection can be read back, up to `max_wait`.
    ///
    /// Returns whether the connection became readable.
    pub async fn wait_until_readable(&self, name: &str, max_wait: Duration, interval: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        loop {
            match self.get_connection(name).await {
                Ok(Some(_)) => return true,
                Ok(None) => debug!("Connection {} not readable yet", name),
                Err(e) => debug!("Connection {} not readable yet: {}", name, e),
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("Connection {} still not readable after {:?}", name, max_wait);
                return false;
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
#[path = "connections_tests.rs"]
mod tests;
