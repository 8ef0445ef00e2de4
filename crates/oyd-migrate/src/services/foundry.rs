//! Foundry projects: listing, lookup and creation.

use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::azure::RestClient;
use crate::constants::api_versions;
use crate::error::{Error, Result};
use crate::models::foundry::FoundryProject;
use crate::models::search::{resource_group_from_id, str_at};

const PROJECT_KIND: &str = "Project";
const HUB_KIND: &str = "Hub";

/// Lists and creates Foundry projects in one subscription.
pub struct FoundryProvisioner {
    arm: RestClient,
    subscription_id: String,
}

impl FoundryProvisioner {
    /// Provisioner over one subscription.
    pub fn new(arm: RestClient, subscription_id: &str) -> Self {
        Self {
            arm,
            subscription_id: subscription_id.to_string(),
        }
    }

    fn workspace_path(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{resource_group}/providers/Microsoft.MachineLearningServices/workspaces/{name}",
            self.subscription_id
        )
    }

    async fn list_workspaces(&self) -> Result<Vec<Value>> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.MachineLearningServices/workspaces",
            self.subscription_id
        );
        self.arm
            .list(&path, api_versions::ML_WORKSPACES, Error::discovery)
            .await
    }

    /// Hub-based projects merged with account-based projects.
    ///
    /// A source that cannot be listed is skipped with a warning. Names are
    /// unique in the result; hub-based projects win.
    pub async fn list_projects(&self) -> Vec<FoundryProject> {
        let mut projects: Vec<FoundryProject> = match self.list_workspaces().await {
            Ok(workspaces) => workspaces
                .iter()
                .filter(|w| kind_of(w) == Some(PROJECT_KIND))
                .filter_map(|w| self.project_from_workspace(w))
                .collect(),
            Err(e) => {
                warn!("Could not list ML workspace projects: {}", e);
                Vec::new()
            }
        };

        let mut seen: HashSet<String> = projects.iter().map(|p| p.name.clone()).collect();
        for project in self.list_account_projects().await {
            if seen.insert(project.name.clone()) {
                projects.push(project);
            }
        }

        info!("Found {} Foundry project(s)", projects.len());
        projects
    }

    async fn list_account_projects(&self) -> Vec<FoundryProject> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.CognitiveServices/accounts",
            self.subscription_id
        );
        let accounts = match self
            .arm
            .list(&path, api_versions::COGNITIVE_PROJECTS, Error::discovery)
            .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("Could not list CognitiveServices projects: {}", e);
                return Vec::new();
            }
        };

        let mut projects = Vec::new();
        for account in &accounts {
            let (Some(account_name), Some(account_id)) = (str_at(account, "name"), str_at(account, "id")) else {
                continue;
            };
            let items = match self
                .arm
                .list(
                    &format!("{account_id}/projects"),
                    api_versions::COGNITIVE_PROJECTS,
                    Error::discovery,
                )
                .await
            {
                Ok(items) => items,
                Err(e) => {
                    debug!("Could not list projects for account {}: {}", account_name, e);
                    continue;
                }
            };

            for item in &items {
                let Some(full_name) = str_at(item, "name") else {
                    continue;
                };
                // ARM names child resources `account/project`.
                let name = full_name.rsplit('/').next().unwrap_or(&full_name).to_string();
                projects.push(FoundryProject {
                    endpoint: FoundryProject::endpoint_for(&account_name, &name),
                    name,
                    resource_name: account_name.clone(),
                    resource_group: resource_group_from_id(&account_id).unwrap_or_default(),
                    subscription_id: self.subscription_id.clone(),
                    location: str_at(account, "location").unwrap_or_default(),
                    has_agent_service: true,
                });
            }
        }
        projects
    }

    fn project_from_workspace(&self, workspace: &Value) -> Option<FoundryProject> {
        let name = str_at(workspace, "name")?;
        let id = str_at(workspace, "id").unwrap_or_default();
        Some(FoundryProject {
            resource_name: hub_name(workspace).unwrap_or_else(|| name.clone()),
            endpoint: project_endpoint(workspace),
            resource_group: resource_group_from_id(&id).unwrap_or_default(),
            subscription_id: self.subscription_id.clone(),
            location: str_at(workspace, "location").unwrap_or_default(),
            has_agent_service: true,
            name,
        })
    }

    /// Foundry accounts (hubs) that can parent new projects.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if workspaces cannot be listed.
    pub async fn list_accounts(&self) -> Result<Vec<FoundryProject>> {
        let workspaces = self.list_workspaces().await?;
        Ok(workspaces
            .iter()
            .filter(|w| kind_of(w) == Some(HUB_KIND))
            .filter_map(|w| {
                let name = str_at(w, "name")?;
                let id = str_at(w, "id").unwrap_or_default();
                Some(FoundryProject {
                    resource_name: name.clone(),
                    resource_group: resource_group_from_id(&id).unwrap_or_default(),
                    subscription_id: self.subscription_id.clone(),
                    location: str_at(w, "location").unwrap_or_default(),
                    endpoint: String::new(),
                    has_agent_service: false,
                    name,
                })
            })
            .collect())
    }

    /// Creates a hub-based project.
    ///
    /// # Errors
    ///
    /// Returns a provisioning error if the service rejects the request.
    pub async fn create_project(
        &self,
        name: &str,
        resource_group: &str,
        location: &str,
        hub_resource_id: Option<&str>,
    ) -> Result<FoundryProject> {
        let mut body = json!({
            "location": location,
            "kind": PROJECT_KIND,
            "properties": {
                "friendlyName": name,
                "description": format!("Migrated OYD project - {name}"),
            }
        });
        if let Some(hub) = hub_resource_id {
            body["properties"]["hubResourceId"] = json!(hub);
        }

        let data = self
            .arm
            .put_json(
                &self.workspace_path(resource_group, name),
                api_versions::ML_WORKSPACES,
                &body,
                Error::provisioning,
            )
            .await
            .map_err(|e| match e {
                Error::Provisioning { .. } | Error::PermissionDenied { .. } => e,
                other => Error::provisioning(format!("Failed to create Foundry project: {other}"))
                    .with_detail("name", name)
                    .with_detail("resource_group", resource_group),
            })?;

        info!("Created Foundry project: {}", name);
        Ok(FoundryProject {
            name: name.to_string(),
            resource_name: name.to_string(),
            resource_group: resource_group.to_string(),
            subscription_id: self.subscription_id.clone(),
            location: location.to_string(),
            endpoint: project_endpoint(&data),
            has_agent_service: true,
        })
    }

    /// A hub-based project by name, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a discovery error for failures other than 404.
    pub async fn get_project(&self, name: &str, resource_group: &str) -> Result<Option<FoundryProject>> {
        match self
            .arm
            .get_json(
                &self.workspace_path(resource_group, name),
                api_versions::ML_WORKSPACES,
                Error::discovery,
            )
            .await
        {
            Ok(data) => Ok(Some(FoundryProject {
                name: name.to_string(),
                resource_name: hub_name(&data).unwrap_or_else(|| name.to_string()),
                resource_group: resource_group.to_string(),
                subscription_id: self.subscription_id.clone(),
                location: str_at(&data, "location").unwrap_or_default(),
                endpoint: project_endpoint(&data),
                has_agent_service: true,
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Agent endpoint of a hub-based project, read from its AI Services
    /// connection. Falls back to the listed endpoint.
    pub async fn resolve_project_endpoint(&self, project: &FoundryProject) -> String {
        let path = format!(
            "{}/connections",
            self.workspace_path(&project.resource_group, &project.name)
        );
        match self
            .arm
            .list(&path, api_versions::ML_CONNECTIONS, Error::discovery)
            .await
        {
            Ok(connections) => ai_services_target(&connections).unwrap_or_else(|| project.endpoint.clone()),
            Err(e) => {
                debug!("Could not resolve endpoint for {}: {}", project.name, e);
                project.endpoint.clone()
            }
        }
    }
}

fn kind_of(workspace: &Value) -> Option<&str> {
    workspace.get("kind").and_then(Value::as_str)
}

fn hub_name(workspace: &Value) -> Option<String> {
    workspace
        .pointer("/properties/hubResourceId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .and_then(|id| id.rsplit('/').next())
        .map(str::to_string)
}

/// `workspaceUrl`, else the hub's services endpoint, else the bare name.
fn project_endpoint(workspace: &Value) -> String {
    if let Some(url) = workspace
        .pointer("/properties/workspaceUrl")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
    {
        return url.to_string();
    }
    let name = str_at(workspace, "name").unwrap_or_default();
    match hub_name(workspace) {
        Some(hub) => FoundryProject::endpoint_for(&hub, &name),
        None => name,
    }
}

/// Target of the `AIServices` connection, else of an `AzureOpenAI` one
/// rewritten to the cognitiveservices host.
fn ai_services_target(connections: &[Value]) -> Option<String> {
    let target_of = |category: &str| {
        connections.iter().find_map(|c| {
            let props = c.get("properties")?;
            if props.get("category").and_then(Value::as_str) != Some(category) {
                return None;
            }
            props
                .get("target")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
    };
    target_of("AIServices").or_else(|| {
        target_of("AzureOpenAI")
            .map(|t| t.replace(".openai.azure.com", ".cognitiveservices.azure.com"))
    })
}

#[cfg(test)]
#[path = "foundry_tests.rs"]
mod tests;
