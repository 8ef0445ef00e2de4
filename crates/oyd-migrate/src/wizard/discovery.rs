//! Turns discovered resources into session configuration.
//!
//! Nothing here prompts or calls Azure, so the mapping rules can be tested
//! directly.

use std::collections::BTreeMap;

use crate::azure::http::trim_endpoint;
use crate::config::{AoaiConfig, SearchConfig};
use crate::models::foundry::FoundryProject;
use crate::models::oyd::OydDeployment;
use crate::models::search::SearchService;
use crate::services::Subscription;
use crate::session::MigrationSession;

/// Where the discovery stage looks for OYD deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryScope {
    /// Every OpenAI account of the subscription.
    Subscription,
    /// Accounts of one resource group.
    ResourceGroup(String),
    /// A single deployment named by the user.
    Manual,
}

/// Session record for a selected deployment.
pub fn aoai_config(deployment: &OydDeployment) -> AoaiConfig {
    let source = deployment
        .oyd_config
        .as_ref()
        .and_then(|c| c.primary_search_source());

    AoaiConfig {
        resource_name: deployment.resource_name.clone(),
        resource_group: deployment.resource_group.clone(),
        endpoint: deployment.endpoint.clone(),
        deployment_name: deployment.deployment_name.clone(),
        api_key: None,
        role_information: source.and_then(|s| s.role_information.clone()),
        query_type: source.map(|s| s.query_type.clone()),
    }
}

/// Search endpoints referenced by the deployments, with their index names.
///
/// Endpoints are compared without a trailing slash; index names keep the
/// order they were first seen in.
pub fn search_endpoints(deployments: &[OydDeployment]) -> BTreeMap<String, Vec<String>> {
    let mut endpoints: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let sources = deployments
        .iter()
        .filter_map(|d| d.oyd_config.as_ref())
        .flat_map(|c| c.azure_search_sources());

    for source in sources {
        let endpoint = trim_endpoint(&source.endpoint).to_string();
        if endpoint.is_empty() {
            continue;
        }
        let indexes = endpoints.entry(endpoint).or_default();
        if !source.index_name.is_empty() && !indexes.contains(&source.index_name) {
            indexes.push(source.index_name.clone());
        }
    }
    endpoints
}

/// Session record for a discovered service. The first index is the one the
/// agents will query.
pub fn search_config(service: &SearchService, indexes: &[String]) -> SearchConfig {
    SearchConfig {
        service_name: service.name.clone(),
        resource_group: service.resource_group.clone(),
        endpoint: service.endpoint.clone(),
        api_key: None,
        use_managed_identity: service.requires_managed_identity(),
        index_name: indexes.first().cloned(),
    }
}

/// Session record for a service entered by hand.
pub fn manual_search_config(name: &str, resource_group: &str, index_name: &str, use_managed_identity: bool) -> SearchConfig {
    SearchConfig {
        service_name: name.to_string(),
        resource_group: resource_group.to_string(),
        endpoint: SearchService::endpoint_for(name),
        api_key: None,
        use_managed_identity,
        index_name: Some(index_name.to_string()),
    }
}

/// `res/dep (model, n data source(s))`.
pub fn deployment_label(deployment: &OydDeployment) -> String {
    format!(
        "{}/{} ({}, {} data source(s))",
        deployment.resource_name,
        deployment.deployment_name,
        deployment.model_name,
        deployment.data_source_count()
    )
}

/// `name (id)`.
pub fn subscription_label(subscription: &Subscription) -> String {
    format!("{} ({})", subscription.display_name, subscription.subscription_id)
}

/// `name (resource group)`.
pub fn project_label(project: &FoundryProject) -> String {
    format!("{} ({})", project.name, project.resource_group)
}

/// `name (resource group) - location`.
pub fn account_label(account: &FoundryProject) -> String {
    format!("{} ({}) - {}", account.resource_name, account.resource_group, account.location)
}

/// ARM id of a Foundry hub, used as the parent of new projects.
pub fn hub_resource_id(account: &FoundryProject) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
        account.subscription_id, account.resource_group, account.resource_name
    )
}

/// Counts shown at the end of discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// Deployments selected.
    pub deployments: usize,
    /// Search services found.
    pub search_services: usize,
    /// Indexes referenced by the deployments.
    pub indexes: usize,
}

impl DiscoverySummary {
    /// Summary of what the discovery stage put on the session.
    pub fn of(session: &MigrationSession, endpoints: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            deployments: session.aoai_configs.len(),
            search_services: session.search_configs.len(),
            indexes: endpoints.values().map(Vec::len).sum(),
        }
    }
}
