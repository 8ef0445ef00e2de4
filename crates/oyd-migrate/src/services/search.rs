//! Azure AI Search services, admin keys and index inventory.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::analyzer;
use crate::azure::http::ensure_success;
use crate::azure::RestClient;
use crate::constants::api_versions;
use crate::error::{Error, Result};
use crate::models::search::{IndexAnalysis, SearchIndex, SearchService};

/// Lists search services and their indexes.
pub struct SearchInventory {
    arm: RestClient,
    subscription_id: String,
}

impl SearchInventory {
    /// Inventory over one subscription.
    pub fn new(arm: RestClient, subscription_id: &str) -> Self {
        Self {
            arm,
            subscription_id: subscription_id.to_string(),
        }
    }

    /// Search services in the subscription or one resource group.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if the listing fails.
    pub async fn list_services(&self, resource_group: Option<&str>) -> Result<Vec<SearchService>> {
        let path = match resource_group {
            Some(rg) => format!(
                "/subscriptions/{}/resourceGroups/{rg}/providers/Microsoft.Search/searchServices",
                self.subscription_id
            ),
            None => format!(
                "/subscriptions/{}/providers/Microsoft.Search/searchServices",
                self.subscription_id
            ),
        };

        let items = self
            .arm
            .list(&path, api_versions::SEARCH_MANAGEMENT, Error::discovery)
            .await
            .map_err(|e| Error::discovery(format!("Failed to list search services: {e}")))?;

        let services: Vec<_> = items
            .iter()
            .filter_map(|s| SearchService::from_arm(&self.subscription_id, s))
            .collect();
        info!("Found {} search service(s)", services.len());
        Ok(services)
    }

    /// The service whose name is the first host label of `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if the listing fails.
    pub async fn service_by_endpoint(&self, endpoint: &str) -> Result<Option<SearchService>> {
        let Some(name) = service_name_from_endpoint(endpoint) else {
            return Ok(None);
        };
        let services = self.list_services(None).await?;
        Ok(services.into_iter().find(|s| s.name == name))
    }

    /// Primary admin key of a service.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if the key cannot be read.
    pub async fn admin_key(&self, service: &SearchService) -> Result<String> {
        let path = format!("{}/listAdminKeys", service.resource_id());
        let body = self
            .arm
            .post_json(&path, api_versions::SEARCH_MANAGEMENT, None, Error::discovery)
            .await?;

        body.get("primaryKey")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                Error::discovery(format!("No admin key returned for '{}'", service.name))
                    .with_detail("service", service.name.as_str())
            })
    }

    /// Indexes of a service with document counts.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn list_indexes(&self, service: &SearchService) -> Vec<SearchIndex> {
        let result = match self.admin_key(service).await {
            Ok(key) => list_indexes_with_key(service, &key).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!("Could not list indexes for {}: {}", service.name, e);
            Vec::new()
        })
    }

    /// One index by name.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown index.
    pub async fn get_index(&self, service: &SearchService, index_name: &str) -> Result<SearchIndex> {
        let key = self.admin_key(service).await?;
        let client = RestClient::api_key(&service.endpoint, &key);
        let path = format!("/indexes/{index_name}");
        let data = client
            .get_json(&path, api_versions::SEARCH_DATA_PLANE, Error::discovery)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Error::ResourceNotFound {
                        resource_type: "Index".to_string(),
                        name: index_name.to_string(),
                    }
                } else {
                    e
                }
            })?;

        let mut index = SearchIndex::from_rest(&service.name, &service.endpoint, &data);
        index.document_count = document_count(&client, index_name).await;
        Ok(index)
    }

    /// Indexes of a service with their compatibility analysis.
    pub async fn analyze_indexes(&self, service: &SearchService) -> Vec<(SearchIndex, IndexAnalysis)> {
        self.list_indexes(service)
            .await
            .into_iter()
            .map(|index| {
                let analysis = analyzer::analyze(&index);
                (index, analysis)
            })
            .collect()
    }
}

/// Lists indexes using a known admin key.
///
/// # Errors
///
/// Returns a discovery error if the listing fails.
pub async fn list_indexes_with_key(service: &SearchService, api_key: &str) -> Result<Vec<SearchIndex>> {
    let client = RestClient::api_key(&service.endpoint, api_key);
    let items = client
        .list("/indexes", api_versions::SEARCH_DATA_PLANE, Error::discovery)
        .await?;

    let mut indexes = Vec::with_capacity(items.len());
    for item in &items {
        let mut index = SearchIndex::from_rest(&service.name, &service.endpoint, item);
        index.document_count = document_count(&client, &index.name).await;
        indexes.push(index);
    }
    debug!("Found {} index(es) in {}", indexes.len(), service.name);
    Ok(indexes)
}

/// `$count` answers with a plain-text integer, sometimes BOM-prefixed.
async fn document_count(client: &RestClient, index_name: &str) -> Option<u64> {
    let url = client.url(
        &format!("/indexes/{index_name}/docs/$count"),
        api_versions::SEARCH_DATA_PLANE,
    );
    let response = client.request(Method::GET, &url).await.ok()?.send().await.ok()?;
    let response = ensure_success(response, "Count documents", Error::discovery)
        .await
        .ok()?;
    let text = response.text().await.ok()?;
    text.trim().trim_start_matches('\u{feff}').parse().ok()
}

/// `https://svc.search.windows.net` → `svc`.
pub fn service_name_from_endpoint(endpoint: &str) -> Option<&str> {
    let host = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    host.split(['.', '/', ':'])
        .next()
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
