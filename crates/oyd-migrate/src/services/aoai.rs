//! Discovery of Azure OpenAI deployments that use On Your Data.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::azure::{RestClient, TokenProvider};
use crate::constants::{api_versions, scopes};
use crate::error::{Error, Result};
use crate::models::oyd::{OydConfiguration, OydDeployment};
use crate::models::search::{resource_group_from_id, str_at};

const OPENAI_KIND: &str = "OpenAI";

/// An Azure OpenAI account as listed by ARM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiAccount {
    /// Account name.
    pub name: String,
    /// ARM resource id.
    pub id: String,
    /// Resource group.
    pub resource_group: String,
    /// Data plane endpoint.
    pub endpoint: String,
}

impl OpenAiAccount {
    fn from_arm(data: &Value) -> Option<Self> {
        let name = str_at(data, "name")?;
        let id = str_at(data, "id").unwrap_or_default();
        let endpoint = data
            .pointer("/properties/endpoint")
            .and_then(Value::as_str)
            .map(|e| e.trim_end_matches('/').to_string())
            .unwrap_or_else(|| OydDeployment::endpoint_for(&name));
        Some(Self {
            resource_group: resource_group_from_id(&id).unwrap_or_default(),
            name,
            id,
            endpoint,
        })
    }
}

/// Finds OpenAI deployments and reads their OYD configuration.
pub struct AoaiDiscovery {
    credential: Arc<dyn TokenProvider>,
    arm: RestClient,
    subscription_id: String,
}

impl AoaiDiscovery {
    /// Discovery over one subscription.
    pub fn new(credential: Arc<dyn TokenProvider>, arm: RestClient, subscription_id: &str) -> Self {
        Self {
            credential,
            arm,
            subscription_id: subscription_id.to_string(),
        }
    }

    /// OpenAI accounts in the subscription or one resource group.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if the accounts cannot be listed.
    pub async fn list_accounts(&self, resource_group: Option<&str>) -> Result<Vec<OpenAiAccount>> {
        let path = match resource_group {
            Some(rg) => format!(
                "/subscriptions/{}/resourceGroups/{rg}/providers/Microsoft.CognitiveServices/accounts",
                self.subscription_id
            ),
            None => format!(
                "/subscriptions/{}/providers/Microsoft.CognitiveServices/accounts",
                self.subscription_id
            ),
        };

        let items = self
            .arm
            .list(&path, api_versions::AOAI_MANAGEMENT, Error::discovery)
            .await
            .map_err(|e| {
                Error::discovery(format!("Failed to discover AOAI resources: {e}"))
                    .with_detail("subscription_id", self.subscription_id.as_str())
            })?;

        Ok(items
            .iter()
            .filter(|a| a.get("kind").and_then(Value::as_str) == Some(OPENAI_KIND))
            .filter_map(OpenAiAccount::from_arm)
            .collect())
    }

    /// Deployments of an account, without OYD configuration.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if the deployments cannot be listed.
    pub async fn list_deployments(&self, account: &OpenAiAccount) -> Result<Vec<OydDeployment>> {
        let path = format!("{}/deployments", account.id);
        let items = self
            .arm
            .list(&path, api_versions::AOAI_MANAGEMENT, Error::discovery)
            .await?;

        Ok(items
            .iter()
            .filter_map(|d| {
                let deployment_name = str_at(d, "name")?;
                Some(OydDeployment {
                    resource_name: account.name.clone(),
                    resource_group: account.resource_group.clone(),
                    subscription_id: self.subscription_id.clone(),
                    endpoint: account.endpoint.clone(),
                    deployment_name,
                    model_name: d
                        .pointer("/properties/model/name")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    model_version: d
                        .pointer("/properties/model/version")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    oyd_config: None,
                })
            })
            .collect())
    }

    /// Reads the OYD extensions of one deployment.
    ///
    /// Any failure means the deployment has no readable OYD configuration.
    pub async fn get_oyd_config(&self, endpoint: &str, deployment: &str, model: &str) -> Option<OydConfiguration> {
        let client = RestClient::bearer(self.credential.clone(), endpoint, scopes::COGNITIVE_SERVICES);
        let path = format!("/openai/deployments/{deployment}/extensions");

        match client
            .get_json(&path, api_versions::AOAI_DATA_PLANE, Error::discovery)
            .await
        {
            Ok(body) => Some(OydConfiguration::from_extensions(deployment, model, &body)),
            Err(e) => {
                debug!("No OYD configuration for {}: {}", deployment, e);
                None
            }
        }
    }

    /// All deployments with at least one OYD data source.
    ///
    /// Accounts whose deployments cannot be listed are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if the accounts cannot be listed.
    pub async fn discover_oyd_deployments(&self, resource_group: Option<&str>) -> Result<Vec<OydDeployment>> {
        let accounts = self.list_accounts(resource_group).await?;
        info!("Found {} Azure OpenAI account(s)", accounts.len());

        let mut found = Vec::new();
        for account in &accounts {
            let deployments = match self.list_deployments(account).await {
                Ok(d) => d,
                Err(e) => {
                    warn!("Skipping account {}: {}", account.name, e);
                    continue;
                }
            };

            for mut deployment in deployments {
                deployment.oyd_config = self
                    .get_oyd_config(&deployment.endpoint, &deployment.deployment_name, &deployment.model_name)
                    .await;
                if deployment.has_oyd() {
                    debug!(
                        "{}/{} has {} data source(s)",
                        account.name,
                        deployment.deployment_name,
                        deployment.data_source_count()
                    );
                    found.push(deployment);
                }
            }
        }

        info!("Found {} OYD deployment(s)", found.len());
        Ok(found)
    }

    /// One deployment of a known account, with its OYD configuration.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if the account lookup fails.
    pub async fn get_deployment(
        &self,
        resource_group: &str,
        account_name: &str,
        deployment_name: &str,
    ) -> Result<Option<OydDeployment>> {
        let accounts = self.list_accounts(Some(resource_group)).await?;
        let Some(account) = accounts.iter().find(|a| a.name == account_name) else {
            return Ok(None);
        };

        let deployments = self.list_deployments(account).await?;
        let Some(mut deployment) = deployments
            .into_iter()
            .find(|d| d.deployment_name == deployment_name)
        else {
            return Ok(None);
        };

        deployment.oyd_config = self
            .get_oyd_config(&deployment.endpoint, &deployment.deployment_name, &deployment.model_name)
            .await;
        Ok(Some(deployment))
    }
}

#[cfg(test)]
#[path = "aoai_tests.rs"]
mod tests;
