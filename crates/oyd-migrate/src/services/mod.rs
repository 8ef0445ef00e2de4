//! Services over the Azure management and data planes.
//!
//! Every service is built from an [`AzureContext`], which owns the credential
//! and the subscription being migrated.

pub mod agents;
pub mod aoai;
pub mod auth;
pub mod connections;
pub mod foundry;
pub mod search;
pub mod testing;

use std::sync::Arc;

use crate::azure::{RestClient, TokenProvider};
use crate::constants::{scopes, MANAGEMENT_ENDPOINT};

pub use agents::{AgentBuilder, AgentRequest};
pub use aoai::AoaiDiscovery;
pub use auth::{AuthService, PermissionCheck, Subscription};
pub use connections::{ConnectionManager, ConnectionValidation};
pub use foundry::FoundryProvisioner;
pub use search::SearchInventory;
pub use testing::AgentTestRunner;

/// Credential plus subscription; hands out service clients.
#[derive(Clone)]
pub struct AzureContext {
    credential: Arc<dyn TokenProvider>,
    subscription_id: String,
    management_url: String,
}

impl AzureContext {
    /// Context against the public cloud.
    pub fn new(credential: Arc<dyn TokenProvider>, subscription_id: &str) -> Self {
        Self {
            credential,
            subscription_id: subscription_id.to_string(),
            management_url: MANAGEMENT_ENDPOINT.to_string(),
        }
    }

    /// Points management calls at another base URL.
    #[must_use]
    pub fn with_management_url(mut self, url: &str) -> Self {
        self.management_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Subscription id.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// The credential.
    pub fn credential(&self) -> Arc<dyn TokenProvider> {
        self.credential.clone()
    }

    /// ARM client.
    pub fn arm(&self) -> RestClient {
        RestClient::management(self.credential.clone()).with_base_url(&self.management_url)
    }

    /// Authentication and RBAC checks.
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.credential.clone(), self.arm())
    }

    /// OYD deployment discovery.
    pub fn aoai(&self) -> AoaiDiscovery {
        AoaiDiscovery::new(self.credential.clone(), self.arm(), &self.subscription_id)
    }

    /// Search service and index inventory.
    pub fn search(&self) -> SearchInventory {
        SearchInventory::new(self.arm(), &self.subscription_id)
    }

    /// Foundry projects.
    pub fn foundry(&self) -> FoundryProvisioner {
        FoundryProvisioner::new(self.arm(), &self.subscription_id)
    }

    fn project_client(&self, project_endpoint: &str) -> RestClient {
        RestClient::bearer(self.credential.clone(), project_endpoint, scopes::AI_FOUNDRY)
    }

    /// Connections of a project.
    pub fn connections(&self, project_endpoint: &str) -> ConnectionManager {
        ConnectionManager::new(self.project_client(project_endpoint))
    }

    /// Agents of a project.
    pub fn agents(&self, project_endpoint: &str) -> AgentBuilder {
        AgentBuilder::new(self.project_client(project_endpoint))
    }

    /// Test queries against agents of a project.
    pub fn test_runner(&self, project_endpoint: &str) -> AgentTestRunner {
        AgentTestRunner::new(self.project_client(project_endpoint))
    }
}
