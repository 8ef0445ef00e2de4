//! Credential checks, subscriptions and role assignments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::azure::{AccessToken, RestClient, TokenProvider};
use crate::constants::{api_versions, scopes};
use crate::error::{Error, Result};
use crate::models::search::str_at;

/// An accessible subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription id.
    pub subscription_id: String,
    /// Display name.
    pub display_name: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// `Enabled`, `Disabled`, ...
    pub state: String,
}

impl Subscription {
    fn from_arm(data: &Value) -> Option<Self> {
        let subscription_id = str_at(data, "subscriptionId")?;
        Some(Self {
            display_name: str_at(data, "displayName").unwrap_or_else(|| subscription_id.clone()),
            tenant_id: str_at(data, "tenantId").unwrap_or_default(),
            state: str_at(data, "state").unwrap_or_else(|| "Unknown".to_string()),
            subscription_id,
        })
    }
}

/// Outcome of a best-effort RBAC check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCheck {
    /// Role assignments visible at the scope.
    pub assignment_count: usize,
    /// Problems worth showing; never fatal.
    pub warnings: Vec<String>,
}

impl PermissionCheck {
    /// Anything to report.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Authentication and authorization checks.
pub struct AuthService {
    credential: Arc<dyn TokenProvider>,
    arm: RestClient,
}

impl AuthService {
    /// Service over a credential and an ARM client.
    pub fn new(credential: Arc<dyn TokenProvider>, arm: RestClient) -> Self {
        Self { credential, arm }
    }

    /// Proves the credential works by acquiring a management token.
    ///
    /// # Errors
    ///
    /// Returns an authentication error naming the credential.
    pub async fn authenticate(&self) -> Result<AccessToken> {
        self.credential
            .token(scopes::MANAGEMENT)
            .await
            .map_err(|e| match e {
                Error::Authentication { .. } => e,
                other => Error::authentication(format!("Failed to authenticate: {other}"))
                    .with_detail("credential", self.credential.name()),
            })
    }

    /// Lists subscriptions the credential can see.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the listing fails.
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let items = self
            .arm
            .list("/subscriptions", api_versions::SUBSCRIPTIONS, Error::authentication)
            .await
            .map_err(|e| Error::authentication(format!("Failed to list subscriptions: {e}")))?;

        let subscriptions: Vec<_> = items.iter().filter_map(Subscription::from_arm).collect();
        debug!("Found {} subscription(s)", subscriptions.len());
        Ok(subscriptions)
    }

    /// Lists role assignments at the subscription or resource group scope.
    ///
    /// Failures are reported as warnings, never as errors.
    pub async fn check_permissions(&self, subscription_id: &str, resource_group: Option<&str>) -> PermissionCheck {
        let mut scope = format!("/subscriptions/{subscription_id}");
        if let Some(rg) = resource_group {
            scope.push_str(&format!("/resourceGroups/{rg}"));
        }
        let path = format!("{scope}/providers/Microsoft.Authorization/roleAssignments");

        let mut check = PermissionCheck::default();
        match self
            .arm
            .list(&path, api_versions::AUTHORIZATION, Error::discovery)
            .await
        {
            Ok(assignments) => {
                check.assignment_count = assignments.len();
                debug!("Found {} role assignment(s)", assignments.len());
                if assignments.is_empty() {
                    check.warnings.push(
                        "No role assignments found. You may need additional permissions."
                            .to_string(),
                    );
                }
            }
            Err(e) => {
                warn!("Permission check failed: {}", e);
                check.warnings.push(format!(
                    "Could not verify permissions: {e}. Proceeding with best effort."
                ));
            }
        }
        check
    }
}
