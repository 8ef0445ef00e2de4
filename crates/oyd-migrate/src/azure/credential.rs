//! Token acquisition for Azure management and data plane calls.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::http::{create_http_client, error_message, read_json};
use crate::config::{AuthMethod, AzureConfig};
use crate::constants::{AUTHORITY_HOST, IMDS_ENDPOINT};
use crate::error::{Error, Result};

/// Environment variable consulted for a service principal secret.
pub const CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";

/// Tokens this close to expiry are refreshed.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// A bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Raw token.
    pub token: String,
    /// Expiry, when reported.
    pub expires_on: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

impl AccessToken {
    /// Still usable for a few minutes.
    pub fn is_fresh(&self) -> bool {
        self.expires_on
            .map_or(true, |exp| exp - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > Utc::now())
    }
}

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token for an OAuth2 scope such as
    /// `https://management.azure.com/.default`.
    async fn token(&self, scope: &str) -> Result<AccessToken>;

    /// Human readable name of the credential.
    fn name(&self) -> &'static str;
}

/// Reuses the Azure CLI login.
#[derive(Debug, Clone, Default)]
pub struct AzureCliCredential {
    tenant_id: Option<String>,
}

impl AzureCliCredential {
    /// Credential bound to the CLI's default or the given tenant.
    pub fn new(tenant_id: Option<String>) -> Self {
        Self { tenant_id }
    }

    fn program() -> &'static str {
        if cfg!(windows) {
            "az.cmd"
        } else {
            "az"
        }
    }
}

#[async_trait]
impl TokenProvider for AzureCliCredential {
    async fn token(&self, scope: &str) -> Result<AccessToken> {
        let mut command = tokio::process::Command::new(Self::program());
        command.args(["account", "get-access-token", "--scope", scope, "--output", "json"]);
        if let Some(tenant) = &self.tenant_id {
            command.args(["--tenant", tenant.as_str()]);
        }

        let output = command.output().await.map_err(|e| {
            Error::authentication(format!(
                "Azure CLI not available ({e}). Install it and run 'az login'."
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.contains("az login") {
                "Not logged in to Azure CLI. Run 'az login' first.".to_string()
            } else {
                format!("Azure CLI token request failed: {}", stderr.trim())
            };
            return Err(Error::authentication(message).with_detail("scope", scope));
        }

        parse_cli_token(&output.stdout)
    }

    fn name(&self) -> &'static str {
        "Azure CLI"
    }
}

/// Parses `az account get-access-token` output.
pub fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let data: Value = serde_json::from_slice(stdout)?;
    let token = data
        .get("accessToken")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::authentication("Azure CLI returned no accessToken"))?;

    // Newer CLIs add epoch `expires_on`; older ones only a local `expiresOn`.
    let expires_on = epoch_field(&data, "expires_on").or_else(|| {
        data.get("expiresOn")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
            .and_then(|naive| chrono::Local.from_local_datetime(&naive).single())
            .map(|local| local.with_timezone(&Utc))
    });

    Ok(AccessToken {
        token: token.to_string(),
        expires_on,
    })
}

fn epoch_field(data: &Value, key: &str) -> Option<DateTime<Utc>> {
    let value = data.get(key)?;
    let secs = value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))?;
    Utc.timestamp_opt(secs, 0).single()
}

fn expires_in(data: &Value) -> Option<DateTime<Utc>> {
    let value = data.get("expires_in")?;
    let secs = value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))?;
    Some(Utc::now() + ChronoDuration::seconds(secs))
}

/// OAuth2 client credentials of an app registration.
#[derive(Clone)]
pub struct ServicePrincipalCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority: String,
    client: Client,
}

impl fmt::Debug for ServicePrincipalCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePrincipalCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

impl ServicePrincipalCredential {
    /// Credential against the public cloud authority.
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authority: AUTHORITY_HOST.to_string(),
            client: create_http_client(),
        }
    }

    /// Overrides the authority host.
    #[must_use]
    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TokenProvider for ServicePrincipalCredential {
    async fn token(&self, scope: &str) -> Result<AccessToken> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);
        debug!("Requesting service principal token for {}", scope);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::authentication(format!(
                "Service principal authentication failed: {}",
                error_message(&body)
            ))
            .with_detail("status_code", status.as_u16())
            .with_detail("client_id", self.client_id.as_str()));
        }

        let data = read_json(response).await?;
        token_from_oauth(&data)
    }

    fn name(&self) -> &'static str {
        "Service Principal"
    }
}

fn token_from_oauth(data: &Value) -> Result<AccessToken> {
    let token = data
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::authentication("Token response has no access_token"))?;
    Ok(AccessToken {
        token: token.to_string(),
        expires_on: epoch_field(data, "expires_on").or_else(|| expires_in(data)),
    })
}

/// Managed identity via the instance metadata service.
#[derive(Debug, Clone)]
pub struct ManagedIdentityCredential {
    client_id: Option<String>,
    endpoint: String,
    client: Client,
}

impl ManagedIdentityCredential {
    /// System assigned identity, or a user assigned one by client id.
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client_id,
            endpoint: IMDS_ENDPOINT.to_string(),
            client: create_http_client(),
        }
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityCredential {
    async fn token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope.trim_end_matches("/.default");
        let mut query = vec![("api-version", "2018-02-01"), ("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .header("Metadata", "true")
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                Error::authentication(format!("Managed identity endpoint unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::authentication(format!(
                "Managed identity token request failed: {}",
                error_message(&body)
            ))
            .with_detail("status_code", status.as_u16()));
        }

        let data = read_json(response).await?;
        token_from_oauth(&data)
    }

    fn name(&self) -> &'static str {
        "Managed Identity"
    }
}

/// Returns the same token for every scope.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_on: None,
        })
    }

    fn name(&self) -> &'static str {
        "Static Token"
    }
}

/// Caches tokens per scope until shortly before expiry.
pub struct CachedTokenProvider {
    inner: Arc<dyn TokenProvider>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl CachedTokenProvider {
    /// Wraps a provider.
    pub fn new(inner: Arc<dyn TokenProvider>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenProvider for CachedTokenProvider {
    async fn token(&self, scope: &str) -> Result<AccessToken> {
        let cached = self
            .cache
            .lock()
            .ok()
            .and_then(|c| c.get(scope).filter(|t| t.is_fresh()).cloned());
        if let Some(token) = cached {
            return Ok(token);
        }

        let token = self.inner.token(scope).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(scope.to_string(), token.clone());
        }
        Ok(token)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Builds the credential described by an [`AzureConfig`].
///
/// A service principal secret is taken from the config, then from
/// `AZURE_CLIENT_SECRET`.
///
/// # Errors
///
/// Returns a configuration error when service principal fields are missing.
pub fn credential_from_config(azure: &AzureConfig) -> Result<Arc<dyn TokenProvider>> {
    let provider: Arc<dyn TokenProvider> = match azure.auth_method {
        AuthMethod::Cli => Arc::new(AzureCliCredential::new(azure.tenant_id.clone())),
        AuthMethod::ServicePrincipal => {
            let tenant = azure.tenant_id.as_deref().ok_or_else(|| {
                Error::Config("Service principal auth requires a tenant id".to_string())
            })?;
            let client_id = azure.client_id.as_deref().ok_or_else(|| {
                Error::Config("Service principal auth requires a client id".to_string())
            })?;
            let secret = azure
                .client_secret
                .clone()
                .or_else(|| std::env::var(CLIENT_SECRET_ENV).ok())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Service principal auth requires a client secret (set {CLIENT_SECRET_ENV})"
                    ))
                })?;
            Arc::new(ServicePrincipalCredential::new(tenant, client_id, &secret))
        }
        AuthMethod::ManagedIdentity => Arc::new(ManagedIdentityCredential::new(
            azure.managed_identity_client_id.clone(),
        )),
    };
    Ok(Arc::new(CachedTokenProvider::new(provider)))
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
