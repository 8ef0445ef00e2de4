//! Authenticated JSON client for ARM and the Azure data planes.

use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::credential::TokenProvider;
use super::http::{create_http_client, ensure_success, read_json, trim_endpoint, ErrorCategory};
use crate::constants::{scopes, MANAGEMENT_ENDPOINT};
use crate::error::Result;
use crate::retry::{with_retry, RetryConfig};

#[derive(Clone)]
enum Auth {
    Bearer {
        credential: Arc<dyn TokenProvider>,
        scope: String,
    },
    ApiKey(String),
}

/// JSON client bound to one base URL and one way of authenticating.
///
/// GETs are retried on throttling and transient failures; other verbs are
/// sent once.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
    auth: Auth,
    retry: RetryConfig,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = match &self.auth {
            Auth::Bearer { credential, scope } => format!("{} ({scope})", credential.name()),
            Auth::ApiKey(_) => "api-key".to_string(),
        };
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("auth", &auth)
            .finish()
    }
}

impl RestClient {
    /// Client for the Azure Resource Manager.
    pub fn management(credential: Arc<dyn TokenProvider>) -> Self {
        Self::bearer(credential, MANAGEMENT_ENDPOINT, scopes::MANAGEMENT)
    }

    /// Client for a data plane endpoint using bearer tokens for `scope`.
    pub fn bearer(credential: Arc<dyn TokenProvider>, base_url: &str, scope: &str) -> Self {
        Self {
            http: create_http_client(),
            base_url: trim_endpoint(base_url).to_string(),
            auth: Auth::Bearer {
                credential,
                scope: scope.to_string(),
            },
            retry: RetryConfig::default(),
        }
    }

    /// Client for a data plane endpoint using an `api-key` header.
    pub fn api_key(base_url: &str, key: &str) -> Self {
        Self {
            http: create_http_client(),
            base_url: trim_endpoint(base_url).to_string(),
            auth: Auth::ApiKey(key.to_string()),
            retry: RetryConfig::default(),
        }
    }

    /// Same auth against another base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_endpoint(base_url).to_string();
        self
    }

    /// Overrides the retry policy for GETs.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a path (or absolute URL) and appends `api-version`.
    pub fn url(&self, path: &str, api_version: &str) -> String {
        let base = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        if api_version.is_empty() {
            return base;
        }
        let sep = if base.contains('?') { '&' } else { '?' };
        format!("{base}{sep}api-version={api_version}")
    }

    /// A request with auth applied, for calls the helpers do not cover.
    ///
    /// # Errors
    ///
    /// Returns an error if a token cannot be acquired.
    pub async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let builder = self.http.request(method, url);
        Ok(match &self.auth {
            Auth::Bearer { credential, scope } => {
                let token = credential.token(scope).await?;
                builder.bearer_auth(token.token)
            }
            Auth::ApiKey(key) => builder.header("api-key", key),
        })
    }

    /// GET returning JSON, with retries.
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error after retries are exhausted.
    pub async fn get_json(&self, path: &str, api_version: &str, category: ErrorCategory) -> Result<Value> {
        let url = self.url(path, api_version);
        self.get_url(&url, category).await
    }

    async fn get_url(&self, url: &str, category: ErrorCategory) -> Result<Value> {
        let this = self;
        with_retry(&self.retry, url, move || async move {
            debug!("GET {}", url);
            let response = this.request(Method::GET, url).await?.send().await?;
            let response = ensure_success(response, &format!("GET {}", short(url)), category).await?;
            read_json(response).await
        })
        .await
    }

    /// GET of a collection, following `nextLink` pages.
    ///
    /// Items are read from `value` (ARM, search) or `data` (agents).
    ///
    /// # Errors
    ///
    /// Returns the first page error.
    pub async fn list(&self, path: &str, api_version: &str, category: ErrorCategory) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path, api_version));

        while let Some(url) = next.take() {
            let page = self.get_url(&url, category).await?;
            let page_items = page
                .get("value")
                .or_else(|| page.get("data"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            items.extend(page_items);
            next = page
                .get("nextLink")
                .and_then(Value::as_str)
                .filter(|link| !link.is_empty())
                .map(str::to_string);
        }

        Ok(items)
    }

    /// PUT a JSON body (create-or-update). Not retried.
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error.
    pub async fn put_json(&self, path: &str, api_version: &str, body: &Value, category: ErrorCategory) -> Result<Value> {
        self.send_json(Method::PUT, path, api_version, Some(body), category)
            .await
    }

    /// POST an optional JSON body. Not retried.
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error.
    pub async fn post_json(
        &self,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
        category: ErrorCategory,
    ) -> Result<Value> {
        self.send_json(Method::POST, path, api_version, body, category)
            .await
    }

    /// DELETE. Returns `false` when the resource did not exist.
    ///
    /// # Errors
    ///
    /// Returns the mapped HTTP error for other failures.
    pub async fn delete(&self, path: &str, api_version: &str, category: ErrorCategory) -> Result<bool> {
        let url = self.url(path, api_version);
        debug!("DELETE {}", url);
        let response = self.request(Method::DELETE, &url).await?.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response, &format!("DELETE {}", short(&url)), category).await?;
        Ok(true)
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
        category: ErrorCategory,
    ) -> Result<Value> {
        let url = self.url(path, api_version);
        debug!("{} {}", method, url);
        let context = format!("{} {}", method, short(&url));
        let mut builder = self.request(method, &url).await?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let response = ensure_success(response, &context, category).await?;
        read_json(response).await
    }
}

/// URL without the query string, for messages.
fn short(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
