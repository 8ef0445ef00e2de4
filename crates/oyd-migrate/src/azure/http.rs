//! HTTP plumbing shared by every Azure client.

use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body kept in error details.
const MAX_ERROR_BODY: usize = 1024;

/// Wait assumed for a 429 without a usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 10;

/// Builds an error of one category from a message.
pub type ErrorCategory = fn(String) -> Error;

/// Creates a configured HTTP client with timeouts.
#[must_use]
pub fn create_http_client() -> Client {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Rejects anything but an http(s) URL.
pub fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{url}'. Allowed: http, https"
        )));
    }
    if url.len() < 10 {
        return Err(Error::Config(format!("Invalid URL format: {url}")));
    }
    Ok(())
}

/// Pulls `error.message` out of an Azure error body, or returns the body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error_description"))
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect())
}

/// Maps a non-success status to an error.
///
/// Throttling and 5xx map to retryable errors, 401 to authentication and
/// 403 to permission denied. Everything else becomes `category`.
pub fn handle_http_error(status_code: u16, body: &str, context: &str, category: ErrorCategory) -> Error {
    let message = error_message(body);
    match status_code {
        429 => Error::RateLimit(DEFAULT_RETRY_AFTER_SECS),
        401 => Error::authentication(format!("{context} auth failed: {message}"))
            .with_detail("status_code", status_code),
        403 => Error::PermissionDenied {
            operation: context.to_string(),
            required_role: None,
        },
        500 | 502 | 503 | 504 => Error::Network {
            endpoint: context.to_string(),
            message: format!("HTTP {status_code}: {message}"),
        },
        _ => category(format!("{context} failed with status {status_code}: {message}"))
            .with_detail("status_code", status_code),
    }
}

/// Passes a successful response through; otherwise reads the body and maps it.
pub async fn ensure_success(response: Response, context: &str, category: ErrorCategory) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let secs = retry_after_secs(response.headers()).unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(Error::RateLimit(secs));
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(handle_http_error(status.as_u16(), &body, context, category))
}

/// Seconds from `Retry-After`, or from the `x-ms-retry-after-ms` ARM variant.
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);
    header("retry-after")
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| {
            header("x-ms-retry-after-ms")
                .and_then(|v| v.parse::<u64>().ok())
                .map(|ms| ms.div_ceil(1000))
        })
}

/// Reads a JSON body; an empty body reads as `null`.
pub async fn read_json(response: Response) -> Result<Value> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Removes a trailing slash.
pub fn trim_endpoint(endpoint: &str) -> &str {
    endpoint.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_http_error_rate_limit() {
        let err = handle_http_error(429, "too many requests", "List accounts", Error::discovery);
        assert!(matches!(err, Error::RateLimit(DEFAULT_RETRY_AFTER_SECS)));
    }

    #[test]
    fn test_retry_after_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), None);

        headers.insert("x-ms-retry-after-ms", "1500".parse().unwrap());
        assert_eq!(retry_after_secs(&headers), Some(2));

        headers.insert("retry-after", "7".parse().unwrap());
        assert_eq!(retry_after_secs(&headers), Some(7));
    }

    #[test]
    fn test_handle_http_error_auth() {
        let err = handle_http_error(401, "unauthorized", "List accounts", Error::discovery);
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn test_handle_http_error_forbidden() {
        let err = handle_http_error(403, "{}", "List role assignments", Error::discovery);
        assert_eq!(err.to_string(), "Permission denied for 'List role assignments'");
    }

    #[test]
    fn test_handle_http_error_server() {
        let err = handle_http_error(503, "busy", "Get index", Error::discovery);
        assert!(matches!(err, Error::Network { .. }));
    }

    #[test]
    fn test_handle_http_error_other_uses_category() {
        // Arrange
        let body = r#"{"error": {"code": "BadRequest", "message": "Name is invalid"}}"#;

        // Act
        let err = handle_http_error(400, body, "Create connection", Error::connection);

        // Assert
        assert!(matches!(err, Error::Connection { .. }));
        let text = err.to_string();
        assert!(text.starts_with("Create connection failed with status 400: Name is invalid"));
        assert!(text.contains("\"status_code\":400"));
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("plain text"), "plain text");
        assert_eq!(
            error_message(r#"{"error_description": "AADSTS7000215: Invalid client secret"}"#),
            "AADSTS7000215: Invalid client secret"
        );
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://acct.services.ai.azure.com").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("ftp://files.example.com").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_trim_endpoint() {
        assert_eq!(trim_endpoint("https://x.search.windows.net/"), "https://x.search.windows.net");
    }

    #[test]
    fn test_create_http_client() {
        let client = create_http_client();
        assert!(client.get("http://example.com").build().is_ok());
    }
}
