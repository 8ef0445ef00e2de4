//! Sends test queries to migrated agents through the responses API.

use reqwest::Method;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::azure::RestClient;
use crate::constants::api_versions;
use crate::models::migration::TestResult;
use crate::models::search::{array_at, str_at};

/// Default time allowed for one response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

const CONVERSATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between queries of a suite.
pub const SUITE_PAUSE: Duration = Duration::from_millis(500);

enum Failure {
    Timeout,
    Http(u16),
    Other(String),
}

impl From<reqwest::Error> for Failure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Runs test queries against agents of one project.
pub struct AgentTestRunner {
    client: RestClient,
    timeout: Duration,
    pause: Duration,
}

impl AgentTestRunner {
    /// Runner over a project-endpoint client.
    pub fn new(client: RestClient) -> Self {
        Self {
            client,
            timeout: DEFAULT_RESPONSE_TIMEOUT,
            pause: SUITE_PAUSE,
        }
    }

    /// Overrides the response timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the pause between suite queries.
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    async fn post(&self, path: &str, body: &Value, timeout: Duration) -> Result<Value, Failure> {
        let url = self.client.url(path, api_versions::RESPONSES);
        let response = self
            .client
            .request(Method::POST, &url)
            .await
            .map_err(|e| Failure::Other(e.to_string()))?
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Failure::Http(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn exchange(&self, agent_name: &str, query: &str) -> Result<Value, Failure> {
        let conversation = self
            .post("/openai/conversations", &json!({}), CONVERSATION_TIMEOUT)
            .await?;
        let conversation_id = str_at(&conversation, "id");
        debug!("Conversation {:?} for {}", conversation_id, agent_name);

        let body = json!({
            "conversation": conversation_id,
            "input": query,
            "agent": {
                "name": agent_name,
                "type": "agent_reference",
            },
        });
        self.post("/openai/responses", &body, self.timeout).await
    }

    /// Sends one query. Failures are recorded in the result, never raised.
    pub async fn test_agent(&self, agent_name: &str, query: &str) -> TestResult {
        let mut result = TestResult::new(agent_name, query);
        let started = Instant::now();

        match self.exchange(agent_name, query).await {
            Ok(data) => record_response(&mut result, &data),
            Err(Failure::Timeout) => result.fail(
                "timeout",
                format!("Request timed out after {}s", self.timeout.as_secs()),
            ),
            Err(Failure::Http(code)) => result.fail("http_error", format!("HTTP error: {code}")),
            Err(Failure::Other(message)) => {
                warn!("Test failed for {}: {}", agent_name, message);
                result.fail("exception", message);
            }
        }

        result.response_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        result
    }

    /// Sends each query in turn, pausing between them.
    pub async fn run_test_suite(&self, agent_name: &str, queries: &[String]) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            results.push(self.test_agent(agent_name, query).await);
        }
        results
    }
}

fn record_response(result: &mut TestResult, data: &Value) {
    result.success = true;
    result.response_text = str_at(data, "output_text").unwrap_or_default();

    let tool_calls = array_at(data, "tool_calls");
    result.tool_calls_count = tool_calls.len();
    result.tool_types.clear();
    for call in tool_calls {
        let kind = str_at(call, "type").unwrap_or_default();
        if !result.tool_types.contains(&kind) {
            result.tool_types.push(kind);
        }
    }

    result.citation_count = array_at(data, "citations").len();
    result.has_citations = result.citation_count > 0;
    result.total_tokens = data
        .pointer("/usage/total_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0);
}

/// Generic queries, plus one about `context` when given.
pub fn default_queries(context: Option<&str>) -> Vec<String> {
    let mut queries = vec![
        "What information do you have available?".to_string(),
        "Can you provide a summary of the main topics?".to_string(),
        "What are the key points I should know about?".to_string(),
    ];
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        queries.push(format!("Tell me about {context}"));
    }
    queries
}

/// Problems with a response; empty when it meets the requirements.
pub fn validate_agent_response(result: &TestResult, require_citations: bool, require_tool_calls: bool) -> Vec<String> {
    if !result.success {
        return vec![format!(
            "Request failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        )];
    }

    let mut issues = Vec::new();
    if result.response_text.is_empty() {
        issues.push("Empty response received".to_string());
    }
    if require_citations && !result.has_citations {
        issues.push("No citations in response".to_string());
    }
    if require_tool_calls && result.tool_calls_count == 0 {
        issues.push("No tool calls made".to_string());
    }
    issues
}

#[cfg(test)]
#[path = "testing_tests.rs"]
mod tests;
