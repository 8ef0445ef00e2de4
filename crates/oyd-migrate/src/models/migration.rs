//! Plans, results and test outcomes of a migration run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::MigrationPath;
use crate::models::foundry::{FoundryAgent, ProjectConnection};

/// Source deployment to target agent mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationMapping {
    /// OYD deployment name.
    pub source_deployment: String,
    /// Index the deployment reads.
    pub source_index: String,
    /// Agent that replaces it.
    pub target_agent_name: String,
    /// Connection the agent uses.
    pub target_connection_name: String,
}

/// What a run will create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Plan id (the session id).
    pub plan_id: String,
    /// Target architecture.
    pub migration_path: MigrationPath,
    /// Target project.
    pub target_project_name: String,
    /// Target project endpoint.
    pub target_project_endpoint: String,
    /// Mappings.
    #[serde(default)]
    pub mappings: Vec<MigrationMapping>,
}

impl MigrationPlan {
    /// Mapping for a source deployment.
    pub fn mapping_for_deployment(&self, deployment: &str) -> Option<&MigrationMapping> {
        self.mappings
            .iter()
            .find(|m| m.source_deployment == deployment)
    }
}

/// One test query against an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Agent under test.
    pub agent_name: String,
    /// Query sent.
    pub query: String,
    /// When the query was sent.
    pub timestamp: DateTime<Utc>,
    /// The request completed.
    pub success: bool,
    /// Answer text.
    #[serde(default)]
    pub response_text: String,
    /// Wall-clock latency.
    #[serde(default)]
    pub response_time_ms: f64,
    /// Tool calls made.
    #[serde(default)]
    pub tool_calls_count: usize,
    /// Distinct tool types used.
    #[serde(default)]
    pub tool_types: Vec<String>,
    /// Citations returned.
    #[serde(default)]
    pub citation_count: usize,
    /// At least one citation.
    #[serde(default)]
    pub has_citations: bool,
    /// Tokens consumed.
    #[serde(default)]
    pub total_tokens: u64,
    /// Failure message.
    #[serde(default)]
    pub error_message: Option<String>,
    /// `timeout`, `http_error` or `exception`.
    #[serde(default)]
    pub error_type: Option<String>,
}

impl TestResult {
    /// A pending result for a query, marked unsuccessful.
    pub fn new(agent_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            query: query.into(),
            timestamp: Utc::now(),
            success: false,
            response_text: String::new(),
            response_time_ms: 0.0,
            tool_calls_count: 0,
            tool_types: Vec::new(),
            citation_count: 0,
            has_citations: false,
            total_tokens: 0,
            error_message: None,
            error_type: None,
        }
    }

    /// Marks the result failed.
    pub fn fail(&mut self, error_type: &str, message: impl Into<String>) {
        self.success = false;
        self.error_type = Some(error_type.to_string());
        self.error_message = Some(message.into());
    }
}

/// Outcome of the review/execute stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Result id.
    pub result_id: String,
    /// Target architecture.
    pub migration_path: MigrationPath,
    /// Plan (session) id.
    pub plan_id: String,
    /// Finish time.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration.
    #[serde(default)]
    pub duration_secs: f64,
    /// Connections created or updated.
    #[serde(default)]
    pub connections_created: Vec<ProjectConnection>,
    /// Agents created or reused.
    #[serde(default)]
    pub agents_created: Vec<FoundryAgent>,
    /// Test results.
    #[serde(default)]
    pub test_results: Vec<TestResult>,
    /// Generated artifacts: file name to kind.
    #[serde(default)]
    pub artifacts: BTreeMap<String, String>,
    /// Every step completed.
    #[serde(default)]
    pub success: bool,
    /// Errors hit during the run.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Non-fatal problems.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl MigrationResult {
    /// An empty, unsuccessful result.
    pub fn new(result_id: impl Into<String>, plan_id: impl Into<String>, path: MigrationPath) -> Self {
        Self {
            result_id: result_id.into(),
            migration_path: path,
            plan_id: plan_id.into(),
            completed_at: None,
            duration_secs: 0.0,
            connections_created: Vec::new(),
            agents_created: Vec::new(),
            test_results: Vec::new(),
            artifacts: BTreeMap::new(),
            success: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// At least one test ran and all passed.
    pub fn all_tests_passed(&self) -> bool {
        !self.test_results.is_empty() && self.test_results.iter().all(|t| t.success)
    }

    /// Number of deployments turned into agents.
    pub fn deployments_migrated(&self) -> usize {
        self.agents_created.len()
    }
}
