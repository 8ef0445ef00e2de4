//! Migration pipeline: the execute half of the review stage.
//!
//! Steps run in order and stop at the first error:
//!
//! 1. create the project when requested;
//! 2. create one search connection per search service;
//! 3. wait until each connection is readable;
//! 4. ensure one agent per OYD deployment;
//! 5. send smoke-test queries;
//! 6. generate client samples.
//!
//! Errors are captured in the [`MigrationResult`], never raised. Every side
//! effect is recorded on the session as it happens so a re-run can skip or
//! overwrite it.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::{AoaiConfig, FoundryConfig};
use crate::constants::{search_tool_query_type, DEFAULT_SEARCH_TOOL_QUERY_TYPE};
use crate::error::{Error, Result};
use crate::generators::samples::{generate_python_sample, sample_file_name};
use crate::models::foundry::ProjectConnection;
use crate::models::migration::MigrationResult;
use crate::services::agents::AgentRequest;
use crate::services::testing::default_queries;
use crate::services::AzureContext;
use crate::session::MigrationSession;

/// Instructions every migrated agent starts with.
pub const BASE_INSTRUCTIONS: &str = "You are a helpful assistant that answers questions using the connected data sources.

When answering questions:
1. Always use the available tools to search for relevant information
2. Cite your sources in your responses
3. If you cannot find relevant information, say so clearly
";

/// Queries sent to each agent after migration.
const SMOKE_TEST_QUERIES: usize = 2;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Agent instructions for a deployment.
pub fn build_instructions(aoai: &AoaiConfig, migrate_system_message: bool) -> String {
    let mut instructions = BASE_INSTRUCTIONS.to_string();
    if migrate_system_message {
        if let Some(role) = aoai.role_information.as_deref().filter(|r| !r.trim().is_empty()) {
            instructions.push_str("\nAdditional context from original configuration:\n");
            instructions.push_str(role);
        }
    }
    instructions
}

/// Session key of one smoke test.
pub fn test_key(agent_name: &str, query: &str) -> String {
    let prefix: String = query.chars().take(20).collect();
    format!("{agent_name}:{prefix}")
}

/// Name of the connection created for a search service.
pub fn connection_name(service_name: &str) -> String {
    format!("{service_name}-connection")
}

/// Name of the agent created for a deployment.
pub fn agent_name(deployment_name: &str) -> String {
    format!("{deployment_name}-migrated")
}

/// Runs the provisioning steps for a configured session.
pub struct MigrationPipeline {
    context: AzureContext,
    propagation_timeout: Duration,
    poll_interval: Duration,
    test_pause: Option<Duration>,
    show_progress: bool,
    sample_dir: Option<PathBuf>,
}

impl MigrationPipeline {
    /// Pipeline with a 15 s propagation bound and no progress output.
    pub fn new(context: AzureContext) -> Self {
        Self {
            context,
            propagation_timeout: Duration::from_secs(15),
            poll_interval: DEFAULT_POLL_INTERVAL,
            test_pause: None,
            show_progress: false,
            sample_dir: None,
        }
    }

    /// Upper bound on the wait for each new connection.
    #[must_use]
    pub fn with_propagation_timeout(mut self, timeout: Duration) -> Self {
        self.propagation_timeout = timeout;
        self
    }

    /// Interval between readability polls.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Pause between smoke-test queries.
    #[must_use]
    pub fn with_test_pause(mut self, pause: Duration) -> Self {
        self.test_pause = Some(pause);
        self
    }

    /// Shows a spinner while running.
    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Also writes generated samples into this directory.
    #[must_use]
    pub fn with_sample_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.sample_dir = dir;
        self
    }

    /// Executes the migration described by the session.
    pub async fn execute(&self, session: &mut MigrationSession) -> MigrationResult {
        let start = Instant::now();
        let path = session.migration_options.migration_path;
        let result_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let mut result = MigrationResult::new(result_id, session.session_id.clone(), path);
        let progress = create_spinner(self.show_progress);

        info!("Starting {} migration for session {}", path, session.session_id);

        if let Err(e) = self.run(session, &mut result, &progress).await {
            error!("Migration failed: {}", e);
            result.errors.push(e.to_string());
        }

        result.success = result.errors.is_empty();
        result.duration_secs = start.elapsed().as_secs_f64();
        result.completed_at = Some(chrono::Utc::now());
        progress.finish_and_clear();

        info!(
            "Migration {}: {} connection(s), {} agent(s), {} test(s) in {:.2}s",
            if result.success { "complete" } else { "failed" },
            result.connections_created.len(),
            result.agents_created.len(),
            result.test_results.len(),
            result.duration_secs
        );
        result
    }

    async fn run(&self, session: &mut MigrationSession, result: &mut MigrationResult, progress: &ProgressBar) -> Result<()> {
        let endpoint = self.ensure_project(session, progress).await?;
        let options = session.migration_options.clone();
        let model = session
            .foundry_config
            .as_ref()
            .map(|f| f.model_deployment.clone())
            .unwrap_or_default();

        // Connections
        let connections = self.context.connections(&endpoint);
        for search in session.search_configs.clone() {
            let name = connection_name(&search.service_name);
            progress.set_message(format!("Creating connection {name}"));
            let connection = connections
                .create_search_connection(
                    &name,
                    &search.endpoint,
                    search.api_key.as_deref(),
                    search.use_managed_identity,
                )
                .await?;
            session.record_connection(&name);
            result.connections_created.push(connection);
        }

        for connection in &result.connections_created {
            progress.set_message(format!("Waiting for {} to propagate", connection.name));
            let ready = connections
                .wait_until_readable(&connection.name, self.propagation_timeout, self.poll_interval)
                .await;
            if !ready {
                let message = format!(
                    "Connection '{}' not readable after {}s",
                    connection.name,
                    self.propagation_timeout.as_secs()
                );
                warn!("{}", message);
                result.warnings.push(message);
            }
        }

        // Agents
        let agents = self.context.agents(&endpoint);
        let index_name = session.search_configs.first().and_then(|s| s.index_name.clone());
        for aoai in session.aoai_configs.clone() {
            let request = agent_request(&aoai, &model, &options, &result.connections_created, index_name.clone());
            progress.set_message(format!("Creating agent {}", request.name));
            let (agent, created) = agents.ensure_agent(&request).await?;
            if !created {
                result
                    .warnings
                    .push(format!("Agent '{}' already existed and was reused", agent.name));
            }
            session.record_agent(&agent.name);
            result.agents_created.push(agent);
        }

        // Smoke tests
        if options.test_after_migration {
            let mut runner = self.context.test_runner(&endpoint);
            if let Some(pause) = self.test_pause {
                runner = runner.with_pause(pause);
            }
            let queries: Vec<String> = default_queries(None).into_iter().take(SMOKE_TEST_QUERIES).collect();
            for agent in &result.agents_created {
                progress.set_message(format!("Testing {}", agent.name));
                for test in runner.run_test_suite(agent.reference(), &queries).await {
                    session.record_test(test_key(&agent.name, &test.query), test.success);
                    result.test_results.push(test);
                }
            }
        }

        // Samples
        if options.generate_samples {
            if let Some(dir) = &self.sample_dir {
                std::fs::create_dir_all(dir)?;
            }
            for agent in &result.agents_created {
                let file_name = sample_file_name(&agent.name);
                let code = generate_python_sample(&agent.name, &endpoint, agent.migration_path);
                if let Some(dir) = &self.sample_dir {
                    std::fs::write(dir.join(&file_name), code)?;
                }
                result.artifacts.insert(file_name, "python".to_string());
            }
        }

        Ok(())
    }

    /// Creates the project when requested and returns the endpoint to use.
    async fn ensure_project(&self, session: &mut MigrationSession, progress: &ProgressBar) -> Result<String> {
        let foundry: &mut FoundryConfig = session
            .foundry_config
            .as_mut()
            .ok_or_else(|| Error::Config("No Foundry project configured".to_string()))?;

        if session.migration_options.create_new_project {
            progress.set_message(format!("Creating project {}", foundry.project_name));
            let provisioner = self.context.foundry();
            let project = match provisioner
                .get_project(&foundry.project_name, &foundry.resource_group)
                .await?
            {
                Some(existing) => {
                    info!("Project {} already exists", existing.name);
                    existing
                }
                None => {
                    provisioner
                        .create_project(
                            &foundry.project_name,
                            &foundry.resource_group,
                            &foundry.location,
                            foundry.hub_resource_id.as_deref(),
                        )
                        .await?
                }
            };
            foundry.project_endpoint = provisioner.resolve_project_endpoint(&project).await;
        }

        if foundry.project_endpoint.trim().is_empty() {
            return Err(Error::Config(format!(
                "Project '{}' has no endpoint",
                foundry.project_name
            )));
        }
        Ok(foundry.project_endpoint.clone())
    }
}

fn agent_request(
    aoai: &AoaiConfig,
    model: &str,
    options: &crate::config::MigrationOptions,
    connections: &[ProjectConnection],
    index_name: Option<String>,
) -> AgentRequest {
    let query_type = if options.preserve_query_type {
        search_tool_query_type(aoai.query_type.as_deref().unwrap_or_default())
    } else {
        DEFAULT_SEARCH_TOOL_QUERY_TYPE
    };

    let instructions = build_instructions(aoai, options.migrate_system_message);
    connections.iter().cloned().fold(
        AgentRequest::new(
            &agent_name(&aoai.deployment_name),
            model,
            &instructions,
            options.migration_path,
        )
        .with_index(index_name)
        .with_query_type(query_type),
        AgentRequest::with_connection,
    )
}

fn create_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
