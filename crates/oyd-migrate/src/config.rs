//! Configuration types for oyd-migrate.
//!
//! Two kinds of configuration live here: [`AppSettings`], the per-user tool
//! settings read from `~/.oyd-migrator/config.yaml` and `OYD_MIGRATOR_*`
//! variables, and the value records a migration session carries
//! ([`AzureConfig`], [`AoaiConfig`], [`SearchConfig`], [`FoundryConfig`],
//! [`MigrationOptions`]). [`MigrationPlanFile`] bundles the latter into a YAML
//! document for non-interactive runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_LOCATION, DEFAULT_MODEL, ENV_PREFIX, SETTINGS_FILE,
};
use crate::error::{Error, Result};

/// How the tool authenticates against Azure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Reuse the Azure CLI login (`az login`).
    #[default]
    Cli,
    /// Client id and secret of an app registration.
    ServicePrincipal,
    /// System or user assigned managed identity.
    ManagedIdentity,
}

impl AuthMethod {
    /// Returns all methods in prompt order.
    pub fn all() -> [Self; 3] {
        [Self::Cli, Self::ServicePrincipal, Self::ManagedIdentity]
    }

    /// Value used in files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::ServicePrincipal => "service_principal",
            Self::ManagedIdentity => "managed_identity",
        }
    }

    /// Label shown in the wizard.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cli => "Azure CLI (az login)",
            Self::ServicePrincipal => "Service Principal (client id + secret)",
            Self::ManagedIdentity => "Managed Identity",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|m| m.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Unknown auth method '{s}'. Expected cli, service_principal or managed_identity"
                ))
            })
    }
}

/// Target architecture of the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPath {
    /// Foundry agent with the Azure AI Search tool.
    #[default]
    SearchTool,
    /// Foundry agent backed by a Foundry IQ knowledge base over MCP.
    KnowledgeBase,
}

impl MigrationPath {
    /// Value used in plan and session files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchTool => "search_tool",
            Self::KnowledgeBase => "knowledge_base",
        }
    }

    /// Label shown in the wizard and reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SearchTool => "Foundry Agent + Azure AI Search Tool",
            Self::KnowledgeBase => "Foundry Agent + Foundry IQ Knowledge Base",
        }
    }
}

impl fmt::Display for MigrationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Azure identity and subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Subscription holding the resources.
    pub subscription_id: String,
    /// Entra tenant (required for service principals).
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Authentication method.
    #[serde(default)]
    pub auth_method: AuthMethod,
    /// Service principal client id.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Service principal secret. Never written to session files.
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
    /// Client id of a user assigned managed identity.
    #[serde(default)]
    pub managed_identity_client_id: Option<String>,
}

/// One Azure OpenAI deployment selected for migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AoaiConfig {
    /// Cognitive Services account name.
    pub resource_name: String,
    /// Resource group of the account.
    pub resource_group: String,
    /// Data plane endpoint.
    pub endpoint: String,
    /// Deployment name.
    pub deployment_name: String,
    /// Optional API key.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// OYD system message, carried into agent instructions.
    #[serde(default)]
    pub role_information: Option<String>,
    /// OYD query type of the primary search source.
    #[serde(default)]
    pub query_type: Option<String>,
}

/// One Azure AI Search service feeding an OYD deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search service name.
    pub service_name: String,
    /// Resource group of the service.
    pub resource_group: String,
    /// Service endpoint.
    pub endpoint: String,
    /// Admin key, when key auth is used.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Use managed identity instead of keys.
    #[serde(default)]
    pub use_managed_identity: bool,
    /// Index referenced by the OYD configuration.
    #[serde(default)]
    pub index_name: Option<String>,
}

/// Target Foundry project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundryConfig {
    /// Project name.
    pub project_name: String,
    /// Resource group of the project.
    pub resource_group: String,
    /// Project endpoint (filled after creation for new projects).
    #[serde(default)]
    pub project_endpoint: String,
    /// Model deployment used by agents.
    #[serde(default = "default_model")]
    pub model_deployment: String,
    /// Region for new projects.
    #[serde(default = "default_location")]
    pub location: String,
    /// Parent hub for new hub-based projects.
    #[serde(default)]
    pub hub_resource_id: Option<String>,
}

/// Choices made in the migration stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Target architecture.
    #[serde(default)]
    pub migration_path: MigrationPath,
    /// Create the Foundry project instead of reusing one.
    #[serde(default)]
    pub create_new_project: bool,
    /// Keep the OYD query type on the search tool.
    #[serde(default = "default_true")]
    pub preserve_query_type: bool,
    /// Append the OYD system message to agent instructions.
    #[serde(default = "default_true")]
    pub migrate_system_message: bool,
    /// Send test queries after agents are created.
    #[serde(default = "default_true")]
    pub test_after_migration: bool,
    /// Produce SDK samples for each agent.
    #[serde(default = "default_true")]
    pub generate_samples: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            migration_path: MigrationPath::default(),
            create_new_project: false,
            preserve_query_type: true,
            migrate_system_message: true,
            test_after_migration: true,
            generate_samples: true,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_propagation_delay() -> u64 {
    15
}

/// Returns `~/.oyd-migrator`, or a relative `.oyd-migrator` without a home dir.
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME))
}

/// Per-user tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Directory holding settings and sessions.
    #[serde(skip)]
    pub config_dir: PathBuf,
    /// Log level used when `--verbose` is not given.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Optional log file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Disable colored output.
    #[serde(default)]
    pub no_color: bool,
    /// Verbose output.
    #[serde(default)]
    pub verbose: bool,
    /// Region for new projects.
    #[serde(default = "default_location")]
    pub default_location: String,
    /// Upper bound on the wait for new connections to become readable.
    #[serde(default = "default_propagation_delay")]
    pub propagation_delay_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            log_level: default_log_level(),
            log_file: None,
            no_color: false,
            verbose: false,
            default_location: default_location(),
            propagation_delay_secs: default_propagation_delay(),
        }
    }
}

impl AppSettings {
    /// Loads settings for a config dir: file first, then environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be parsed.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let mut settings = Self::from_dir(config_dir)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Reads `config.yaml` from the dir; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_dir(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(SETTINGS_FILE);
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Self::default()
            } else {
                serde_yaml::from_str::<Self>(&content)?
            }
        } else {
            Self::default()
        };
        settings.config_dir = config_dir.to_path_buf();
        Ok(settings)
    }

    /// Applies `OYD_MIGRATOR_*` overrides through the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        if let Some(file) = var("LOG_FILE") {
            self.log_file = Some(PathBuf::from(file));
        }
        if let Some(flag) = var("NO_COLOR") {
            self.no_color = parse_flag(&flag);
        }
        if let Some(flag) = var("VERBOSE") {
            self.verbose = parse_flag(&flag);
        }
        if let Some(location) = var("DEFAULT_LOCATION") {
            self.default_location = location;
        }
        if let Some(delay) = var("PROPAGATION_DELAY_SECS").and_then(|d| d.parse().ok()) {
            self.propagation_delay_secs = delay;
        }
    }

    /// Directory holding session files.
    pub fn sessions_dir(&self) -> PathBuf {
        self.config_dir.join(crate::constants::SESSIONS_DIR)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Full migration description for non-interactive runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationPlanFile {
    /// Azure identity.
    pub azure: AzureConfig,
    /// Deployments to migrate.
    #[serde(default)]
    pub openai: Vec<AoaiConfig>,
    /// Search services to connect.
    #[serde(default)]
    pub search: Vec<SearchConfig>,
    /// Target project.
    pub foundry: FoundryConfig,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

impl MigrationPlanFile {
    /// Load a plan from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let plan: Self = serde_yaml::from_str(&content)?;
        Ok(plan)
    }

    /// Validate the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing.
    pub fn validate(&self) -> Result<()> {
        if self.azure.subscription_id.trim().is_empty() {
            return Err(Error::Config(
                "azure.subscription_id cannot be empty".to_string(),
            ));
        }
        if self.azure.auth_method == AuthMethod::ServicePrincipal
            && (self.azure.tenant_id.is_none() || self.azure.client_id.is_none())
        {
            return Err(Error::Config(
                "service_principal auth requires azure.tenant_id and azure.client_id".to_string(),
            ));
        }
        if self.openai.is_empty() {
            return Err(Error::Config(
                "at least one openai deployment is required".to_string(),
            ));
        }
        if self.search.is_empty() {
            return Err(Error::Config(
                "at least one search service is required".to_string(),
            ));
        }
        if let Some(bad) = self.openai.iter().find(|d| d.deployment_name.is_empty()) {
            return Err(Error::Config(format!(
                "openai entry for '{}' has no deployment_name",
                bad.resource_name
            )));
        }
        if !self.options.create_new_project && self.foundry.project_endpoint.is_empty() {
            return Err(Error::Config(
                "foundry.project_endpoint is required unless options.create_new_project is set"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PLAN_YAML: &str = r#"
azure:
  subscription_id: sub-123
  auth_method: cli
openai:
  - resource_name: my-aoai
    resource_group: rg-ai
    endpoint: https://my-aoai.openai.azure.com
    deployment_name: gpt-4o-deployment
search:
  - service_name: my-search
    resource_group: rg-ai
    endpoint: https://my-search.search.windows.net
    index_name: products-index
foundry:
  project_name: my-proj
  resource_group: rg-ai
  project_endpoint: https://acct.services.ai.azure.com/api/projects/my-proj
options:
  migration_path: knowledge_base
"#;

    #[test]
    fn test_migration_options_defaults() {
        let options = MigrationOptions::default();
        assert_eq!(options.migration_path, MigrationPath::SearchTool);
        assert!(!options.create_new_project);
        assert!(options.preserve_query_type);
        assert!(options.migrate_system_message);
        assert!(options.test_after_migration);
        assert!(options.generate_samples);
    }

    #[test]
    fn test_plan_yaml_parse() {
        let plan: MigrationPlanFile = serde_yaml::from_str(PLAN_YAML).unwrap();
        assert_eq!(plan.azure.subscription_id, "sub-123");
        assert_eq!(plan.foundry.model_deployment, "gpt-4.1");
        assert_eq!(plan.foundry.location, "eastus");
        assert_eq!(plan.options.migration_path, MigrationPath::KnowledgeBase);
        assert!(plan.options.test_after_migration);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_plan_requires_endpoint_for_existing_project() {
        // Arrange
        let mut plan: MigrationPlanFile = serde_yaml::from_str(PLAN_YAML).unwrap();
        plan.foundry.project_endpoint.clear();

        // Act & Assert
        assert!(plan.validate().is_err());
        plan.options.create_new_project = true;
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_plan_service_principal_needs_tenant() {
        let mut plan: MigrationPlanFile = serde_yaml::from_str(PLAN_YAML).unwrap();
        plan.azure.auth_method = AuthMethod::ServicePrincipal;
        plan.azure.client_id = Some("app".to_string());

        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("tenant_id"));
    }

    #[test]
    fn test_plan_requires_deployments() {
        let mut plan: MigrationPlanFile = serde_yaml::from_str(PLAN_YAML).unwrap();
        plan.openai.clear();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let config = AzureConfig {
            subscription_id: "sub".to_string(),
            auth_method: AuthMethod::ServicePrincipal,
            client_secret: Some("s3cret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(json.contains("service_principal"));
    }

    #[test]
    fn test_auth_method_from_str() {
        assert_eq!("cli".parse::<AuthMethod>().unwrap(), AuthMethod::Cli);
        assert_eq!(
            "Managed_Identity".parse::<AuthMethod>().unwrap(),
            AuthMethod::ManagedIdentity
        );
        assert!("password".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn test_settings_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AppSettings::from_dir(dir.path()).unwrap();
        assert_eq!(settings.config_dir, dir.path());
        assert_eq!(settings.default_location, "eastus");
        assert_eq!(settings.propagation_delay_secs, 15);
    }

    #[test]
    fn test_settings_file_and_env_overrides() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "log_level: debug\ndefault_location: westeurope\n",
        )
        .unwrap();
        let env: HashMap<String, String> = [
            ("OYD_MIGRATOR_DEFAULT_LOCATION", "swedencentral"),
            ("OYD_MIGRATOR_NO_COLOR", "true"),
            ("OYD_MIGRATOR_PROPAGATION_DELAY_SECS", "0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        // Act
        let mut settings = AppSettings::from_dir(dir.path()).unwrap();
        settings.apply_env(|key| env.get(key).cloned());

        // Assert
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.default_location, "swedencentral");
        assert!(settings.no_color);
        assert_eq!(settings.propagation_delay_secs, 0);
    }

    #[test]
    fn test_sessions_dir() {
        let settings = AppSettings {
            config_dir: PathBuf::from("/tmp/oyd"),
            ..Default::default()
        };
        assert_eq!(settings.sessions_dir(), PathBuf::from("/tmp/oyd/sessions"));
    }
}
