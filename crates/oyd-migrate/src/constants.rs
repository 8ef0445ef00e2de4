//! API versions, token scopes and other fixed values.

/// REST API versions. Kept verbatim; the live services reject unknown values.
pub mod api_versions {
    /// Azure OpenAI data plane (deployment extensions).
    pub const AOAI_DATA_PLANE: &str = "2024-10-21";
    /// Cognitive Services management plane (accounts, deployments).
    pub const AOAI_MANAGEMENT: &str = "2023-05-01";
    /// Azure AI Search data plane (indexes, knowledge bases).
    pub const SEARCH_DATA_PLANE: &str = "2025-11-01-preview";
    /// Azure AI Search management plane (services, admin keys).
    pub const SEARCH_MANAGEMENT: &str = "2024-06-01-preview";
    /// Foundry agent service.
    pub const FOUNDRY_AGENTS: &str = "2025-05-01";
    /// Foundry projects data plane.
    pub const FOUNDRY_PROJECTS: &str = "2025-01-01-preview";
    /// Foundry project connections.
    pub const FOUNDRY_CONNECTIONS: &str = "2025-10-01-preview";
    /// Conversations and responses endpoints.
    pub const RESPONSES: &str = "2025-11-15-preview";
    /// Machine Learning workspaces (hubs and hub-based projects).
    pub const ML_WORKSPACES: &str = "2024-04-01";
    /// Machine Learning workspace connections.
    pub const ML_CONNECTIONS: &str = "2024-07-01-preview";
    /// Cognitive Services account projects.
    pub const COGNITIVE_PROJECTS: &str = "2024-10-01";
    /// Role assignments.
    pub const AUTHORIZATION: &str = "2022-04-01";
    /// Subscription listing.
    pub const SUBSCRIPTIONS: &str = "2022-12-01";
}

/// OAuth scopes requested from Entra ID.
pub mod scopes {
    /// Azure Resource Manager.
    pub const MANAGEMENT: &str = "https://management.azure.com/.default";
    /// Azure OpenAI data plane.
    pub const COGNITIVE_SERVICES: &str = "https://cognitiveservices.azure.com/.default";
    /// Azure AI Search data plane.
    pub const SEARCH: &str = "https://search.azure.com/.default";
    /// Foundry project data plane.
    pub const AI_FOUNDRY: &str = "https://ai.azure.com/.default";
}

/// Public ARM endpoint.
pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Public Entra ID authority.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Instance metadata endpoint for managed identity tokens.
pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Audience used by MCP connections to the search service.
pub const SEARCH_AUDIENCE: &str = "https://search.azure.com/";

/// Name of the per-user configuration directory under `$HOME`.
pub const CONFIG_DIR_NAME: &str = ".oyd-migrator";

/// Sub-directory of the config dir holding session files.
pub const SESSIONS_DIR: &str = "sessions";

/// Sub-directory of the config dir holding generated samples.
pub const SAMPLES_DIR: &str = "samples";

/// Settings file inside the config dir.
pub const SETTINGS_FILE: &str = "config.yaml";

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "OYD_MIGRATOR_";

/// Environment variable overriding the config dir.
pub const CONFIG_DIR_ENV: &str = "OYD_MIGRATOR_CONFIG_DIR";

/// Default Azure region for new projects.
pub const DEFAULT_LOCATION: &str = "eastus";

/// Default model deployment for migrated agents.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Models offered by the wizard, with a short description.
pub const RECOMMENDED_MODELS: &[(&str, &str)] = &[
    ("gpt-4.1", "Latest GPT-4.1 (recommended)"),
    ("gpt-4.1-mini", "Faster, lower cost"),
    ("gpt-4.1-nano", "Fastest, lowest cost"),
    ("gpt-4o", "GPT-4o (retiring)"),
    ("gpt-4o-mini", "GPT-4o mini (retiring)"),
];

/// RBAC roles the migration relies on.
pub const REQUIRED_ROLES: &[&str] = &[
    "Cognitive Services Contributor",
    "Search Service Contributor",
    "Search Index Data Reader",
    "Azure AI User",
    "Azure AI Developer",
];

/// Query types understood by both OYD and the search tool.
pub const QUERY_TYPES: &[&str] = &[
    "simple",
    "semantic",
    "vector",
    "vector_simple_hybrid",
    "vector_semantic_hybrid",
];

/// Search tool query type used when the OYD one is not preserved.
pub const DEFAULT_SEARCH_TOOL_QUERY_TYPE: &str = "vector_semantic_hybrid";

/// Maps an OYD query type onto the search tool, falling back to the default.
pub fn search_tool_query_type(oyd_query_type: &str) -> &'static str {
    QUERY_TYPES
        .iter()
        .find(|q| **q == oyd_query_type)
        .copied()
        .unwrap_or(DEFAULT_SEARCH_TOOL_QUERY_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_mapping_is_identity_for_known_types() {
        for q in QUERY_TYPES {
            assert_eq!(search_tool_query_type(q), *q);
        }
    }

    #[test]
    fn test_query_type_mapping_defaults_unknown() {
        assert_eq!(search_tool_query_type("full"), DEFAULT_SEARCH_TOOL_QUERY_TYPE);
        assert!(QUERY_TYPES.contains(&DEFAULT_SEARCH_TOOL_QUERY_TYPE));
    }

    #[test]
    fn test_default_model_is_recommended() {
        assert!(RECOMMENDED_MODELS.iter().any(|(m, _)| *m == DEFAULT_MODEL));
    }
}
