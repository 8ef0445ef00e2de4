//! Error types for oyd-migrate.

use serde_json::Value;
use std::collections::BTreeMap;

/// Structured context attached to an error.
pub type Details = BTreeMap<String, Value>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while discovering, provisioning or validating a migration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential acquisition or subscription access failed.
    #[error("{message}{}", render_details(.details))]
    Authentication {
        /// Human readable message.
        message: String,
        /// Extra context.
        details: Details,
    },

    /// Listing or reading source resources failed.
    #[error("{message}{}", render_details(.details))]
    Discovery {
        /// Human readable message.
        message: String,
        /// Extra context.
        details: Details,
    },

    /// Creating a Foundry project failed.
    #[error("{message}{}", render_details(.details))]
    Provisioning {
        /// Human readable message.
        message: String,
        /// Extra context.
        details: Details,
    },

    /// Creating or reading a project connection failed.
    #[error("{message}{}", render_details(.details))]
    Connection {
        /// Human readable message.
        message: String,
        /// Extra context.
        details: Details,
    },

    /// Creating an agent failed.
    #[error("{message}{}", render_details(.details))]
    AgentCreation {
        /// Human readable message.
        message: String,
        /// Extra context.
        details: Details,
    },

    /// A migrated resource did not pass validation.
    #[error("{message}{}", render_details(.details))]
    Validation {
        /// Human readable message.
        message: String,
        /// Extra context.
        details: Details,
    },

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A named resource does not exist.
    #[error("{resource_type} '{name}' not found")]
    ResourceNotFound {
        /// Kind of resource, e.g. `SearchIndex`.
        resource_type: String,
        /// Resource name.
        name: String,
    },

    /// The caller lacks a role for an operation.
    #[error("Permission denied for '{operation}'{}", render_role(.required_role))]
    PermissionDenied {
        /// Operation that was attempted.
        operation: String,
        /// Role that would grant access, when known.
        required_role: Option<String>,
    },

    /// An endpoint could not be reached.
    #[error("Network error contacting {endpoint}: {message}")]
    Network {
        /// Endpoint that failed.
        endpoint: String,
        /// Underlying failure.
        message: String,
    },

    /// A source feature has no equivalent on the chosen migration path.
    #[error("Feature '{feature}' is not supported by migration path '{path}'")]
    UnsupportedConfiguration {
        /// Source feature, e.g. `cosmos_db`.
        feature: String,
        /// Migration path name.
        path: String,
    },

    /// Throttled by the remote API; retry after the given seconds.
    #[error("Rate limit exceeded, retry after {0}s")]
    RateLimit(u64),

    /// The user cancelled an interactive prompt.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn render_details(details: &Details) -> String {
    if details.is_empty() {
        String::new()
    } else {
        let rendered = serde_json::to_string(details).unwrap_or_default();
        format!(" | Details: {rendered}")
    }
}

fn render_role(role: &Option<String>) -> String {
    role.as_ref()
        .map(|r| format!(". Required role: {r}"))
        .unwrap_or_default()
}

macro_rules! categorized {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {
        $(
            #[doc = concat!("Builds an [`Error::", stringify!($variant), "`] without details.")]
            pub fn $fn_name(message: impl Into<String>) -> Self {
                Self::$variant {
                    message: message.into(),
                    details: Details::new(),
                }
            }
        )*
    };
}

impl Error {
    categorized! {
        authentication => Authentication,
        discovery => Discovery,
        provisioning => Provisioning,
        connection => Connection,
        agent_creation => AgentCreation,
        validation => Validation,
    }

    /// Attaches a detail entry. No-op for variants without a detail map.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        match &mut self {
            Self::Authentication { details, .. }
            | Self::Discovery { details, .. }
            | Self::Provisioning { details, .. }
            | Self::Connection { details, .. }
            | Self::AgentCreation { details, .. }
            | Self::Validation { details, .. } => {
                details.insert(key.to_string(), value.into());
            }
            _ => {}
        }
        self
    }

    /// Returns the detail map for categorized errors.
    pub fn details(&self) -> Option<&Details> {
        match self {
            Self::Authentication { details, .. }
            | Self::Discovery { details, .. }
            | Self::Provisioning { details, .. }
            | Self::Connection { details, .. }
            | Self::AgentCreation { details, .. }
            | Self::Validation { details, .. } => Some(details),
            _ => None,
        }
    }

    /// A 404 from the service, or an explicit not-found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
            || self
                .details()
                .and_then(|d| d.get("status_code"))
                .and_then(Value::as_u64)
                == Some(404)
    }

    /// Whether this error came from the user backing out of a prompt.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}
