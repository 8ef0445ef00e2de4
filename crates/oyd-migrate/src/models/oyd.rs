//! Azure OpenAI "On Your Data" configuration as returned by the extensions API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How OYD maps index fields onto citations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OydFieldMapping {
    /// Fields concatenated into the grounding content.
    #[serde(default)]
    pub content_fields: Vec<String>,
    /// Citation title.
    #[serde(default)]
    pub title_field: Option<String>,
    /// Citation URL.
    #[serde(default)]
    pub url_field: Option<String>,
    /// Citation file path.
    #[serde(default)]
    pub filepath_field: Option<String>,
    /// Vector fields used for vector queries.
    #[serde(default)]
    pub vector_fields: Vec<String>,
}

/// An `azure_search` data source of an OYD deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OydSearchSource {
    /// Search endpoint.
    #[serde(default)]
    pub endpoint: String,
    /// Index name.
    #[serde(default)]
    pub index_name: String,
    /// Authentication block, kept verbatim.
    #[serde(default)]
    pub authentication: Value,
    /// Query type.
    #[serde(default = "default_query_type")]
    pub query_type: String,
    /// Semantic configuration name.
    #[serde(default)]
    pub semantic_configuration: Option<String>,
    /// OData filter.
    #[serde(default)]
    pub filter: Option<String>,
    /// Field mapping.
    #[serde(default)]
    pub fields_mapping: OydFieldMapping,
    /// Restrict answers to the data.
    #[serde(default = "default_true")]
    pub in_scope: bool,
    /// System message.
    #[serde(default)]
    pub role_information: Option<String>,
    /// Retrieval strictness, 1 to 5.
    #[serde(default = "default_strictness")]
    pub strictness: u8,
    /// Documents passed to the model.
    #[serde(default = "default_top_n")]
    pub top_n_documents: u32,
    /// Embedding deployment, kept verbatim.
    #[serde(default)]
    pub embedding_dependency: Option<Value>,
}

fn default_query_type() -> String {
    "simple".to_string()
}

fn default_true() -> bool {
    true
}

fn default_strictness() -> u8 {
    3
}

fn default_top_n() -> u32 {
    5
}

impl OydSearchSource {
    /// Parses the `parameters` object of an `azure_search` data source.
    /// Strictness outside 1..=5 is clamped.
    pub fn from_parameters(params: &Value) -> Option<Self> {
        let mut source: Self = serde_json::from_value(params.clone()).ok()?;
        source.strictness = source.strictness.clamp(1, 5);
        Some(source)
    }
}

/// A data source of an OYD deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataSource {
    /// Azure AI Search.
    AzureSearch(OydSearchSource),
    /// Any other source type (Cosmos DB, blob, Elasticsearch, ...).
    Other {
        /// Source type string.
        source_type: String,
        /// Raw parameters.
        parameters: Value,
    },
}

/// OYD configuration of one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OydConfiguration {
    /// Deployment name.
    pub deployment_name: String,
    /// Model name.
    pub model: String,
    /// Configured data sources.
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
    /// Completion token limit.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl OydConfiguration {
    /// Parses an extensions response body.
    pub fn from_extensions(deployment_name: &str, model: &str, data: &Value) -> Self {
        let data_sources = data
            .get("data_sources")
            .and_then(Value::as_array)
            .map(|sources| sources.iter().filter_map(parse_data_source).collect())
            .unwrap_or_default();

        Self {
            deployment_name: deployment_name.to_string(),
            model: model.to_string(),
            data_sources,
            max_tokens: data
                .get("max_tokens")
                .and_then(Value::as_u64)
                .and_then(|t| u32::try_from(t).ok()),
            temperature: data.get("temperature").and_then(Value::as_f64),
        }
    }

    /// All Azure AI Search sources.
    pub fn azure_search_sources(&self) -> Vec<&OydSearchSource> {
        self.data_sources
            .iter()
            .filter_map(|s| match s {
                DataSource::AzureSearch(source) => Some(source),
                DataSource::Other { .. } => None,
            })
            .collect()
    }

    /// The first Azure AI Search source.
    pub fn primary_search_source(&self) -> Option<&OydSearchSource> {
        self.azure_search_sources().into_iter().next()
    }
}

fn parse_data_source(source: &Value) -> Option<DataSource> {
    let source_type = source.get("type").and_then(Value::as_str)?;
    let parameters = source.get("parameters").cloned().unwrap_or(Value::Null);

    if source_type == "azure_search" {
        OydSearchSource::from_parameters(&parameters).map(DataSource::AzureSearch)
    } else {
        Some(DataSource::Other {
            source_type: source_type.to_string(),
            parameters,
        })
    }
}

/// An Azure OpenAI deployment and its OYD configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OydDeployment {
    /// Cognitive Services account.
    pub resource_name: String,
    /// Resource group.
    pub resource_group: String,
    /// Subscription id.
    pub subscription_id: String,
    /// `https://{account}.openai.azure.com`.
    pub endpoint: String,
    /// Deployment name.
    pub deployment_name: String,
    /// Model name.
    pub model_name: String,
    /// Model version.
    #[serde(default)]
    pub model_version: Option<String>,
    /// OYD configuration, when one was found.
    #[serde(default)]
    pub oyd_config: Option<OydConfiguration>,
}

impl OydDeployment {
    /// Builds the data plane endpoint for an account name.
    pub fn endpoint_for(account: &str) -> String {
        format!("https://{account}.openai.azure.com")
    }

    /// The deployment has at least one data source.
    pub fn has_oyd(&self) -> bool {
        self.data_source_count() > 0
    }

    /// Number of data sources.
    pub fn data_source_count(&self) -> usize {
        self.oyd_config
            .as_ref()
            .map_or(0, |c| c.data_sources.len())
    }
}
