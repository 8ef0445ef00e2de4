//! Azure AI Search services, indexes and their REST representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field type of plain text fields.
pub const TEXT_FIELD_TYPE: &str = "Edm.String";

/// Field type of float vector fields.
pub const VECTOR_FIELD_TYPE: &str = "Collection(Edm.Single)";

/// A field of a search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    /// Field name.
    pub name: String,
    /// EDM type, e.g. `Edm.String`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Full-text searchable.
    #[serde(default)]
    pub searchable: bool,
    /// Usable in filters.
    #[serde(default)]
    pub filterable: bool,
    /// Usable in `$orderby`.
    #[serde(default)]
    pub sortable: bool,
    /// Usable in facets.
    #[serde(default)]
    pub facetable: bool,
    /// Returned in results. The service treats a missing flag as true.
    #[serde(default = "default_retrievable")]
    pub retrievable: bool,
    /// Document key.
    #[serde(default)]
    pub key: bool,
    /// Vector dimensions.
    #[serde(default)]
    pub dimensions: Option<u32>,
    /// Vector search profile name.
    #[serde(default)]
    pub vector_search_profile: Option<String>,
    /// Analyzer for indexing and search.
    #[serde(default)]
    pub analyzer: Option<String>,
    /// Search-time analyzer.
    #[serde(default)]
    pub search_analyzer: Option<String>,
    /// Index-time analyzer.
    #[serde(default)]
    pub index_analyzer: Option<String>,
}

fn default_retrievable() -> bool {
    true
}

impl IndexField {
    /// Creates a field with the given name and type and default flags.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            searchable: false,
            filterable: false,
            sortable: false,
            facetable: false,
            retrievable: true,
            key: false,
            dimensions: None,
            vector_search_profile: None,
            analyzer: None,
            search_analyzer: None,
            index_analyzer: None,
        }
    }

    /// A searchable `Edm.String` field.
    pub fn is_text(&self) -> bool {
        self.field_type == TEXT_FIELD_TYPE && self.searchable
    }

    /// A float vector field with configured dimensions.
    pub fn is_vector(&self) -> bool {
        self.field_type == VECTOR_FIELD_TYPE && self.dimensions.is_some()
    }
}

/// Field reference inside a semantic configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticField {
    /// Referenced field name.
    pub field_name: String,
}

/// Prioritized fields of a semantic configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedFields {
    /// Title field.
    #[serde(default)]
    pub title_field: Option<SemanticField>,
    /// Content fields, in priority order.
    #[serde(default)]
    pub content_fields: Vec<SemanticField>,
    /// Keyword fields, in priority order.
    #[serde(default, alias = "keywordFields")]
    pub keywords_fields: Vec<SemanticField>,
}

/// A semantic ranker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticConfig {
    /// Configuration name.
    pub name: String,
    /// Prioritized fields.
    #[serde(default)]
    pub prioritized_fields: PrioritizedFields,
}

/// Semantic settings block of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticSettings {
    /// Configuration used when a query names none.
    #[serde(default)]
    pub default_configuration: Option<String>,
    /// All configurations.
    #[serde(default)]
    pub configurations: Vec<SemanticConfig>,
}

/// A vector search algorithm (HNSW, exhaustive KNN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorAlgorithm {
    /// Algorithm configuration name.
    pub name: String,
    /// Algorithm kind, e.g. `hnsw`.
    pub kind: String,
    /// Kind-specific parameters.
    #[serde(default)]
    pub parameters: Value,
}

/// A vector search profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorProfile {
    /// Profile name.
    pub name: String,
    /// Algorithm configuration used by the profile.
    pub algorithm_configuration_name: String,
    /// Vectorizer used at query time.
    #[serde(default)]
    pub vectorizer_name: Option<String>,
}

/// Vector search settings of an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorSearchConfig {
    /// Algorithms.
    #[serde(default)]
    pub algorithms: Vec<VectorAlgorithm>,
    /// Profiles.
    #[serde(default)]
    pub profiles: Vec<VectorProfile>,
    /// Vectorizers, kept verbatim.
    #[serde(default)]
    pub vectorizers: Vec<Value>,
}

/// A search index with the metadata the migration cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    /// Index name.
    pub name: String,
    /// Owning service name.
    pub service_name: String,
    /// Owning service endpoint.
    pub service_endpoint: String,
    /// Fields.
    #[serde(default)]
    pub fields: Vec<IndexField>,
    /// Semantic configurations.
    #[serde(default)]
    pub semantic_configurations: Vec<SemanticConfig>,
    /// Default semantic configuration.
    #[serde(default)]
    pub default_semantic_configuration: Option<String>,
    /// Vector search settings.
    #[serde(default)]
    pub vector_search: Option<VectorSearchConfig>,
    /// Document count, when known.
    #[serde(default)]
    pub document_count: Option<u64>,
    /// Storage size in bytes, when known.
    #[serde(default)]
    pub storage_size_bytes: Option<u64>,
}

impl SearchIndex {
    /// Creates an index with no fields or settings.
    pub fn new(
        name: impl Into<String>,
        service_name: impl Into<String>,
        service_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_name: service_name.into(),
            service_endpoint: service_endpoint.into(),
            fields: Vec::new(),
            semantic_configurations: Vec::new(),
            default_semantic_configuration: None,
            vector_search: None,
            document_count: None,
            storage_size_bytes: None,
        }
    }

    /// The document key field.
    pub fn key_field(&self) -> Option<&IndexField> {
        self.fields.iter().find(|f| f.key)
    }

    /// Searchable text fields.
    pub fn text_fields(&self) -> Vec<&IndexField> {
        self.fields.iter().filter(|f| f.is_text()).collect()
    }

    /// Vector fields with dimensions.
    pub fn vector_fields(&self) -> Vec<&IndexField> {
        self.fields.iter().filter(|f| f.is_vector()).collect()
    }

    /// At least one semantic configuration exists.
    pub fn has_semantic_search(&self) -> bool {
        !self.semantic_configurations.is_empty()
    }

    /// At least one vector field exists.
    pub fn has_vector_search(&self) -> bool {
        self.fields.iter().any(IndexField::is_vector)
    }

    /// Parses the index definition returned by `GET /indexes`.
    pub fn from_rest(service_name: &str, service_endpoint: &str, data: &Value) -> Self {
        let mut index = Self::new(
            str_at(data, "name").unwrap_or_default(),
            service_name,
            service_endpoint,
        );

        index.fields = array_at(data, "fields")
            .iter()
            .filter_map(|f| serde_json::from_value::<IndexField>(f.clone()).ok())
            .collect();

        if let Some(semantic) = data.get("semantic") {
            let settings: SemanticSettings =
                serde_json::from_value(semantic.clone()).unwrap_or_default();
            index.default_semantic_configuration = settings.default_configuration;
            index.semantic_configurations = settings.configurations;
        }

        if let Some(vector) = data.get("vectorSearch").filter(|v| v.is_object()) {
            index.vector_search = Some(parse_vector_search(vector));
        }

        index
    }
}

fn parse_vector_search(data: &Value) -> VectorSearchConfig {
    let algorithms = array_at(data, "algorithms")
        .iter()
        .map(|alg| {
            let kind = str_at(alg, "kind").unwrap_or_default();
            // Parameters sit under `<kind>Parameters`, e.g. `hnswParameters`.
            let parameters = alg
                .get(format!("{kind}Parameters"))
                .or_else(|| alg.get(&kind))
                .cloned()
                .unwrap_or(Value::Null);
            VectorAlgorithm {
                name: str_at(alg, "name").unwrap_or_default(),
                kind,
                parameters,
            }
        })
        .collect();

    let profiles = array_at(data, "profiles")
        .iter()
        .map(|p| VectorProfile {
            name: str_at(p, "name").unwrap_or_default(),
            algorithm_configuration_name: str_at(p, "algorithm")
                .or_else(|| str_at(p, "algorithmConfigurationName"))
                .unwrap_or_default(),
            vectorizer_name: str_at(p, "vectorizer").or_else(|| str_at(p, "vectorizerName")),
        })
        .collect();

    VectorSearchConfig {
        algorithms,
        profiles,
        vectorizers: array_at(data, "vectorizers").to_vec(),
    }
}

/// An Azure AI Search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchService {
    /// Service name.
    pub name: String,
    /// Resource group.
    pub resource_group: String,
    /// Subscription id.
    pub subscription_id: String,
    /// Azure region.
    pub location: String,
    /// `https://{name}.search.windows.net`.
    pub endpoint: String,
    /// Pricing tier.
    pub sku: String,
    /// Replicas.
    pub replica_count: u32,
    /// Partitions.
    pub partition_count: u32,
    /// `enabled` or `disabled`.
    pub public_network_access: String,
    /// Private endpoint connection ids.
    #[serde(default)]
    pub private_endpoint_connections: Vec<String>,
    /// Key authentication is disabled.
    #[serde(default)]
    pub disable_local_auth: bool,
}

impl SearchService {
    /// Builds the data plane endpoint for a service name.
    pub fn endpoint_for(name: &str) -> String {
        format!("https://{name}.search.windows.net")
    }

    /// Key auth is off, so connections must use managed identity.
    pub fn requires_managed_identity(&self) -> bool {
        self.disable_local_auth
    }

    /// ARM resource id.
    pub fn resource_id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Search/searchServices/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }

    /// Parses an ARM `searchServices` resource.
    pub fn from_arm(subscription_id: &str, data: &Value) -> Option<Self> {
        let name = str_at(data, "name")?;
        let id = str_at(data, "id").unwrap_or_default();
        let props = data.get("properties").cloned().unwrap_or(Value::Null);

        Some(Self {
            endpoint: Self::endpoint_for(&name),
            resource_group: resource_group_from_id(&id).unwrap_or_default(),
            subscription_id: subscription_id.to_string(),
            location: str_at(data, "location").unwrap_or_default(),
            sku: data
                .pointer("/sku/name")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            replica_count: props
                .get("replicaCount")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(1),
            partition_count: props
                .get("partitionCount")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(1),
            public_network_access: str_at(&props, "publicNetworkAccess")
                .unwrap_or_else(|| "enabled".to_string()),
            private_endpoint_connections: array_at(&props, "privateEndpointConnections")
                .iter()
                .filter_map(|pe| str_at(pe, "id"))
                .collect(),
            disable_local_auth: props
                .get("disableLocalAuth")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            name,
        })
    }
}

/// Compatibility verdict for one index; see [`crate::analyzer::analyze`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexAnalysis {
    /// Analyzed index.
    pub index_name: String,
    /// Searchable text fields.
    pub text_field_count: usize,
    /// Vector fields with dimensions.
    pub vector_field_count: usize,
    /// Filterable fields.
    pub filterable_field_count: usize,
    /// At least one semantic configuration.
    pub supports_semantic: bool,
    /// At least one vector field.
    pub supports_vector: bool,
    /// Vector, text and semantic together.
    pub supports_hybrid: bool,
    /// Usable by the Azure AI Search tool.
    pub compatible_with_search_tool: bool,
    /// Usable by a Foundry IQ knowledge base.
    pub compatible_with_knowledge_base: bool,
    /// Recommended search tool query type.
    pub recommended_query_type: String,
    /// Advice for the operator.
    pub recommendations: Vec<String>,
    /// Problems found.
    pub issues: Vec<String>,
}

/// Extracts the resource group from an ARM resource id.
pub fn resource_group_from_id(id: &str) -> Option<String> {
    let mut parts = id.split('/');
    while let Some(part) = parts.next() {
        if part.eq_ignore_ascii_case("resourceGroups") {
            return parts.next().map(str::to_string);
        }
    }
    None
}

pub(crate) fn str_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
