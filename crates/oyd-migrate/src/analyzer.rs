//! Index compatibility analysis.
//!
//! [`analyze`] inspects the fields and semantic/vector settings of a
//! [`SearchIndex`] and decides which search tool query type fits it best.
//! The decision is a fixed priority table; the first matching row wins:
//!
//! | semantic | vector | text | query type |
//! |----------|--------|------|------------|
//! | yes | yes | yes | `vector_semantic_hybrid` |
//! | no | yes | yes | `vector_simple_hybrid` |
//! | any | yes | no | `vector` |
//! | yes | no | any | `semantic` |
//! | no | no | any | `simple` |

use crate::models::search::{IndexAnalysis, SearchIndex};

/// Issue raised for an index nobody can search.
pub const NO_TEXT_FIELDS_ISSUE: &str = "No searchable text fields found. At least one is required.";

/// Issue raised for an index that returns nothing to cite.
pub const NO_RETRIEVABLE_FIELDS_ISSUE: &str =
    "No retrievable fields found. Citations may not work properly.";

/// Analyzes an index. Pure; never fails.
pub fn analyze(index: &SearchIndex) -> IndexAnalysis {
    let text_field_count = index.text_fields().len();
    let vector_field_count = index.vector_fields().len();
    let filterable_field_count = index.fields.iter().filter(|f| f.filterable).count();

    let supports_semantic = index.has_semantic_search();
    let supports_vector = vector_field_count > 0;
    let has_text = text_field_count > 0;
    let supports_hybrid = supports_vector && has_text && supports_semantic;

    let (recommended_query_type, recommendation) =
        recommend(supports_semantic, supports_vector, has_text);

    let mut issues = Vec::new();
    if !has_text {
        issues.push(NO_TEXT_FIELDS_ISSUE.to_string());
    }
    if !index.fields.iter().any(|f| f.retrievable) {
        issues.push(NO_RETRIEVABLE_FIELDS_ISSUE.to_string());
    }

    IndexAnalysis {
        index_name: index.name.clone(),
        text_field_count,
        vector_field_count,
        filterable_field_count,
        supports_semantic,
        supports_vector,
        supports_hybrid,
        compatible_with_search_tool: has_text,
        compatible_with_knowledge_base: has_text,
        recommended_query_type: recommended_query_type.to_string(),
        recommendations: vec![recommendation.to_string()],
        issues,
    }
}

fn recommend(semantic: bool, vector: bool, text: bool) -> (&'static str, &'static str) {
    match (semantic, vector, text) {
        (true, true, true) => (
            "vector_semantic_hybrid",
            "Index supports hybrid + semantic search (recommended)",
        ),
        (false, true, true) => (
            "vector_simple_hybrid",
            "Index supports hybrid search. Consider adding semantic configuration.",
        ),
        (_, true, false) => ("vector", "Index supports vector search only."),
        (true, false, _) => (
            "semantic",
            "Index supports semantic search. Consider adding vector fields.",
        ),
        (false, false, _) => (
            "simple",
            "Index supports simple keyword search only. Consider adding semantic config or vector fields.",
        ),
    }
}
