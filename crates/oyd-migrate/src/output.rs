//! Table rendering for discovery results, sessions and test runs.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::models::foundry::FoundryProject;
use crate::models::migration::TestResult;
use crate::models::oyd::OydDeployment;
use crate::models::search::{IndexAnalysis, SearchIndex, SearchService};
use crate::session::MigrationSession;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// ✅ or ❌.
pub fn check(flag: bool) -> &'static str {
    if flag {
        "✅"
    } else {
        "❌"
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

/// OYD deployments with their primary search source.
pub fn deployments_table(deployments: &[OydDeployment]) -> Table {
    let mut table = new_table(&["Resource", "Deployment", "Model", "Sources", "Index", "Query Type"]);
    for d in deployments {
        let source = d.oyd_config.as_ref().and_then(|c| c.primary_search_source());
        table.add_row(vec![
            d.resource_name.clone(),
            d.deployment_name.clone(),
            d.model_name.clone(),
            d.data_source_count().to_string(),
            or_dash(source.map(|s| s.index_name.as_str())),
            or_dash(source.map(|s| s.query_type.as_str())),
        ]);
    }
    table
}

/// Search services and how they authenticate.
pub fn services_table(services: &[SearchService]) -> Table {
    let mut table = new_table(&["Service", "Resource Group", "Location", "SKU", "Auth", "Private Endpoints"]);
    for s in services {
        table.add_row(vec![
            s.name.clone(),
            s.resource_group.clone(),
            s.location.clone(),
            s.sku.clone(),
            if s.requires_managed_identity() {
                "Managed Identity".to_string()
            } else {
                "Key or Identity".to_string()
            },
            s.private_endpoint_connections.len().to_string(),
        ]);
    }
    table
}

/// Indexes of one service with their analysis.
pub fn indexes_table(indexes: &[(SearchIndex, IndexAnalysis)]) -> Table {
    let mut table = new_table(&[
        "Index",
        "Documents",
        "Text",
        "Vector",
        "Semantic",
        "Recommended",
        "Search Tool",
        "Knowledge Base",
    ]);
    for (index, analysis) in indexes {
        table.add_row(vec![
            index.name.clone(),
            index
                .document_count
                .map_or_else(|| "-".to_string(), |c| c.to_string()),
            analysis.text_field_count.to_string(),
            analysis.vector_field_count.to_string(),
            check(analysis.supports_semantic).to_string(),
            analysis.recommended_query_type.clone(),
            check(analysis.compatible_with_search_tool).to_string(),
            check(analysis.compatible_with_knowledge_base).to_string(),
        ]);
    }
    table
}

/// Field list of one index.
pub fn fields_table(index: &SearchIndex) -> Table {
    let mut table = new_table(&["Field", "Type", "Key", "Searchable", "Filterable", "Retrievable", "Dimensions"]);
    for f in &index.fields {
        table.add_row(vec![
            f.name.clone(),
            f.field_type.clone(),
            check(f.key).to_string(),
            check(f.searchable).to_string(),
            check(f.filterable).to_string(),
            check(f.retrievable).to_string(),
            f.dimensions.map_or_else(|| "-".to_string(), |d| d.to_string()),
        ]);
    }
    table
}

/// Capability summary of one analysis.
pub fn analysis_table(analysis: &IndexAnalysis) -> Table {
    let mut table = new_table(&["Capability", "Value"]);
    let rows = [
        ("Text fields", analysis.text_field_count.to_string()),
        ("Vector fields", analysis.vector_field_count.to_string()),
        ("Filterable fields", analysis.filterable_field_count.to_string()),
        ("Semantic search", check(analysis.supports_semantic).to_string()),
        ("Vector search", check(analysis.supports_vector).to_string()),
        ("Hybrid search", check(analysis.supports_hybrid).to_string()),
        ("Search tool", check(analysis.compatible_with_search_tool).to_string()),
        ("Knowledge base", check(analysis.compatible_with_knowledge_base).to_string()),
        ("Recommended query type", analysis.recommended_query_type.clone()),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    table
}

/// Foundry projects.
pub fn projects_table(projects: &[FoundryProject]) -> Table {
    let mut table = new_table(&["Project", "Resource", "Resource Group", "Location", "Endpoint"]);
    for p in projects {
        table.add_row(vec![
            p.name.clone(),
            p.resource_name.clone(),
            p.resource_group.clone(),
            p.location.clone(),
            p.endpoint.clone(),
        ]);
    }
    table
}

/// Condensed comparison of the two migration paths.
pub fn path_comparison_table() -> Table {
    let mut table = new_table(&["Feature", "Search Tool", "IQ Knowledge Base"]);
    let rows = [
        ("Setup Complexity", "Lower", "Higher"),
        ("Query Control", "Direct", "Automated"),
        ("Multi-Index", "✅", "✅"),
        ("Query Decomposition", "❌", "✅"),
        ("Agentic Reasoning", "Basic", "Full"),
        ("Best For", "Simple RAG", "Complex Reasoning"),
    ];
    for (feature, search_tool, knowledge_base) in rows {
        table.add_row(vec![feature, search_tool, knowledge_base]);
    }
    table
}

/// Saved sessions, newest first as given.
pub fn sessions_table(sessions: &[MigrationSession]) -> Table {
    let mut table = new_table(&["Session ID", "Stage", "Status", "Updated"]);
    for s in sessions {
        table.add_row(vec![
            s.session_id.clone(),
            s.current_stage.title().to_string(),
            if s.completed {
                "✅ Completed".to_string()
            } else {
                "🔄 In Progress".to_string()
            },
            s.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

/// Test query outcomes.
pub fn test_results_table(results: &[TestResult]) -> Table {
    let mut table = new_table(&["Query", "Result", "Tools", "Citations", "Time (ms)"]);
    for r in results {
        let outcome = if r.success {
            "✅ Passed".to_string()
        } else {
            format!("❌ {}", r.error_message.as_deref().unwrap_or("Failed"))
        };
        table.add_row(vec![
            r.query.clone(),
            outcome,
            r.tool_calls_count.to_string(),
            r.citation_count.to_string(),
            format!("{:.0}", r.response_time_ms),
        ]);
    }
    table
}
