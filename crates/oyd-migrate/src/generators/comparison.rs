//! OYD versus Foundry feature matrix.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt::Write as _;

use self::Support::{No, Note, Yes};

/// How well an architecture covers a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// Supported.
    Yes,
    /// Not supported.
    No,
    /// Supported with a qualification.
    Note(&'static str),
}

impl Support {
    /// Cell text: ✅, ❌ or the note.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Yes => "✅",
            Self::No => "❌",
            Self::Note(note) => note,
        }
    }
}

impl Serialize for Support {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Yes => serializer.serialize_bool(true),
            Self::No => serializer.serialize_bool(false),
            Self::Note(note) => serializer.serialize_str(note),
        }
    }
}

/// One row of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Feature {
    /// Feature name.
    pub name: &'static str,
    /// Azure OpenAI On Your Data.
    pub oyd: Support,
    /// Foundry agent with the search tool.
    pub foundry_search_tool: Support,
    /// Foundry agent with a knowledge base.
    pub foundry_iq_kb: Support,
}

const fn row(name: &'static str, oyd: Support, foundry_search_tool: Support, foundry_iq_kb: Support) -> Feature {
    Feature {
        name,
        oyd,
        foundry_search_tool,
        foundry_iq_kb,
    }
}

/// The matrix.
pub const FEATURES: [Feature; 18] = [
    row("Azure AI Search", Yes, Yes, Yes),
    row("Semantic Search", Yes, Yes, Yes),
    row("Vector Search", Yes, Yes, Yes),
    row("Hybrid Search", Yes, Yes, Yes),
    row("Multi-Index Support", No, Yes, Yes),
    row("Multi-Source Types", Note("Limited"), Yes, Yes),
    row("Citations", Yes, Yes, Yes),
    row("Managed Identity", Yes, Yes, Yes),
    row("VNet/Private Endpoints", Yes, Note("Standard"), Note("Standard")),
    row("Document ACLs", Note("Entra groups"), Note("filter param"), Note("ACL header")),
    row("Multi-turn Conversations", No, Yes, Yes),
    row("Tool Orchestration", No, Yes, Yes),
    row("Code Interpreter", No, Yes, Yes),
    row("Query Decomposition", No, No, Yes),
    row("Agentic Reasoning", No, Note("Basic"), Note("Full")),
    row("Streaming", Yes, Yes, Yes),
    row("Supported Models", Note("GPT-4o (retiring)"), Note("GPT-4.1+"), Note("GPT-4.1+")),
    row("API Status", Note("Deprecated"), Note("GA"), Note("Preview")),
];

const TITLE: &str = "OYD vs Foundry Agent Service Feature Comparison";
const HEADERS: [&str; 4] = [
    "Feature",
    "OYD (Deprecated)",
    "Foundry + Search Tool",
    "Foundry + IQ KB",
];

/// Output format of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ComparisonFormat {
    /// Terminal table with legend.
    #[default]
    Table,
    /// Markdown document.
    Markdown,
    /// JSON document.
    Json,
}

/// Matrix as a terminal table.
pub fn comparison_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(HEADERS.iter().map(|h| Cell::new(h).fg(Color::Cyan)));

    for f in &FEATURES {
        table.add_row(vec![
            Cell::new(f.name),
            Cell::new(f.oyd.symbol()).set_alignment(CellAlignment::Center),
            Cell::new(f.foundry_search_tool.symbol()).set_alignment(CellAlignment::Center),
            Cell::new(f.foundry_iq_kb.symbol()).set_alignment(CellAlignment::Center),
        ]);
    }
    table
}

/// Table plus legend and recommendations, ready to print.
pub fn render_table() -> String {
    format!(
        "{TITLE}\n{}\n\nLegend:\n  ✅ = Supported\n  ❌ = Not Supported\n  Standard = Requires Standard deployment (for VNet)\n\n\
         Recommendations:\n  • For simple RAG with existing indexes: Foundry + Azure AI Search Tool\n  \
         • For complex reasoning and multi-source: Foundry + Foundry IQ Knowledge Base\n",
        comparison_table()
    )
}

/// Matrix as Markdown, with the migration paths explained.
pub fn render_markdown() -> String {
    let mut md = format!(
        "# {TITLE}\n\n| {} |\n|---------|------------------|----------------------|-----------------|\n",
        HEADERS.join(" | ")
    );
    for f in &FEATURES {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            f.name,
            f.oyd.symbol(),
            f.foundry_search_tool.symbol(),
            f.foundry_iq_kb.symbol()
        );
    }
    md.push_str(
        "
## Recommendations

- **For simple RAG with existing indexes**: Use Foundry + Azure AI Search Tool
- **For complex reasoning and multi-source**: Use Foundry + Foundry IQ Knowledge Base

## Migration Paths

### Path A: Azure AI Search Tool
- Direct index connection via `AzureAISearchAgentTool`
- Simpler setup, familiar query patterns
- Best for straightforward RAG scenarios

### Path B: Foundry IQ Knowledge Base
- MCP-based with `knowledge_base_retrieve` tool
- Advanced query planning and decomposition
- Better for complex reasoning scenarios
",
    );
    md
}

/// Matrix as `{"features": [...]}`.
pub fn render_json() -> Value {
    json!({ "features": FEATURES })
}

/// Renders the matrix in the given format.
pub fn render(format: ComparisonFormat) -> String {
    match format {
        ComparisonFormat::Table => render_table(),
        ComparisonFormat::Markdown => render_markdown(),
        ComparisonFormat::Json => {
            serde_json::to_string_pretty(&render_json()).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_are_unique() {
        let mut names: Vec<_> = FEATURES.iter().map(|f| f.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURES.len());
    }

    #[test]
    fn test_json_mixes_booleans_and_strings() {
        let value = render_json();
        let features = value["features"].as_array().unwrap();

        assert_eq!(features.len(), 18);
        assert_eq!(features[0]["name"], "Azure AI Search");
        assert_eq!(features[4]["oyd"], false);
        assert_eq!(features[4]["foundry_search_tool"], true);
        assert_eq!(features[17]["foundry_iq_kb"], "Preview");
    }

    #[test]
    fn test_markdown_has_one_row_per_feature() {
        let md = render_markdown();

        assert!(md.starts_with("# OYD vs Foundry"));
        assert!(md.contains("| Query Decomposition | ❌ | ❌ | ✅ |"));
        assert!(md.contains("### Path B: Foundry IQ Knowledge Base"));
        let rows = md.lines().filter(|l| l.starts_with("| ") && !l.starts_with("| Feature")).count();
        assert_eq!(rows, 18);
    }

    #[test]
    fn test_table_includes_legend() {
        let text = render(ComparisonFormat::Table);
        assert!(text.contains("Agentic Reasoning"));
        assert!(text.contains("Legend:"));
    }
}
