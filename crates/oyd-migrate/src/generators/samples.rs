//! Client samples for migrated agents.
//!
//! Samples are plain templates; placeholders are substituted by name so the
//! Python and shell braces stay readable.

use crate::config::MigrationPath;
use crate::constants::{api_versions, scopes};

const PYTHON_TEMPLATE: &str = r#"#!/usr/bin/env python3
"""
Sample client for the migrated Foundry agent '@AGENT@'.

Requirements:
    pip install azure-ai-projects azure-identity
"""

import os

from azure.ai.projects import AIProjectClient
from azure.ai.projects.models import @TOOL_CLASS@
from azure.identity import DefaultAzureCredential

PROJECT_ENDPOINT = os.environ.get("PROJECT_ENDPOINT", "@ENDPOINT@")
AGENT_NAME = "@AGENT@"


def build_tool():
    """Tool definition used by the agent. Needed only to recreate it."""
@TOOL_BODY@


def ask(question: str) -> None:
    project = AIProjectClient(
        endpoint=PROJECT_ENDPOINT,
        credential=DefaultAzureCredential(),
    )
    openai = project.get_openai_client()

    conversation = openai.conversations.create()
    response = openai.responses.create(
        conversation=conversation.id,
        input=question,
        extra_body={"agent": {"name": AGENT_NAME, "type": "agent_reference"}},
    )

    print(f"Q: {question}")
    print(f"A: {response.output_text}")


if __name__ == "__main__":
    ask("What information do you have available?")
"#;

const SEARCH_TOOL_BODY: &str = r#"    return AzureAISearchAgentTool(
        index_connection_id="your-connection-id",
        index_name="your-index-name",
        query_type="vector_semantic_hybrid",
        top_k=5,
    )"#;

const MCP_TOOL_BODY: &str = r#"    return MCPTool(
        server_label="knowledge_base",
        server_url="https://your-search.search.windows.net/knowledgebases/your-index-name/mcp",
        project_connection_id="your-connection-id",
        allowed_tools=["knowledge_base_retrieve"],
        require_approval="never",
    )"#;

const CURL_TEMPLATE: &str = r#"#!/bin/bash
# cURL examples for the migrated Foundry agent '@AGENT@'.
# Requires the Azure CLI (az login) and jq.

set -euo pipefail

PROJECT_ENDPOINT="@ENDPOINT@"
AGENT_NAME="@AGENT@"
API_VERSION="@API_VERSION@"

TOKEN=$(az account get-access-token --resource @RESOURCE@ --query accessToken -o tsv)

# 1. Create a conversation
CONVERSATION_ID=$(curl -s -X POST "$PROJECT_ENDPOINT/openai/conversations?api-version=$API_VERSION" \
  -H "Authorization: Bearer $TOKEN" \
  -H "Content-Type: application/json" \
  -d '{}' | jq -r '.id')

echo "Conversation: $CONVERSATION_ID"

# 2. Ask the agent
curl -s -X POST "$PROJECT_ENDPOINT/openai/responses?api-version=$API_VERSION" \
  -H "Authorization: Bearer $TOKEN" \
  -H "Content-Type: application/json" \
  -d "{
    \"conversation\": \"$CONVERSATION_ID\",
    \"input\": \"What information do you have available?\",
    \"agent\": {\"name\": \"$AGENT_NAME\", \"type\": \"agent_reference\"}
  }" | jq -r '.output_text'
"#;

/// File name used when a sample is saved for an agent.
pub fn sample_file_name(agent_name: &str) -> String {
    format!("{agent_name}_sample.py")
}

/// Python script that queries the agent, with the tool definition for `path`.
pub fn generate_python_sample(agent_name: &str, project_endpoint: &str, path: MigrationPath) -> String {
    let (tool_class, tool_body) = match path {
        MigrationPath::SearchTool => ("AzureAISearchAgentTool", SEARCH_TOOL_BODY),
        MigrationPath::KnowledgeBase => ("MCPTool", MCP_TOOL_BODY),
    };
    PYTHON_TEMPLATE
        .replace("@TOOL_CLASS@", tool_class)
        .replace("@TOOL_BODY@", tool_body)
        .replace("@AGENT@", agent_name)
        .replace("@ENDPOINT@", project_endpoint.trim_end_matches('/'))
}

/// Shell script that creates a conversation and asks the agent one question.
pub fn generate_curl_commands(agent_name: &str, project_endpoint: &str) -> String {
    CURL_TEMPLATE
        .replace("@AGENT@", agent_name)
        .replace("@ENDPOINT@", project_endpoint.trim_end_matches('/'))
        .replace("@API_VERSION@", api_versions::RESPONSES)
        .replace("@RESOURCE@", scopes::AI_FOUNDRY.trim_end_matches("/.default"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EP: &str = "https://acct.services.ai.azure.com/api/projects/support/";

    #[test]
    fn test_python_search_tool_sample() {
        let code = generate_python_sample("chat-migrated", EP, MigrationPath::SearchTool);

        assert!(code.contains("from azure.ai.projects.models import AzureAISearchAgentTool"));
        assert!(code.contains(r#"AGENT_NAME = "chat-migrated""#));
        assert!(code.contains(r#""https://acct.services.ai.azure.com/api/projects/support")"#));
        assert!(code.contains("your-index-name"));
        assert!(code.contains("your-connection-id"));
        assert!(!code.contains('@'));
    }

    #[test]
    fn test_python_knowledge_base_sample() {
        let code = generate_python_sample("kb-agent", EP, MigrationPath::KnowledgeBase);

        assert!(code.contains("import MCPTool"));
        assert!(code.contains("knowledge_base_retrieve"));
        assert!(!code.contains("AzureAISearchAgentTool"));
    }

    #[test]
    fn test_curl_commands() {
        let script = generate_curl_commands("chat-migrated", EP);

        assert!(script.starts_with("#!/bin/bash"));
        assert!(script.contains(r#"AGENT_NAME="chat-migrated""#));
        assert!(script.contains("$PROJECT_ENDPOINT/openai/conversations"));
        assert!(script.contains("$PROJECT_ENDPOINT/openai/responses"));
        assert!(script.contains("API_VERSION=\"2025-11-15-preview\""));
        assert!(script.contains("--resource https://ai.azure.com "));
        assert_eq!(script.matches("-X POST").count(), 2);
    }

    #[test]
    fn test_sample_file_name() {
        assert_eq!(sample_file_name("chat-migrated"), "chat-migrated_sample.py");
    }
}
