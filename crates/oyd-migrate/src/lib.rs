// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # OYD Migration Tool
//!
//! `oyd-migrate` is a CLI tool and library for moving Azure OpenAI "On Your
//! Data" (OYD) deployments to Foundry Agent Service.
//!
//! ## Migration Paths
//!
//! | Path | Tool | Notes |
//! |------|------|-------|
//! | `search_tool` | Azure AI Search tool | Direct queries against the existing index |
//! | `knowledge_base` | Foundry IQ knowledge base | MCP `knowledge_base_retrieve` with query planning |
//!
//! ## Quick Start
//!
//! ```bash
//! # Guided, resumable migration
//! oyd-migrate migrate interactive
//!
//! # Resume an interrupted session
//! oyd-migrate migrate interactive --resume 1a2b3c4d
//!
//! # Non-interactive from a plan file
//! oyd-migrate migrate init --output plan.yaml
//! oyd-migrate migrate search-tool --plan plan.yaml
//! ```
//!
//! ## Plan Example
//!
//! ```yaml
//! azure:
//!   subscription_id: 00000000-0000-0000-0000-000000000000
//!   auth_method: cli
//! openai:
//!   - resource_name: contoso-aoai
//!     resource_group: rg-ai
//!     endpoint: https://contoso-aoai.openai.azure.com
//!     deployment_name: chat
//! search:
//!   - service_name: contoso-search
//!     resource_group: rg-ai
//!     endpoint: https://contoso-search.search.windows.net
//!     index_name: products
//! foundry:
//!   project_name: support
//!   resource_group: rg-ai
//!   project_endpoint: https://acct.services.ai.azure.com/api/projects/support
//! options:
//!   migration_path: search_tool
//! ```

#![warn(missing_docs)]

pub mod analyzer;
pub mod azure;
pub mod config;
pub mod constants;
pub mod error;
pub mod generators;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod retry;
pub mod services;
pub mod session;
pub mod wizard;

pub use analyzer::analyze;
pub use config::{AppSettings, MigrationOptions, MigrationPath, MigrationPlanFile};
pub use error::{Error, Result};
pub use models::{IndexAnalysis, MigrationResult, SearchIndex, TestResult};
pub use pipeline::MigrationPipeline;
pub use services::AzureContext;
pub use session::{run_stages, run_stages_until, MigrationSession, SessionStore, Stage, StageRunner};
pub use wizard::Wizard;
