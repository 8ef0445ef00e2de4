//! Domain records for the source (OYD, search) and target (Foundry) sides.

pub mod foundry;
pub mod migration;
pub mod oyd;
pub mod search;

pub use foundry::{AgentTool, FoundryAgent, FoundryProject, McpToolConfig, ProjectConnection, SearchToolConfig};
pub use migration::{MigrationMapping, MigrationPlan, MigrationResult, TestResult};
pub use oyd::{DataSource, OydConfiguration, OydDeployment, OydFieldMapping, OydSearchSource};
pub use search::{IndexAnalysis, IndexField, SearchIndex, SearchService, SemanticConfig, VectorSearchConfig};
