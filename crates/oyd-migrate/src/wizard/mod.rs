//! Interactive migration wizard.
//!
//! The wizard is the [`StageRunner`] behind `migrate interactive`: one
//! handler per [`Stage`], each prompting for what it needs and storing the
//! answers on the session. [`run_stages_until`] persists the session between
//! stages, so an interrupted run resumes at the stage it stopped in.

mod discovery;
mod prompts;
mod ui;

pub use discovery::{
    aoai_config, search_config, search_endpoints, DiscoveryScope, DiscoverySummary,
};
pub use prompts::WizardPrompts;
pub use ui::WizardUI;

use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::azure::{credential_from_config, TokenProvider};
use crate::config::{AppSettings, AuthMethod, AzureConfig, FoundryConfig, MigrationPath};
use crate::constants::SAMPLES_DIR;
use crate::error::{Error, Result};
use crate::models::foundry::FoundryProject;
use crate::models::oyd::OydDeployment;
use crate::output::{deployments_table, path_comparison_table};
use crate::pipeline::MigrationPipeline;
use crate::services::search::service_name_from_endpoint;
use crate::services::AzureContext;
use crate::session::{run_stages_until, MigrationSession, SessionStore, Stage, StageRunner};

use self::discovery::{
    account_label, deployment_label, hub_resource_id, manual_search_config, project_label,
    subscription_label,
};

/// Numbered actions the review stage will take.
pub fn plan_actions(session: &MigrationSession) -> Vec<String> {
    let options = &session.migration_options;
    let mut actions = Vec::new();

    if options.create_new_project {
        let name = session
            .foundry_config
            .as_ref()
            .map_or("", |f| f.project_name.as_str());
        actions.push(format!("Create Foundry project '{name}'"));
    }
    actions.push(format!("Create {} connection(s)", session.search_configs.len()));
    actions.push(format!("Create {} agent(s)", session.aoai_configs.len()));
    if options.test_after_migration {
        actions.push("Run validation tests".to_string());
    }
    if options.generate_samples {
        actions.push("Generate code samples".to_string());
    }
    actions
}

/// Bullet points describing a migration path.
pub fn path_notes(path: MigrationPath) -> [&'static str; 4] {
    match path {
        MigrationPath::SearchTool => [
            "Directly connects to your existing search index",
            "Uses the AzureAISearchAgentTool SDK",
            "Supports all query types (simple, semantic, vector, hybrid)",
            "Best for straightforward RAG scenarios",
        ],
        MigrationPath::KnowledgeBase => [
            "Creates a Knowledge Base on top of your search index",
            "Uses MCP protocol with knowledge_base_retrieve tool",
            "Enables advanced query planning and decomposition",
            "Best for complex reasoning and multi-source scenarios",
        ],
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Interactive migration wizard.
pub struct Wizard {
    ui: WizardUI,
    prompts: WizardPrompts,
    settings: AppSettings,
    sample_dir: Option<PathBuf>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new(AppSettings::default())
    }
}

impl Wizard {
    /// Creates a new wizard instance.
    pub fn new(settings: AppSettings) -> Self {
        Self {
            ui: WizardUI::new(),
            prompts: WizardPrompts::new(),
            settings,
            sample_dir: None,
        }
    }

    /// Writes samples here instead of `<config_dir>/samples/<session>`.
    #[must_use]
    pub fn with_sample_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.sample_dir = dir;
        self
    }

    /// Console output shared with the caller.
    pub fn ui(&self) -> &WizardUI {
        &self.ui
    }

    /// Runs the remaining stages of a session until done or `interrupt`
    /// resolves.
    ///
    /// Returns `None` when interrupted; the session is saved either way.
    /// Otherwise the first stage error, if any.
    pub async fn run<I>(
        &mut self,
        session: &mut MigrationSession,
        store: &SessionStore,
        resumed: bool,
        interrupt: I,
    ) -> Option<Result<()>>
    where
        I: Future<Output = ()>,
    {
        self.ui.print_header();
        if resumed {
            self.ui.print_resumed(session);
        }
        if let Err(e) = store.save(session) {
            return Some(Err(e));
        }
        run_stages_until(self, session, store, interrupt).await
    }

    fn context(&self, credential: Arc<dyn TokenProvider>, subscription_id: &str) -> AzureContext {
        AzureContext::new(credential, subscription_id)
    }

    fn session_context(&self, session: &MigrationSession) -> Result<AzureContext> {
        let azure = session
            .azure_config
            .as_ref()
            .ok_or_else(|| Error::Config("Session has no Azure configuration".to_string()))?;
        let credential = credential_from_config(azure)?;
        Ok(self.context(credential, &azure.subscription_id))
    }

    // ==================== Stage 1: Authentication ====================

    async fn authenticate(&self, session: &mut MigrationSession) -> Result<()> {
        println!("Let's set up Azure authentication.");
        println!();

        let method = self.prompts.select_auth_method()?;
        let mut azure = AzureConfig {
            auth_method: method,
            ..Default::default()
        };
        match method {
            AuthMethod::ServicePrincipal => {
                azure.tenant_id = Some(self.prompts.input("Tenant ID:", None)?);
                azure.client_id = Some(self.prompts.input("Client ID (Application ID):", None)?);
                azure.client_secret = Some(self.prompts.password("Client Secret:")?);
            }
            AuthMethod::ManagedIdentity => {
                if self.prompts.confirm("Use user-assigned managed identity?", false)? {
                    azure.managed_identity_client_id =
                        Some(self.prompts.input("User-assigned managed identity client ID:", None)?);
                }
            }
            AuthMethod::Cli => {}
        }

        let credential = credential_from_config(&azure)?;
        let auth = self.context(credential.clone(), "").auth();

        let spinner = self.ui.spinner("Authenticating with Azure...");
        let token = auth.authenticate().await;
        spinner.finish_and_clear();
        token?;
        self.ui
            .print_success(&format!("Authenticated with {}", method.display_name()));

        let spinner = self.ui.spinner("Fetching subscriptions...");
        let subscriptions = auth.list_subscriptions().await;
        spinner.finish_and_clear();
        let subscriptions = subscriptions?;

        let subscription = match subscriptions.as_slice() {
            [] => {
                return Err(Error::authentication(
                    "No subscriptions found for this account.",
                ))
            }
            [only] => {
                self.ui
                    .print_info(&format!("Using subscription: {}", subscription_label(only)));
                only.clone()
            }
            many => {
                let labels: Vec<String> = many.iter().map(subscription_label).collect();
                let selection = self
                    .prompts
                    .fuzzy_select("Select the Azure subscription to use:", &labels)?;
                many[selection].clone()
            }
        };

        let spinner = self.ui.spinner("Checking permissions...");
        let permissions = auth
            .check_permissions(&subscription.subscription_id, None)
            .await;
        spinner.finish_and_clear();

        if permissions.has_warnings() {
            for warning in &permissions.warnings {
                self.ui.print_warning(warning);
            }
            if !self
                .prompts
                .confirm("Continue with limited permissions?", true)?
            {
                return Err(Error::Cancelled("Insufficient permissions".to_string()));
            }
        } else {
            self.ui.print_success("Permissions validated.");
        }

        azure.subscription_id = subscription.subscription_id.clone();
        if azure.tenant_id.is_none() && !subscription.tenant_id.is_empty() {
            azure.tenant_id = Some(subscription.tenant_id.clone());
        }
        info!("Authenticated against subscription {}", azure.subscription_id);
        session.azure_config = Some(azure);
        Ok(())
    }

    // ==================== Stage 2: Discovery ====================

    async fn discover(&self, session: &mut MigrationSession) -> Result<()> {
        let context = self.session_context(session)?;

        let scope = self.prompts.select_discovery_scope()?;
        let mut deployments = match &scope {
            DiscoveryScope::Manual => self.manual_deployment(&context).await?,
            DiscoveryScope::Subscription => self.scan(&context, None).await?,
            DiscoveryScope::ResourceGroup(rg) => self.scan(&context, Some(rg.as_str())).await?,
        };

        if deployments.is_empty() {
            self.ui.print_warning("No deployments with On Your Data found.");
            if !self
                .prompts
                .confirm("Would you like to manually specify an AOAI resource?", true)?
            {
                self.ui.print_info("No deployments to migrate.");
                return Err(Error::Cancelled("No deployments to migrate".to_string()));
            }
            deployments = self.manual_deployment(&context).await?;
        }

        self.ui.print_section(&format!("Found {} deployment(s):", deployments.len()));
        self.ui.print_table(&deployments_table(&deployments));

        let selected: Vec<OydDeployment> = if deployments.len() == 1 {
            self.ui
                .print_info(&format!("Using deployment: {}", deployment_label(&deployments[0])));
            deployments
        } else {
            let labels: Vec<String> = deployments.iter().map(deployment_label).collect();
            let picked = self
                .prompts
                .multi_select("Select the deployments to migrate:", &labels)?;
            picked.into_iter().map(|i| deployments[i].clone()).collect()
        };

        session.aoai_configs = selected.iter().map(aoai_config).collect();

        let endpoints = search_endpoints(&selected);
        session.search_configs.clear();
        let search = context.search();
        for (endpoint, indexes) in &endpoints {
            match search.service_by_endpoint(endpoint).await {
                Ok(Some(service)) => session.search_configs.push(search_config(&service, indexes)),
                Ok(None) => {
                    self.ui.print_warning(&format!(
                        "Search service {endpoint} is not in this subscription; using managed identity"
                    ));
                    if let Some(name) = service_name_from_endpoint(endpoint) {
                        let index = indexes.first().map_or("", String::as_str);
                        session
                            .search_configs
                            .push(manual_search_config(name, "", index, true));
                    }
                }
                Err(e) => {
                    warn!("Could not resolve search service {}: {}", endpoint, e);
                    self.ui
                        .print_warning(&format!("Could not resolve search service {endpoint}: {e}"));
                }
            }
        }

        if session.search_configs.is_empty() {
            self.ui.print_warning("No search services found for the selected deployments.");
            if !self
                .prompts
                .confirm("Would you like to manually specify a search service?", true)?
            {
                return Err(Error::Cancelled("No search service to connect".to_string()));
            }
            let name = self.prompts.input("Search service name:", None)?;
            let resource_group = self.prompts.input("Search service resource group:", None)?;
            let index = self.prompts.input("Search index name:", None)?;
            let use_mi = self
                .prompts
                .confirm("Use managed identity for authentication? (recommended)", true)?;
            session
                .search_configs
                .push(manual_search_config(&name, &resource_group, &index, use_mi));
        }

        self.ui
            .print_discovery_summary(DiscoverySummary::of(session, &endpoints));
        Ok(())
    }

    async fn scan(&self, context: &AzureContext, resource_group: Option<&str>) -> Result<Vec<OydDeployment>> {
        let spinner = self.ui.spinner("Discovering AOAI resources...");
        let found = context.aoai().discover_oyd_deployments(resource_group).await;
        spinner.finish_and_clear();
        found
    }

    async fn manual_deployment(&self, context: &AzureContext) -> Result<Vec<OydDeployment>> {
        let resource_name = self.prompts.input("Resource name:", None)?;
        let resource_group = self.prompts.input("Resource group:", None)?;
        let deployment_name = self.prompts.input("Deployment name:", None)?;
        let model_name = self.prompts.input("Model name (e.g., gpt-4o):", Some("gpt-4o"))?;

        let spinner = self.ui.spinner("Reading deployment configuration...");
        let found = context
            .aoai()
            .get_deployment(&resource_group, &resource_name, &deployment_name)
            .await;
        spinner.finish_and_clear();

        match found {
            Ok(Some(deployment)) => return Ok(vec![deployment]),
            Ok(None) => self
                .ui
                .print_warning(&format!("Deployment {resource_name}/{deployment_name} was not found")),
            Err(e) => self
                .ui
                .print_warning(&format!("Could not read {resource_name}/{deployment_name}: {e}")),
        }

        Ok(vec![OydDeployment {
            endpoint: OydDeployment::endpoint_for(&resource_name),
            subscription_id: context.subscription_id().to_string(),
            resource_name,
            resource_group,
            deployment_name,
            model_name,
            model_version: None,
            oyd_config: None,
        }])
    }

    // ==================== Stage 3: Migration Configuration ====================

    async fn configure(&self, session: &mut MigrationSession) -> Result<()> {
        let context = self.session_context(session)?;

        println!("Let's configure your migration target.");
        println!();
        self.ui.print_table(&path_comparison_table());

        self.ui.print_section("Select your migration path:");
        let path = self.prompts.select_migration_path()?;
        self.ui
            .print_info(&format!("{} selected. This approach:", path.display_name()));
        for note in path_notes(path) {
            self.ui.print_item(note);
        }

        self.ui.print_section("Configure your Foundry project:");
        let spinner = self.ui.spinner("Checking for existing Foundry projects...");
        let projects = context.foundry().list_projects().await;
        spinner.finish_and_clear();

        let mut create_new_project = true;
        let mut foundry = if projects.is_empty() {
            self.ui.print_info("No existing Foundry projects found.");
            self.new_project(&context).await?
        } else {
            self.ui
                .print_info(&format!("Found {} existing Foundry project(s).", projects.len()));
            if self
                .prompts
                .confirm("Would you like to use an existing project?", true)?
            {
                let labels: Vec<String> = projects.iter().map(project_label).collect();
                let project = &projects[self.prompts.select("Select a project:", &labels, 0)?];
                create_new_project = false;
                existing_project(project, &self.settings.default_location)
            } else {
                self.new_project(&context).await?
            }
        };

        self.ui.print_section("Select the model for your agents:");
        foundry.model_deployment = self.prompts.select_model()?;

        self.ui.print_section("Additional options:");
        let mut options = session.migration_options.clone();
        options.migration_path = path;
        options.create_new_project = create_new_project;
        let options = self.prompts.migration_options(options)?;

        self.ui.print_section("Migration Configuration Summary:");
        self.ui.print_item(&format!("Migration path: {}", path.as_str()));
        self.ui.print_item(&format!("Project: {}", foundry.project_name));
        self.ui.print_item(&format!("Model: {}", foundry.model_deployment));
        self.ui
            .print_item(&format!("Create new project: {}", yes_no(options.create_new_project)));
        self.ui
            .print_item(&format!("Preserve query type: {}", yes_no(options.preserve_query_type)));
        self.ui.print_item(&format!(
            "Migrate system message: {}",
            yes_no(options.migrate_system_message)
        ));
        self.ui
            .print_item(&format!("Test after migration: {}", yes_no(options.test_after_migration)));
        println!();

        session.foundry_config = Some(foundry);
        session.migration_options = options;
        Ok(())
    }

    async fn new_project(&self, context: &AzureContext) -> Result<FoundryConfig> {
        self.ui.print_section("Enter details for the new Foundry project:");

        let spinner = self.ui.spinner("Checking for existing Foundry Accounts...");
        let accounts = context.foundry().list_accounts().await;
        spinner.finish_and_clear();

        let accounts = accounts.unwrap_or_else(|e| {
            debug!("Could not list Foundry accounts: {}", e);
            Vec::new()
        });

        let mut hub = None;
        if !accounts.is_empty() {
            self.ui
                .print_info(&format!("Found {} existing Foundry Account(s).", accounts.len()));
            let mut labels: Vec<String> = accounts.iter().map(account_label).collect();
            labels.push("Skip - Create standalone project (advanced)".to_string());
            let selection = self
                .prompts
                .select("Select a Foundry Account for your new project:", &labels, 0)?;
            if let Some(account) = accounts.get(selection) {
                self.ui
                    .print_success(&format!("Using Foundry Account: {}", account.resource_name));
                hub = Some(hub_resource_id(account));
            }
        }

        let project_name = self.prompts.input("Project name:", Some("oyd-migration-project"))?;
        let resource_group = self.prompts.input("Resource group:", None)?;
        let location = self
            .prompts
            .input("Location (Azure region):", Some(&self.settings.default_location))?;

        Ok(FoundryConfig {
            project_name,
            resource_group,
            project_endpoint: String::new(),
            model_deployment: crate::constants::DEFAULT_MODEL.to_string(),
            location,
            hub_resource_id: hub,
        })
    }

    // ==================== Stage 4: Review & Execute ====================

    async fn review(&self, session: &mut MigrationSession) -> Result<()> {
        let context = self.session_context(session)?;

        self.ui.print_section("Migration Plan Review:");
        println!();
        self.ui.print_plan(session, &plan_actions(session));

        if !self.prompts.confirm("Ready to execute this migration?", true)? {
            return Err(Error::Cancelled("Migration not confirmed".to_string()));
        }

        self.ui.print_section("Executing Migration...");
        let sample_dir = self.sample_dir.clone().unwrap_or_else(|| {
            self.settings
                .config_dir
                .join(SAMPLES_DIR)
                .join(&session.session_id)
        });
        let pipeline = MigrationPipeline::new(context)
            .with_propagation_timeout(Duration::from_secs(self.settings.propagation_delay_secs))
            .with_progress(self.ui.is_interactive())
            .with_sample_dir(Some(sample_dir.clone()));

        let result = pipeline.execute(session).await;
        session.migration_succeeded = Some(result.success);

        self.ui.print_result(&result);
        if !result.artifacts.is_empty() {
            self.ui
                .print_info(&format!("Samples written to {}", sample_dir.display()));
        }
        Ok(())
    }
}

fn existing_project(project: &FoundryProject, location: &str) -> FoundryConfig {
    FoundryConfig {
        project_name: project.name.clone(),
        resource_group: project.resource_group.clone(),
        project_endpoint: project.endpoint.clone(),
        model_deployment: crate::constants::DEFAULT_MODEL.to_string(),
        location: if project.location.is_empty() {
            location.to_string()
        } else {
            project.location.clone()
        },
        hub_resource_id: None,
    }
}

#[async_trait]
impl StageRunner for Wizard {
    async fn run_stage(&mut self, stage: Stage, session: &mut MigrationSession) -> Result<()> {
        self.ui.print_stage(stage);
        match stage {
            Stage::Auth => self.authenticate(session).await,
            Stage::Discovery => self.discover(session).await,
            Stage::Migration => self.configure(session).await,
            Stage::Review => self.review(session).await,
        }
    }
}
