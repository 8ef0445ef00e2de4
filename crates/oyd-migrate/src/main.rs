//! OYD Migration CLI
//!
//! CLI tool for moving Azure OpenAI On Your Data deployments to Foundry
//! Agent Service.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oyd_migrate::azure::{credential_from_config, TokenProvider};
use oyd_migrate::config::{default_config_dir, AuthMethod, AzureConfig};
use oyd_migrate::constants::{CONFIG_DIR_ENV, SAMPLES_DIR};
use oyd_migrate::generators::{
    comparison, generate_curl_commands, generate_python_sample, generate_report, ComparisonFormat, ReportFormat,
};
use oyd_migrate::output::{
    analysis_table, deployments_table, fields_table, indexes_table, projects_table, services_table, sessions_table,
    test_results_table,
};
use oyd_migrate::services::testing::{default_queries, validate_agent_response};
use oyd_migrate::wizard::WizardUI;
use oyd_migrate::{
    analyze, AppSettings, AzureContext, MigrationPath, MigrationPipeline, MigrationPlanFile, MigrationSession,
    SessionStore, Stage, Wizard,
};

#[derive(Parser)]
#[command(name = "oyd-migrate")]
#[command(version)]
#[command(
    about = "Migrate Azure OpenAI On Your Data deployments to Foundry Agent Service",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding settings and sessions
    #[arg(long, global = true, env = CONFIG_DIR_ENV, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover OYD deployments, search services and Foundry projects
    #[command(subcommand)]
    Discover(DiscoverCommand),

    /// Run or manage migrations
    #[command(subcommand)]
    Migrate(MigrateCommand),

    /// Validate migrated resources
    #[command(subcommand)]
    Validate(ValidateCommand),

    /// Generate comparisons, samples and reports
    #[command(subcommand)]
    Generate(GenerateCommand),

    /// Alias for `migrate interactive`
    Wizard {
        /// Session id to resume
        #[arg(long, value_name = "ID")]
        resume: Option<String>,
    },

    /// Alias for `generate comparison`
    Compare(ComparisonArgs),
}

#[derive(Subcommand)]
enum DiscoverCommand {
    /// List AOAI deployments with On Your Data configurations
    Aoai {
        #[command(flatten)]
        azure: AzureArgs,

        /// Only scan this resource group
        #[arg(short = 'g', long)]
        resource_group: Option<String>,
    },

    /// List search services, optionally with index analysis
    Search {
        #[command(flatten)]
        azure: AzureArgs,

        /// Only scan this resource group
        #[arg(short = 'g', long)]
        resource_group: Option<String>,

        /// Also list and analyze indexes
        #[arg(long)]
        indexes: bool,
    },

    /// Analyze one index in detail
    Index {
        #[command(flatten)]
        azure: AzureArgs,

        /// Search service name
        #[arg(long)]
        service: String,

        /// Index name
        #[arg(long)]
        index: String,
    },

    /// List Foundry projects
    Projects {
        #[command(flatten)]
        azure: AzureArgs,
    },
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Guided, resumable migration
    Interactive {
        /// Session id to resume
        #[arg(long, value_name = "ID")]
        resume: Option<String>,
    },

    /// List saved sessions
    Sessions {
        /// Include completed sessions
        #[arg(long)]
        completed: bool,
    },

    /// Migrate to Foundry agents with the Azure AI Search tool
    SearchTool {
        /// Migration plan file
        #[arg(long, value_name = "FILE")]
        plan: PathBuf,
    },

    /// Migrate to Foundry agents backed by a Foundry IQ knowledge base
    KnowledgeBase {
        /// Migration plan file
        #[arg(long, value_name = "FILE")]
        plan: PathBuf,
    },

    /// Write an example migration plan
    Init {
        /// Output file path
        #[arg(short, long, default_value = "migration-plan.yaml")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum ValidateCommand {
    /// Send test queries to an agent
    Agent {
        #[command(flatten)]
        azure: AzureArgs,

        /// Agent name
        name: String,

        /// Foundry project endpoint
        #[arg(short, long)]
        project_endpoint: String,

        /// Query to send (repeatable); defaults to generic questions
        #[arg(short, long)]
        query: Vec<String>,
    },

    /// Check that a project connection resolves and its target answers
    Connection {
        #[command(flatten)]
        azure: AzureArgs,

        /// Connection name
        name: String,

        /// Foundry project endpoint
        #[arg(short, long)]
        project_endpoint: String,
    },

    /// Check role assignments
    Rbac {
        #[command(flatten)]
        azure: AzureArgs,

        /// Check this resource group instead of the subscription
        #[arg(short = 'g', long)]
        resource_group: Option<String>,
    },
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// OYD vs Foundry feature comparison
    Comparison(ComparisonArgs),

    /// Python sample for an agent
    Python {
        /// Agent name
        agent: String,

        /// Foundry project endpoint
        #[arg(short, long)]
        project_endpoint: String,

        /// Migration path of the agent
        #[arg(long, value_enum, default_value_t = MigrationPath::SearchTool)]
        path: MigrationPath,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// cURL script for an agent
    Curl {
        /// Agent name
        agent: String,

        /// Foundry project endpoint
        #[arg(short, long)]
        project_endpoint: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Migration report for a saved session
    Report {
        /// Session id
        session: String,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ComparisonArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = ComparisonFormat::Table)]
    format: ComparisonFormat,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Clone)]
struct AzureArgs {
    /// Subscription id
    #[arg(short, long, env = "AZURE_SUBSCRIPTION_ID")]
    subscription: Option<String>,

    /// Authentication method (cli, service_principal, managed_identity)
    #[arg(long, default_value = "cli")]
    auth_method: AuthMethod,

    /// Tenant id (service principal)
    #[arg(long, env = "AZURE_TENANT_ID")]
    tenant_id: Option<String>,

    /// Client id (service principal or user-assigned identity)
    #[arg(long, env = "AZURE_CLIENT_ID")]
    client_id: Option<String>,
}

impl AzureArgs {
    fn to_config(&self) -> AzureConfig {
        let mut config = AzureConfig {
            subscription_id: self.subscription.clone().unwrap_or_default(),
            tenant_id: self.tenant_id.clone(),
            auth_method: self.auth_method,
            ..Default::default()
        };
        match self.auth_method {
            AuthMethod::ManagedIdentity => config.managed_identity_client_id = self.client_id.clone(),
            _ => config.client_id = self.client_id.clone(),
        }
        config
    }

    /// Context without a subscription, for data-plane commands.
    fn credential_context(&self) -> anyhow::Result<AzureContext> {
        let credential = credential_from_config(&self.to_config())?;
        Ok(AzureContext::new(credential, ""))
    }

    /// Context for the given subscription, or the only one visible.
    async fn context(&self) -> anyhow::Result<AzureContext> {
        let credential: std::sync::Arc<dyn TokenProvider> = credential_from_config(&self.to_config())?;
        let subscription_id = match &self.subscription {
            Some(id) => id.clone(),
            None => {
                let subscriptions = AzureContext::new(credential.clone(), "")
                    .auth()
                    .list_subscriptions()
                    .await?;
                match subscriptions.as_slice() {
                    [] => bail!("No subscriptions found for this account."),
                    [only] => only.subscription_id.clone(),
                    _ => bail!("Several subscriptions are available; pass --subscription or set AZURE_SUBSCRIPTION_ID"),
                }
            }
        };
        debug!("Using subscription {}", subscription_id);
        Ok(AzureContext::new(credential, &subscription_id))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);
    let mut settings = AppSettings::load(&config_dir)?;
    settings.verbose |= cli.verbose;
    settings.no_color |= cli.no_color;

    // Setup logging
    let level = if settings.verbose {
        "debug".to_string()
    } else {
        settings.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!settings.no_color)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if settings.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    match cli.command {
        Commands::Discover(command) => discover(command).await?,
        Commands::Migrate(command) => migrate(command, settings).await?,
        Commands::Validate(command) => validate(command).await?,
        Commands::Generate(command) => generate(command, &settings)?,
        Commands::Wizard { resume } => run_wizard(settings, resume).await?,
        Commands::Compare(args) => write_comparison(&args)?,
    }

    Ok(())
}

// ==================== discover ====================

async fn discover(command: DiscoverCommand) -> anyhow::Result<()> {
    let ui = WizardUI::new();

    match command {
        DiscoverCommand::Aoai { azure, resource_group } => {
            let context = azure.context().await?;
            let spinner = ui.spinner("Discovering AOAI resources...");
            let deployments = context
                .aoai()
                .discover_oyd_deployments(resource_group.as_deref())
                .await;
            spinner.finish_and_clear();
            let deployments = deployments?;

            if deployments.is_empty() {
                ui.print_info("No deployments with On Your Data configurations found.");
            } else {
                ui.print_table(&deployments_table(&deployments));
                ui.print_success(&format!("Found {} OYD deployment(s)", deployments.len()));
            }
        }
        DiscoverCommand::Search {
            azure,
            resource_group,
            indexes,
        } => {
            let context = azure.context().await?;
            let search = context.search();
            let spinner = ui.spinner("Listing search services...");
            let services = search.list_services(resource_group.as_deref()).await;
            spinner.finish_and_clear();
            let services = services?;

            if services.is_empty() {
                ui.print_info("No search services found.");
                return Ok(());
            }
            ui.print_table(&services_table(&services));

            if indexes {
                for service in &services {
                    let spinner = ui.spinner(&format!("Analyzing indexes of {}...", service.name));
                    let analyzed = search.analyze_indexes(service).await;
                    spinner.finish_and_clear();

                    ui.print_section(&format!("{} ({} index(es))", service.name, analyzed.len()));
                    if !analyzed.is_empty() {
                        ui.print_table(&indexes_table(&analyzed));
                    }
                }
            }
        }
        DiscoverCommand::Index { azure, service, index } => {
            let context = azure.context().await?;
            let search = context.search();
            let services = search.list_services(None).await?;
            let Some(found) = services.into_iter().find(|s| s.name == service) else {
                bail!("Search service '{service}' not found in the subscription");
            };

            let spinner = ui.spinner(&format!("Reading index {index}..."));
            let search_index = search.get_index(&found, &index).await;
            spinner.finish_and_clear();
            let search_index = search_index?;
            let analysis = analyze(&search_index);

            ui.print_section(&format!("Index {} on {}", search_index.name, found.name));
            ui.print_table(&fields_table(&search_index));
            ui.print_table(&analysis_table(&analysis));
            for issue in &analysis.issues {
                ui.print_warning(issue);
            }
            for recommendation in &analysis.recommendations {
                ui.print_item(recommendation);
            }
        }
        DiscoverCommand::Projects { azure } => {
            let context = azure.context().await?;
            let spinner = ui.spinner("Listing Foundry projects...");
            let projects = context.foundry().list_projects().await;
            spinner.finish_and_clear();

            if projects.is_empty() {
                ui.print_info("No Foundry projects found.");
            } else {
                ui.print_table(&projects_table(&projects));
            }
        }
    }

    Ok(())
}

// ==================== migrate ====================

async fn migrate(command: MigrateCommand, settings: AppSettings) -> anyhow::Result<()> {
    match command {
        MigrateCommand::Interactive { resume } => run_wizard(settings, resume).await?,
        MigrateCommand::Sessions { completed } => {
            let store = SessionStore::new(&settings.config_dir);
            let sessions = store.list(completed)?;
            if sessions.is_empty() {
                println!("No sessions found.");
            } else {
                println!("{}", sessions_table(&sessions));
            }
        }
        MigrateCommand::SearchTool { plan } => run_plan(&plan, MigrationPath::SearchTool, &settings).await?,
        MigrateCommand::KnowledgeBase { plan } => run_plan(&plan, MigrationPath::KnowledgeBase, &settings).await?,
        MigrateCommand::Init { output } => {
            std::fs::write(&output, PLAN_TEMPLATE)?;
            println!("✅ Generated migration plan: {}", output.display());
            println!(
                "   Edit the file and run: oyd-migrate migrate search-tool --plan {}",
                output.display()
            );
        }
    }
    Ok(())
}

async fn run_wizard(settings: AppSettings, resume: Option<String>) -> anyhow::Result<()> {
    let store = SessionStore::new(&settings.config_dir);

    let (mut session, resumed) = match resume {
        Some(id) => match store.load(&id)? {
            Some(session) => (session, true),
            None => {
                eprintln!("❌ Session '{id}' not found");
                eprintln!("   List sessions with: oyd-migrate migrate sessions");
                std::process::exit(1);
            }
        },
        None => (MigrationSession::new(), false),
    };

    if session.completed {
        println!("Session {} is already completed.", session.session_id);
        println!("   Report: oyd-migrate generate report {}", session.session_id);
        return Ok(());
    }

    let mut wizard = Wizard::new(settings);
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let outcome = wizard.run(&mut session, &store, resumed, interrupt).await;

    let ui = wizard.ui();
    match outcome {
        Some(Ok(())) => {
            ui.print_success(&format!("Session {} completed.", session.session_id));
            println!(
                "   Report: oyd-migrate generate report {} --format html",
                session.session_id
            );
        }
        Some(Err(e)) if e.is_cancelled() => {
            info!("Wizard cancelled: {}", e);
            ui.print_cancelled();
            ui.print_resume_hint(&session.session_id);
        }
        Some(Err(e)) => {
            ui.print_error(&e.to_string());
            ui.print_resume_hint(&session.session_id);
            std::process::exit(1);
        }
        None => {
            if let Err(e) = console::Term::stdout().show_cursor() {
                debug!("Could not restore cursor: {}", e);
            }
            ui.print_cancelled();
            ui.print_resume_hint(&session.session_id);
        }
    }
    Ok(())
}

async fn run_plan(plan_path: &Path, path: MigrationPath, settings: &AppSettings) -> anyhow::Result<()> {
    info!("Loading migration plan from {}", plan_path.display());
    let plan = MigrationPlanFile::from_file(plan_path)
        .with_context(|| format!("Failed to load plan {}", plan_path.display()))?;
    plan.validate()?;

    let mut session = MigrationSession::new();
    session.azure_config = Some(plan.azure.clone());
    session.aoai_configs = plan.openai;
    session.search_configs = plan.search;
    session.foundry_config = Some(plan.foundry);
    session.migration_options = plan.options;
    session.migration_options.migration_path = path;
    session.current_stage = Stage::Review;

    let credential = credential_from_config(&plan.azure)?;
    let context = AzureContext::new(credential, &plan.azure.subscription_id);
    let ui = WizardUI::new();

    println!("Executing {} migration (session {})", path.display_name(), session.session_id);
    let pipeline = MigrationPipeline::new(context)
        .with_propagation_timeout(Duration::from_secs(settings.propagation_delay_secs))
        .with_progress(ui.is_interactive())
        .with_sample_dir(Some(settings.config_dir.join(SAMPLES_DIR).join(&session.session_id)));
    let result = pipeline.execute(&mut session).await;

    session.migration_succeeded = Some(result.success);
    session.completed = true;
    let store = SessionStore::new(&settings.config_dir);
    store.save(&mut session)?;

    ui.print_result(&result);
    println!("   Report: oyd-migrate generate report {}", session.session_id);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

// ==================== validate ====================

async fn validate(command: ValidateCommand) -> anyhow::Result<()> {
    let ui = WizardUI::new();

    match command {
        ValidateCommand::Agent {
            azure,
            name,
            project_endpoint,
            query,
        } => {
            let context = azure.credential_context()?;
            let queries = if query.is_empty() { default_queries(None) } else { query };

            let spinner = ui.spinner(&format!("Testing agent {name}..."));
            let results = context
                .test_runner(&project_endpoint)
                .run_test_suite(&name, &queries)
                .await;
            spinner.finish_and_clear();

            ui.print_table(&test_results_table(&results));
            let mut failed = 0;
            for result in &results {
                let issues = validate_agent_response(result, false, false);
                if !issues.is_empty() {
                    failed += 1;
                    for issue in issues {
                        ui.print_warning(&format!("{}: {}", result.query, issue));
                    }
                }
            }

            if failed > 0 {
                ui.print_error(&format!("{failed}/{} queries failed", results.len()));
                std::process::exit(1);
            }
            ui.print_success(&format!("All {} queries passed", results.len()));
        }
        ValidateCommand::Connection {
            azure,
            name,
            project_endpoint,
        } => {
            let context = azure.credential_context()?;
            let validation = context
                .connections(&project_endpoint)
                .validate_connection(&name)
                .await;

            ui.print_item(&format!("Type: {}", validation.connection_type));
            ui.print_item(&format!("Target: {}", validation.target));
            ui.print_item(&format!("Auth: {}", validation.auth_type));
            for issue in &validation.issues {
                ui.print_warning(issue);
            }
            if !validation.is_valid {
                ui.print_error(&format!("Connection '{name}' is not valid"));
                std::process::exit(1);
            }
            ui.print_success(&format!("Connection '{name}' is valid"));
        }
        ValidateCommand::Rbac { azure, resource_group } => {
            let context = azure.context().await?;
            let check = context
                .auth()
                .check_permissions(context.subscription_id(), resource_group.as_deref())
                .await;

            ui.print_info(&format!("{} role assignment(s) visible", check.assignment_count));
            if check.has_warnings() {
                for warning in &check.warnings {
                    ui.print_warning(warning);
                }
            } else {
                ui.print_success("Permissions validated.");
            }
        }
    }

    Ok(())
}

// ==================== generate ====================

fn generate(command: GenerateCommand, settings: &AppSettings) -> anyhow::Result<()> {
    match command {
        GenerateCommand::Comparison(args) => write_comparison(&args)?,
        GenerateCommand::Python {
            agent,
            project_endpoint,
            path,
            output,
        } => emit(&generate_python_sample(&agent, &project_endpoint, path), output.as_deref())?,
        GenerateCommand::Curl {
            agent,
            project_endpoint,
            output,
        } => emit(&generate_curl_commands(&agent, &project_endpoint), output.as_deref())?,
        GenerateCommand::Report {
            session,
            format,
            output,
        } => {
            let store = SessionStore::new(&settings.config_dir);
            let Some(loaded) = store.load(&session)? else {
                bail!("Session '{session}' not found");
            };
            emit(&generate_report(&loaded, format)?, output.as_deref())?;
        }
    }
    Ok(())
}

fn write_comparison(args: &ComparisonArgs) -> anyhow::Result<()> {
    emit(&comparison::render(args.format), args.output.as_deref())
}

/// Prints to stdout, or writes the file and says so.
fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Written to {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

const PLAN_TEMPLATE: &str = r#"# oyd-migrate migration plan
# Run with: oyd-migrate migrate search-tool --plan <this file>
#       or: oyd-migrate migrate knowledge-base --plan <this file>

azure:
  subscription_id: 00000000-0000-0000-0000-000000000000
  auth_method: cli                # cli, service_principal, managed_identity
  # tenant_id: your-tenant-id
  # client_id: your-client-id     # secret is read from AZURE_CLIENT_SECRET

openai:
  - resource_name: your-aoai-resource
    resource_group: your-resource-group
    endpoint: https://your-aoai-resource.openai.azure.com
    deployment_name: your-deployment
    # role_information: You are a helpful assistant...
    # query_type: vector_semantic_hybrid

search:
  - service_name: your-search-service
    resource_group: your-resource-group
    endpoint: https://your-search-service.search.windows.net
    index_name: your-index
    use_managed_identity: true

foundry:
  project_name: oyd-migration-project
  resource_group: your-resource-group
  project_endpoint: https://your-account.services.ai.azure.com/api/projects/oyd-migration-project
  model_deployment: gpt-4.1
  location: eastus

options:
  create_new_project: false
  preserve_query_type: true
  migrate_system_message: true
  test_after_migration: true
  generate_samples: true
"#;
