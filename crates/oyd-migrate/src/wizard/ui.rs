//! Console UI formatting for the migration wizard.

use comfy_table::Table;
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::models::migration::MigrationResult;
use crate::output::test_results_table;
use crate::session::{MigrationSession, Stage};

use super::discovery::DiscoverySummary;

/// Console UI handler for the wizard.
pub struct WizardUI {
    term: Term,
}

impl Default for WizardUI {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardUI {
    /// Creates a new UI handler.
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Stdout is a terminal, so spinners can be drawn.
    pub fn is_interactive(&self) -> bool {
        self.term.is_term()
    }

    /// Prints the wizard header.
    pub fn print_header(&self) {
        let cyan = Style::new().cyan().bold();

        println!();
        println!(
            "{}",
            cyan.apply_to("╔═══════════════════════════════════════════════════════════════╗")
        );
        println!(
            "{}",
            cyan.apply_to("║         🚀 OYD → FOUNDRY MIGRATION WIZARD                     ║")
        );
        println!(
            "{}",
            cyan.apply_to("║         Move On Your Data deployments to Foundry Agents       ║")
        );
        println!(
            "{}",
            cyan.apply_to("╚═══════════════════════════════════════════════════════════════╝")
        );
        println!();
    }

    /// Prints the banner shown when an existing session is picked up.
    pub fn print_resumed(&self, session: &MigrationSession) {
        println!(
            "{} Resuming session {} at stage {}/{}: {}",
            style("ℹ").blue(),
            style(&session.session_id).bold(),
            session.current_stage.number(),
            Stage::ALL.len(),
            session.current_stage.title()
        );
        println!();
    }

    /// Prints a stage heading.
    pub fn print_stage(&self, stage: Stage) {
        let bold = Style::new().bold();
        println!();
        println!(
            "{}",
            bold.apply_to(format!("━━━ Stage {}/{}: {} ━━━", stage.number(), Stage::ALL.len(), stage.title()))
        );
        println!();
    }

    /// Prints a bold section heading inside a stage.
    pub fn print_section(&self, title: &str) {
        println!();
        println!("{}", style(title).bold());
    }

    /// Prints an informational line.
    pub fn print_info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    /// Prints a success line.
    pub fn print_success(&self, message: &str) {
        println!("{} {}", style("✅").green(), message);
    }

    /// Prints a warning line.
    pub fn print_warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow().bold(), message);
    }

    /// Prints a bullet.
    pub fn print_item(&self, message: &str) {
        println!("  • {message}");
    }

    /// Prints a table.
    pub fn print_table(&self, table: &Table) {
        println!("{table}");
    }

    /// Prints the discovery counts.
    pub fn print_discovery_summary(&self, summary: DiscoverySummary) {
        self.print_section("Discovery Summary:");
        self.print_item(&format!("OYD deployments: {}", summary.deployments));
        self.print_item(&format!("Search services: {}", summary.search_services));
        self.print_item(&format!("Total indexes: {}", summary.indexes));
        println!();
    }

    /// Prints the numbered plan shown before execution.
    pub fn print_plan(&self, session: &MigrationSession, actions: &[String]) {
        let cyan = Style::new().cyan();

        println!("{}", cyan.apply_to("Source (OYD Deployments):"));
        for aoai in &session.aoai_configs {
            self.print_item(&format!("{}/{}", aoai.resource_name, aoai.deployment_name));
        }

        println!();
        println!("{}", cyan.apply_to("Connected Search Services:"));
        for search in &session.search_configs {
            self.print_item(&search.service_name);
        }

        println!();
        println!("{}", cyan.apply_to("Target (Foundry):"));
        if let Some(foundry) = &session.foundry_config {
            self.print_item(&format!("Project: {}", foundry.project_name));
            self.print_item(&format!("Model: {}", foundry.model_deployment));
        }
        self.print_item(&format!(
            "Architecture: {}",
            session.migration_options.migration_path.display_name()
        ));

        println!();
        println!("{}", cyan.apply_to("Actions:"));
        for (i, action) in actions.iter().enumerate() {
            println!("  {}. ⏳ {}", i + 1, action);
        }
        println!();
    }

    /// Prints the outcome of the execute step.
    pub fn print_result(&self, result: &MigrationResult) {
        let green = Style::new().green().bold();
        let bold = Style::new().bold();

        println!();
        if result.success {
            println!("{}", green.apply_to("✅ Migration Complete!"));
        } else {
            println!("{}", style("❌ Migration finished with errors").red().bold());
        }
        println!();
        println!("   {} {}", bold.apply_to("Connections:"), result.connections_created.len());
        println!("   {} {}", bold.apply_to("Agents:     "), result.agents_created.len());
        println!("   {} {:.1}s", bold.apply_to("Duration:   "), result.duration_secs);

        if !result.test_results.is_empty() {
            println!();
            self.print_table(&test_results_table(&result.test_results));
        }
        for file in result.artifacts.keys() {
            self.print_item(&format!("Sample: {file}"));
        }
        for warning in &result.warnings {
            self.print_warning(warning);
        }
        for error in &result.errors {
            self.print_error(error);
        }
        println!();
    }

    /// Prints how to pick the session up again.
    pub fn print_resume_hint(&self, session_id: &str) {
        let dim = Style::new().dim();
        println!();
        println!("Session saved: {}", style(session_id).bold());
        println!(
            "   {} oyd-migrate migrate interactive --resume {}",
            dim.apply_to("Resume with:"),
            session_id
        );
    }

    /// Prints cancellation message.
    pub fn print_cancelled(&self) {
        println!();
        println!("{} Migration cancelled.", style("ℹ").blue());
    }

    /// Prints error message.
    pub fn print_error(&self, message: &str) {
        println!();
        println!("{} {}", style("❌").red().bold(), message);
    }

    /// Spinner for one remote call; hidden when stdout is not a terminal.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.is_interactive() {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}
