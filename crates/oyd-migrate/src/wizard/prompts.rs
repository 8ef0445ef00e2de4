//! Interactive prompts for the migration wizard.

use dialoguer::{theme::ColorfulTheme, Confirm, FuzzySelect, Input, MultiSelect, Password, Select};

use crate::config::{AuthMethod, MigrationOptions, MigrationPath};
use crate::constants::RECOMMENDED_MODELS;
use crate::error::{Error, Result};

use super::discovery::DiscoveryScope;

fn cancelled(e: dialoguer::Error) -> Error {
    Error::Cancelled(format!("Prompt cancelled: {e}"))
}

/// Interactive prompts handler.
pub struct WizardPrompts {
    theme: ColorfulTheme,
}

impl Default for WizardPrompts {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardPrompts {
    /// Creates a new prompts handler.
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Single choice; returns the selected position.
    pub fn select<T: ToString>(&self, prompt: &str, items: &[T], default: usize) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(cancelled)
    }

    /// Single choice with type-to-filter, for long lists.
    pub fn fuzzy_select<T: ToString>(&self, prompt: &str, items: &[T]) -> Result<usize> {
        FuzzySelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(cancelled)
    }

    /// Several choices, all checked initially. At least one must stay checked.
    pub fn multi_select<T: ToString>(&self, prompt: &str, items: &[T]) -> Result<Vec<usize>> {
        let defaults = vec![true; items.len()];
        let selected = MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .defaults(&defaults)
            .interact()
            .map_err(cancelled)?;

        if selected.is_empty() {
            return Err(Error::Cancelled("Nothing selected".to_string()));
        }
        Ok(selected)
    }

    /// Required free text.
    pub fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input
            .validate_with(|value: &String| -> std::result::Result<(), &str> {
                if value.trim().is_empty() {
                    Err("Required")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .map(|value| value.trim().to_string())
            .map_err(cancelled)
    }

    /// Required hidden text.
    pub fn password(&self, prompt: &str) -> Result<String> {
        let value = Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact()
            .map_err(cancelled)?;

        if value.is_empty() {
            return Err(Error::Config(format!("{} is required", prompt.trim_end_matches(':'))));
        }
        Ok(value)
    }

    /// Yes or no.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(cancelled)
    }

    /// Prompts for the authentication method.
    pub fn select_auth_method(&self) -> Result<AuthMethod> {
        let items = [
            "Azure CLI (az login) - Recommended for interactive use",
            "Service Principal (client ID + secret)",
            "Managed Identity (for Azure-hosted environments)",
        ];
        let selection = self.select("How would you like to authenticate?", &items, 0)?;
        Ok(AuthMethod::all()[selection])
    }

    /// Prompts for how deployments are found.
    pub fn select_discovery_scope(&self) -> Result<DiscoveryScope> {
        let items = [
            "Scan entire subscription (slower)",
            "Filter by resource group (faster, recommended)",
            "Manually specify AOAI resource (fastest)",
        ];
        match self.select("How would you like to discover resources?", &items, 1)? {
            0 => Ok(DiscoveryScope::Subscription),
            1 => Ok(DiscoveryScope::ResourceGroup(self.input("Enter resource group name:", None)?)),
            _ => Ok(DiscoveryScope::Manual),
        }
    }

    /// Prompts for the target architecture.
    pub fn select_migration_path(&self) -> Result<MigrationPath> {
        let items = [
            "Foundry Agent + Azure AI Search Tool (Recommended for simple RAG)",
            "Foundry Agent + Foundry IQ Knowledge Base (Better for complex reasoning)",
        ];
        match self.select("Which architecture do you want to migrate to?", &items, 0)? {
            0 => Ok(MigrationPath::SearchTool),
            _ => Ok(MigrationPath::KnowledgeBase),
        }
    }

    /// Prompts for the agent model; the last entry asks for a custom name.
    pub fn select_model(&self) -> Result<String> {
        let mut items: Vec<String> = RECOMMENDED_MODELS
            .iter()
            .map(|(name, description)| format!("{name} ({description})"))
            .collect();
        items.push("Other (specify)".to_string());

        let selection = self.select("Which model should the agents use?", &items, 0)?;
        match RECOMMENDED_MODELS.get(selection) {
            Some((name, _)) => Ok((*name).to_string()),
            None => self.input("Enter model deployment name:", None),
        }
    }

    /// Prompts for the option toggles, keeping path and project choice.
    pub fn migration_options(&self, mut options: MigrationOptions) -> Result<MigrationOptions> {
        options.preserve_query_type =
            self.confirm("Preserve original query type from OYD configuration?", true)?;
        options.migrate_system_message =
            self.confirm("Migrate role_information to agent instructions?", true)?;
        options.test_after_migration = self.confirm("Run test queries after migration?", true)?;
        options.generate_samples = self.confirm("Generate SDK code samples?", true)?;
        Ok(options)
    }
}
