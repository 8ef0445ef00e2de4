//! Resumable migration sessions.
//!
//! A [`MigrationSession`] moves through four stages in a fixed order:
//!
//! ```text
//! auth -> discovery -> migration -> review -> (completed)
//! ```
//!
//! [`transition`] is the only place the stage changes. A stage whose handler
//! returns an error is not advanced, so it is re-entered in full on resume
//! (at-least-once). Handlers keep that safe by writing resources with
//! create-or-update semantics and recording side effects through
//! [`MigrationSession::record_connection`] and friends, which de-duplicate.
//!
//! `completed` is set once the review stage returns, whether or not the
//! migration itself succeeded; `migration_succeeded` records the latter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{AoaiConfig, AzureConfig, FoundryConfig, MigrationOptions, SearchConfig};
use crate::constants::SESSIONS_DIR;
use crate::error::Result;

/// Wizard stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Pick a credential and subscription.
    #[default]
    #[serde(alias = "new")]
    Auth,
    /// Find OYD deployments and their search indexes.
    Discovery,
    /// Choose the target path, project and options.
    Migration,
    /// Confirm and execute.
    Review,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Self::Auth, Self::Discovery, Self::Migration, Self::Review];

    /// The following stage, `None` after review.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Auth => Some(Self::Discovery),
            Self::Discovery => Some(Self::Migration),
            Self::Migration => Some(Self::Review),
            Self::Review => None,
        }
    }

    /// Name stored on disk.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Discovery => "discovery",
            Self::Migration => "migration",
            Self::Review => "review",
        }
    }

    /// Heading shown by the wizard.
    pub fn title(self) -> &'static str {
        match self {
            Self::Auth => "Authentication",
            Self::Discovery => "Discovery",
            Self::Migration => "Migration Configuration",
            Self::Review => "Review & Execute",
        }
    }

    /// 1-based position.
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state machine part of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    /// Current stage.
    pub stage: Stage,
    /// The review stage has returned.
    pub completed: bool,
}

/// How a stage handler ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The handler returned. For review this includes a failed migration.
    Finished,
    /// The handler raised an error.
    Aborted,
}

/// Computes the state after a stage handler ends.
///
/// Aborted never moves the state and a completed state absorbs everything.
/// Finishing review marks the session completed and leaves the stage there.
pub fn transition(state: SessionState, outcome: StageOutcome) -> SessionState {
    if state.completed || outcome == StageOutcome::Aborted {
        return state;
    }
    match state.stage.next() {
        Some(stage) => SessionState {
            stage,
            completed: false,
        },
        None => SessionState {
            stage: state.stage,
            completed: true,
        },
    }
}

/// A persisted migration attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSession {
    /// Short random id.
    pub session_id: String,
    /// Creation time.
    pub started_at: DateTime<Utc>,
    /// Last save time.
    pub updated_at: DateTime<Utc>,
    /// Stage to run next.
    pub current_stage: Stage,
    /// The review stage has returned.
    pub completed: bool,
    /// Outcome reported by the review stage.
    pub migration_succeeded: Option<bool>,
    /// Identity and subscription.
    pub azure_config: Option<AzureConfig>,
    /// Deployments selected for migration.
    pub aoai_configs: Vec<AoaiConfig>,
    /// Search services behind them.
    pub search_configs: Vec<SearchConfig>,
    /// Target project.
    pub foundry_config: Option<FoundryConfig>,
    /// Options chosen in the migration stage.
    pub migration_options: MigrationOptions,
    /// Connections written so far.
    pub created_connections: Vec<String>,
    /// Agents written so far.
    pub created_agents: Vec<String>,
    /// Test id to pass/fail.
    pub test_results: BTreeMap<String, bool>,
}

impl Default for MigrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationSession {
    /// Starts a session at the auth stage with a fresh id.
    pub fn new() -> Self {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            session_id: id[..8].to_string(),
            started_at: now,
            updated_at: now,
            current_stage: Stage::Auth,
            completed: false,
            migration_succeeded: None,
            azure_config: None,
            aoai_configs: Vec::new(),
            search_configs: Vec::new(),
            foundry_config: None,
            migration_options: MigrationOptions::default(),
            created_connections: Vec::new(),
            created_agents: Vec::new(),
            test_results: BTreeMap::new(),
        }
    }

    /// Current state machine position.
    pub fn state(&self) -> SessionState {
        SessionState {
            stage: self.current_stage,
            completed: self.completed,
        }
    }

    /// Applies a stage outcome through [`transition`].
    pub fn apply(&mut self, outcome: StageOutcome) {
        let next = transition(self.state(), outcome);
        self.current_stage = next.stage;
        self.completed = next.completed;
    }

    /// Records a written connection once.
    pub fn record_connection(&mut self, name: &str) {
        push_unique(&mut self.created_connections, name);
    }

    /// Records a written agent once.
    pub fn record_agent(&mut self, name: &str) {
        push_unique(&mut self.created_agents, name);
    }

    /// Records a test outcome, replacing an earlier run of the same test.
    pub fn record_test(&mut self, key: impl Into<String>, passed: bool) {
        self.test_results.insert(key.into(), passed);
    }

    /// Number of recorded tests that passed.
    pub fn tests_passed(&self) -> usize {
        self.test_results.values().filter(|passed| **passed).count()
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// Reads and writes sessions under `<config_dir>/sessions`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Store for a config directory.
    pub fn new(config_dir: &Path) -> Self {
        Self {
            dir: config_dir.join(SESSIONS_DIR),
        }
    }

    /// Directory holding the session files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Writes the session, refreshing `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, session: &mut MigrationSession) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        session.updated_at = Utc::now();
        let path = self.path_for(&session.session_id);
        std::fs::write(&path, serde_json::to_string_pretty(session)?)?;
        debug!("Saved session {} at stage {}", session.session_id, session.current_stage);
        Ok(path)
    }

    /// Loads a session by id; `None` when no such session exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self, session_id: &str) -> Result<Option<MigrationSession>> {
        if session_id.is_empty() || session_id.contains(&['/', '\\'][..]) || session_id.contains("..") {
            return Ok(None);
        }
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Lists sessions, newest first. Unreadable files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list(&self, include_completed: bool) -> Result<Vec<MigrationSession>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(crate::error::Error::from)
                .and_then(|c| serde_json::from_str::<MigrationSession>(&c).map_err(Into::into));
            match parsed {
                Ok(session) if include_completed || !session.completed => sessions.push(session),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable session file {}: {}", path.display(), e),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

/// Runs the handler of one stage.
///
/// Handlers must tolerate being re-run after a partial failure.
#[async_trait]
pub trait StageRunner: Send {
    /// Executes `stage`, mutating the session with what it learned.
    async fn run_stage(&mut self, stage: Stage, session: &mut MigrationSession) -> Result<()>;
}

/// Drives a session to completion, saving after every transition.
///
/// On a handler error the session is saved unchanged and the error returned.
///
/// # Errors
///
/// Returns the first handler or persistence error.
pub async fn run_stages<R>(
    runner: &mut R,
    session: &mut MigrationSession,
    store: &SessionStore,
) -> Result<()>
where
    R: StageRunner + ?Sized,
{
    while !session.completed {
        let stage = session.current_stage;
        debug!("Running stage {} of session {}", stage, session.session_id);

        match runner.run_stage(stage, session).await {
            Ok(()) => {
                session.apply(StageOutcome::Finished);
                store.save(session)?;
            }
            Err(e) => {
                session.apply(StageOutcome::Aborted);
                if let Err(save_err) = store.save(session) {
                    warn!("Could not save session {}: {}", session.session_id, save_err);
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Like [`run_stages`], but gives up when `interrupt` resolves first.
///
/// The stage in flight is dropped and the session is saved as it stands,
/// keeping side effects the stage already recorded. Returns `None` on
/// interrupt; the stage is left unchanged so it is replayed on resume.
pub async fn run_stages_until<R, I>(
    runner: &mut R,
    session: &mut MigrationSession,
    store: &SessionStore,
    interrupt: I,
) -> Option<Result<()>>
where
    R: StageRunner + ?Sized,
    I: Future<Output = ()>,
{
    let outcome = tokio::select! {
        result = run_stages(runner, session, store) => Some(result),
        () = interrupt => None,
    };

    if outcome.is_none() {
        debug!("Interrupted at stage {} of session {}", session.current_stage, session.session_id);
        if let Err(e) = store.save(session) {
            warn!("Could not save session {}: {}", session.session_id, e);
        }
    }
    outcome
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
