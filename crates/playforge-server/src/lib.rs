//! Playforge HTTP server
//!
//! Server-rendered pages for managing game projects, the JSON APIs used by the
//! editors and by the games themselves, and static serving of project files.

pub mod http;
mod views;

use std::sync::Arc;

use anyhow::Context;
use playforge_core::config::Config;
use playforge_core::notifier::{MandrillNotifier, Notifier};
use playforge_core::projects::ProjectRepository;
use playforge_core::results::ResultsLog;
use playforge_core::storage::Database;
use playforge_core::submission::SubmissionService;

pub use http::app;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub projects: ProjectRepository,
    pub results: ResultsLog,
    pub submissions: SubmissionService,
}

impl AppState {
    pub fn new(config: Config, db: Database, notifier: Arc<dyn Notifier>) -> Self {
        let projects = ProjectRepository::new(&config.storage);
        let results = ResultsLog::new(db);
        let submissions = SubmissionService::new(results.clone(), notifier);
        Self {
            config: Arc::new(config),
            projects,
            results,
            submissions,
        }
    }

    /// Open the database, prepare the project root and build the mail notifier
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let db = Database::open(&config.storage.database_path).await?;
        let notifier = MandrillNotifier::new(&config.mail).context("Failed to build mail client")?;
        let state = Self::new(config, db, Arc::new(notifier));
        state
            .projects
            .ensure_root()
            .context("Failed to create the projects directory")?;
        Ok(state)
    }

    pub fn results_per_page(&self) -> u32 {
        self.config.server.results_per_page.max(1)
    }
}
