//! Playforge Core Library
//!
//! This crate provides the core functionality for Playforge, including:
//! - Projects (folder-per-project store, manifests, zip export)
//! - Templates (read-only catalog and visual editor mapping)
//! - Results log (SQLite, filtered and paginated)
//! - Result notifications (Mailchimp Transactional)
//! - Path safety for user-supplied names

pub mod config;
pub mod error;
pub mod manifest;
pub mod notifier;
pub mod paths;
pub mod projects;
pub mod results;
pub mod storage;
pub mod submission;
pub mod templates;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::notifier::{MandrillNotifier, Notifier, ResultSummary};
    pub use crate::projects::{ProjectRepository, ProjectSummary, VisualEditor};
    pub use crate::results::{GameResult, ResultFilter, ResultPage, ResultsLog};
    pub use crate::storage::Database;
    pub use crate::submission::{Submission, SubmissionService};
    pub use crate::templates::{EditorKind, TemplateCatalog, TemplateInfo};
}
