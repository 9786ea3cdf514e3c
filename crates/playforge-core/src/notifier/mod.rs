//! Result notifications
//!
//! After a play session the student receives an HTML summary of their result.
//! Delivery goes through a [`Notifier`]; the production implementation talks to the
//! Mailchimp Transactional (Mandrill) HTTP API.

mod mandrill;

pub use mandrill::MandrillNotifier;

use askama::Template;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the student is told about one play session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub student_name: String,
    pub student_email: String,
    pub project_name: String,
    pub score: String,
    pub time_spent: String,
}

impl ResultSummary {
    pub fn subject(&self) -> String {
        format!(
            "Results of '{}' for {}",
            self.project_name, self.student_name
        )
    }

    /// Render the HTML body of the notification
    pub fn render_html(&self) -> Result<String> {
        Ok(ResultEmail { summary: self }.render()?)
    }
}

#[derive(Template)]
#[template(path = "email_result.html")]
struct ResultEmail<'a> {
    summary: &'a ResultSummary,
}

/// Delivers result summaries to students
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one summary; a single attempt, no retries
    async fn notify(&self, summary: &ResultSummary) -> Result<()>;
}
