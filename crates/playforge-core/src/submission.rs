//! Game result submission
//!
//! A finished play session is normalised, appended to the results log and then
//! mailed to the student. The log write always happens first and is never undone.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::notifier::{Notifier, ResultSummary};
use crate::results::{GameResult, NewGameResult, ResultsLog};

/// Placeholder stored when a game reports `null` for score or time
pub const MISSING_VALUE: &str = "N/D";

const REQUIRED_FIELDS: [&str; 4] = ["name", "email", "score", "time"];

/// Payload posted by a game when a session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub score: String,
    pub time: String,
}

impl Submission {
    /// Parse `{name, email, score, time}`; all four keys are required
    pub fn from_json(body: &Value) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| Error::Validation("Missing data".to_string()))?;

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !object.contains_key(*field))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Missing data: {}",
                missing.join(", ")
            )));
        }

        let text = |field: &str| -> Result<String> {
            object[field]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::Validation(format!("'{}' must be a string", field)))
        };

        Ok(Self {
            name: text("name")?,
            email: text("email")?,
            score: opaque(&object["score"]),
            time: opaque(&object["time"]),
        })
    }
}

/// Games format score and time themselves; keep strings verbatim
fn opaque(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => MISSING_VALUE.to_string(),
        other => other.to_string(),
    }
}

/// Replace non-breaking spaces and trim
pub fn normalize_text(text: &str) -> String {
    text.replace('\u{a0}', " ").trim().to_string()
}

/// Persists submissions and notifies students
#[derive(Clone)]
pub struct SubmissionService {
    results: ResultsLog,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionService {
    pub fn new(results: ResultsLog, notifier: Arc<dyn Notifier>) -> Self {
        Self { results, notifier }
    }

    /// Record a play session and mail its summary
    ///
    /// A failed log write is logged and does not stop the email. A failed email is
    /// returned, but the stored row stays. Returns the stored row when the write
    /// succeeded.
    pub async fn submit(
        &self,
        project_name: &str,
        submission: Submission,
    ) -> Result<Option<GameResult>> {
        let entry = NewGameResult {
            student_name: normalize_text(&submission.name),
            student_email: submission.email.trim().to_string(),
            project_name: normalize_text(project_name),
            score: submission.score,
            time_spent: submission.time,
        };

        let summary = ResultSummary {
            student_name: entry.student_name.clone(),
            student_email: entry.student_email.clone(),
            project_name: entry.project_name.clone(),
            score: entry.score.clone(),
            time_spent: entry.time_spent.clone(),
        };

        let saved = match self.results.append(entry).await {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::error!(error = %e, project = %summary.project_name, "Failed to save game result");
                None
            }
        };

        if let Err(e) = self.notifier.notify(&summary).await {
            tracing::warn!(error = %e, code = e.code(), recipient = %summary.student_email, "Result email not sent");
            return Err(e);
        }

        Ok(saved)
    }
}
