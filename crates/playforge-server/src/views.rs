//! Server-rendered pages

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use playforge_core::projects::ProjectSummary;
use playforge_core::results::{GameResult, ResultFilter, ResultPage};
use playforge_core::templates::TemplateInfo;

use crate::http::error::ApiError;
use crate::http::flash::{self, FlashMessage};

/// Render `page`, expiring the flash cookie when a message was shown
pub(crate) fn render<T: Template>(page: &T, shown_flash: bool) -> Result<Response, ApiError> {
    let html = page.render().map_err(playforge_core::Error::from)?;
    if shown_flash {
        Ok(([flash::clear_cookie()], Html(html)).into_response())
    } else {
        Ok(Html(html).into_response())
    }
}

/// Template filters
mod filters {
    /// Percent-encode a value for use as one URL path segment
    pub fn segment<T: std::fmt::Display>(value: T) -> askama::Result<String> {
        Ok(crate::http::encode_segment(&value.to_string()))
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub(crate) struct DashboardPage {
    pub flash: Option<FlashMessage>,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Template)]
#[template(path = "create_project.html")]
pub(crate) struct CreateProjectPage {
    pub flash: Option<FlashMessage>,
    pub templates: Vec<TemplateInfo>,
}

#[derive(Template)]
#[template(path = "launch_game.html")]
pub(crate) struct LaunchPage {
    pub flash: Option<FlashMessage>,
    pub project_id: String,
    pub project_name: String,
}

#[derive(Template)]
#[template(path = "edit_project.html")]
pub(crate) struct EditProjectPage {
    pub flash: Option<FlashMessage>,
    pub project_id: String,
    pub project_name: String,
    pub files: Vec<String>,
}

#[derive(Template)]
#[template(path = "visual_editor.html")]
pub(crate) struct VisualEditorPage {
    pub flash: Option<FlashMessage>,
    pub project_id: String,
    pub project_name: String,
    pub editor_title: &'static str,
    pub editor_kind: &'static str,
    /// Pretty-printed data document
    pub data_json: String,
}

/// A `<select>` entry on the reports page
pub(crate) struct FilterOption {
    pub value: String,
    pub selected: bool,
}

impl FilterOption {
    pub fn list(values: Vec<String>, current: Option<&str>) -> Vec<Self> {
        values
            .into_iter()
            .map(|value| {
                let selected = current == Some(value.as_str());
                Self { value, selected }
            })
            .collect()
    }
}

pub(crate) struct ResultRow {
    pub student_name: String,
    pub student_email: String,
    pub project_name: String,
    pub score: String,
    pub time_spent: String,
    pub played_at: String,
}

impl From<GameResult> for ResultRow {
    fn from(result: GameResult) -> Self {
        Self {
            played_at: result.created_at.format("%Y-%m-%d %H:%M").to_string(),
            student_name: result.student_name,
            student_email: result.student_email,
            project_name: result.project_name,
            score: result.score,
            time_spent: result.time_spent,
        }
    }
}

#[derive(Template)]
#[template(path = "reports.html")]
pub(crate) struct ReportsPage {
    pub flash: Option<FlashMessage>,
    pub rows: Vec<ResultRow>,
    pub total: i64,
    pub page: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub students: Vec<FilterOption>,
    pub projects: Vec<FilterOption>,
    pub emails: Vec<FilterOption>,
}

impl ReportsPage {
    /// Page with no results, used when the results log is unavailable
    pub fn empty(flash: Option<FlashMessage>) -> Self {
        Self {
            flash,
            rows: Vec::new(),
            total: 0,
            page: 1,
            total_pages: 0,
            prev_url: None,
            next_url: None,
            students: Vec::new(),
            projects: Vec::new(),
            emails: Vec::new(),
        }
    }

    pub fn build(
        flash: Option<FlashMessage>,
        page: ResultPage,
        filter: &ResultFilter,
        distinct: [Vec<String>; 3],
    ) -> Self {
        let [students, projects, emails] = distinct;
        let prev_url = page.has_prev().then(|| page_url(filter, page.page - 1));
        let next_url = page.has_next().then(|| page_url(filter, page.page + 1));
        Self {
            flash,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages(),
            prev_url,
            next_url,
            rows: page.items.into_iter().map(ResultRow::from).collect(),
            students: FilterOption::list(students, filter.student_name.as_deref()),
            projects: FilterOption::list(projects, filter.project_name.as_deref()),
            emails: FilterOption::list(emails, filter.student_email.as_deref()),
        }
    }
}

/// Reports URL for `page` keeping the active filters
fn page_url(filter: &ResultFilter, page: u32) -> String {
    let mut url = format!("/reports?page={}", page);
    for (key, value) in [
        ("student_name", &filter.student_name),
        ("project_name", &filter.project_name),
        ("student_email", &filter.student_email),
    ] {
        if let Some(value) = value {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
    }
    url
}
