use axum::extract::{Path, Query, State};
use axum::response::{Redirect, Response};
use playforge_core::Error;
use playforge_core::manifest;
use playforge_core::projects::{EditorUnavailable, VisualEditor};
use playforge_core::results::ResultFilter;
use serde::Deserialize;

use super::{blocking, encode_segment};
use super::error::ApiError;
use super::flash::{self, Flash, FlashMessage};
use crate::AppState;
use crate::views::{
    self, CreateProjectPage, DashboardPage, EditProjectPage, LaunchPage, ReportsPage,
    VisualEditorPage,
};

type PageResult = Result<Response, ApiError>;

pub(super) async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

pub(super) async fn dashboard(State(state): State<AppState>, flash: Flash) -> PageResult {
    let flash = flash.into_inner();
    let shown = flash.is_some();
    let repo = state.projects.clone();
    let projects = blocking(move || repo.list()).await?;
    views::render(&DashboardPage { flash, projects }, shown)
}

pub(super) async fn create_project(State(state): State<AppState>, flash: Flash) -> PageResult {
    let flash = flash.into_inner();
    let shown = flash.is_some();
    let repo = state.projects.clone();
    let templates = blocking(move || repo.templates().list()).await?;
    views::render(&CreateProjectPage { flash, templates }, shown)
}

/// Redirect to the dashboard when a page names an unknown project
fn project_missing(project: &str) -> Response {
    flash::redirect_with(
        "/dashboard",
        FlashMessage::error(format!("Project \"{}\" not found.", project)),
    )
}

/// Folder and display name of an existing project
async fn lookup(state: &AppState, project: &str) -> Result<(String, String), Response> {
    let repo = state.projects.clone();
    let id = project.to_string();
    let found = blocking(move || {
        let dir = repo.project_dir(&id)?;
        Ok((id, manifest::read(&dir).name))
    })
    .await;
    match found {
        Ok(found) => Ok(found),
        Err(e) => {
            tracing::debug!(project, error = %e, "Page requested for unknown project");
            Err(project_missing(project))
        }
    }
}

pub(super) async fn launch_game(
    State(state): State<AppState>,
    Path(project): Path<String>,
    flash: Flash,
) -> PageResult {
    let (project_id, project_name) = match lookup(&state, &project).await {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };
    let flash = flash.into_inner();
    let shown = flash.is_some();
    views::render(
        &LaunchPage {
            flash,
            project_id,
            project_name,
        },
        shown,
    )
}

pub(super) async fn edit_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
    flash: Flash,
) -> PageResult {
    let (project_id, project_name) = match lookup(&state, &project).await {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };
    let repo = state.projects.clone();
    let id = project_id.clone();
    let files = blocking(move || repo.list_editable_files(&id)).await?;
    let flash = flash.into_inner();
    let shown = flash.is_some();
    views::render(
        &EditProjectPage {
            flash,
            project_id,
            project_name,
            files,
        },
        shown,
    )
}

pub(super) async fn visual_edit(
    State(state): State<AppState>,
    Path(project): Path<String>,
    flash: Flash,
) -> PageResult {
    let (project_id, project_name) = match lookup(&state, &project).await {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect),
    };
    let edit_page = format!("/edit_project/{}", encode_segment(&project_id));

    let repo = state.projects.clone();
    let id = project_id.clone();
    let editor = match blocking(move || repo.visual_editor(&id)).await {
        Ok(editor) => editor,
        Err(e) => {
            tracing::warn!(project = %project_id, error = %e, "Could not load project data");
            return Ok(flash::redirect_with(
                "/dashboard",
                FlashMessage::error(format!("Error loading project data: {}", e)),
            ));
        }
    };

    let (kind, data) = match editor {
        VisualEditor::Available { kind, data } => (kind, data),
        VisualEditor::Unavailable(reason) => {
            let message = reason.to_string();
            let flash = match reason {
                EditorUnavailable::UnsupportedTemplate(_) => FlashMessage::warning(message),
                EditorUnavailable::MissingManifest | EditorUnavailable::UnspecifiedTemplate => {
                    FlashMessage::error(message)
                }
            };
            return Ok(flash::redirect_with(&edit_page, flash));
        }
    };

    let data_json = serde_json::to_string_pretty(&data)
        .map_err(|e| Error::Other(format!("Failed to format game data: {}", e)))?;
    let flash = flash.into_inner();
    let shown = flash.is_some();
    views::render(
        &VisualEditorPage {
            flash,
            project_id,
            project_name,
            editor_title: kind.title(),
            editor_kind: kind.template_id(),
            data_json,
        },
        shown,
    )
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ReportsQuery {
    page: Option<String>,
    student_name: Option<String>,
    project_name: Option<String>,
    student_email: Option<String>,
}

pub(super) async fn reports(
    State(state): State<AppState>,
    Query(query): Query<ReportsQuery>,
    flash: Flash,
) -> PageResult {
    let flash = flash.into_inner();
    let shown = flash.is_some();

    // Unparseable page numbers fall back to the first page
    let page = query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(1);
    let filter = ResultFilter::new(query.student_name, query.project_name, query.student_email);

    let loaded = async {
        let results = state
            .results
            .query(&filter, page, state.results_per_page())
            .await?;
        let distinct = [
            state.results.distinct_student_names().await?,
            state.results.distinct_project_names().await?,
            state.results.distinct_emails().await?,
        ];
        Ok::<_, Error>((results, distinct))
    }
    .await;

    let view = match loaded {
        Ok((results, distinct)) => ReportsPage::build(flash, results, &filter, distinct),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load reports");
            ReportsPage::empty(Some(FlashMessage::error(
                "Could not load reports. Check the database connection.",
            )))
        }
    };
    views::render(&view, shown)
}

