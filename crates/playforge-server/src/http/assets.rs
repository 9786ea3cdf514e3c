use axum::body::Body;
use axum::extract::{Path, RawQuery, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use playforge_core::Error;
use playforge_core::projects::ENTRY_FILE;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::{blocking, encode_segment};
use super::error::ApiError;
use super::flash::{self, FlashMessage};
use crate::AppState;

fn missing_project(project: &str) -> Response {
    flash::redirect_with(
        "/dashboard",
        FlashMessage::error(format!("Project \"{}\" not found.", project)),
    )
}

/// Redirect to the entry file so relative asset paths resolve, keeping the query
pub(super) async fn play(Path(project): Path<String>, RawQuery(query): RawQuery) -> Redirect {
    let mut target = format!("/preview/{}/{}", encode_segment(&project), ENTRY_FILE);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(&query);
    }
    Redirect::to(&target)
}

pub(super) async fn preview_file(
    State(state): State<AppState>,
    Path((project, path)): Path<(String, String)>,
    request: Request,
) -> Result<Response, ApiError> {
    let projects = state.projects.clone();
    let id = project.clone();
    let file = match blocking(move || projects.asset_path(&id, &path)).await {
        Ok(file) => file,
        Err(Error::ProjectNotFound(_)) => return Ok(missing_project(&project)),
        Err(e) => return Err(e.into()),
    };

    match ServeFile::new(file).oneshot(request).await {
        Ok(response) => Ok(response.map(Body::new)),
        Err(never) => match never {},
    }
}

pub(super) async fn export_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Response, ApiError> {
    let projects = state.projects.clone();
    let id = project.clone();
    let archive = match blocking(move || projects.export(&id)).await {
        Ok(archive) => archive,
        Err(Error::ProjectNotFound(_)) => return Ok(missing_project(&project)),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(project = %project, bytes = archive.len(), "Project exported");
    let file_name = format!("{}.zip", project);
    let ascii_name: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_name,
        urlencoding::encode(&file_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}
