use axum::Json;
use axum::body::Bytes;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use playforge_core::submission::Submission;
use serde::Deserialize;
use serde_json::{Value, json};

use super::blocking;
use super::error::ApiError;
use crate::AppState;

type ApiResult = Result<Json<Value>, ApiError>;

/// Parse a JSON request body, rejecting anything unparseable with 400
fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Missing JSON body"));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Body is not valid JSON: {}", e)))
}

pub(super) async fn healthz(State(state): State<AppState>) -> Response {
    match state.results.database().health_check().await {
        Ok(()) => Json(json!({"status": "ok"})).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "error", "message": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProjectForm {
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    template_type: String,
}

pub(super) async fn create_project(
    State(state): State<AppState>,
    Form(form): Form<CreateProjectForm>,
) -> ApiResult {
    let projects = state.projects.clone();
    let (name, template) = (form.project_name.clone(), form.template_type);
    let project_id = blocking(move || projects.create(&name, &template)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Project \"{}\" created.", form.project_name.trim()),
        "project_id": project_id,
        "redirect_url": "/dashboard",
    })))
}

pub(super) async fn read_file(
    State(state): State<AppState>,
    Path((project, path)): Path<(String, String)>,
) -> ApiResult {
    let projects = state.projects.clone();
    let content = blocking(move || projects.read_file(&project, &path)).await?;
    Ok(Json(json!({ "content": content })))
}

pub(super) async fn write_file(
    State(state): State<AppState>,
    Path((project, path)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult {
    let body = json_body(&body)?;
    let Some(content) = body.get("content").and_then(Value::as_str) else {
        return Err(ApiError::bad_request("Missing content"));
    };
    let content = content.to_string();
    let projects = state.projects.clone();
    let file_name = path.clone();
    blocking(move || projects.write_file(&project, &file_name, &content)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("File \"{}\" saved.", path),
    })))
}

pub(super) async fn save_visual_data(
    State(state): State<AppState>,
    Path(project): Path<String>,
    body: Bytes,
) -> ApiResult {
    let data = json_body(&body)?;
    let projects = state.projects.clone();
    blocking(move || projects.write_data_document(&project, &data)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Game data saved.",
    })))
}

pub(super) async fn submit_result(
    State(state): State<AppState>,
    Path(project): Path<String>,
    body: Bytes,
) -> ApiResult {
    let submission = Submission::from_json(&json_body(&body)?)?;
    let saved = state.submissions.submit(&project, submission).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Email sent.",
        "result_id": saved.map(|r| r.id),
    })))
}

pub(super) async fn delete_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult {
    let projects = state.projects.clone();
    let id = blocking(move || projects.delete(&project)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Project \"{}\" deleted.", id),
    })))
}

pub(super) async fn duplicate_project(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult {
    let projects = state.projects.clone();
    let id = blocking(move || projects.duplicate(&project)).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Project duplicated.",
        "project_id": id,
    })))
}
