//! HTTP surface
//!
//! - `pages`: HTML pages, failures become a flash message and a redirect
//! - `api`: JSON endpoints, failures become `{status: "error", ...}` with a mapped status
//! - `assets`: project preview, play redirects and zip export

mod api;
mod assets;
pub mod error;
pub mod flash;
mod pages;

use axum::Router;
use axum::routing::{get, post};
use playforge_core::Error;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/healthz", get(api::healthz))
        .route("/dashboard", get(pages::dashboard))
        .route(
            "/create_project",
            get(pages::create_project).post(api::create_project),
        )
        .route("/launch/:project", get(pages::launch_game))
        .route("/play/:project", get(assets::play))
        .route("/preview/:project", get(assets::play))
        .route("/preview/:project/*path", get(assets::preview_file))
        .route("/edit_project/:project", get(pages::edit_project))
        .route("/visual_edit/:project", get(pages::visual_edit))
        .route(
            "/api/project/:project/file/*path",
            get(api::read_file).post(api::write_file),
        )
        .route("/api/project/:project/visual_data", post(api::save_visual_data))
        .route("/api/submit_result/:project", post(api::submit_result))
        .route("/delete_project/:project", post(api::delete_project))
        .route("/duplicate_project/:project", post(api::duplicate_project))
        .route("/export_project/:project", get(assets::export_project))
        .route("/reports", get(pages::reports))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Path segment for `id`, safe to embed in a `Location` header
pub(crate) fn encode_segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Run blocking filesystem work on the blocking pool instead of an async worker
pub(crate) async fn blocking<T, F>(work: F) -> playforge_core::Result<T>
where
    F: FnOnce() -> playforge_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Other(format!("Task join error: {}", e)))?
}
