//! Mapping of core errors onto HTTP responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use playforge_core::Error;
use serde_json::json;

/// JSON error returned by the API routes
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(Error::Validation(message.into()))
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

/// HTTP status for a core error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::ProjectNotFound(_)
        | Error::TemplateNotFound(_)
        | Error::FileNotFound(_)
        | Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::PathTraversal(_) => StatusCode::FORBIDDEN,
        Error::NotifierNetwork(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Storage(_)
        | Error::DatabaseError(_)
        | Error::NotifierConfig(_)
        | Error::NotifierRemote(_)
        | Error::ConfigError(_)
        | Error::Template(_)
        | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "Request failed");
        } else {
            tracing::debug!(code = self.0.code(), error = %self.0, "Request rejected");
        }

        let message = self.0.to_string();
        let mut body = json!({
            "status": "error",
            "error": message,
            "message": message,
            "code": self.0.code(),
        });
        if let Some(suggestion) = self.0.suggestion() {
            body["suggestion"] = suggestion.into();
        }
        (status, Json(body)).into_response()
    }
}
