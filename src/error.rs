use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised inside the generation pipeline.
///
/// None of these reach a caller of `Curator::generate`; they exist so the
/// fallible inner steps can use `?` and so the failure is logged with a
/// meaningful message before it is collapsed into an empty result.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

impl IntoResponse for SchemaError {
    fn into_response(self) -> Response {
        let status = match &self {
            SchemaError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
