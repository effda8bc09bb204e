use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::curator::Curator;
use crate::error::{Result, SchemaError};
use crate::models::{GenerateRequest, ResultSet};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Longest query accepted from the page.
pub const MAX_QUERY_CHARS: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub curator: Arc<Curator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/api/generate", post(generate))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn generate(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<ResultSet>> {
    // Unreadable bodies are the caller's fault; report them like a blank query.
    let Json(req) = body.map_err(|e| SchemaError::Validation(e.body_text()))?;
    let query = req.query.trim();
    if query.is_empty() {
        return Err(SchemaError::Validation("query must not be empty".to_string()));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(SchemaError::Validation(format!(
            "query must be at most {MAX_QUERY_CHARS} characters"
        )));
    }

    tracing::info!("Generate request: mode={} query='{}'", req.mode, query);
    let set = state
        .curator
        .generate(req.mode, query, req.filters.as_ref())
        .await;
    Ok(Json(set))
}
