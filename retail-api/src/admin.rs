use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/dataset/reload", post(reload_dataset))
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Assistant is operational.",
    }))
}

/// POST /dataset/reload
/// Re-read the sales history from the configured path. On failure the
/// previous dataset keeps serving.
pub async fn reload_dataset(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let dataset = state
        .dataset
        .reload(state.dataset_path.clone())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "rows": dataset.len(),
        "skipped": dataset.skipped(),
    })))
}
