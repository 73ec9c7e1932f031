use axum::{extract::State, routing::post, Json, Router};

use retail_pricing::{PricingRecommendation, PricingRequest};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/pricing/recommend", post(recommend_pricing))
}

/// POST /pricing/recommend
/// Estimate elasticity and recommend a profit-maximizing price subject to
/// margin and competitor constraints.
pub async fn recommend_pricing(
    State(state): State<AppState>,
    Json(req): Json<PricingRequest>,
) -> Result<Json<PricingRecommendation>, AppError> {
    req.validate()?;

    let dataset = state.dataset.snapshot().await;
    let history = dataset.series(&req.key());
    tracing::debug!("Pricing {} on {} historical rows", req.key(), history.len());

    // Elasticity and forecast both read this snapshot
    let recommendation = state.optimizer.recommend_price(&req, history).await;
    Ok(Json(recommendation))
}
