use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use retail_shared::{ForecastPoint, Horizon, SeriesKey};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub sku: String,
    pub region: String,
    pub channel: String,
    pub horizon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub sku: String,
    pub region: String,
    pub channel: String,
    pub forecast_series: Vec<ForecastPoint>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/forecast", get(get_forecast))
}

/// GET /forecast
/// Demand forecast series with confidence bounds for one series.
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, AppError> {
    let horizon = match query.horizon.as_deref() {
        Some(raw) => raw.parse::<Horizon>()?,
        None => Horizon::default(),
    };

    let key = SeriesKey::new(&query.sku, &query.region, &query.channel);
    let dataset = state.dataset.snapshot().await;
    let forecast_series = state
        .forecaster
        .forecast(&key, dataset.series(&key), horizon)
        .await?;

    Ok(Json(ForecastResponse {
        sku: query.sku,
        region: query.region,
        channel: query.channel,
        forecast_series,
    }))
}
