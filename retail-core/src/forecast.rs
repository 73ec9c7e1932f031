use async_trait::async_trait;
use retail_shared::{ForecastPoint, HistoricalObservation, Horizon, SeriesKey};

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Forecast model failed: {0}")]
    ModelFailed(String),
}

/// Demand forecasting collaborator.
///
/// `history` is the caller's view of the series identified by `key`, so a
/// forecast and anything else derived in the same request share one dataset.
/// Implementations return a finite series ordered by increasing date. An
/// empty series is a valid answer meaning "no forecast available". Calling
/// twice with the same inputs must return the same series.
#[async_trait]
pub trait DemandForecaster: Send + Sync {
    async fn forecast(
        &self,
        key: &SeriesKey,
        history: &[HistoricalObservation],
        horizon: Horizon,
    ) -> Result<Vec<ForecastPoint>, ForecastError>;
}
