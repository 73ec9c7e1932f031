pub mod forecast;
pub mod regression;

pub use forecast::{DemandForecaster, ForecastError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
