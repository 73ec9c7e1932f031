use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use retail_core::{CoreError, ForecastError};
use retail_shared::HorizonError;
use retail_store::DatasetError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    UpstreamError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UpstreamError(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => Self::ValidationError(msg),
        }
    }
}

impl From<HorizonError> for AppError {
    fn from(err: HorizonError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        Self::UpstreamError(err.to_string())
    }
}

impl From<DatasetError> for AppError {
    fn from(err: DatasetError) -> Self {
        Self::InternalServerError(format!("Dataset reload failed: {}", err))
    }
}
