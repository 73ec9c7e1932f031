use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use retail_api::{app, AppState};
use retail_forecast::TrendForecaster;
use retail_pricing::{PriceOptimizer, PricingPolicy};
use retail_shared::HistoricalObservation;
use retail_store::{DatasetHandle, SalesDataset};

/// Weekly history with units = 1e6 · price^-2, so the fitted elasticity is -2.
fn history() -> Vec<HistoricalObservation> {
    (0..20)
        .map(|i| {
            let price = 80.0 + 2.0 * i as f64;
            HistoricalObservation {
                product_id: "SKU123".to_string(),
                region: "North".to_string(),
                channel: "online".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap() + Duration::weeks(i),
                price,
                units_sold: 1e6 * price.powf(-2.0),
                promo: Some(i % 4 == 0),
                stock_level: Some(300),
            }
        })
        .collect()
}

fn state_with(dataset: SalesDataset, dataset_path: PathBuf) -> AppState {
    let dataset = DatasetHandle::new(dataset);
    let forecaster = Arc::new(TrendForecaster::new(0.90).unwrap());
    let optimizer = Arc::new(PriceOptimizer::new(
        PricingPolicy::default(),
        forecaster.clone(),
        std::time::Duration::from_secs(2),
    ));
    AppState {
        dataset,
        dataset_path,
        optimizer,
        forecaster,
    }
}

fn test_state() -> AppState {
    state_with(
        SalesDataset::from_observations(history()),
        PathBuf::from("/nonexistent/sales.csv"),
    )
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(test_state(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_recommend_price_from_history() {
    let request = json!({
        "sku": "SKU123",
        "region": "North",
        "channel": "online",
        "current_price": 100.0,
        "cost": 60.0
    });
    let (status, body) = send(test_state(), post_json("/pricing/recommend", request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sku"], "SKU123");
    assert!((body["elasticity_coefficient"].as_f64().unwrap() + 2.0).abs() < 1e-6);
    assert_eq!(body["recommended_price"].as_f64().unwrap(), 120.0);
    assert!(body["max_profit_estimate"].as_f64().unwrap() >= 0.0);

    let rationale = body["rationale"].as_str().unwrap();
    assert!(rationale.starts_with("Recommended Price: 120.00. Optimal price derived"));
    assert!(rationale.contains("Demand forecast (Q) used:"));
}

#[tokio::test]
async fn test_competitor_bound_caps_price() {
    let request = json!({
        "product_id": "SKU123",
        "region": "North",
        "channel": "online",
        "current_price": 100.0,
        "cost": 60.0,
        "competitor_price_bound": 99.99
    });
    let (status, body) = send(test_state(), post_json("/pricing/recommend", request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommended_price"].as_f64().unwrap(), 99.99);
    assert!(body["rationale"]
        .as_str()
        .unwrap()
        .contains("Final price capped by the competitor price bound."));
}

#[tokio::test]
async fn test_unknown_series_keeps_current_price() {
    let request = json!({
        "sku": "SKU404",
        "region": "North",
        "channel": "online",
        "current_price": 42.5
    });
    let (status, body) = send(test_state(), post_json("/pricing/recommend", request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recommended_price"].as_f64().unwrap(), 42.5);
    assert_eq!(body["max_profit_estimate"].as_f64().unwrap(), 0.0);
    assert_eq!(
        body["rationale"],
        "Insufficient historical sales data to calculate elasticity."
    );
}

#[tokio::test]
async fn test_recommendation_is_repeatable() {
    let request = json!({
        "sku": "SKU123",
        "region": "North",
        "channel": "online",
        "current_price": 100.0
    });
    let state = test_state();
    let (_, first) = send(state.clone(), post_json("/pricing/recommend", request.clone())).await;
    let (_, second) = send(state, post_json("/pricing/recommend", request)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
    let request = json!({
        "sku": "SKU123",
        "region": "North",
        "channel": "online",
        "current_price": -1.0
    });
    let (status, body) = send(test_state(), post_json("/pricing/recommend", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("current_price"));
}

#[tokio::test]
async fn test_forecast_endpoint() {
    let (status, body) = send(
        test_state(),
        get("/forecast?sku=SKU123&region=North&channel=online&horizon=4w"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sku"], "SKU123");
    let series = body["forecast_series"].as_array().unwrap();
    assert_eq!(series.len(), 4);
    assert_eq!(series[0]["date"], "2024-05-26");
}

#[tokio::test]
async fn test_forecast_rejects_bad_horizon() {
    let (status, _) = send(
        test_state(),
        get("/forecast?sku=SKU123&region=North&channel=online&horizon=soon"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forecast_rejects_oversized_horizon() {
    for horizon in ["4294967295d", "200w"] {
        let (status, body) = send(
            test_state(),
            get(&format!(
                "/forecast?sku=SKU123&region=North&channel=online&horizon={horizon}"
            )),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("day limit"));
    }
}

#[tokio::test]
async fn test_dataset_reload() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "date,sku,region,channel,price,units_sold,promo,stock_level").unwrap();
    writeln!(file, "2024-01-07,SKU777,West,store,10.0,100,0,50").unwrap();
    writeln!(file, "2024-01-14,SKU777,West,store,12.0,80,1,40").unwrap();
    writeln!(file, "bad-row").unwrap();

    let state = state_with(SalesDataset::default(), file.path().to_path_buf());
    let (status, body) = send(state.clone(), post_json("/dataset/reload", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], 2);
    assert_eq!(body["skipped"], 1);
    assert_eq!(state.dataset.snapshot().await.len(), 2);
}

#[tokio::test]
async fn test_failed_reload_keeps_dataset() {
    let state = test_state();
    let (status, _) = send(state.clone(), post_json("/dataset/reload", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.dataset.snapshot().await.len(), 20);
}
