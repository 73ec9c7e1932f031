use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use retail_api::{app, AppState};
use retail_forecast::TrendForecaster;
use retail_pricing::PriceOptimizer;
use retail_store::{DatasetHandle, SalesDataset};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retail_api=debug,retail_pricing=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = retail_store::Config::load().context("Failed to load config")?;
    tracing::info!("Starting pricing API on port {}", config.server.port);

    // Without history every request takes the no-data path
    let dataset = match SalesDataset::from_csv_path(&config.dataset.path) {
        Ok(dataset) => {
            tracing::info!(
                "Loaded {} sales rows from {} ({} skipped)",
                dataset.len(),
                config.dataset.path.display(),
                dataset.skipped()
            );
            dataset
        }
        Err(e) => {
            tracing::warn!("Starting with an empty dataset: {}", e);
            SalesDataset::default()
        }
    };
    let dataset = DatasetHandle::new(dataset);

    let forecaster = Arc::new(
        TrendForecaster::new(config.forecast.interval_width)
            .context("Invalid forecast configuration")?,
    );
    let optimizer = Arc::new(PriceOptimizer::new(
        config.pricing.clone(),
        forecaster.clone(),
        config.forecast.timeout(),
    ));

    let app_state = AppState {
        dataset,
        dataset_path: config.dataset.path.clone(),
        optimizer,
        forecaster,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
