use std::path::PathBuf;
use std::sync::Arc;

use retail_core::DemandForecaster;
use retail_pricing::PriceOptimizer;
use retail_store::DatasetHandle;

#[derive(Clone)]
pub struct AppState {
    pub dataset: DatasetHandle,
    /// Source of the dataset, re-read on reload
    pub dataset_path: PathBuf,
    pub optimizer: Arc<PriceOptimizer>,
    pub forecaster: Arc<dyn DemandForecaster>,
}
