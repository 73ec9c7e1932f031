pub mod app_config;
pub mod sales_repo;

pub use app_config::Config;
pub use sales_repo::{DatasetError, DatasetHandle, SalesDataset};
