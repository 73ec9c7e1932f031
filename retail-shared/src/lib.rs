pub mod models;

pub use models::forecast::{ForecastPoint, Horizon, HorizonError};
pub use models::observation::{HistoricalObservation, SeriesKey};
