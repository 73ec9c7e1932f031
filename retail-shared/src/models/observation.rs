use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifies one sales time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub product_id: String,
    pub region: String,
    pub channel: String,
}

impl SeriesKey {
    pub fn new(
        product_id: impl Into<String>,
        region: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            region: region.into(),
            channel: channel.into(),
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.product_id, self.region, self.channel)
    }
}

/// One row of historical sales for a product/region/channel/period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalObservation {
    pub product_id: String,
    pub region: String,
    pub channel: String,
    pub date: NaiveDate,
    pub price: f64,
    pub units_sold: f64,
    /// Missing values are treated as "no promotion"
    #[serde(default)]
    pub promo: Option<bool>,
    #[serde(default)]
    pub stock_level: Option<u32>,
}

impl HistoricalObservation {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.product_id, &self.region, &self.channel)
    }

    /// Promotion flag as a regression control (0 or 1).
    pub fn promo_value(&self) -> f64 {
        match self.promo {
            Some(true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn stock_value(&self) -> f64 {
        self.stock_level.map(f64::from).unwrap_or(0.0)
    }
}
