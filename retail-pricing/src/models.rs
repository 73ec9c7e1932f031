use retail_core::{CoreError, CoreResult};
use retail_shared::SeriesKey;
use serde::{Deserialize, Serialize};

fn default_min_margin() -> f64 {
    0.10
}

/// Request for a price recommendation on one product/region/channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRequest {
    #[serde(alias = "sku")]
    pub product_id: String,
    pub region: String,
    pub channel: String,
    pub current_price: f64,
    /// Marginal cost; derived from the current price when absent
    #[serde(default)]
    pub cost: Option<f64>,
    /// Minimum gross margin over cost (0.10 = 10%)
    #[serde(default = "default_min_margin")]
    pub min_margin_percent: f64,
    /// Upper price limit from competitor pricing
    #[serde(default)]
    pub competitor_price_bound: Option<f64>,
}

impl PricingRequest {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.product_id, &self.region, &self.channel)
    }

    /// Cost used for optimization: explicit cost, else `ratio × current_price`.
    pub fn effective_cost(&self, fallback_cost_ratio: f64) -> f64 {
        self.cost.unwrap_or(self.current_price * fallback_cost_ratio)
    }

    pub fn margin_floor(&self, cost: f64) -> f64 {
        cost * (1.0 + self.min_margin_percent)
    }

    /// Reject malformed input before it reaches the optimizer.
    pub fn validate(&self) -> CoreResult<()> {
        for (name, value) in [
            ("product_id", &self.product_id),
            ("region", &self.region),
            ("channel", &self.channel),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationError(format!("{name} must not be empty")));
            }
        }

        if !(self.current_price.is_finite() && self.current_price > 0.0) {
            return Err(CoreError::ValidationError(
                "current_price must be a positive number".to_string(),
            ));
        }
        if let Some(cost) = self.cost {
            if !(cost.is_finite() && cost > 0.0) {
                return Err(CoreError::ValidationError("cost must be a positive number".to_string()));
            }
        }
        if !(self.min_margin_percent.is_finite() && self.min_margin_percent >= 0.0) {
            return Err(CoreError::ValidationError(
                "min_margin_percent must be zero or positive".to_string(),
            ));
        }
        if let Some(bound) = self.competitor_price_bound {
            if !(bound.is_finite() && bound > 0.0) {
                return Err(CoreError::ValidationError(
                    "competitor_price_bound must be a positive number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Final pricing decision with its derivation trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecommendation {
    #[serde(rename = "sku", alias = "product_id")]
    pub product_id: String,
    /// Log-log price coefficient used for the decision
    pub elasticity_coefficient: f64,
    pub recommended_price: f64,
    /// Estimated profit per period at the recommended price
    pub max_profit_estimate: f64,
    pub rationale: String,
}

impl PricingRecommendation {
    /// Degenerate answer when no sales history exists for the series.
    pub fn insufficient_data(request: &PricingRequest) -> Self {
        Self {
            product_id: request.product_id.clone(),
            elasticity_coefficient: 0.0,
            recommended_price: request.current_price,
            max_profit_estimate: 0.0,
            rationale: "Insufficient historical sales data to calculate elasticity.".to_string(),
        }
    }
}
