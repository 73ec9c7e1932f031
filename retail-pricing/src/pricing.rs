use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use retail_core::DemandForecaster;
use retail_shared::{HistoricalObservation, Horizon, SeriesKey};

use crate::elasticity::{estimate_price_elasticity, ElasticityEstimate};
use crate::models::{PricingRecommendation, PricingRequest};
use crate::rationale::Rationale;

/// Policy constants for the optimizer.
///
/// The constant-elasticity identity `P* = cost · ε / (ε + 1)` is singular at
/// `ε = −1` and unreliable on poorly identified regressions, so it is only
/// applied between the two thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// At or above this elasticity demand is treated as inelastic
    #[serde(default = "default_inelastic_threshold")]
    pub inelastic_threshold: f64,

    /// Below this elasticity the estimate is treated as noise
    #[serde(default = "default_extreme_threshold")]
    pub extreme_threshold: f64,

    /// Multiplier on the current price for inelastic demand
    #[serde(default = "default_inelastic_nudge")]
    pub inelastic_nudge: f64,

    /// Markup over the margin floor for extremely elastic demand
    #[serde(default = "default_extreme_markup")]
    pub extreme_markup: f64,

    /// Cost as a share of current price when the request omits it
    #[serde(default = "default_fallback_cost_ratio")]
    pub fallback_cost_ratio: f64,
}

fn default_inelastic_threshold() -> f64 { -0.01 }
fn default_extreme_threshold() -> f64 { -10.0 }
fn default_inelastic_nudge() -> f64 { 1.05 }
fn default_extreme_markup() -> f64 { 1.1 }
fn default_fallback_cost_ratio() -> f64 { 0.6 }

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            inelastic_threshold: default_inelastic_threshold(),
            extreme_threshold: default_extreme_threshold(),
            inelastic_nudge: default_inelastic_nudge(),
            extreme_markup: default_extreme_markup(),
            fallback_cost_ratio: default_fallback_cost_ratio(),
        }
    }
}

/// Which branch of the optimum derivation applies to an elasticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRegime {
    Inelastic,
    ExtremelyElastic,
    ConstantElasticity,
}

/// Where the demand quantity for the profit projection came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DemandSource {
    Forecast(u64),
    HistoricalAverage(f64),
}

impl DemandSource {
    pub fn quantity(&self) -> f64 {
        match self {
            DemandSource::Forecast(q) => *q as f64,
            DemandSource::HistoricalAverage(q) => *q,
        }
    }

    fn sentence(&self) -> String {
        match self {
            DemandSource::Forecast(q) => format!("Demand forecast (Q) used: {} units/period.", q),
            DemandSource::HistoricalAverage(_) => {
                "Forecast unavailable, using historical average demand.".to_string()
            }
        }
    }
}

impl PricingPolicy {
    pub fn classify(&self, elasticity: f64) -> PriceRegime {
        if elasticity >= self.inelastic_threshold {
            PriceRegime::Inelastic
        } else if elasticity < self.extreme_threshold {
            PriceRegime::ExtremelyElastic
        } else {
            PriceRegime::ConstantElasticity
        }
    }

    /// Unconstrained optimum and the sentence explaining it.
    pub fn optimal_price(
        &self,
        request: &PricingRequest,
        cost: f64,
        estimate: &ElasticityEstimate,
    ) -> (f64, String) {
        let e = estimate.coefficient;
        match self.classify(e) {
            PriceRegime::Inelastic => (
                request.current_price * self.inelastic_nudge,
                format!(
                    "Demand is inelastic ({:.2}), suggesting price is too low, or elasticity model failed.",
                    e
                ),
            ),
            PriceRegime::ExtremelyElastic => (
                request.margin_floor(cost) * self.extreme_markup,
                format!(
                    "Demand is extremely elastic ({:.2}), suggesting a small price increase above cost for profit.",
                    e
                ),
            ),
            PriceRegime::ConstantElasticity => (
                cost * (e / (e + 1.0)),
                format!(
                    "Optimal price derived from constant elasticity formula. Elasticity (ε) is {:.2} (R-squared: {:.2}).",
                    e, estimate.fit_quality
                ),
            ),
        }
    }

    /// Margin floor first, then competitor ceiling.
    ///
    /// A ceiling below the floor wins and yields a below-floor price.
    pub fn apply_constraints(
        &self,
        request: &PricingRequest,
        cost: f64,
        p_star: f64,
        rationale: &mut Rationale,
    ) -> f64 {
        let mut final_price = p_star;

        let min_price = request.margin_floor(cost);
        if final_price < min_price || final_price.is_nan() {
            final_price = min_price;
            rationale.push_adjustment(format!(
                "Final price clamped to meet minimum {:.0}% margin constraint.",
                request.min_margin_percent * 100.0
            ));
        }

        if let Some(bound) = request.competitor_price_bound {
            if final_price > bound {
                final_price = bound;
                rationale.push_adjustment("Final price capped by the competitor price bound.");
            }
        }

        final_price
    }

    /// Profit at `final_price` on a constant-elasticity demand curve through
    /// the forecast quantity at the current price. Never negative.
    pub fn project_profit(
        &self,
        request: &PricingRequest,
        cost: f64,
        final_price: f64,
        elasticity: f64,
        q_forecast: f64,
    ) -> f64 {
        let q_new = q_forecast * (final_price / request.current_price).powf(elasticity);
        let q_new = if q_new.is_finite() {
            q_new
        } else {
            tracing::debug!("Demand projection degenerate, keeping forecast quantity");
            q_forecast
        };

        let profit = (final_price - cost) * q_new;
        if profit.is_nan() {
            0.0
        } else {
            profit.max(0.0)
        }
    }

    /// Pure pricing decision given an elasticity and a demand quantity.
    pub fn recommend(
        &self,
        request: &PricingRequest,
        estimate: &ElasticityEstimate,
        demand: DemandSource,
    ) -> PricingRecommendation {
        let cost = request.effective_cost(self.fallback_cost_ratio);

        let (p_star, core) = self.optimal_price(request, cost, estimate);
        let mut rationale = Rationale::new(core);

        let final_price = self.apply_constraints(request, cost, p_star, &mut rationale);
        rationale.set_demand_source(demand.sentence());

        let profit = self.project_profit(
            request,
            cost,
            final_price,
            estimate.coefficient,
            demand.quantity(),
        );

        tracing::debug!(
            product_id = %request.product_id,
            p_star,
            final_price,
            profit,
            "Price recommendation computed"
        );

        // Cent rounding must not push the price over the competitor bound
        let mut recommended_price = round_cents(final_price);
        if let Some(bound) = request.competitor_price_bound {
            recommended_price = recommended_price.min(bound);
        }

        PricingRecommendation {
            product_id: request.product_id.clone(),
            elasticity_coefficient: estimate.coefficient,
            recommended_price,
            max_profit_estimate: round_cents(profit),
            rationale: rationale.render(recommended_price),
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Recommends prices from sales history and a demand forecast.
pub struct PriceOptimizer {
    policy: PricingPolicy,
    forecaster: Arc<dyn DemandForecaster>,
    forecast_timeout: Duration,
}

impl PriceOptimizer {
    pub fn new(
        policy: PricingPolicy,
        forecaster: Arc<dyn DemandForecaster>,
        forecast_timeout: Duration,
    ) -> Self {
        Self {
            policy,
            forecaster,
            forecast_timeout,
        }
    }

    /// Recommend a price for `request`.
    ///
    /// `observations` must be the history of the request's series. Never
    /// fails: missing data, unsolvable regressions and missing forecasts all
    /// degrade to documented fallbacks recorded in the rationale.
    pub async fn recommend_price(
        &self,
        request: &PricingRequest,
        observations: &[HistoricalObservation],
    ) -> PricingRecommendation {
        if observations.is_empty() {
            tracing::info!(
                "No sales history for {}, keeping current price",
                request.key()
            );
            return PricingRecommendation::insufficient_data(request);
        }

        let estimate = estimate_price_elasticity(observations);
        let demand = self.forecast_demand(&request.key(), observations).await;

        self.policy.recommend(request, &estimate, demand)
    }

    /// Next-period demand from the forecaster, or the historical mean.
    async fn forecast_demand(
        &self,
        key: &SeriesKey,
        observations: &[HistoricalObservation],
    ) -> DemandSource {
        let call = self.forecaster.forecast(key, observations, Horizon::one_week());
        match tokio::time::timeout(self.forecast_timeout, call).await {
            Ok(Ok(points)) => {
                if let Some(first) = points.first() {
                    return DemandSource::Forecast(first.demand);
                }
                tracing::info!("Forecast for {} is empty", key);
            }
            Ok(Err(e)) => tracing::warn!("Forecast for {} failed: {}", key, e),
            Err(_) => tracing::warn!(
                "Forecast for {} timed out after {:?}",
                key,
                self.forecast_timeout
            ),
        }

        let mean = observations.iter().map(|o| o.units_sold).sum::<f64>() / observations.len() as f64;
        DemandSource::HistoricalAverage(mean)
    }
}
