//! Price elasticity of demand from historical sales.
//!
//! Fits `ln(units) = β0 + β1·ln(price) + β2·promo + β3·stock_level` by OLS and
//! reports `β1` together with the regression R². When the regression cannot
//! be solved the estimator returns a fixed, moderately elastic fallback
//! instead of failing: a recommendation on an assumed elasticity is preferred
//! over no recommendation at all.

use nalgebra::{DMatrix, DVector};
use retail_core::regression::fit_ols;
use retail_shared::HistoricalObservation;
use serde::Serialize;

/// Elasticity assumed when the regression is not solvable.
pub const FALLBACK_ELASTICITY: f64 = -2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElasticityEstimate {
    /// d ln(demand) / d ln(price)
    pub coefficient: f64,
    /// Coefficient of determination, in [0, 1]
    pub fit_quality: f64,
    pub observations: usize,
    pub fallback: bool,
}

impl ElasticityEstimate {
    pub fn fallback() -> Self {
        Self {
            coefficient: FALLBACK_ELASTICITY,
            fit_quality: 0.0,
            observations: 0,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationFailure {
    #[error("need at least 2 distinct prices with positive sales, found {0}")]
    InsufficientPriceVariation(usize),
    #[error("{rows} usable rows cannot identify {columns} coefficients")]
    TooFewObservations { rows: usize, columns: usize },
    #[error("design matrix is singular")]
    SingularDesign,
    #[error("log demand has no variance")]
    DegenerateDemand,
    #[error("regression produced a non-finite estimate")]
    NonFinite,
}

/// Estimate elasticity, degrading to [`ElasticityEstimate::fallback`] on any
/// numerical failure.
pub fn estimate_price_elasticity(observations: &[HistoricalObservation]) -> ElasticityEstimate {
    match try_estimate_price_elasticity(observations) {
        Ok(estimate) => {
            tracing::debug!(
                coefficient = estimate.coefficient,
                r_squared = estimate.fit_quality,
                rows = estimate.observations,
                "Elasticity regression fitted"
            );
            estimate
        }
        Err(failure) => {
            tracing::warn!(
                "Elasticity regression failed ({}), assuming {}",
                failure,
                FALLBACK_ELASTICITY
            );
            ElasticityEstimate::fallback()
        }
    }
}

/// Fit the log-log regression, surfacing why it could not be solved.
pub fn try_estimate_price_elasticity(
    observations: &[HistoricalObservation],
) -> Result<ElasticityEstimate, EstimationFailure> {
    // Only rows where both logarithms exist
    let rows: Vec<&HistoricalObservation> = observations
        .iter()
        .filter(|o| o.price > 0.0 && o.units_sold > 0.0 && o.price.is_finite() && o.units_sold.is_finite())
        .collect();

    let distinct_prices = count_distinct(rows.iter().map(|o| o.price));
    if distinct_prices < 2 {
        return Err(EstimationFailure::InsufficientPriceVariation(distinct_prices));
    }

    // A control with no variation is collinear with the intercept
    let promo: Vec<f64> = rows.iter().map(|o| o.promo_value()).collect();
    let stock: Vec<f64> = rows.iter().map(|o| o.stock_value()).collect();
    let mut columns: Vec<Vec<f64>> = vec![
        vec![1.0; rows.len()],
        rows.iter().map(|o| o.price.ln()).collect(),
    ];
    if varies(&promo) {
        columns.push(promo);
    }
    if varies(&stock) {
        columns.push(stock);
    }

    let n = rows.len();
    let p = columns.len();
    if n < p {
        return Err(EstimationFailure::TooFewObservations { rows: n, columns: p });
    }

    let x = DMatrix::from_fn(n, p, |r, c| columns[c][r]);
    let y = DVector::from_iterator(n, rows.iter().map(|o| o.units_sold.ln()));

    let fit = fit_ols(&x, &y).ok_or(EstimationFailure::SingularDesign)?;
    let r_squared = fit.r_squared.ok_or(EstimationFailure::DegenerateDemand)?;
    let coefficient = fit.coefficient(1).ok_or(EstimationFailure::SingularDesign)?;
    if !coefficient.is_finite() || !r_squared.is_finite() {
        return Err(EstimationFailure::NonFinite);
    }

    Ok(ElasticityEstimate {
        coefficient,
        fit_quality: r_squared,
        observations: n,
        fallback: false,
    })
}

fn count_distinct(values: impl Iterator<Item = f64>) -> usize {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values.len()
}

fn varies(values: &[f64]) -> bool {
    values.windows(2).any(|w| w[0] != w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn obs(week: i64, price: f64, units: f64, promo: Option<bool>, stock: Option<u32>) -> HistoricalObservation {
        HistoricalObservation {
            product_id: "SKU123".to_string(),
            region: "North".to_string(),
            channel: "online".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::weeks(week),
            price,
            units_sold: units,
            promo,
            stock_level: stock,
        }
    }

    #[test]
    fn test_recovers_constant_elasticity() {
        // units = 1e6 · price^-2
        let data: Vec<_> = (0..20)
            .map(|i| {
                let price = 80.0 + 2.0 * i as f64;
                obs(i, price, 1e6 * price.powf(-2.0), None, None)
            })
            .collect();

        let estimate = try_estimate_price_elasticity(&data).unwrap();
        assert!((estimate.coefficient + 2.0).abs() < 1e-9);
        assert!((estimate.fit_quality - 1.0).abs() < 1e-9);
        assert_eq!(estimate.observations, 20);
        assert!(!estimate.fallback);
    }

    #[test]
    fn test_controls_absorb_promo_lift() {
        // Promotion weeks sell e^0.5 more at the same price curve
        let data: Vec<_> = (0..30)
            .map(|i| {
                let price = 90.0 + (i % 10) as f64 * 3.0;
                let promo = i % 3 == 0;
                let lift = if promo { 0.5f64.exp() } else { 1.0 };
                let stock = 100 + (i as u32 * 37) % 400;
                obs(i, price, 5e5 * price.powf(-1.5) * lift, Some(promo), Some(stock))
            })
            .collect();

        let estimate = try_estimate_price_elasticity(&data).unwrap();
        assert!((estimate.coefficient + 1.5).abs() < 1e-6);
        assert!(estimate.fit_quality > 0.999);
    }

    #[test]
    fn test_constant_price_falls_back() {
        let data: Vec<_> = (0..10).map(|i| obs(i, 100.0, 50.0 + i as f64, None, None)).collect();

        assert_eq!(
            try_estimate_price_elasticity(&data),
            Err(EstimationFailure::InsufficientPriceVariation(1))
        );
        let estimate = estimate_price_elasticity(&data);
        assert_eq!(estimate.coefficient, -2.0);
        assert_eq!(estimate.fit_quality, 0.0);
        assert!(estimate.fallback);
    }

    #[test]
    fn test_zero_sales_rows_are_ignored() {
        let data = vec![
            obs(0, 100.0, 0.0, None, None),
            obs(1, 110.0, 0.0, None, None),
            obs(2, 120.0, 40.0, None, None),
        ];
        assert_eq!(
            try_estimate_price_elasticity(&data),
            Err(EstimationFailure::InsufficientPriceVariation(1))
        );
    }

    #[test]
    fn test_flat_demand_falls_back() {
        let data: Vec<_> = (0..10).map(|i| obs(i, 90.0 + i as f64, 60.0, None, None)).collect();
        assert_eq!(
            try_estimate_price_elasticity(&data),
            Err(EstimationFailure::DegenerateDemand)
        );
    }

    #[test]
    fn test_too_few_rows_for_controls() {
        // Two rows, but promo and stock both vary: 4 columns
        let data = vec![
            obs(0, 100.0, 50.0, Some(true), Some(100)),
            obs(1, 110.0, 45.0, Some(false), Some(200)),
        ];
        assert_eq!(
            try_estimate_price_elasticity(&data),
            Err(EstimationFailure::TooFewObservations { rows: 2, columns: 4 })
        );
        assert!(estimate_price_elasticity(&data).fallback);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let data: Vec<_> = (0..15)
            .map(|i| obs(i, 100.0 + ((i * 7) % 11) as f64, 300.0 - 2.0 * i as f64, Some(i % 2 == 0), Some(250)))
            .collect();
        assert_eq!(estimate_price_elasticity(&data), estimate_price_elasticity(&data));
    }
}
