//! Linear-trend demand forecaster.
//!
//! Aggregates a series' units sold per date, fits `units = a + b·t` on the
//! period index and projects forward at the series' own cadence. Intervals
//! are regression prediction intervals at the configured coverage. There is
//! no seasonal component.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;

use retail_core::regression::fit_ols;
use retail_core::{DemandForecaster, ForecastError};
use retail_shared::{ForecastPoint, HistoricalObservation, Horizon, SeriesKey};

#[derive(Debug, Clone)]
pub struct TrendForecaster {
    z: f64,
}

/// Fitted level and slope with what is needed for prediction intervals.
struct TrendModel {
    intercept: f64,
    slope: f64,
    residual_se: f64,
    n: f64,
    t_mean: f64,
    t_sxx: f64,
}

impl TrendModel {
    fn flat(level: f64) -> Self {
        Self {
            intercept: level,
            slope: 0.0,
            residual_se: 0.0,
            n: 1.0,
            t_mean: 0.0,
            t_sxx: 0.0,
        }
    }

    fn fit(t: &[f64], y: &[f64]) -> Self {
        let n = y.len();
        let mean = y.iter().sum::<f64>() / n as f64;
        if n < 3 {
            return Self::flat(mean);
        }

        let x = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { t[r] });
        let fit = match fit_ols(&x, &DVector::from_column_slice(y)) {
            Some(fit) => fit,
            None => return Self::flat(mean),
        };

        let t_mean = t.iter().sum::<f64>() / n as f64;
        Self {
            intercept: fit.coefficients[0],
            slope: fit.coefficients[1],
            residual_se: fit.residual_std_error,
            n: n as f64,
            t_mean,
            t_sxx: t.iter().map(|v| (v - t_mean) * (v - t_mean)).sum(),
        }
    }

    fn predict(&self, t: f64) -> f64 {
        self.intercept + self.slope * t
    }

    /// Standard error of a new observation at `t`.
    fn prediction_se(&self, t: f64) -> f64 {
        if self.residual_se == 0.0 {
            return 0.0;
        }
        let leverage = if self.t_sxx > 0.0 {
            1.0 / self.n + (t - self.t_mean).powi(2) / self.t_sxx
        } else {
            1.0 / self.n
        };
        self.residual_se * (1.0 + leverage).sqrt()
    }
}

impl TrendForecaster {
    /// `interval_width` is the two-sided coverage, e.g. 0.90.
    pub fn new(interval_width: f64) -> Result<Self, ForecastError> {
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(ForecastError::ModelFailed(format!(
                "interval_width must be between 0 and 1, got {interval_width}"
            )));
        }
        let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::ModelFailed(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + interval_width / 2.0);
        Ok(Self { z })
    }
}

/// Median spacing between consecutive dates, at least one day.
fn cadence_days(dates: &[NaiveDate]) -> i64 {
    let mut gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
    if gaps.is_empty() {
        return 1;
    }
    gaps.sort_unstable();
    gaps[gaps.len() / 2].max(1)
}

fn to_units(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

#[async_trait]
impl DemandForecaster for TrendForecaster {
    async fn forecast(
        &self,
        key: &SeriesKey,
        history: &[HistoricalObservation],
        horizon: Horizon,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let mut per_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for obs in history {
            *per_date.entry(obs.date).or_default() += obs.units_sold;
        }
        let Some((&first, _)) = per_date.iter().next() else {
            tracing::debug!("No history to forecast {}", key);
            return Ok(Vec::new());
        };

        let dates: Vec<NaiveDate> = per_date.keys().copied().collect();
        let step = cadence_days(&dates);
        let t: Vec<f64> = dates
            .iter()
            .map(|d| (*d - first).num_days() as f64 / step as f64)
            .collect();
        let y: Vec<f64> = per_date.values().copied().collect();

        let model = TrendModel::fit(&t, &y);
        let last_date = dates[dates.len() - 1];
        let last_t = t[t.len() - 1];
        let periods = (i64::from(horizon.as_days()) / step).max(1);

        // Stops early at the end of the calendar
        let points = (1..=periods)
            .map_while(|k| {
                let date = TimeDelta::try_days(step * k)
                    .and_then(|offset| last_date.checked_add_signed(offset))?;
                let t_k = last_t + k as f64;
                let yhat = model.predict(t_k);
                let half_width = self.z * model.prediction_se(t_k);
                Some(ForecastPoint {
                    date,
                    demand: to_units(yhat),
                    confidence_low: to_units(yhat - half_width),
                    confidence_high: to_units(yhat + half_width),
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Forecast {} over {}: {} periods of {} days",
            key,
            horizon,
            points.len(),
            step
        );
        Ok(points)
    }
}
