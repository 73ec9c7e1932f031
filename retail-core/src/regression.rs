//! Ordinary least squares on small dense design matrices.
//!
//! Both the elasticity estimator and the reference forecaster fit regressions
//! with a handful of columns, so an SVD per fit is cheap. Singular or
//! rank-deficient systems are reported as `None` instead of producing a
//! minimum-norm solution, because callers treat them as "not estimable".

use nalgebra::{DMatrix, DVector};

/// Relative tolerance applied to the largest singular value.
const RANK_TOLERANCE: f64 = 1e-10;

/// Result of an OLS fit.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: DVector<f64>,
    /// `None` when the dependent variable has no variance
    pub r_squared: Option<f64>,
    pub residual_std_error: f64,
    pub observations: usize,
}

impl OlsFit {
    pub fn coefficient(&self, idx: usize) -> Option<f64> {
        self.coefficients.get(idx).copied()
    }
}

/// Solve `min ||x·β − y||²` via SVD.
///
/// Returns `None` when the system has fewer rows than columns, the design
/// matrix is rank-deficient, or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.ncols() == 0 || x.nrows() < x.ncols() {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !(max_sv > 0.0) {
        return None;
    }

    let eps = max_sv * RANK_TOLERANCE;
    if svd.rank(eps) < x.ncols() {
        return None;
    }

    let beta = svd.solve(y, eps).ok()?;
    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}

/// Fit OLS and compute goodness-of-fit statistics.
pub fn fit_ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsFit> {
    let beta = solve_least_squares(x, y)?;

    let n = y.len();
    let fitted = x * &beta;
    let ssr: f64 = (y - fitted).iter().map(|r| r * r).sum();
    let mean = y.mean();
    let sst: f64 = y.iter().map(|v| (v - mean) * (v - mean)).sum();

    let r_squared = if sst > f64::EPSILON * n as f64 {
        Some((1.0 - ssr / sst).clamp(0.0, 1.0))
    } else {
        None
    };

    let dof = n.saturating_sub(x.ncols());
    let residual_std_error = if dof > 0 { (ssr / dof as f64).sqrt() } else { 0.0 };

    Some(OlsFit {
        coefficients: beta,
        r_squared,
        residual_std_error,
        observations: n,
    })
}
