//! Forecast engine - Short-horizon demand forecasts from a quantity history.
//!
//! Two independent methods are produced side by side so callers can compare them:
//! a trailing moving average and an ordinary-least-squares trend on the point index.
//! Both are pure and deterministic.
//!
//! `forecast_for_product` reads the product's recorded OUT history. Products with no
//! recorded demand fall back to a synthetic Poisson series seeded by the product ID,
//! and the result is tagged so callers can tell the two apart.

#![allow(clippy::cast_precision_loss)]

use crate::{
    core::{history::history_for_product, product::product_exists, training::RegressionModel},
    errors::{Error, Result},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{debug, instrument};

/// Number of trailing points averaged by the moving-average forecast.
pub const MOVING_AVERAGE_WINDOW: usize = 7;

/// Horizon used when none is requested.
pub const DEFAULT_HORIZON: usize = 7;

/// Length of the synthetic fallback series.
pub const SYNTHETIC_HISTORY_LEN: usize = 60;

/// Mean daily demand of the synthetic fallback series.
pub const SYNTHETIC_DEMAND_MEAN: f64 = 5.0;

/// Slope and intercept of `value = intercept + slope * index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    /// Change per step
    pub slope: f64,
    /// Value at index 0
    pub intercept: f64,
}

impl LinearFit {
    /// Value of the fitted line at `index`.
    #[must_use]
    pub fn predict(&self, index: f64) -> f64 {
        self.slope.mul_add(index, self.intercept)
    }
}

/// Where the forecast input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    /// Recorded OUT movements
    Recorded,
    /// Seeded stand-in data, used when nothing has been recorded
    Synthetic,
}

/// Both forecasts for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Product the forecast is for
    pub product_id: i64,
    /// Number of future periods
    pub horizon: usize,
    /// Origin of the input series
    pub source: HistorySource,
    /// Moving-average forecast
    pub moving_average: Vec<f64>,
    /// Linear-regression forecast
    pub linear_regression: Vec<f64>,
}

/// Mean of the last `min(7, n)` points, repeated `horizon` times. Zeros for an
/// empty history.
#[must_use]
pub fn forecast_moving_average(history: &[f64], horizon: usize) -> Vec<f64> {
    if history.is_empty() {
        return vec![0.0; horizon];
    }

    let window = MOVING_AVERAGE_WINDOW.min(history.len());
    let tail = &history[history.len() - window..];
    let mean = tail.iter().sum::<f64>() / window as f64;
    vec![mean; horizon]
}

/// Ordinary least squares of value against index `0..n`.
///
/// Returns `None` for fewer than two points or when the fit is not finite.
#[must_use]
pub fn fit_linear(history: &[f64]) -> Option<LinearFit> {
    if history.len() < 2 {
        return None;
    }

    let n = history.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = history.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (index, value) in history.iter().enumerate() {
        let dx = index as f64 - x_mean;
        sxy += dx * (value - y_mean);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    let intercept = slope.mul_add(-x_mean, y_mean);

    (slope.is_finite() && intercept.is_finite()).then_some(LinearFit { slope, intercept })
}

/// Extrapolates the OLS trend to indices `n..n + horizon`, clamped at zero.
///
/// Falls back to [`forecast_moving_average`] with fewer than two points.
#[must_use]
pub fn forecast_linear_regression(history: &[f64], horizon: usize) -> Vec<f64> {
    let Some(fit) = fit_linear(history) else {
        return forecast_moving_average(history, horizon);
    };

    let start = history.len();
    (start..start + horizon)
        .map(|index| fit.predict(index as f64).max(0.0))
        .collect()
}

/// Forecast from a trained artifact, continuing after the points it was trained on.
#[must_use]
pub fn forecast_with_model(model: &RegressionModel, horizon: usize) -> Vec<f64> {
    let start = model.samples;
    (start..start + horizon)
        .map(|index| model.predict(index).max(0.0))
        .collect()
}

/// Deterministic Poisson(5) demand series seeded by the product ID.
#[must_use]
pub fn synthetic_history(product_id: i64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(u64::from_le_bytes(product_id.to_le_bytes()));
    (0..len)
        .map(|_| sample_poisson(&mut rng, SYNTHETIC_DEMAND_MEAN))
        .collect()
}

// Knuth's multiplication method; fine for small means.
fn sample_poisson<R: Rng>(rng: &mut R, mean: f64) -> f64 {
    let limit = (-mean).exp();
    let mut count = 0.0;
    let mut product: f64 = rng.gen_range(0.0..1.0);
    while product > limit {
        count += 1.0;
        product *= rng.gen_range(0.0..1.0);
    }
    count
}

/// Builds both forecasts from an explicit history.
#[must_use]
pub fn forecast_from_history(
    product_id: i64,
    history: &[f64],
    horizon: usize,
    source: HistorySource,
) -> Forecast {
    Forecast {
        product_id,
        horizon,
        source,
        moving_average: forecast_moving_average(history, horizon),
        linear_regression: forecast_linear_regression(history, horizon),
    }
}

/// Forecasts demand for a product from its recorded OUT movements.
///
/// When the product has no recorded demand yet, the synthetic series is used
/// instead and the forecast is tagged [`HistorySource::Synthetic`].
///
/// # Errors
/// Returns an error if the product does not exist or the history cannot be read.
#[instrument(skip(db))]
pub async fn forecast_for_product(
    db: &DatabaseConnection,
    product_id: i64,
    horizon: usize,
) -> Result<Forecast> {
    if !product_exists(db, product_id).await? {
        return Err(Error::ProductNotFound { id: product_id });
    }

    let recorded = history_for_product(db, product_id).await?;
    if recorded.is_empty() {
        debug!("no recorded demand, using synthetic history");
        let synthetic = synthetic_history(product_id, SYNTHETIC_HISTORY_LEN);
        return Ok(forecast_from_history(
            product_id,
            &synthetic,
            horizon,
            HistorySource::Synthetic,
        ));
    }

    Ok(forecast_from_history(
        product_id,
        &recorded,
        horizon,
        HistorySource::Recorded,
    ))
}
