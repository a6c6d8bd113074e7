//! Model training - Fits and persists one demand model per product.
//!
//! A training run gathers every product's OUT history, fits an OLS trend on the
//! point index and writes it as `model_product_<id>.json`. Products with fewer than
//! two OUT movements get no model. A product whose artifact cannot be written is
//! logged and skipped without aborting the run. Runs are idempotent: the same
//! products always map to the same artifact paths, which are overwritten.
//!
//! The time of the last completed run is kept in `system_state` so the scheduler
//! can tell whether a run is due.

#![allow(clippy::cast_precision_loss)]

use crate::{
    core::{forecast::fit_linear, history::gather_histories, model_store::ModelStore},
    entities::{SystemState, system_state},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const LAST_TRAINING_RUN_KEY: &str = "last_training_run";

/// Trained linear demand model for one product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    /// Product the model was trained for
    pub product_id: i64,
    /// Change in demand per observation
    pub slope: f64,
    /// Demand at index 0
    pub intercept: f64,
    /// Number of observations used; the next index to predict
    pub samples: usize,
    /// When the model was fitted
    pub trained_at: DateTime<Utc>,
}

impl RegressionModel {
    /// Predicted demand at observation `index`.
    #[must_use]
    pub fn predict(&self, index: usize) -> f64 {
        self.slope.mul_add(index as f64, self.intercept)
    }
}

/// Why a training request could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The background worker is no longer running
    #[error("training scheduler is not running")]
    Stopped,
}

/// Something that can run training in the background.
pub trait TrainingQueue: Send + Sync {
    /// Queues a run. A run that is already pending counts as queued.
    fn enqueue(&self) -> std::result::Result<(), ScheduleError>;
}

/// Result of [`trigger_training`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "saved", rename_all = "snake_case")]
pub enum TrainingOutcome {
    /// Handed to the background scheduler
    Scheduled,
    /// Ran in the calling task; lists the artifacts written
    Completed(Vec<PathBuf>),
}

/// Fits an OLS trend of quantity against index.
///
/// Returns `None` for fewer than two points or a degenerate fit.
#[must_use]
pub fn train_series(product_id: i64, series: &[i64]) -> Option<RegressionModel> {
    let values: Vec<f64> = series.iter().map(|quantity| *quantity as f64).collect();
    let fit = fit_linear(&values)?;

    Some(RegressionModel {
        product_id,
        slope: fit.slope,
        intercept: fit.intercept,
        samples: series.len(),
        trained_at: Utc::now(),
    })
}

/// Trains and persists a model for every product with enough OUT history.
///
/// # Returns
/// Paths of the artifacts written during this run.
///
/// # Errors
/// Returns an error if the movement history cannot be read, the models directory
/// cannot be created, or the run cannot be recorded. Failures to write a single
/// product's artifact are logged and skipped.
#[instrument(skip(db, store), fields(models_dir = %store.dir().display()))]
pub async fn train_all(db: &DatabaseConnection, store: &ModelStore) -> Result<Vec<PathBuf>> {
    store.ensure_dir().await?;
    let histories = gather_histories(db).await?;

    let mut saved = Vec::new();
    for (product_id, series) in &histories {
        let Some(model) = train_series(*product_id, series) else {
            debug!(product_id, points = series.len(), "not enough history, skipping");
            continue;
        };

        match store.save(&model).await {
            Ok(path) => saved.push(path),
            Err(e) => warn!(product_id, error = %e, "failed to persist model, skipping"),
        }
    }

    record_training_run(db, Utc::now()).await?;
    info!(
        products = histories.len(),
        models = saved.len(),
        "training run complete"
    );
    Ok(saved)
}

/// Paths of all persisted models.
pub async fn list_models(store: &ModelStore) -> Result<Vec<PathBuf>> {
    store.list().await
}

/// The persisted model for `product_id`, if one has been trained.
pub async fn load_model(store: &ModelStore, product_id: i64) -> Result<Option<RegressionModel>> {
    store.load(product_id).await
}

/// Runs training asynchronously when asked to and possible, inline otherwise.
///
/// With `run_async` set, the request goes to `queue`. Only when there is no queue or
/// the queue reports it cannot accept work does training run inline; the outcome
/// says which of the two happened. Errors from an inline run propagate.
pub async fn trigger_training(
    db: &DatabaseConnection,
    store: &ModelStore,
    queue: Option<&dyn TrainingQueue>,
    run_async: bool,
) -> Result<TrainingOutcome> {
    if run_async {
        match queue.map(|queue| queue.enqueue()) {
            Some(Ok(())) => return Ok(TrainingOutcome::Scheduled),
            Some(Err(e)) => warn!(error = %e, "could not schedule training, running inline"),
            None => warn!("no training scheduler available, running inline"),
        }
    }

    let saved = train_all(db, store).await?;
    Ok(TrainingOutcome::Completed(saved))
}

/// Time of the last completed training run, if any.
pub async fn last_training_run(db: &DatabaseConnection) -> Result<Option<DateTime<Utc>>> {
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_TRAINING_RUN_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => DateTime::parse_from_rfc3339(&s.value)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| Error::StoredState {
                key: LAST_TRAINING_RUN_KEY.to_string(),
                message: format!("Failed to parse last training run time: {e}"),
            }),
        None => Ok(None),
    }
}

/// True when no run has completed yet or the last one is at least `interval` old.
pub async fn is_training_due(db: &DatabaseConnection, interval: Duration) -> Result<bool> {
    let interval = chrono::Duration::from_std(interval).map_err(|e| Error::Config {
        message: format!("Training interval out of range: {e}"),
    })?;

    Ok(last_training_run(db)
        .await?
        .is_none_or(|last| Utc::now() - last >= interval))
}

async fn record_training_run<C>(db: &C, at: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    let value = at.to_rfc3339();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_TRAINING_RUN_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(LAST_TRAINING_RUN_KEY.to_string()),
            value: Set(value),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }

    Ok(())
}
