//! Training scheduler - Runs model training periodically and on request.
//!
//! A single background task owns training. It wakes up on a fixed tick and trains
//! when the last recorded run is older than the configured interval, which keeps
//! the daily cadence across restarts. Callers can also queue a run through a
//! [`TrainingHandle`]. At most one request is buffered; further requests while one
//! is pending collapse into it. Failed runs are logged and the loop keeps going.

use crate::core::{
    model_store::ModelStore,
    training::{self, ScheduleError, TrainingQueue},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Longest time between two checks of whether a run is due.
const MAX_CHECK_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Sends training requests to a running scheduler.
#[derive(Debug, Clone)]
pub struct TrainingHandle {
    requests: mpsc::Sender<()>,
}

impl TrainingQueue for TrainingHandle {
    fn enqueue(&self) -> Result<(), ScheduleError> {
        match self.requests.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Closed(())) => Err(ScheduleError::Stopped),
        }
    }
}

/// Starts the scheduler task.
///
/// The task stops once every [`TrainingHandle`] has been dropped.
#[must_use]
pub fn spawn_scheduler(
    db: Arc<DatabaseConnection>,
    store: ModelStore,
    interval: Duration,
) -> (TrainingHandle, JoinHandle<()>) {
    let (requests, receiver) = mpsc::channel(1);
    let task = tokio::spawn(run_scheduler(db, store, interval, receiver));
    (TrainingHandle { requests }, task)
}

async fn run_scheduler(
    db: Arc<DatabaseConnection>,
    store: ModelStore,
    interval: Duration,
    mut requests: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval.min(MAX_CHECK_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "training scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match training::is_training_due(&db, interval).await {
                    Ok(true) => run_training(&db, &store, "scheduled").await,
                    Ok(false) => debug!("training not due yet"),
                    Err(e) => error!(error = %e, "could not check training schedule"),
                }
            }
            request = requests.recv() => {
                if request.is_none() {
                    info!("all training handles dropped, scheduler stopping");
                    break;
                }
                run_training(&db, &store, "requested").await;
            }
        }
    }
}

async fn run_training(db: &DatabaseConnection, store: &ModelStore, trigger: &str) {
    match training::train_all(db, store).await {
        Ok(saved) => info!(trigger, models = saved.len(), "training finished"),
        Err(e) => error!(trigger, error = %e, "training failed"),
    }
}
