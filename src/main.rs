use inventory_forecast::{
    config::{self, database},
    core::{audit, model_store::ModelStore},
    errors::Result,
    scheduler,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(?app_config, "Configuration loaded");

    // 4. Database connection and schema
    let db = database::init_database()
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Check the audit chain before accepting new entries
    if audit::verify_chain(&db).await? {
        info!("Audit chain verified");
    } else {
        warn!("Audit chain verification failed; the audit log has been altered");
    }

    // 6. Model store and training scheduler
    let store = ModelStore::open(&app_config.training.models_dir)
        .await
        .inspect_err(|e| error!("Failed to open models directory: {}", e))?;
    let db = Arc::new(db);
    let (handle, task) =
        scheduler::spawn_scheduler(Arc::clone(&db), store, app_config.training.interval());

    // 7. Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    drop(handle);
    if let Err(e) = task.await {
        error!("Training scheduler ended abnormally: {}", e);
    }

    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await?,
        Err(_) => warn!("Database connection still shared at shutdown"),
    }
    Ok(())
}
