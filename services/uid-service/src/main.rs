//! uid-service
//!
//! Issues, registers and deactivates tenant-scoped Surrogate identifiers
//! over a REST API.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uid_service::{
    api, config,
    generator::RandomGenerator,
    state::{AppState, Settings},
    store::{Database, MemoryStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    // Prefer RUST_LOG, fall back to UID_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting uid-service");
    info!(listen_addr = %config.listen_addr, dev_mode = config.dev_mode, "Configuration loaded");

    let store: Arc<dyn Store> = match &config.database {
        Some(db_config) => {
            let db = match Database::connect(db_config).await {
                Ok(db) => {
                    info!("Database connection established");
                    db
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return Err(e.into());
                }
            };

            if config.dev_mode {
                info!("Running database migrations (dev mode)");
                if let Err(e) = db.run_migrations().await {
                    error!(error = %e, "Failed to run migrations");
                    return Err(e.into());
                }
            }
            Arc::new(db)
        }
        None => {
            warn!("DATABASE_URL not set in dev mode; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let templates = match &config.template_path {
        Some(path) => {
            let configuration = uid_template::parse_file(path).map_err(|e| {
                error!(error = %e, path = %path.display(), "Failed to load request templates");
                e
            })?;
            info!(
                path = %path.display(),
                environments = configuration.environments.len(),
                "Request templates loaded"
            );
            Some(Arc::new(configuration))
        }
        None => None,
    };

    if config.dev_mode {
        warn!("Dev mode: role lists in Bearer tokens are trusted");
    }
    let settings = Settings {
        page_size: config.page_size,
        templates,
        dev_mode: config.dev_mode,
        administrators: config.administrators.clone(),
    };
    let generator = Arc::new(RandomGenerator::new(config.eid_length));
    let state = AppState::with_settings(store, generator, settings);

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("uid-service shutdown complete");
    Ok(())
}
