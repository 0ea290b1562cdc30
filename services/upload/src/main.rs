use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use common::{
    database::init_pool,
    store::{DocumentStore, FirestoreStore, MemoryStore, PgDocumentStore},
};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod scheduler;
mod service;
mod state;
#[cfg(test)]
mod testing;

use crate::{
    config::{AppConfig, StoreBackend},
    scheduler::TaskScheduler,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting upload service");

    let config = AppConfig::from_env()?;
    info!(
        "Using {} store, app id {}, processing delay {:?}",
        config.store.name(),
        config.app_id,
        config.processing_delay
    );

    let store = connect_store(&config.store).await?;

    if store.health_check().await? {
        info!("Document store connection successful");
    } else {
        anyhow::bail!("Failed to connect to document store");
    }

    let scheduler = TaskScheduler::new(config.retry.clone());
    let app_state = AppState::new(store, scheduler.clone(), &config);

    // Start the web server
    let cors = middleware::cors_layer(config.cors_allowed_origin.as_deref())?;
    let app = routes::create_router(app_state, cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Upload service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let cancelled = scheduler.shutdown(config.shutdown_grace).await;
    if cancelled > 0 {
        warn!(
            "{} media records were left in processing; their completion was cancelled",
            cancelled
        );
    }
    if scheduler.failures() > 0 {
        warn!("{} deferred completions failed during this run", scheduler.failures());
    }

    info!("Upload service shut down");
    Ok(())
}

async fn connect_store(backend: &StoreBackend) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match backend {
        StoreBackend::Firestore {
            credentials,
            base_url,
        } => Arc::new(FirestoreStore::with_base_url(credentials, base_url)?),
        StoreBackend::Postgres(db_config) => {
            let pool = init_pool(db_config).await?;
            let store = PgDocumentStore::new(pool);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, records are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(store)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
