//! # tendrild: tendril daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Select the storage backend (`SQLite` or in-memory) and run migrations
//! - Register device drivers
//! - Install the feature modules, assemble the API and build the axum router
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tendril_adapter_http_axum::router;
use tendril_adapter_http_axum::state::AppState;
use tendril_adapter_storage_sqlite_sqlx::Config as SqliteConfig;
use tendril_adapter_virtual::{MemoryDatabase, MemorySettingsStore, VirtualDriver};
use tendril_app::deps::Dependencies;
use tendril_app::features;
use tendril_app::ports::{Database, DriverRegistry, SettingsStore};
use tendril_app::registry::Registry;

use crate::config::{Backend, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.logging.filter).context("parsing log filter")?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (database, settings) = storage(&config).await?;

    let drivers = config
        .drivers
        .virtual_kinds
        .iter()
        .fold(DriverRegistry::new(), |registry, kind| {
            registry.with(Arc::new(VirtualDriver::with_kind(kind.as_str())))
        });

    let deps = Dependencies::new(database, drivers, settings);
    let mut registry = Registry::new(
        config.api.title.as_str(),
        config.api.version.as_str(),
        Arc::clone(&deps.events),
    );
    features::install(&mut registry, &deps, config.triggers.scope)
        .context("installing features")?;
    let api = registry.finish();

    let app = router::build(AppState::new(api));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "tendrild listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("tendrild stopped");
    Ok(())
}

async fn storage(config: &Config) -> anyhow::Result<(Arc<dyn Database>, Arc<dyn SettingsStore>)> {
    match config.storage.backend {
        Backend::Sqlite => {
            let db = SqliteConfig {
                database_url: config.storage.url.clone(),
            }
            .build()
            .await
            .context("opening sqlite database")?;
            let settings: Arc<dyn SettingsStore> = Arc::new(db.settings());
            let database: Arc<dyn Database> = Arc::new(db);
            Ok((database, settings))
        }
        Backend::Memory => {
            tracing::warn!("in-memory storage: records are lost on exit");
            let database: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
            let settings: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
            Ok((database, settings))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
