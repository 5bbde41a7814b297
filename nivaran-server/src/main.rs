use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use nivaran_core::audit::AuditSink;
use nivaran_core::clock::SystemClock;
use nivaran_core::config::EngineConfig;
use nivaran_core::duplicate::DuplicateResolver;
use nivaran_core::engine::ComplaintEngine;
use nivaran_core::intake::IntakeOrchestrator;
use nivaran_core::notify::NotificationDispatcher;
use nivaran_core::scheduler::EscalationScheduler;
use nivaran_core::store::GrievanceStore;
use nivaran_core::store_memory::MemoryStore;

use nivaran_server::adapters::{FsObjectStore, KeywordClassifier, LogMessaging};
use nivaran_server::routes;
use nivaran_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Arc::new(load_config()?);
    let store = build_store().await?;
    let clock = Arc::new(SystemClock);

    let audit = AuditSink::new(store.clone(), clock.clone());
    let notifier = NotificationDispatcher::new(store.clone(), clock.clone(), Some(Arc::new(LogMessaging)));
    let engine = Arc::new(ComplaintEngine::new(
        store.clone(),
        audit,
        notifier,
        clock.clone(),
        config.clone(),
    ));
    let resolver = Arc::new(DuplicateResolver::new(
        store.clone(),
        engine.clone(),
        clock.clone(),
        config.clone(),
    ));
    let objects: Arc<FsObjectStore> = Arc::new(FsObjectStore::new(
        std::env::var("NIVARAN_OBJECT_DIR").unwrap_or_else(|_| "./objects".to_string()),
    ));
    let intake = Arc::new(IntakeOrchestrator::new(
        engine.clone(),
        resolver.clone(),
        Arc::new(KeywordClassifier),
        objects.clone(),
        config.clone(),
    ));
    let scheduler = Arc::new(EscalationScheduler::new(engine.clone())?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(scheduler.clone().run(shutdown_rx));

    let state = AppState {
        engine,
        intake,
        resolver,
        scheduler,
        objects,
        config,
    };

    let addr = std::env::var("NIVARAN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "nivaran listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    Ok(())
}

fn load_config() -> anyhow::Result<EngineConfig> {
    match std::env::var("NIVARAN_CONFIG") {
        Ok(path) => {
            tracing::info!(%path, "loading configuration");
            EngineConfig::from_yaml_file(path)
        }
        Err(_) => Ok(EngineConfig::default()),
    }
}

/// Memory store unless a database URL is configured and the `postgres`
/// feature is compiled in.
async fn build_store() -> anyhow::Result<Arc<dyn GrievanceStore>> {
    let database_url = std::env::var("DATABASE_URL").ok();
    match database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            tracing::info!("connecting to PostgreSQL");
            let pool = sqlx::PgPool::connect(&url).await?;
            let store = nivaran_core::store_postgres::PostgresStore::new(pool);
            store.migrate().await?;
            tracing::info!("using PostgresStore (migrations applied)");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            tracing::warn!(
                "DATABASE_URL set but postgres feature not enabled, using MemoryStore"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
        None => {
            tracing::info!("using MemoryStore (no database URL configured)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
