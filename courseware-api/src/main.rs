//! # Courseware API Server
//!
//! Resolves the operating mode and configuration, connects storage, and
//! serves the course-management API.
//!
//! ## Usage
//!
//! ```bash
//! APP_ENV=development cargo run -p courseware-api
//! ```

use std::sync::Arc;

use courseware_api::{
    app::{build_router, AppState},
    config::Config,
    routes::RouteGroups,
};
use courseware_shared::db::{migrations::run_migrations, pool::create_pool, users::PgUserStore};
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Mode and .env are resolved before anything reads the environment
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courseware_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Courseware API Server v{} starting in {:?} mode",
        env!("CARGO_PKG_VERSION"),
        config.mode
    );

    let pool = create_pool(config.pool_config()).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let session_store = PostgresStore::new(pool.clone());
    session_store.migrate().await?;

    let deletion_task = tokio::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(600)),
    );

    let bind_addr = config.bind_address();
    let state = AppState::new(Arc::new(PgUserStore::new(pool.clone())), config);
    let app = build_router(state, session_store, RouteGroups::default());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    deletion_task.abort();
    courseware_shared::db::pool::close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
