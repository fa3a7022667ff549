//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use laundry_backend::{
    config::{AppConfig, AppState},
    routes::build_router,
    services::catalog::sync_catalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    // If configuration fails the application must not start
    let config = AppConfig::from_env()?;
    let (app_state, db_pool) = AppState::new(&config).await?;

    sqlx::migrate!().run(&db_pool).await?;
    tracing::info!("Database migrations applied");

    // Catalog rows the system roles and overrides refer to
    sync_catalog(app_state.rbac.as_ref()).await?;

    let app = build_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
