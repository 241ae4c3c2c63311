use anyhow::Context;
use tracing::{Level, info};

use server::config::AppConfig;
use server::database::init_db;
use server::seed::{ensure_bootstrap_admin, ensure_indexes, seed_role_permissions};
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    info!("Database ready");

    seed_role_permissions(&db)
        .await
        .context("Failed to seed roles")?;
    ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    ensure_bootstrap_admin(&db, &config.auth)
        .await
        .context("Failed to create bootstrap admin")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = server::build_router(AppState { db, config });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
