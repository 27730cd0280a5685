use std::net::SocketAddr;

use axum::Router;
use migration::{Migrator, MigratorTrait};
use tower_http::cors::CorsLayer;
use tracing::info;

use configs::AppConfig;

use crate::{errors::StartupError, routes, state::AppState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

/// Public entry: connect the database, build the app and run the HTTP server.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    common::env::ensure_env(&cfg.storage.documents_dir).await?;
    let addr = bind_addr(&cfg)?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.auto_migrate {
        // 启动时自动执行迁移
        Migrator::up(&db, None).await?;
        info!(event = "migrations_applied");
    }

    let state = AppState::from_config(db, cfg)?;
    let app: Router = routes::build_router(state, build_cors());

    info!(%addr, "starting family finance api");
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| StartupError::Runtime(e.to_string()))?;
    axum::serve(listener, app).await?;
    Ok(())
}
