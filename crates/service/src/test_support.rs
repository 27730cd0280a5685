#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::{connect_with_config, resolve_config};

// 迁移在整个测试进程内只执行一次；None 表示数据库不可用
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

/// Fresh connection for the current test, or `None` when `SKIP_DB_TESTS` is set
/// or Postgres is unreachable.
pub async fn get_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let ready = *MIGRATED
        .get_or_init(|| async {
            let cfg = resolve_config();
            match connect_with_config(&cfg).await {
                Ok(db) => migration::Migrator::up(&db, None).await.is_ok(),
                Err(_) => false,
            }
        })
        .await;
    if !ready {
        return None;
    }

    let mut cfg = resolve_config();
    cfg.max_connections = cfg.max_connections.max(5);
    cfg.min_connections = cfg.min_connections.min(1);
    cfg.acquire_timeout_secs = 10;
    connect_with_config(&cfg).await.ok()
}
