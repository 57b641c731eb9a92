pub mod mapping;
pub mod schema;
pub mod sqlite;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_config::DatabaseConfig;
use fleet_domain::{FleetStore, StoreLifecycle};
use fleet_errors::FleetResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error_handling::{RepositoryErrorHelpers, RepositoryOperation};
use crate::repo_context;
pub use sqlite::*;

/// SQLite 连接池管理
///
/// 整个进程共享一个连接池，启动时创建，停止时关闭。
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> FleetResult<Self> {
        debug!("连接数据库: {}", config.url);

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds));

        // 内存数据库每个连接各自独立，只能保留唯一且常驻的连接
        let pool = if is_memory_url(&config.url) {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            pool_options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        info!("数据库连接池已创建: 最大连接数 {}", config.max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> FleetResult<()> {
        schema::run_migrations(&self.pool).await
    }

    pub async fn health_check(&self) -> FleetResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(
                    repo_context!(RepositoryOperation::Query, "数据库连接"),
                    e,
                )
            })?;
        Ok(())
    }

    /// 基于当前连接池组装全部仓储
    pub fn store(&self) -> FleetStore {
        let pool = self.pool.clone();
        FleetStore {
            agents: Arc::new(SqliteAgentRepository::new(pool.clone())),
            loads: Arc::new(SqliteLoadRepository::new(pool.clone())),
            drivers: Arc::new(SqliteDriverRepository::new(pool.clone())),
            trucks: Arc::new(SqliteTruckRepository::new(pool.clone())),
            hos_logs: Arc::new(SqliteHosLogRepository::new(pool.clone())),
            tracking: Arc::new(SqliteTrackingRepository::new(pool.clone())),
            notifications: Arc::new(SqliteNotificationRepository::new(pool.clone())),
            metrics: Arc::new(SqliteMetricRepository::new(pool.clone())),
            compliance: Arc::new(SqliteComplianceRepository::new(pool.clone())),
            conversations: Arc::new(SqliteConversationRepository::new(pool.clone())),
            lifecycle: Arc::new(SqliteStoreLifecycle::new(pool)),
        }
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// 关闭共享连接池
pub struct SqliteStoreLifecycle {
    pool: SqlitePool,
}

impl SqliteStoreLifecycle {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreLifecycle for SqliteStoreLifecycle {
    async fn close(&self) -> FleetResult<()> {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("数据库连接池已关闭");
        }
        Ok(())
    }
}
