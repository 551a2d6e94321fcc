pub mod transaction;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub use transaction::with_transaction;

/// Handle to the lifecycle store, shared by every service and command.
pub type DbPool = DatabaseConnection;

/// Pool sizing and timeouts resolved from [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let mut settings = Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections.max(1),
            min_connections: cfg.db_min_connections.min(cfg.db_max_connections.max(1)),
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        };

        // Every in-memory SQLite connection opens its own empty database.
        if is_in_memory_sqlite(&settings.url) && settings.max_connections != 1 {
            warn!(
                requested = settings.max_connections,
                "in-memory sqlite store pinned to a single connection"
            );
            settings.max_connections = 1;
            settings.min_connections = 1;
        }

        settings
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(self.connect_timeout)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .sqlx_logging(false);
        opt
    }
}

fn is_in_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite::memory:") || (url.starts_with("sqlite:") && url.contains("mode=memory"))
}

/// Opens the connection pool described by the application config.
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let settings = PoolSettings::from_config(cfg);
    debug!(?settings, "opening lifecycle store");

    gauge!("tender_db.max_connections", settings.max_connections as f64);

    let pool = Database::connect(settings.connect_options())
        .await
        .map_err(ServiceError::DatabaseError)?;

    info!(
        backend = ?pool.get_database_backend(),
        max_connections = settings.max_connections,
        "lifecycle store connected"
    );
    Ok(pool)
}

/// Applies every pending schema migration.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    let pending = crate::migrator::Migrator::get_pending_migrations(pool)
        .await
        .map_err(ServiceError::DatabaseError)?
        .len();

    if pending == 0 {
        debug!("schema up to date");
        return Ok(());
    }

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    match &result {
        Ok(()) => info!(applied = pending, elapsed = ?started.elapsed(), "schema migrated"),
        Err(e) => error!(pending, elapsed = ?started.elapsed(), error = %e, "schema migration failed"),
    }
    result
}

/// Round-trips the store; used by readiness checks.
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    match pool.ping().await {
        Ok(()) => {
            gauge!(
                "tender_db.connection_latency",
                started.elapsed().as_millis() as f64
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "lifecycle store ping failed");
            counter!("tender_db.connection_failures", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("closing lifecycle store");
    pool.close().await.map_err(ServiceError::DatabaseError)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(url: &str, max: u32, min: u32) -> AppConfig {
        let mut cfg = AppConfig::new(
            url.to_string(),
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        );
        cfg.db_max_connections = max;
        cfg.db_min_connections = min;
        cfg
    }

    #[test]
    fn in_memory_sqlite_uses_one_connection() {
        let settings = PoolSettings::from_config(&config_for("sqlite::memory:", 10, 2));
        assert_eq!(settings.max_connections, 1);
        assert_eq!(settings.min_connections, 1);

        let shared = PoolSettings::from_config(&config_for("sqlite:file:lifecycle?mode=memory", 4, 1));
        assert_eq!(shared.max_connections, 1);
    }

    #[test]
    fn file_backed_pool_keeps_configured_size() {
        let settings = PoolSettings::from_config(&config_for("postgres://localhost/tenders", 12, 20));
        assert_eq!(settings.max_connections, 12);
        // Minimum never exceeds the maximum.
        assert_eq!(settings.min_connections, 12);
    }
}
