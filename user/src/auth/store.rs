//! SQLx session store and session cookie configuration

use std::env;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{debug, error, info};

use crate::error::{Result, UserError};

/// SQLx-based session store for tower-sessions
#[derive(Debug, Clone)]
pub struct SqlxSessionStore {
    store: SqliteStore,
    pool: SqlitePool,
}

impl SqlxSessionStore {
    /// Create the store and its `tower_sessions` table
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let store = SqliteStore::new(pool.clone());
        store.migrate().await.map_err(|e| {
            error!("Failed to create session table: {}", e);
            UserError::Database(e)
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_tower_sessions_expiry ON tower_sessions(expiry_date)",
        )
        .execute(&pool)
        .await?;

        info!("SQLx session store initialized");
        Ok(Self { store, pool })
    }

    /// Get the underlying SqliteStore
    pub fn inner(&self) -> &SqliteStore {
        &self.store
    }

    /// Session middleware layer backed by this store
    pub fn layer(&self, config: &SessionConfig) -> SessionManagerLayer<SqliteStore> {
        SessionManagerLayer::new(self.store.clone())
            .with_name(config.cookie_name.clone())
            .with_path("/")
            .with_secure(config.secure)
            .with_http_only(config.http_only)
            .with_same_site(config.same_site.into())
            .with_expiry(Expiry::OnInactivity(Duration::seconds(
                config.timeout_seconds,
            )))
    }

    /// Delete expired sessions, returning how many were removed
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("DELETE FROM tower_sessions WHERE expiry_date < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to cleanup expired sessions: {}", e);
                UserError::Session(format!("Session cleanup failed: {}", e))
            })?;

        debug!("Removed {} expired sessions", result.rows_affected());
        Ok(result.rows_affected())
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session cookie name
    pub cookie_name: String,
    /// Session timeout in seconds
    pub timeout_seconds: i64,
    /// Whether to use secure cookies (HTTPS only)
    pub secure: bool,
    /// SameSite cookie attribute
    pub same_site: SameSiteConfig,
    /// HTTP only cookie (not accessible via JavaScript)
    pub http_only: bool,
}

impl SessionConfig {
    pub const COOKIE_NAME: &'static str = "admin_session";

    /// Session configuration for the current `ENVIRONMENT`; cookies are
    /// marked secure only in `prd`
    pub fn new() -> Self {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        Self {
            secure: environment == "prd",
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: Self::COOKIE_NAME.to_string(),
            timeout_seconds: 86400, // 24 hours
            secure: false,
            same_site: SameSiteConfig::Strict,
            http_only: true,
        }
    }
}

/// SameSite cookie configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSiteConfig {
    Strict,
    Lax,
    None,
}

impl From<SameSiteConfig> for tower_sessions::cookie::SameSite {
    fn from(config: SameSiteConfig) -> Self {
        match config {
            SameSiteConfig::Strict => tower_sessions::cookie::SameSite::Strict,
            SameSiteConfig::Lax => tower_sessions::cookie::SameSite::Lax,
            SameSiteConfig::None => tower_sessions::cookie::SameSite::None,
        }
    }
}
