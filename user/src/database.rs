use authz::{Permission, Role};
use chrono::Utc;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::types::{AdminUser, AdminUserRow, NewAdminUser};
use crate::error::{Result, UserError};
use crate::secure_log::{AuditOutcome, SecureLogConfig, SecureLogger};

const SELECT_ADMIN_USER: &str = r#"
    SELECT id, uid, email, name, role, permissions, created_at, updated_at
    FROM admin_users
"#;

/// Configuration for the admin user database
#[derive(Debug, Clone)]
pub struct AdminDatabaseConfig {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
    /// Audit log configuration
    pub secure_log_config: SecureLogConfig,
}

impl Default for AdminDatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/admin/storefront_admin.db"),
            max_connections: 5,
            connection_timeout: 30,
            secure_log_config: SecureLogConfig::default(),
        }
    }
}

/// Admin user store
pub struct AdminDatabase {
    pool: Pool<Sqlite>,
    /// None for a read-only handle
    secure_logger: Option<Arc<SecureLogger>>,
}

impl AdminDatabase {
    /// Open (creating if needed) the admin database and run migrations
    pub async fn new(config: AdminDatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}", config.database_path.display());

        if !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            info!(
                "Creating admin database at: {}",
                config.database_path.display()
            );
            Sqlite::create_database(&db_url).await.map_err(|e| {
                UserError::Initialization(format!("Failed to create database: {}", e))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&config.database_path)
                    .create_if_missing(true),
            )
            .await?;

        let secure_logger = Arc::new(SecureLogger::new(config.secure_log_config.clone())?);

        let db = Self {
            pool,
            secure_logger: Some(secure_logger.clone()),
        };

        db.run_migrations().await?;

        secure_logger
            .log_action(None, "database_initialized", None, None, None, AuditOutcome::Success)
            .await?;

        info!("Admin database initialized successfully");

        Ok(db)
    }

    /// Open an existing database for lookups only. Nothing is created,
    /// migrated or written to the audit log, and every mutation fails.
    pub async fn open_read_only(database_path: &Path) -> Result<Self> {
        if !database_path.exists() {
            return Err(UserError::Initialization(format!(
                "No admin database at {}",
                database_path.display()
            )));
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .read_only(true),
            )
            .await?;

        debug!("Opened admin database read-only: {}", database_path.display());

        Ok(Self {
            pool,
            secure_logger: None,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        info!("Running admin database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id TEXT PRIMARY KEY,
                uid TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                role TEXT NOT NULL,
                permissions TEXT NOT NULL DEFAULT '[]',
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_admin_users_email ON admin_users(email)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_admin_users_updated ON admin_users(updated_at)",
        )
        .execute(&self.pool)
        .await?;

        info!("Admin database migrations completed");

        Ok(())
    }

    /// Get the database pool for external use
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Get the audit log; fails on a read-only handle
    pub fn audit_log(&self) -> Result<Arc<SecureLogger>> {
        self.secure_logger.clone().ok_or(UserError::ReadOnly)
    }

    /// Insert a new admin user. `actor` is the uid of whoever made the change.
    pub async fn create_admin_user(
        &self,
        new_user: NewAdminUser,
        actor: Option<&str>,
    ) -> Result<AdminUser> {
        let now = Utc::now();
        let user = AdminUser {
            id: ulid::Ulid::new().to_string(),
            uid: new_user.uid,
            email: new_user.email,
            name: new_user.name,
            role: new_user.role,
            permissions: new_user.permissions,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO admin_users (id, uid, email, name, role, permissions, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.uid)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(encode_permissions(&user.permissions)?)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                UserError::AlreadyExists(format!("uid {} or email {}", user.uid, user.email))
            }
            other => UserError::Database(other),
        })?;

        self.audit_log()?
            .log_action(
                actor,
                "admin_user_created",
                Some(user.uid.clone()),
                Some(serde_json::json!({
                    "email": user.email,
                    "role": user.role,
                    "permissions": user.permissions,
                })),
                None,
                AuditOutcome::Success,
            )
            .await?;

        info!("Created admin user: {} ({})", user.uid, user.role);
        Ok(user)
    }

    /// Create the record unless one already exists for the uid or email
    pub async fn ensure_admin_user(&self, new_user: NewAdminUser) -> Result<AdminUser> {
        if let Some(existing) = self.get_by_uid(&new_user.uid).await? {
            return Ok(existing);
        }
        if let Some(existing) = self.get_by_email(&new_user.email).await? {
            return Ok(existing);
        }
        self.create_admin_user(new_user, None).await
    }

    pub async fn get_by_uid(&self, uid: &str) -> Result<Option<AdminUser>> {
        self.fetch_one_where("uid", uid).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<AdminUser>> {
        self.fetch_one_where("id", id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        self.fetch_one_where("email", email).await
    }

    async fn fetch_one_where(&self, column: &'static str, value: &str) -> Result<Option<AdminUser>> {
        let query = format!("{} WHERE {} = ?", SELECT_ADMIN_USER, column);

        let row = sqlx::query_as::<_, AdminUserRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        debug!("Lookup admin user by {}: found={}", column, row.is_some());
        row.map(AdminUser::try_from).transpose()
    }

    /// All admin users, most recently updated first
    pub async fn list_admin_users(&self) -> Result<Vec<AdminUser>> {
        let query = format!("{} ORDER BY updated_at DESC, id DESC", SELECT_ADMIN_USER);

        sqlx::query_as::<_, AdminUserRow>(&query)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AdminUser::try_from)
            .collect()
    }

    /// Change the role of the record with the given id
    pub async fn update_role(&self, id: &str, role: Role, actor: Option<&str>) -> Result<AdminUser> {
        let result = sqlx::query("UPDATE admin_users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound(id.to_string()));
        }

        let user = self.require_by_id(id).await?;

        self.audit_log()?
            .log_action(
                actor,
                "admin_role_changed",
                Some(user.uid.clone()),
                Some(serde_json::json!({ "role": role })),
                None,
                AuditOutcome::Success,
            )
            .await?;

        info!("Changed role of {} to {}", user.uid, role);
        Ok(user)
    }

    /// Replace the permission set of the record with the given id
    pub async fn update_permissions(
        &self,
        id: &str,
        permissions: BTreeSet<Permission>,
        actor: Option<&str>,
    ) -> Result<AdminUser> {
        let result =
            sqlx::query("UPDATE admin_users SET permissions = ?, updated_at = ? WHERE id = ?")
                .bind(encode_permissions(&permissions)?)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound(id.to_string()));
        }

        let user = self.require_by_id(id).await?;

        self.audit_log()?
            .log_action(
                actor,
                "admin_permissions_changed",
                Some(user.uid.clone()),
                Some(serde_json::json!({ "permissions": permissions })),
                None,
                AuditOutcome::Success,
            )
            .await?;

        info!(
            "Replaced permissions of {} ({} granted)",
            user.uid,
            permissions.len()
        );
        Ok(user)
    }

    /// Delete the record with the given uid
    pub async fn delete_by_uid(&self, uid: &str, actor: Option<&str>) -> Result<()> {
        let result = sqlx::query("DELETE FROM admin_users WHERE uid = ?")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound(uid.to_string()));
        }

        self.audit_log()?
            .log_action(
                actor,
                "admin_user_deleted",
                Some(uid.to_string()),
                None,
                None,
                AuditOutcome::Success,
            )
            .await?;

        info!("Deleted admin user: {}", uid);
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn require_by_id(&self, id: &str) -> Result<AdminUser> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))
    }

    /// Verify database integrity
    pub async fn verify_integrity(&self) -> Result<bool> {
        for table in ["admin_users", "tower_sessions"] {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;

            if !exists {
                warn!("Missing table: {}", table);
                return Ok(false);
            }
        }

        if let Some(secure_logger) = &self.secure_logger {
            if !secure_logger.verify_log_chain().await? {
                warn!("Audit log chain verification failed");
                return Ok(false);
            }
        }

        info!("Database integrity check passed");
        Ok(true)
    }

    /// Close the database connection
    pub async fn close(&self) -> Result<()> {
        self.pool.close().await;
        info!("Admin database connection closed");
        Ok(())
    }
}

fn encode_permissions(permissions: &BTreeSet<Permission>) -> Result<String> {
    Ok(serde_json::to_string(permissions)?)
}
