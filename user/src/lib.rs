pub mod auth;
pub mod context;
pub mod database;
pub mod error;
pub mod secure_log;

use authz::{permissions, PermissionCatalog, Role};
use std::sync::Arc;
use tracing::{info, warn};

use auth::AdminAuthenticator;
pub use auth::{AdminCredentials, SessionConfig, SqlxSessionStore};
use database::AdminDatabase;

/// Admin user management with sessions, sign-in and the audit log
pub struct AdminManager {
    database: Arc<AdminDatabase>,
    secure_logger: Arc<SecureLogger>,
    authenticator: AdminAuthenticator,
    session_store: SqlxSessionStore,
    session_config: SessionConfig,
    catalog: Arc<PermissionCatalog>,
}

impl AdminManager {
    /// Create a new admin manager with the provided configuration
    pub async fn new(
        db_config: database::AdminDatabaseConfig,
        session_config: SessionConfig,
        credentials: AdminCredentials,
        catalog: Arc<PermissionCatalog>,
    ) -> error::Result<Self> {
        info!("Initializing admin management system");

        let database = Arc::new(AdminDatabase::new(db_config).await?);
        let secure_logger = database.audit_log()?;

        let authenticator =
            AdminAuthenticator::new(database.clone(), secure_logger.clone(), credentials);

        let session_store = SqlxSessionStore::new(database.pool().clone()).await?;

        info!(
            "Admin management system initialized (catalog {}, {} permissions)",
            catalog.version(),
            catalog.permissions().len()
        );

        Ok(Self {
            database,
            secure_logger,
            authenticator,
            session_store,
            session_config,
            catalog,
        })
    }

    pub fn database(&self) -> &AdminDatabase {
        &self.database
    }

    pub fn audit_log(&self) -> &SecureLogger {
        &self.secure_logger
    }

    pub fn authenticator(&self) -> &AdminAuthenticator {
        &self.authenticator
    }

    pub fn session_store(&self) -> &SqlxSessionStore {
        &self.session_store
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    pub fn catalog(&self) -> Arc<PermissionCatalog> {
        self.catalog.clone()
    }

    /// Resolve the signed-in uid into an admin context
    pub async fn context(&self, uid: Option<&str>) -> error::Result<AdminContext> {
        AdminContext::resolve(&self.database, self.catalog.clone(), uid).await
    }

    /// Make sure the console account has a record. A new record holds the
    /// catalog's highest role and every catalog permission.
    pub async fn seed_admin(&self, uid: &str, email: &str) -> error::Result<AdminUser> {
        let role = self
            .catalog
            .roles()
            .last()
            .cloned()
            .unwrap_or(Role::SUPER_ADMIN);
        let seed = NewAdminUser::new(uid, email, role).with_permissions(
            self.catalog
                .permissions()
                .iter()
                .map(|def| def.id.clone()),
        );
        let user = self.database.ensure_admin_user(seed).await?;

        if !user.principal().holds(permissions::ADMIN_LOGIN) {
            warn!(
                "Seeded admin {} does not hold {}; console sign-in will be refused",
                user.uid,
                permissions::ADMIN_LOGIN
            );
        }
        Ok(user)
    }

    /// Verify system integrity
    pub async fn verify_integrity(&self) -> error::Result<bool> {
        self.database.verify_integrity().await
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired(&self) -> error::Result<u64> {
        let removed = self.session_store.cleanup_expired().await?;
        info!("Cleaned up {} expired sessions", removed);
        Ok(removed)
    }
}

// Re-export commonly used types
pub use auth::{
    hash_password, AdminSession, AdminUser, LoginOutcome, NewAdminUser,
    SameSiteConfig, SessionIdentity,
};
pub use context::AdminContext;
pub use database::AdminDatabaseConfig;
pub use error::{Result as UserResult, UserError};
pub use secure_log::{AuditOutcome, SecureLogConfig, SecureLogEntry, SecureLogger};
