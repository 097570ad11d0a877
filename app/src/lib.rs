mod logging;

use api::ApiConfig;
use authz::PermissionCatalog;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use user::{AdminCredentials, AdminDatabaseConfig, AdminManager, SecureLogConfig, SessionConfig};

/// How often expired sessions are purged from the store
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Environment paths configuration
#[derive(Debug, Clone)]
pub struct EnvPaths {
    pub data_path: PathBuf,
    pub configuration_path: PathBuf,
}

impl EnvPaths {
    /// Load paths from environment variables
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let project_root = Self::find_project_root()?;

        let data_path = std::env::var("DATA_PATH").unwrap_or_else(|_| "./data".to_string());
        let configuration_path =
            std::env::var("CONFIGURATION_PATH").unwrap_or_else(|_| "./config".to_string());

        Ok(Self::resolve(&project_root, &data_path, &configuration_path))
    }

    /// Resolve relative paths against the project root
    pub fn resolve(project_root: &Path, data_path: &str, configuration_path: &str) -> Self {
        let resolve_path = |path: &str| -> PathBuf {
            if let Some(relative) = path.strip_prefix("./") {
                project_root.join(relative)
            } else if path.starts_with('/') {
                PathBuf::from(path)
            } else {
                project_root.join(path)
            }
        };

        Self {
            data_path: resolve_path(data_path),
            configuration_path: resolve_path(configuration_path),
        }
    }

    /// Path of the permission catalog document
    pub fn catalog_file(&self) -> PathBuf {
        self.configuration_path.join("permissions.yaml")
    }

    /// Database and audit log locations under the data directory
    pub fn database_config(&self) -> AdminDatabaseConfig {
        let admin_dir = self.data_path.join("admin");
        AdminDatabaseConfig {
            database_path: admin_dir.join("storefront_admin.db"),
            secure_log_config: SecureLogConfig {
                log_path: admin_dir.join("audit.log"),
                ..SecureLogConfig::default()
            },
            ..AdminDatabaseConfig::default()
        }
    }

    /// Find the project root directory
    fn find_project_root() -> std::io::Result<PathBuf> {
        let current_dir = std::env::current_dir()?;

        // Running from a member crate (`cargo run -p storefront-admin` inside app/)
        if current_dir.ends_with("app") {
            if let Some(parent) = current_dir.parent() {
                return Ok(parent.to_path_buf());
            }
        }
        Ok(current_dir)
    }
}

/// Server settings read from the environment
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub api_port: u16,
    /// Identity-provider uid of the console account
    pub admin_uid: String,
    pub environment: String,
}

impl ServerSettings {
    pub fn from_env(admin_email: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let api_port = match std::env::var("API_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|e| format!("API_PORT must be a port number: {}", e))?,
            Err(_) => ApiConfig::default().port,
        };

        Ok(Self {
            api_port,
            admin_uid: std::env::var("ADMIN_UID").unwrap_or_else(|_| default_admin_uid(admin_email)),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()),
        })
    }
}

/// Uid used for the console account when `ADMIN_UID` is unset
pub fn default_admin_uid(email: &str) -> String {
    format!("local:{}", email)
}

/// Build the admin manager and make sure the console account has a record
pub async fn build_manager(
    env_paths: &EnvPaths,
    credentials: AdminCredentials,
    admin_uid: &str,
) -> Result<Arc<AdminManager>, Box<dyn std::error::Error>> {
    let catalog = PermissionCatalog::load_or_builtin(&env_paths.catalog_file())?;
    let admin_email = credentials.email().to_string();

    let manager = AdminManager::new(
        env_paths.database_config(),
        SessionConfig::new(),
        credentials,
        Arc::new(catalog),
    )
    .await?;

    let seeded = manager.seed_admin(admin_uid, &admin_email).await?;
    tracing::info!(
        "Console account {} ({}) has role {}",
        seeded.email,
        seeded.uid,
        seeded.role
    );

    if !manager.verify_integrity().await? {
        tracing::warn!("Admin store integrity check failed; inspect the audit log");
    }

    Ok(Arc::new(manager))
}

fn spawn_session_cleanup(manager: Arc<AdminManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = manager.cleanup_expired().await {
                tracing::error!("Session cleanup failed: {}", e);
            }
        }
    })
}

async fn serve(env_paths: EnvPaths) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = AdminCredentials::from_env()?;
    let settings = ServerSettings::from_env(credentials.email())?;
    tracing::info!("Environment: {}", settings.environment);

    let manager = build_manager(&env_paths, credentials, &settings.admin_uid).await?;

    let cleanup = spawn_session_cleanup(manager.clone());
    let server = api::spawn_server_with_config(
        manager.clone(),
        ApiConfig::new().with_port(settings.api_port),
    );

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("API server task failed: {}", e);
            }
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
        }
    }

    cleanup.abort();
    manager.database().close().await?;
    Ok(())
}

/// Start the admin console server and block until it stops
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let env_paths = EnvPaths::from_env()?;
    let _guard = logging::init_logging(&env_paths)?;

    tracing::info!("=== Storefront admin starting up ===");
    tracing::info!("  Data path: {:?}", env_paths.data_path);
    tracing::info!("  Configuration path: {:?}", env_paths.configuration_path);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(serve(env_paths));

    if let Err(e) = &result {
        tracing::error!("Server stopped with error: {}", e);
    }
    logging::log_shutdown();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz::Role;
    use tempfile::TempDir;

    fn test_paths(temp_dir: &TempDir) -> EnvPaths {
        EnvPaths::resolve(temp_dir.path(), "./data", "config")
    }

    #[test]
    fn test_resolve_paths() {
        let root = Path::new("/srv/storefront");

        let paths = EnvPaths::resolve(root, "./data", "/etc/storefront");
        assert_eq!(paths.data_path, PathBuf::from("/srv/storefront/data"));
        assert_eq!(paths.configuration_path, PathBuf::from("/etc/storefront"));
        assert_eq!(
            paths.catalog_file(),
            PathBuf::from("/etc/storefront/permissions.yaml")
        );

        let paths = EnvPaths::resolve(root, "var/data", "./config");
        assert_eq!(paths.data_path, PathBuf::from("/srv/storefront/var/data"));
        assert_eq!(
            paths.database_config().database_path,
            PathBuf::from("/srv/storefront/var/data/admin/storefront_admin.db")
        );
        assert_eq!(
            paths.database_config().secure_log_config.log_path,
            PathBuf::from("/srv/storefront/var/data/admin/audit.log")
        );
    }

    #[test]
    fn test_default_admin_uid() {
        assert_eq!(default_admin_uid("owner@example.com"), "local:owner@example.com");
    }

    #[tokio::test]
    async fn test_build_manager_seeds_console_account() {
        let temp_dir = TempDir::new().unwrap();
        let paths = test_paths(&temp_dir);
        let hash = user::hash_password("secret").unwrap();
        let credentials = AdminCredentials::new("owner@example.com", hash).unwrap();

        let manager = build_manager(&paths, credentials, "uid-owner").await.unwrap();

        let owner = manager
            .database()
            .get_by_uid("uid-owner")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.role, Role::SUPER_ADMIN);
        assert_eq!(owner.permissions.len(), manager.catalog().permissions().len());
        assert!(paths.data_path.join("admin/storefront_admin.db").exists());
    }

    #[tokio::test]
    async fn test_build_manager_uses_catalog_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = test_paths(&temp_dir);
        std::fs::create_dir_all(&paths.configuration_path).unwrap();
        std::fs::write(
            paths.catalog_file(),
            r#"
version: "2.0.0"
roles: [viewer, owner]
permissions:
  - id: admin.login
  - id: reports.view
groups:
  BASIC_ACCESS: [admin.login]
"#,
        )
        .unwrap();
        let hash = user::hash_password("secret").unwrap();
        let credentials = AdminCredentials::new("owner@example.com", hash).unwrap();

        let manager = build_manager(&paths, credentials, "uid-owner").await.unwrap();

        assert_eq!(manager.catalog().version(), "2.0.0");
        let owner = manager
            .database()
            .get_by_uid("uid-owner")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.role, Role::from("owner"));
        assert_eq!(owner.permissions.len(), 2);

        let ctx = manager.context(Some("uid-owner")).await.unwrap();
        assert!(ctx.check_role("viewer"));
        assert!(ctx.check_role("owner"));
    }
}
