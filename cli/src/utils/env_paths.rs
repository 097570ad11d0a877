use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment-based path configuration, resolved the same way the server does
#[derive(Debug, Clone)]
pub struct EnvPaths {
    pub data_path: PathBuf,
    pub configuration_path: PathBuf,
}

impl EnvPaths {
    /// Load paths from environment variables with defaults
    pub fn load() -> Result<Self> {
        Self::load_with_base(None)
    }

    /// Load paths relative to `base_dir`, or the current directory (after
    /// reading its `.env`) when none is given
    pub fn load_with_base(base_dir: Option<PathBuf>) -> Result<Self> {
        let base = if let Some(base) = base_dir {
            base
        } else {
            let current_dir = env::current_dir().context("Failed to get current directory")?;
            let env_file = current_dir.join(".env");
            if env_file.exists() {
                dotenv::from_path(&env_file).ok();
            }
            current_dir
        };

        Ok(Self {
            data_path: Self::get_path_from_env("DATA_PATH", "./data", &base),
            configuration_path: Self::get_path_from_env("CONFIGURATION_PATH", "./config", &base),
        })
    }

    fn get_path_from_env(var_name: &str, default: &str, base_dir: &Path) -> PathBuf {
        let path = PathBuf::from(env::var(var_name).unwrap_or_else(|_| default.to_string()));

        if path.is_relative() {
            base_dir.join(path)
        } else {
            path
        }
    }

    /// Permission catalog document
    pub fn catalog_path(&self) -> PathBuf {
        self.configuration_path.join("permissions.yaml")
    }

    /// Admin-user database
    pub fn admin_database_path(&self) -> PathBuf {
        self.data_path.join("admin").join("storefront_admin.db")
    }

    /// Hash-chained audit log
    pub fn audit_log_path(&self) -> PathBuf {
        self.data_path.join("admin").join("audit.log")
    }
}

/// Port the admin API listens on, from `API_PORT`
pub fn api_port() -> u16 {
    env::var("API_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(3030)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Tests below mutate process environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("DATA_PATH");
        env::remove_var("CONFIGURATION_PATH");
        env::remove_var("API_PORT");
    }

    #[test]
    fn test_env_paths_with_base_dir() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();

        let paths = EnvPaths::load_with_base(Some(base_path.clone())).unwrap();

        assert_eq!(paths.data_path, base_path.join("data"));
        assert_eq!(paths.configuration_path, base_path.join("config"));
        assert_eq!(paths.catalog_path(), base_path.join("config/permissions.yaml"));
        assert_eq!(
            paths.admin_database_path(),
            base_path.join("data/admin/storefront_admin.db")
        );
        assert_eq!(paths.audit_log_path(), base_path.join("data/admin/audit.log"));
    }

    #[test]
    fn test_env_paths_with_env_vars() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();
        let absolute = temp_dir.path().join("elsewhere");

        env::set_var("DATA_PATH", "./var");
        env::set_var("CONFIGURATION_PATH", absolute.to_str().unwrap());

        let paths = EnvPaths::load_with_base(Some(base_path.clone())).unwrap();
        assert_eq!(paths.data_path, base_path.join("./var"));
        assert_eq!(paths.configuration_path, absolute);

        clear_env();
    }

    #[test]
    fn test_api_port() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        assert_eq!(api_port(), 3030);
        env::set_var("API_PORT", "8080");
        assert_eq!(api_port(), 8080);
        env::set_var("API_PORT", "not-a-port");
        assert_eq!(api_port(), 3030);

        clear_env();
    }
}
