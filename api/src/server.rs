use crate::{create_router, AppState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use user::AdminManager;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Address to bind
    pub host: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 3030,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create a new API configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Start the API server with the given configuration
pub async fn start_server_with_config(
    manager: Arc<AdminManager>,
    config: ApiConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(manager);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);
    info!(
        "Swagger UI available at http://localhost:{}/api/admin/swagger",
        config.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Start the API server in a background task with custom configuration
pub fn spawn_server_with_config(manager: Arc<AdminManager>, config: ApiConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = start_server_with_config(manager, config).await {
            error!("API server error: {}", e);
        }
    })
}
