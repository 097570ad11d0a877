use crate::utils::env_paths::{api_port, EnvPaths};
use anyhow::Result;
use authz::PermissionCatalog;
use colored::*;
use serde_json::json;
use std::time::Duration;
use user::secure_log::verify_chain_file;

/// Execute the health check command
pub async fn execute(format: String) -> Result<()> {
    let env_paths = EnvPaths::load()?;
    let health_status = check_system_health(&env_paths).await;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&health_status)?),
        _ => print_health_status_text(&health_status),
    }

    Ok(())
}

/// Check the catalog, the admin store, the audit log and the running API
async fn check_system_health(env_paths: &EnvPaths) -> serde_json::Value {
    let components = json!({
        "catalog": check_catalog_health(env_paths),
        "database": check_database_health(env_paths),
        "audit_log": check_audit_log_health(env_paths),
        "api": check_api_health().await,
    });

    let all_healthy = components
        .as_object()
        .into_iter()
        .flat_map(|c| c.values())
        .all(|v| v["status"].as_str().unwrap_or("unknown") == "healthy");

    json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "components": components,
    })
}

fn check_catalog_health(env_paths: &EnvPaths) -> serde_json::Value {
    let path = env_paths.catalog_path();
    if !path.exists() {
        return json!({
            "status": "healthy",
            "message": "No catalog file, the builtin catalog is in use",
            "version": PermissionCatalog::builtin().version(),
        });
    }

    match PermissionCatalog::from_file(&path) {
        Ok(catalog) => json!({
            "status": "healthy",
            "message": format!("Catalog loaded from {}", path.display()),
            "version": catalog.version(),
            "permissions": catalog.permissions().len(),
        }),
        Err(e) => json!({
            "status": "unhealthy",
            "message": format!("Catalog at {} is invalid: {}", path.display(), e),
        }),
    }
}

fn check_database_health(env_paths: &EnvPaths) -> serde_json::Value {
    let db_path = env_paths.admin_database_path();

    if db_path.exists() {
        json!({
            "status": "healthy",
            "message": "Admin database file exists",
            "path": db_path.display().to_string()
        })
    } else {
        json!({
            "status": "not_initialized",
            "message": "Admin database does not exist yet",
            "path": db_path.display().to_string()
        })
    }
}

fn check_audit_log_health(env_paths: &EnvPaths) -> serde_json::Value {
    let log_path = env_paths.audit_log_path();

    if !log_path.exists() {
        return json!({
            "status": "not_initialized",
            "message": "No audit log yet",
            "path": log_path.display().to_string()
        });
    }

    match verify_chain_file(&log_path) {
        Ok(true) => json!({
            "status": "healthy",
            "message": "Audit log hash chain intact",
            "path": log_path.display().to_string()
        }),
        Ok(false) => json!({
            "status": "unhealthy",
            "message": "Audit log hash chain is broken",
            "path": log_path.display().to_string()
        }),
        Err(e) => json!({
            "status": "unhealthy",
            "message": format!("Audit log cannot be read: {}", e),
            "path": log_path.display().to_string()
        }),
    }
}

async fn check_api_health() -> serde_json::Value {
    let endpoint = format!("http://localhost:{}", api_port());
    let url = format!("{}/api/admin/health", endpoint);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return json!({
                "status": "unhealthy",
                "message": format!("Failed to build HTTP client: {}", e),
                "endpoint": endpoint
            })
        }
    };

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => json!({
            "status": "healthy",
            "message": "Admin API is running and responsive",
            "endpoint": endpoint
        }),
        Ok(response) => json!({
            "status": "unhealthy",
            "message": format!("Admin API returned status: {}", response.status()),
            "endpoint": endpoint
        }),
        Err(_) => json!({
            "status": "offline",
            "message": "Admin API is not running or not reachable",
            "endpoint": endpoint
        }),
    }
}

/// Print health status in a formatted text output
fn print_health_status_text(status: &serde_json::Value) {
    println!("{}", "=== Storefront Admin Health Check ===".bold());
    println!();

    let status_display = match status["status"].as_str().unwrap_or("unknown") {
        "healthy" => "HEALTHY".green().bold(),
        "degraded" => "DEGRADED".yellow().bold(),
        _ => "UNKNOWN".white().bold(),
    };

    println!("Overall Status: {}", status_display);
    println!("Timestamp: {}", status["timestamp"].as_str().unwrap_or(""));
    println!();

    println!("{}", "Components:".bold());
    println!("{}", "─".repeat(50));

    if let Some(components) = status["components"].as_object() {
        for (name, component) in components {
            let comp_status = component["status"].as_str().unwrap_or("unknown");
            let (status_icon, status_text) = match comp_status {
                "healthy" => ("✓".green(), comp_status.green()),
                "unhealthy" => ("✗".red(), comp_status.red()),
                "offline" | "not_initialized" => ("○".white(), comp_status.white()),
                _ => ("?".white(), comp_status.white()),
            };

            println!(
                "{} {} ({})",
                status_icon,
                name.to_uppercase().bold(),
                status_text
            );
            if let Some(message) = component["message"].as_str() {
                println!("  {}", message);
            }
            if let Some(version) = component["version"].as_str() {
                println!("  Catalog version: {}", version);
            }
            println!();
        }
    }
}
