use crate::utils::env_paths::EnvPaths;
use anyhow::{anyhow, Result};
use authz::PermissionCatalog;
use colored::*;
use serde_json::json;
use std::sync::Arc;
use user::{database::AdminDatabase, AdminContext};

/// Open the server's admin database read-only; it must already exist
async fn open_database() -> Result<AdminDatabase> {
    let env_paths = EnvPaths::load()?;
    let database_path = env_paths.admin_database_path();
    if !database_path.exists() {
        return Err(anyhow!(
            "No admin database at {}; start the server once to create it",
            database_path.display()
        ));
    }

    Ok(AdminDatabase::open_read_only(&database_path).await?)
}

/// List admin users, most recently updated first
pub async fn list(format: String) -> Result<()> {
    let db = open_database().await?;
    let users = db.list_admin_users().await?;

    match format.as_str() {
        "json" => {
            let value: Vec<_> = users
                .iter()
                .map(|u| {
                    json!({
                        "id": u.id,
                        "uid": u.uid,
                        "email": u.email,
                        "name": u.name,
                        "role": u.role,
                        "permissions": u.permissions,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => {
            println!("{}", "Admin Users".bold().underline());
            for u in &users {
                println!(
                    "  {:<28} {:<12} {} ({} permissions)",
                    u.email.cyan(),
                    u.role.as_str().bold(),
                    u.uid.dimmed(),
                    u.permissions.len()
                );
            }
            println!("{}: {}", "Total".bold(), users.len());
        }
    }

    db.close().await?;
    Ok(())
}

/// Show one admin user with the feature areas the record opens
pub async fn show(catalog: PermissionCatalog, uid: String, format: String) -> Result<()> {
    let db = open_database().await?;
    let context = AdminContext::resolve(&db, Arc::new(catalog), Some(&uid)).await?;
    db.close().await?;

    let Some(principal) = context.principal() else {
        return Err(anyhow!("No admin user with uid '{}'", uid));
    };
    let features = context.accessible_features();

    match format.as_str() {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "principal": principal,
                "features": features,
            }))?
        ),
        _ => {
            println!("{}: {}", "Admin".bold(), principal.email.cyan());
            println!("{}: {}", "UID".bold(), principal.uid);
            if let Some(name) = &principal.name {
                println!("{}: {}", "Name".bold(), name);
            }
            println!(
                "{}: {} (tier {})",
                "Role".bold(),
                principal.role,
                context.catalog().role_tier(principal.role.as_str())
            );
            println!("{}:", "Permissions".bold());
            for permission in &principal.permissions {
                let marker = if context.catalog().contains(permission.as_str()) {
                    permission.as_str().green()
                } else {
                    permission.as_str().yellow()
                };
                println!("  - {}", marker);
            }
            println!("{}:", "Features".bold());
            for feature in &features {
                println!("  - {}", feature.cyan());
            }
        }
    }

    Ok(())
}
