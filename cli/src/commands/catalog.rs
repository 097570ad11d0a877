use crate::utils::env_paths::EnvPaths;
use anyhow::{anyhow, Context, Result};
use authz::{Permission, PermissionCatalog};
use colored::*;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Load the catalog from `--catalog`, else `<config>/permissions.yaml`,
/// else the builtin catalog
pub fn load_catalog(explicit: Option<&Path>) -> Result<PermissionCatalog> {
    match explicit {
        Some(path) => PermissionCatalog::from_file(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => {
            let path = EnvPaths::load()?.catalog_path();
            PermissionCatalog::load_or_builtin(&path)
                .with_context(|| format!("Failed to load catalog from {}", path.display()))
        }
    }
}

/// Print version, role tiers and every permission
pub fn list(catalog: &PermissionCatalog, format: String) -> Result<()> {
    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(catalog)?),
        "yaml" => print!("{}", catalog.to_yaml()?),
        _ => {
            println!("{}", "Permission Catalog".bold().underline());
            println!("{}: {}", "Version".bold(), catalog.version());
            println!();

            println!("{}", "Roles (lowest tier first)".bold());
            for role in catalog.roles() {
                println!(
                    "  {} {}",
                    format!("{:>2}", catalog.role_tier(role.as_str())).dimmed(),
                    role.as_str().cyan()
                );
            }
            println!();

            println!("{}", "Permissions".bold());
            for def in catalog.permissions() {
                match &def.description {
                    Some(description) => {
                        println!("  {:<28} {}", def.id.as_str().green(), description)
                    }
                    None => println!("  {}", def.id.as_str().green()),
                }
            }
            println!();
            println!(
                "{}: {}",
                "Total permissions".bold(),
                catalog.permissions().len()
            );
        }
    }

    Ok(())
}

/// Print the feature groups and their members
pub fn groups(catalog: &PermissionCatalog, format: String) -> Result<()> {
    let groups: Vec<(&str, Vec<&str>)> = catalog
        .group_names()
        .map(|name| (name, group_members(catalog, name)))
        .collect();

    match format.as_str() {
        "json" | "yaml" => {
            let value: serde_json::Map<String, serde_json::Value> = groups
                .iter()
                .map(|(name, members)| (name.to_string(), json!(members)))
                .collect();
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", serde_yaml::to_string(&value)?);
            }
        }
        _ => {
            println!("{}", "Feature Groups".bold().underline());
            for (name, members) in &groups {
                println!("{}", name.cyan().bold());
                for member in members {
                    println!("  - {}", member);
                }
            }
        }
    }

    Ok(())
}

/// Describe a single permission id or group name
pub fn show(catalog: &PermissionCatalog, name: String, format: String) -> Result<()> {
    let value = if let Some(def) = catalog.permissions().iter().find(|d| d.id.as_str() == name) {
        let member_of: Vec<&str> = catalog
            .group_names()
            .filter(|group| {
                catalog
                    .group(group)
                    .is_some_and(|members| members.iter().any(|m| m == &def.id))
            })
            .collect();
        json!({
            "kind": "permission",
            "id": def.id,
            "description": def.description,
            "groups": member_of,
        })
    } else if catalog.group(&name).is_some() {
        json!({
            "kind": "group",
            "name": name,
            "permissions": group_members(catalog, &name),
        })
    } else {
        return Err(anyhow!(
            "'{}' is neither a permission nor a group in catalog {}",
            name,
            catalog.version()
        ));
    };

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&value)?),
        "yaml" => print!("{}", serde_yaml::to_string(&value)?),
        _ => {
            if value["kind"] == "permission" {
                println!("{}: {}", "Permission".bold(), name.green());
                if let Some(description) = value["description"].as_str() {
                    println!("{}: {}", "Description".bold(), description);
                }
                println!("{}:", "Groups".bold());
                for group in value["groups"].as_array().into_iter().flatten() {
                    println!("  - {}", group.as_str().unwrap_or_default().cyan());
                }
            } else {
                println!("{}: {}", "Group".bold(), name.cyan());
                for member in value["permissions"].as_array().into_iter().flatten() {
                    println!("  - {}", member.as_str().unwrap_or_default().green());
                }
            }
        }
    }

    Ok(())
}

/// Validate a catalog document without starting the server
pub fn validate(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => EnvPaths::load()?.catalog_path(),
    };
    let catalog = PermissionCatalog::from_file(&path)
        .with_context(|| format!("Catalog {} is invalid", path.display()))?;

    println!(
        "{} {} (version {}, {} roles, {} permissions)",
        "✓".green().bold(),
        path.display(),
        catalog.version(),
        catalog.roles().len(),
        catalog.permissions().len()
    );
    Ok(())
}

/// Write the builtin catalog as YAML, for seeding `config/permissions.yaml`
pub fn export() -> Result<()> {
    print!("{}", PermissionCatalog::builtin().to_yaml()?);
    Ok(())
}

fn group_members<'c>(catalog: &'c PermissionCatalog, name: &str) -> Vec<&'c str> {
    catalog
        .group(name)
        .unwrap_or_default()
        .iter()
        .map(Permission::as_str)
        .collect()
}
