use anyhow::Result;
use authz::{AdminPrincipal, Decision, Evaluator, PermissionCatalog, Role};
use colored::*;
use serde_json::json;

/// What to evaluate for the hypothetical principal
#[derive(Debug, Clone)]
pub enum Query {
    Permission(String),
    AllPermissions(Vec<String>),
    Role(String),
    Feature(String),
    Features,
}

/// Build a principal from the command line. `--group` expands to the
/// group's members; unknown grants are kept, as a stored record would.
pub fn principal(
    catalog: &PermissionCatalog,
    role: String,
    grants: Vec<String>,
    grant_groups: Vec<String>,
) -> AdminPrincipal {
    for grant in grants.iter().filter(|g| !catalog.contains(g)) {
        eprintln!(
            "{} '{}' is not in catalog {}",
            "Warning:".yellow().bold(),
            grant,
            catalog.version()
        );
    }
    if !catalog.is_known_role(&role) {
        eprintln!(
            "{} role '{}' is not in catalog {}; it ranks below every tier",
            "Warning:".yellow().bold(),
            role,
            catalog.version()
        );
    }

    let mut permissions = grants;
    for group in &grant_groups {
        match catalog.group(group) {
            Some(members) => permissions.extend(members.iter().map(|p| p.to_string())),
            None => eprintln!("{} unknown group '{}'", "Warning:".yellow().bold(), group),
        }
    }

    AdminPrincipal::new("cli", "cli@localhost", Role::from(role)).with_permissions(permissions)
}

/// Evaluate `query` and print the outcome. Returns whether access is allowed.
pub fn execute(
    catalog: &PermissionCatalog,
    principal: Option<&AdminPrincipal>,
    query: Query,
    format: String,
) -> Result<bool> {
    let evaluator = Evaluator::new(catalog);

    let (label, decision) = match query {
        Query::Permission(permission) => (
            format!("permission {}", permission),
            evaluator.check_permission(principal, &permission),
        ),
        Query::AllPermissions(permissions) => (
            format!("all of {}", permissions.join(", ")),
            evaluator.check_all_permissions(principal, &permissions),
        ),
        Query::Role(role) => (
            format!("role tier {}", role),
            evaluator.check_role(principal, &role),
        ),
        Query::Feature(group) => (
            format!("feature {}", group),
            evaluator.check_feature(principal, &group),
        ),
        Query::Features => return print_features(&evaluator, principal, &format),
    };

    match format.as_str() {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "query": label, "result": decision }))?
        ),
        _ => match decision {
            Decision::Allow => println!("{} {}", "ALLOW".green().bold(), label),
            Decision::Deny(reason) => {
                println!("{} {} ({})", "DENY".red().bold(), label, reason)
            }
        },
    }

    Ok(decision.is_allowed())
}

fn print_features(
    evaluator: &Evaluator<'_>,
    principal: Option<&AdminPrincipal>,
    format: &str,
) -> Result<bool> {
    let features = evaluator.accessible_features(principal);
    match format {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "features": features }))?
        ),
        _ => {
            println!("{}", "Accessible features".bold());
            for feature in &features {
                println!("  - {}", feature.cyan());
            }
            if features.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
        }
    }
    Ok(!features.is_empty())
}
