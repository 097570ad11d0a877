use crate::utils::env_paths::EnvPaths;
use anyhow::{anyhow, Result};
use colored::*;
use std::path::PathBuf;
use user::secure_log::{read_entries, verify_chain_file};

fn resolve_log_path(log: Option<PathBuf>) -> Result<PathBuf> {
    match log {
        Some(path) => Ok(path),
        None => Ok(EnvPaths::load()?.audit_log_path()),
    }
}

/// Verify the hash chain of the audit log; a broken chain is an error
pub fn verify(log: Option<PathBuf>) -> Result<()> {
    let path = resolve_log_path(log)?;

    if !path.exists() {
        println!(
            "{} No audit log at {}",
            "!".yellow().bold(),
            path.display()
        );
        return Ok(());
    }

    if verify_chain_file(&path)? {
        let entries = read_entries(&path)?;
        println!(
            "{} Audit log chain intact ({} entries) at {}",
            "✓".green().bold(),
            entries.len(),
            path.display()
        );
        Ok(())
    } else {
        Err(anyhow!(
            "Audit log chain is broken at {}; entries were modified or removed",
            path.display()
        ))
    }
}

/// Print the most recent audit entries, oldest first
pub fn show(log: Option<PathBuf>, limit: usize, denied_only: bool, format: String) -> Result<()> {
    let path = resolve_log_path(log)?;
    let mut entries = read_entries(&path)?;

    if denied_only {
        entries.retain(|e| e.result.starts_with("denied"));
    }
    let skip = entries.len().saturating_sub(limit);
    let entries = &entries[skip..];

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(entries)?),
        _ => {
            println!("{}", "Audit Log".bold().underline());
            for entry in entries {
                let result = if entry.result == "success" {
                    entry.result.green()
                } else if entry.result.starts_with("denied") {
                    entry.result.red()
                } else {
                    entry.result.yellow()
                };
                println!(
                    "{} {:<24} actor={} target={} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                    entry.action,
                    entry.actor.as_deref().unwrap_or("-"),
                    entry.target.as_deref().unwrap_or("-"),
                    result
                );
            }
            if entries.is_empty() {
                println!("  {}", "(no entries)".dimmed());
            }
        }
    }

    Ok(())
}
