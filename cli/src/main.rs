use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::env;
use std::path::PathBuf;

mod commands;
mod utils;

use commands::{audit, catalog, check, health, password, users};
use utils::project_root;

/// Storefront admin CLI - inspect permissions and the admin console state
#[derive(Parser)]
#[command(name = "sfadm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Permission catalog file (defaults to <config>/permissions.yaml, then builtin)
    #[arg(long, global = true, env = "SFADM_CATALOG")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the permission catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Evaluate an access check for a hypothetical admin
    Check {
        /// Role of the admin
        #[arg(short, long, required_unless_present = "anonymous")]
        role: Option<String>,

        /// Granted permission id (repeatable)
        #[arg(short, long = "grant")]
        grants: Vec<String>,

        /// Grant every member of a feature group (repeatable)
        #[arg(long = "group")]
        groups: Vec<String>,

        /// Evaluate as if nobody were signed in
        #[arg(long, conflicts_with_all = ["role", "grants", "groups"])]
        anonymous: bool,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text", global = true)]
        format: String,

        #[command(subcommand)]
        query: CheckQuery,
    },

    /// Hash an admin password for ADMIN_PASSWORD_HASH
    HashPassword {
        /// Password to hash; read from stdin when omitted
        #[arg(long)]
        password: Option<String>,

        /// Print as an .env line
        #[arg(long)]
        env: bool,
    },

    /// Audit log commands
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },

    /// Admin user records
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Check system health and status
    Health {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List roles and permissions
    List {
        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List feature groups and their members
    Groups {
        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Describe a permission id or group name
    Show {
        name: String,

        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate a catalog file
    Validate { path: Option<PathBuf> },

    /// Print the builtin catalog as YAML
    Export,
}

#[derive(Subcommand)]
enum CheckQuery {
    /// Does the admin hold this permission?
    Permission { id: String },
    /// Does the admin hold every one of these permissions?
    All {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Is the admin's role at or above this tier?
    Role { role: String },
    /// Can the admin open this feature group?
    Feature { group: String },
    /// Which feature groups can the admin open?
    Features,
}

#[derive(Subcommand)]
enum AuditAction {
    /// Verify the audit log hash chain
    Verify {
        /// Audit log file (defaults to <data>/admin/audit.log)
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Show recent audit entries
    Show {
        #[arg(long)]
        log: Option<PathBuf>,

        /// Number of entries
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Only access denials
        #[arg(long)]
        denied: bool,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List admin users
    List {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show an admin user with its accessible features
    Show {
        uid: String,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    // Outside a checkout paths resolve against the current directory
    match project_root::find_project_root() {
        Some(root) => env::set_current_dir(&root)?,
        None => tracing::debug!("No project root found, using the current directory"),
    }

    match cli.command {
        Commands::Catalog { action } => {
            let load = || catalog::load_catalog(cli.catalog.as_deref());
            match action {
                CatalogAction::List { format } => catalog::list(&load()?, format)?,
                CatalogAction::Groups { format } => catalog::groups(&load()?, format)?,
                CatalogAction::Show { name, format } => catalog::show(&load()?, name, format)?,
                CatalogAction::Validate { path } => {
                    catalog::validate(path.or_else(|| cli.catalog.clone()))?
                }
                CatalogAction::Export => catalog::export()?,
            }
        }
        Commands::Check {
            role,
            grants,
            groups,
            anonymous: _,
            format,
            query,
        } => {
            let loaded = catalog::load_catalog(cli.catalog.as_deref())?;
            let principal = role.map(|role| check::principal(&loaded, role, grants, groups));
            let query = match query {
                CheckQuery::Permission { id } => check::Query::Permission(id),
                CheckQuery::All { ids } => check::Query::AllPermissions(ids),
                CheckQuery::Role { role } => check::Query::Role(role),
                CheckQuery::Feature { group } => check::Query::Feature(group),
                CheckQuery::Features => check::Query::Features,
            };

            let allowed = check::execute(&loaded, principal.as_ref(), query, format)?;
            if !allowed {
                std::process::exit(1);
            }
        }
        Commands::HashPassword { password, env } => password::hash(password, env)?,
        Commands::Audit { action } => match action {
            AuditAction::Verify { log } => audit::verify(log)?,
            AuditAction::Show {
                log,
                limit,
                denied,
                format,
            } => audit::show(log, limit, denied, format)?,
        },
        Commands::Users { action } => match action {
            UsersAction::List { format } => users::list(format).await?,
            UsersAction::Show { uid, format } => {
                let loaded = catalog::load_catalog(cli.catalog.as_deref())?;
                users::show(loaded, uid, format).await?
            }
        },
        Commands::Health { format } => health::execute(format).await?,
    }

    Ok(())
}
