use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use authz::Role;
use user::database::AdminDatabase;
use user::{AdminDatabaseConfig, AuditOutcome, NewAdminUser, SecureLogConfig, SecureLogger};

/// `sfadm` running in `dir` with a clean environment and no colors
fn sfadm(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sfadm").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("DATA_PATH")
        .env_remove("CONFIGURATION_PATH")
        .env_remove("SFADM_CATALOG")
        .env_remove("API_PORT");
    cmd
}

const CUSTOM_CATALOG: &str = r#"version: "2.0.0"
roles: [viewer, owner]
permissions:
  - id: admin.login
    description: Sign in
  - id: reports.view
groups:
  BASIC_ACCESS: [admin.login]
  REPORTS: [reports.view]
"#;

#[test]
fn test_cli_help() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Storefront admin CLI"))
        .stdout(predicate::str::contains("hash-password"));
}

#[test]
fn test_cli_version() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sfadm"));
}

#[test]
fn test_catalog_list_builtin() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["catalog", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version: 1.0.0"))
        .stdout(predicate::str::contains("super_admin"))
        .stdout(predicate::str::contains("Total permissions: 30"));

    sfadm(temp_dir.path())
        .args(["catalog", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"admin.permissions.edit\""));
}

#[test]
fn test_catalog_list_from_config_dir() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("config")).unwrap();
    fs::write(
        temp_dir.path().join("config").join("permissions.yaml"),
        CUSTOM_CATALOG,
    )
    .unwrap();

    sfadm(temp_dir.path())
        .args(["catalog", "list", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2.0.0"))
        .stdout(predicate::str::contains("reports.view"))
        .stdout(predicate::str::contains("products.view").not());
}

#[test]
fn test_catalog_groups_and_show() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["catalog", "groups"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ADMIN_MANAGEMENT"))
        .stdout(predicate::str::contains("BASIC_ACCESS"));

    sfadm(temp_dir.path())
        .args(["catalog", "show", "orders.capture"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ORDER_MANAGEMENT"));

    sfadm(temp_dir.path())
        .args(["catalog", "show", "SECURITY", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("audit.logs.view"));

    sfadm(temp_dir.path())
        .args(["catalog", "show", "orders.*"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("neither a permission nor a group"));
}

#[test]
fn test_catalog_export_then_validate() {
    let temp_dir = TempDir::new().unwrap();

    let output = sfadm(temp_dir.path())
        .args(["catalog", "export"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let exported = temp_dir.path().join("exported.yaml");
    fs::write(&exported, &output.stdout).unwrap();

    sfadm(temp_dir.path())
        .args(["catalog", "validate"])
        .arg(&exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("30 permissions"));

    let broken = temp_dir.path().join("broken.yaml");
    fs::write(
        &broken,
        "version: \"1\"\nroles: [a]\npermissions: []\ngroups:\n  X: [missing.permission]\n",
    )
    .unwrap();

    sfadm(temp_dir.path())
        .args(["catalog", "validate"])
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn test_check_permission() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["check", "--role", "general", "--grant", "orders.view"])
        .args(["permission", "orders.view"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOW"));

    sfadm(temp_dir.path())
        .args(["check", "--role", "general", "--grant", "orders.view"])
        .args(["permission", "orders.edit"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("DENY"))
        .stdout(predicate::str::contains("missing_permission"));

    sfadm(temp_dir.path())
        .args(["check", "--role", "super_admin", "permission", "orders.*"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("unknown_permission"));
}

#[test]
fn test_check_all_permissions() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["check", "--role", "admin", "--group", "ADMIN_MANAGEMENT"])
        .args(["all", "admin.list.edit", "admin.permissions.edit"])
        .assert()
        .success();

    sfadm(temp_dir.path())
        .args(["check", "--role", "admin", "--grant", "admin.list.edit"])
        .args(["all", "admin.list.edit", "admin.permissions.edit"])
        .assert()
        .code(1);
}

#[test]
fn test_check_role_tiers() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["check", "--role", "admin", "role", "general"])
        .assert()
        .success();

    sfadm(temp_dir.path())
        .args(["check", "--role", "general", "role", "admin"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("insufficient_role"));

    // Unknown roles rank below every tier
    sfadm(temp_dir.path())
        .args(["check", "--role", "owner", "role", "test_mode"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not in catalog"));
}

#[test]
fn test_check_anonymous_and_features() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["check", "--anonymous", "feature", "REPORTS"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("unauthenticated"));

    sfadm(temp_dir.path())
        .args(["check", "--anonymous", "--role", "admin", "features"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));

    sfadm(temp_dir.path())
        .args(["check", "features"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--role"));

    sfadm(temp_dir.path())
        .args(["check", "--role", "general", "--group", "REPORTS", "--format", "json"])
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"REPORTS\""))
        .stdout(predicate::str::contains("ANALYTICS").not());
}

#[test]
fn test_hash_password() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["hash-password", "--password", "correct horse"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("$argon2"));

    sfadm(temp_dir.path())
        .args(["hash-password", "--env"])
        .write_stdin("correct horse\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ADMIN_PASSWORD_HASH='$argon2"));

    sfadm(temp_dir.path())
        .arg("hash-password")
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be empty"));
}

#[test]
fn test_audit_verify_without_log() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["audit", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No audit log"));
}

#[tokio::test]
async fn test_audit_verify_detects_tampering() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("audit.log");

    let logger = SecureLogger::new(SecureLogConfig {
        log_path: log_path.clone(),
        max_size_mb: 10,
        max_rotations: 2,
    })
    .unwrap();
    logger
        .log_action(Some("uid-1"), "login", None, None, None, AuditOutcome::Success)
        .await
        .unwrap();
    logger
        .log_action(
            Some("uid-1"),
            "admin_user_delete",
            Some("uid-2".to_string()),
            None,
            None,
            AuditOutcome::Success,
        )
        .await
        .unwrap();

    sfadm(temp_dir.path())
        .args(["audit", "verify", "--log"])
        .arg(&log_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 entries"));

    sfadm(temp_dir.path())
        .args(["audit", "show", "--log"])
        .arg(&log_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("admin_user_delete"))
        .stdout(predicate::str::contains("target=uid-2"));

    let content = fs::read_to_string(&log_path).unwrap();
    fs::write(&log_path, content.replace("uid-2", "uid-3")).unwrap();

    sfadm(temp_dir.path())
        .args(["audit", "verify", "--log"])
        .arg(&log_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("chain is broken"));
}

#[test]
fn test_users_list_without_database() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .args(["users", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No admin database"));
}

#[tokio::test]
async fn test_users_list_keeps_server_audit_chain() {
    let temp_dir = TempDir::new().unwrap();
    let admin_dir = temp_dir.path().join("data").join("admin");
    let audit_path = admin_dir.join("audit.log");

    let server = AdminDatabase::new(AdminDatabaseConfig {
        database_path: admin_dir.join("storefront_admin.db"),
        secure_log_config: SecureLogConfig {
            log_path: audit_path.clone(),
            max_size_mb: 10,
            max_rotations: 2,
        },
        ..AdminDatabaseConfig::default()
    })
    .await
    .unwrap();
    server
        .create_admin_user(
            NewAdminUser::new("uid-1", "lead@example.com", Role::ADMIN),
            None,
        )
        .await
        .unwrap();

    sfadm(temp_dir.path())
        .args(["users", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lead@example.com"));

    server
        .create_admin_user(
            NewAdminUser::new("uid-2", "staff@example.com", Role::GENERAL),
            None,
        )
        .await
        .unwrap();
    server.close().await.unwrap();

    sfadm(temp_dir.path())
        .args(["audit", "verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 entries"));
}

#[test]
fn test_health_command_json() {
    let temp_dir = TempDir::new().unwrap();

    sfadm(temp_dir.path())
        .env("API_PORT", "1")
        .args(["health", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"components\""))
        .stdout(predicate::str::contains("builtin catalog"))
        .stdout(predicate::str::contains("\"offline\""));
}
