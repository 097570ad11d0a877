//! Authentication for the storefront admin console
//!
//! This module provides:
//! - Email/password sign-in against the configured console account
//! - The admin-access check for an identity-provider uid
//! - Session helpers and the SQLx-backed tower-sessions store

pub mod credentials;
pub mod session;
pub mod store;
pub mod types;

use authz::{has_permission, permissions};
use std::sync::Arc;
use tracing::{info, warn};

pub use credentials::{hash_password, AdminCredentials};
pub use session::{AdminSession, SessionIdentity, SessionKeys};
pub use store::{SameSiteConfig, SessionConfig, SqlxSessionStore};
pub use types::{AdminUser, LoginOutcome, NewAdminUser};

use crate::{
    database::AdminDatabase,
    error::Result,
    secure_log::{AuditOutcome, SecureLogger},
};

/// Signs admins in and answers admin-access checks
#[derive(Clone)]
pub struct AdminAuthenticator {
    db: Arc<AdminDatabase>,
    secure_logger: Arc<SecureLogger>,
    credentials: AdminCredentials,
}

impl AdminAuthenticator {
    pub fn new(
        db: Arc<AdminDatabase>,
        secure_logger: Arc<SecureLogger>,
        credentials: AdminCredentials,
    ) -> Self {
        Self {
            db,
            secure_logger,
            credentials,
        }
    }

    /// Check email and password, then look up the admin record for the email
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<String>,
    ) -> Result<LoginOutcome> {
        info!("Sign-in attempt");

        if !self.credentials.verify(email, password) {
            self.secure_logger
                .log_action(
                    None,
                    "login",
                    None,
                    Some(serde_json::json!({ "details": "invalid credentials" })),
                    ip_address,
                    AuditOutcome::Failure,
                )
                .await?;
            warn!("Sign-in failed: invalid credentials");
            return Ok(LoginOutcome::InvalidCredentials);
        }

        let Some(user) = self.db.get_by_email(email).await? else {
            self.secure_logger
                .log_action(
                    None,
                    "login",
                    Some(email.to_string()),
                    Some(serde_json::json!({ "details": "no admin record" })),
                    ip_address,
                    AuditOutcome::Failure,
                )
                .await?;
            warn!("Sign-in refused: no admin record for {}", email);
            return Ok(LoginOutcome::NotAnAdmin);
        };

        self.secure_logger
            .log_action(
                Some(&user.uid),
                "login",
                Some(user.email.clone()),
                None,
                ip_address,
                AuditOutcome::Success,
            )
            .await?;
        info!("Admin {} signed in", user.uid);

        Ok(LoginOutcome::Authenticated(user))
    }

    /// Whether `uid` belongs to an admin allowed to sign in to the console
    pub async fn check_access(&self, uid: &str, email: Option<&str>) -> Result<bool> {
        let principal = self.db.get_by_uid(uid).await?.map(|user| user.principal());
        let has_access = has_permission(principal.as_ref(), permissions::ADMIN_LOGIN);

        let outcome = if has_access {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };
        self.secure_logger
            .log_action(
                Some(uid),
                "check_access",
                email.map(str::to_string),
                None,
                None,
                outcome,
            )
            .await?;

        Ok(has_access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::AdminDatabaseConfig;
    use crate::secure_log::SecureLogConfig;
    use authz::Role;
    use tempfile::TempDir;

    async fn authenticator(temp_dir: &TempDir) -> (AdminAuthenticator, Arc<AdminDatabase>) {
        let db = Arc::new(
            AdminDatabase::new(AdminDatabaseConfig {
                database_path: temp_dir.path().join("admin.db"),
                max_connections: 5,
                connection_timeout: 30,
                secure_log_config: SecureLogConfig {
                    log_path: temp_dir.path().join("audit.log"),
                    max_size_mb: 10,
                    max_rotations: 5,
                },
            })
            .await
            .unwrap(),
        );
        let credentials =
            AdminCredentials::new("admin@example.com", hash_password("s3cret").unwrap()).unwrap();
        let auth = AdminAuthenticator::new(db.clone(), db.audit_log().unwrap(), credentials);
        (auth, db)
    }

    #[tokio::test]
    async fn test_authenticate_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let (auth, db) = authenticator(&temp_dir).await;

        assert_eq!(
            auth.authenticate("admin@example.com", "wrong", None).await.unwrap(),
            LoginOutcome::InvalidCredentials
        );
        assert_eq!(
            auth.authenticate("admin@example.com", "s3cret", None).await.unwrap(),
            LoginOutcome::NotAnAdmin
        );

        db.create_admin_user(
            NewAdminUser::new("uid-1", "admin@example.com", Role::SUPER_ADMIN),
            None,
        )
        .await
        .unwrap();

        match auth
            .authenticate("admin@example.com", "s3cret", Some("127.0.0.1".to_string()))
            .await
            .unwrap()
        {
            LoginOutcome::Authenticated(user) => assert_eq!(user.uid, "uid-1"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let results: Vec<String> = db
            .audit_log()
            .unwrap()
            .entries()
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == "login")
            .map(|e| e.result)
            .collect();
        assert_eq!(results, vec!["failure", "failure", "success"]);
    }

    #[tokio::test]
    async fn test_check_access_requires_login_permission() {
        let temp_dir = TempDir::new().unwrap();
        let (auth, db) = authenticator(&temp_dir).await;

        db.create_admin_user(
            NewAdminUser::new("uid-1", "a@example.com", Role::GENERAL)
                .with_permissions([permissions::ADMIN_LOGIN]),
            None,
        )
        .await
        .unwrap();
        db.create_admin_user(
            NewAdminUser::new("uid-2", "b@example.com", Role::SUPER_ADMIN)
                .with_permissions([permissions::ORDERS_VIEW]),
            None,
        )
        .await
        .unwrap();

        assert!(auth.check_access("uid-1", Some("a@example.com")).await.unwrap());
        assert!(!auth.check_access("uid-2", None).await.unwrap());
        assert!(!auth.check_access("uid-3", None).await.unwrap());
    }
}
