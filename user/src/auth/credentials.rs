//! Console sign-in credentials

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use std::env;
use tracing::{debug, warn};

use crate::error::{Result, UserError};

/// The configured console account: an email and an argon2 PHC password hash
#[derive(Clone)]
pub struct AdminCredentials {
    email: String,
    password_hash: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

impl AdminCredentials {
    pub const EMAIL_VAR: &'static str = "ADMIN_EMAIL";
    pub const PASSWORD_HASH_VAR: &'static str = "ADMIN_PASSWORD_HASH";

    /// Build credentials, rejecting a hash that is not a PHC string
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Result<Self> {
        let email = email.into();
        let password_hash = password_hash.into();

        if email.trim().is_empty() {
            return Err(UserError::Configuration("admin email is empty".to_string()));
        }
        PasswordHash::new(&password_hash)
            .map_err(|e| UserError::Configuration(format!("Invalid admin password hash: {}", e)))?;

        Ok(Self {
            email,
            password_hash,
        })
    }

    /// Load from `ADMIN_EMAIL` and `ADMIN_PASSWORD_HASH`; both are required
    pub fn from_env() -> Result<Self> {
        let email = env::var(Self::EMAIL_VAR).map_err(|_| {
            UserError::Configuration(format!("{} environment variable is required", Self::EMAIL_VAR))
        })?;
        let password_hash = env::var(Self::PASSWORD_HASH_VAR).map_err(|_| {
            UserError::Configuration(format!(
                "{} environment variable is required",
                Self::PASSWORD_HASH_VAR
            ))
        })?;
        Self::new(email, password_hash)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Exact email match plus argon2 password verification
    pub fn verify(&self, email: &str, password: &str) -> bool {
        if email != self.email {
            debug!("Sign-in attempt for unknown email");
            return false;
        }

        let parsed = match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored admin password hash is unreadable: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Hash a password into an argon2id PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| UserError::Password(format!("Failed to encode salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| UserError::Password(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let creds = AdminCredentials::new("admin@example.com", hash).unwrap();
        assert!(creds.verify("admin@example.com", "correct horse"));
        assert!(!creds.verify("admin@example.com", "wrong"));
        assert!(!creds.verify("Admin@example.com", "correct horse"));
        assert!(!creds.verify("", ""));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("pw").unwrap(), hash_password("pw").unwrap());
    }

    #[test]
    fn test_rejects_plain_text_hash() {
        let err = AdminCredentials::new("admin@example.com", "hunter2").unwrap_err();
        assert!(matches!(err, UserError::Configuration(_)));

        let err = AdminCredentials::new("  ", hash_password("pw").unwrap()).unwrap_err();
        assert!(matches!(err, UserError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let creds = AdminCredentials::new("admin@example.com", hash_password("pw").unwrap()).unwrap();
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("argon2"));
    }
}
