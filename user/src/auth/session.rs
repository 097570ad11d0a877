//! Session helpers for the signed-in admin

use chrono::{DateTime, Utc};
use tower_sessions::Session;
use tracing::debug;

use crate::error::{Result, UserError};

/// Session keys used for storing data
pub struct SessionKeys;

impl SessionKeys {
    pub const UID: &'static str = "admin_uid";
    pub const EMAIL: &'static str = "admin_email";
    pub const SIGNED_IN_AT: &'static str = "signed_in_at";
}

/// What the session remembers about the signed-in admin. Only the identity
/// is kept; the role and permissions are always re-read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub uid: String,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

/// Reads and writes the admin identity on a tower-sessions `Session`
pub struct AdminSession;

impl AdminSession {
    /// Record a successful sign-in. The session id is cycled first so a
    /// pre-login cookie cannot be reused.
    pub async fn sign_in(session: &Session, uid: &str, email: &str) -> Result<()> {
        session
            .cycle_id()
            .await
            .map_err(|e| UserError::Session(format!("Failed to cycle session id: {}", e)))?;

        session
            .insert(SessionKeys::UID, uid)
            .await
            .map_err(|e| UserError::Session(format!("Failed to set uid: {}", e)))?;

        session
            .insert(SessionKeys::EMAIL, email)
            .await
            .map_err(|e| UserError::Session(format!("Failed to set email: {}", e)))?;

        session
            .insert(SessionKeys::SIGNED_IN_AT, Utc::now())
            .await
            .map_err(|e| UserError::Session(format!("Failed to set signed_in_at: {}", e)))?;

        session
            .save()
            .await
            .map_err(|e| UserError::Session(format!("Failed to save session: {}", e)))?;

        debug!("Session created for admin: {}", uid);
        Ok(())
    }

    /// The signed-in identity, if any
    pub async fn identity(session: &Session) -> Result<Option<SessionIdentity>> {
        let uid: Option<String> = session
            .get(SessionKeys::UID)
            .await
            .map_err(|e| UserError::Session(format!("Failed to get uid: {}", e)))?;

        let Some(uid) = uid else {
            return Ok(None);
        };

        let email: String = session
            .get(SessionKeys::EMAIL)
            .await
            .map_err(|e| UserError::Session(format!("Failed to get email: {}", e)))?
            .unwrap_or_default();

        let signed_in_at = session
            .get(SessionKeys::SIGNED_IN_AT)
            .await
            .map_err(|e| UserError::Session(format!("Failed to get signed_in_at: {}", e)))?
            .unwrap_or_else(Utc::now);

        Ok(Some(SessionIdentity {
            uid,
            email,
            signed_in_at,
        }))
    }

    /// The signed-in uid, if any
    pub async fn signed_in_uid(session: &Session) -> Result<Option<String>> {
        Ok(Self::identity(session).await?.map(|identity| identity.uid))
    }

    /// Destroy the session (logout)
    pub async fn sign_out(session: &Session) -> Result<()> {
        session
            .flush()
            .await
            .map_err(|e| UserError::Session(format!("Failed to flush session: {}", e)))?;

        debug!("Session destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn test_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let session = test_session();
        assert!(AdminSession::identity(&session).await.unwrap().is_none());

        AdminSession::sign_in(&session, "uid-1", "admin@example.com")
            .await
            .unwrap();

        let identity = AdminSession::identity(&session).await.unwrap().unwrap();
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.email, "admin@example.com");
        assert_eq!(
            AdminSession::signed_in_uid(&session).await.unwrap().as_deref(),
            Some("uid-1")
        );

        AdminSession::sign_out(&session).await.unwrap();
        assert!(AdminSession::identity(&session).await.unwrap().is_none());
        assert!(AdminSession::signed_in_uid(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_cycles_session_id() {
        let session = test_session();
        session.insert("pre_login", true).await.unwrap();
        session.save().await.unwrap();
        let before = session.id();

        AdminSession::sign_in(&session, "uid-1", "admin@example.com")
            .await
            .unwrap();

        assert!(session.id().is_some());
        assert_ne!(session.id(), before);
    }
}
