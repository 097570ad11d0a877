//! Admin user records and authentication types

use authz::{AdminPrincipal, Permission, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;

use crate::error::{Result, UserError};

/// A persisted admin user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    /// Identity-provider uid the record is keyed on
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    /// The principal the evaluator checks for this record
    pub fn principal(&self) -> AdminPrincipal {
        let mut principal = AdminPrincipal::new(self.uid.clone(), self.email.clone(), self.role.clone())
            .with_permissions(self.permissions.iter().cloned());
        if let Some(name) = &self.name {
            principal = principal.with_name(name.clone());
        }
        principal
    }
}

/// Raw `admin_users` row; permissions are stored as a JSON array
#[derive(Debug, Clone, FromRow)]
pub(crate) struct AdminUserRow {
    pub id: String,
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub permissions: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = UserError;

    fn try_from(row: AdminUserRow) -> Result<Self> {
        let permissions: Vec<String> = serde_json::from_str(&row.permissions).map_err(|e| {
            UserError::InvalidRecord(format!("permissions of {} are not a JSON array: {}", row.uid, e))
        })?;

        Ok(Self {
            id: row.id,
            uid: row.uid,
            email: row.email,
            name: row.name,
            role: Role::from(row.role),
            permissions: permissions.into_iter().map(Permission::from).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Data for a new admin user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdminUser {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl NewAdminUser {
    pub fn new(uid: impl Into<String>, email: impl Into<String>, role: impl Into<Role>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            name: None,
            role: role.into(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials matched and an admin record exists for the email
    Authenticated(AdminUser),
    /// Email or password did not match
    InvalidCredentials,
    /// Credentials matched but no admin record exists for the email
    NotAnAdmin,
}
