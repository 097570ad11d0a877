//! The signed-in admin as seen by request handlers.
//!
//! An [`AdminContext`] is built from an identity (the uid kept in the
//! session) by reading the admin-user record. It never trusts anything the
//! client sent beyond that uid, and it only ever reads the evaluator.

use authz::{AdminPrincipal, Decision, Evaluator, Permission, PermissionCatalog, Role};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::database::AdminDatabase;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct AdminContext {
    principal: Option<AdminPrincipal>,
    catalog: Arc<PermissionCatalog>,
}

impl AdminContext {
    /// Resolve `uid` to a principal. No uid, or no record for it, gives an
    /// unauthenticated context.
    pub async fn resolve(
        db: &AdminDatabase,
        catalog: Arc<PermissionCatalog>,
        uid: Option<&str>,
    ) -> Result<Self> {
        let principal = match uid {
            Some(uid) => {
                let record = db.get_by_uid(uid).await?;
                if record.is_none() {
                    debug!("No admin record for signed-in uid {}", uid);
                }
                record.map(|user| user.principal())
            }
            None => None,
        };

        Ok(Self { principal, catalog })
    }

    /// A context around an already resolved principal
    pub fn new(principal: Option<AdminPrincipal>, catalog: Arc<PermissionCatalog>) -> Self {
        Self { principal, catalog }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn principal(&self) -> Option<&AdminPrincipal> {
        self.principal.as_ref()
    }

    pub fn uid(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.uid.as_str())
    }

    pub fn role(&self) -> Option<&Role> {
        self.principal.as_ref().map(|p| &p.role)
    }

    /// Granted permissions; empty when unauthenticated
    pub fn permissions(&self) -> BTreeSet<Permission> {
        self.principal
            .as_ref()
            .map(|p| p.permissions.clone())
            .unwrap_or_default()
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.catalog)
    }

    pub fn check_permission(&self, permission: &str) -> bool {
        self.evaluator().has_permission(self.principal(), permission)
    }

    pub fn check_any_permission<I>(&self, permissions: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.evaluator().has_any_permission(self.principal(), permissions)
    }

    pub fn check_all_permissions<I>(&self, permissions: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.evaluator().has_all_permissions(self.principal(), permissions)
    }

    pub fn check_role(&self, required_role: &str) -> bool {
        self.evaluator().can_access_by_role(self.principal(), required_role)
    }

    pub fn check_feature(&self, group: &str) -> bool {
        self.evaluator().can_access_feature(self.principal(), group)
    }

    /// Decision for a set of required permissions, for audit logging
    pub fn decide_all<I>(&self, permissions: I) -> Decision
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.evaluator().check_all_permissions(self.principal(), permissions)
    }

    /// Names of the feature groups this admin can open
    pub fn accessible_features(&self) -> Vec<&str> {
        self.evaluator().accessible_features(self.principal())
    }

    /// Re-read the record, picking up role and permission changes. A deleted
    /// record leaves the context unauthenticated.
    pub async fn refresh(&mut self, db: &AdminDatabase) -> Result<()> {
        if let Some(uid) = self.uid().map(str::to_string) {
            self.principal = db.get_by_uid(&uid).await?.map(|user| user.principal());
        }
        Ok(())
    }

    pub fn sign_out(&mut self) {
        self.principal = None;
    }
}
