//! Core authorization types: permissions, roles and the admin principal.
//!
//! # Security Considerations
//!
//! ## 1. Principal Identity
//! - A principal must be built from a persisted admin-user record, looked up
//!   by the identity the authentication layer confirmed
//! - Never build a principal from client-supplied role or permission data
//!
//! ## 2. Role versus Permission Set
//! - The role is a coarse tier used for redirects and default-access
//!   heuristics
//! - The permission set is the authorization source of truth; every write
//!   path checks set membership, never the role alone
//!
//! ## 3. Catalog Contract
//! - Permission identifiers and group names are part of the public interface
//! - Renaming an identifier is a breaking change for every consumer

use serde::{Deserialize, Serialize};
use std::borrow::{Borrow, Cow};
use std::collections::BTreeSet;
use std::fmt;

/// Permission identifiers of the storefront catalog.
///
/// Identifiers are namespaced `area.resource[.action]`.
pub mod permissions {
    pub const ADMIN_LOGIN: &str = "admin.login";
    pub const ADMIN_LIST_EDIT: &str = "admin.list.edit";
    pub const ADMIN_PERMISSIONS_EDIT: &str = "admin.permissions.edit";

    pub const PRODUCTS_VIEW: &str = "products.view";
    pub const PRODUCTS_EDIT: &str = "products.edit";
    pub const PRODUCTS_DELETE: &str = "products.delete";
    pub const PRODUCTS_POPULARITY_VIEW: &str = "products.popularity.view";

    pub const ORDERS_VIEW: &str = "orders.view";
    pub const ORDERS_EDIT: &str = "orders.edit";
    pub const ORDERS_CAPTURE: &str = "orders.capture";

    pub const CUSTOMERS_VIEW: &str = "customers.view";
    pub const CUSTOMERS_EDIT: &str = "customers.edit";
    pub const CUSTOMERS_DELETE: &str = "customers.delete";

    pub const ANALYTICS_VIEW: &str = "analytics.view";
    pub const ANALYTICS_EXPORT: &str = "analytics.export";
    pub const ANALYTICS_PROFIT_VIEW: &str = "analytics.profit.view";
    pub const ANALYTICS_PROFIT_EDIT: &str = "analytics.profit.edit";

    pub const SYSTEM_SETTINGS: &str = "system.settings";
    pub const SYSTEM_MAINTENANCE: &str = "system.maintenance";

    pub const REPORTS_SALES_VIEW: &str = "reports.sales.view";
    pub const REPORTS_INVENTORY_VIEW: &str = "reports.inventory.view";
    pub const REPORTS_FINANCIAL_VIEW: &str = "reports.financial.view";

    pub const SHIPPING_MANAGE: &str = "shipping.manage";
    pub const NOTIFICATIONS_SEND: &str = "notifications.send";
    pub const PROMOTIONS_MANAGE: &str = "promotions.manage";
    pub const INVENTORY_MANAGE: &str = "inventory.manage";
    pub const DATA_IMPORT: &str = "data.import";
    pub const DATA_EXPORT: &str = "data.export";
    pub const AUDIT_LOGS_VIEW: &str = "audit.logs.view";
    pub const SECURITY_MANAGE: &str = "security.manage";
}

/// Feature-area group names of the storefront catalog.
pub mod groups {
    pub const ADMIN_MANAGEMENT: &str = "ADMIN_MANAGEMENT";
    pub const PRODUCT_MANAGEMENT: &str = "PRODUCT_MANAGEMENT";
    pub const ORDER_MANAGEMENT: &str = "ORDER_MANAGEMENT";
    pub const CUSTOMER_MANAGEMENT: &str = "CUSTOMER_MANAGEMENT";
    pub const ANALYTICS: &str = "ANALYTICS";
    pub const SYSTEM_MANAGEMENT: &str = "SYSTEM_MANAGEMENT";
    pub const REPORTS: &str = "REPORTS";
    pub const OPERATIONS: &str = "OPERATIONS";
    pub const DATA_MANAGEMENT: &str = "DATA_MANAGEMENT";
    pub const SECURITY: &str = "SECURITY";
    pub const BASIC_ACCESS: &str = "BASIC_ACCESS";
}

/// An opaque permission identifier.
///
/// Unknown identifiers are legal values; they simply never match anything
/// a principal was granted unless it was granted exactly that string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Creates a permission from any string.
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the leading namespace segment (`products` for `products.edit`).
    pub fn area(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// Hash, Eq and Ord of `Cow<str>` all delegate to `str`.
impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }
}

impl From<String> for Permission {
    fn from(id: String) -> Self {
        Self(Cow::Owned(id))
    }
}

/// A role label.
///
/// Roles are kept as strings because persisted records may carry a label the
/// catalog does not know; such a role ranks below every known tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const TEST_MODE: Role = Role(Cow::Borrowed("test_mode"));
    pub const GENERAL: Role = Role(Cow::Borrowed("general"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const SUPER_ADMIN: Role = Role(Cow::Borrowed("super_admin"));

    /// Creates a role from any label.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the role label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// An authenticated staff member as seen by the evaluator.
///
/// The evaluator reads only `role` and `permissions`. The identity fields are
/// carried for logging and for the callers that render them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPrincipal {
    /// External identity-provider user id
    pub uid: String,

    /// Email address the account signs in with
    pub email: String,

    /// Display name, if the record has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Coarse access tier
    pub role: Role,

    /// Granted permissions; the authorization source of truth
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl AdminPrincipal {
    /// Creates a principal with no granted permissions.
    pub fn new(uid: impl Into<String>, email: impl Into<String>, role: impl Into<Role>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            name: None,
            role: role.into(),
            permissions: BTreeSet::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds granted permissions. Duplicates collapse.
    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Exact membership test against the granted set.
    pub fn holds(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_creation() {
        let permission = Permission::new("products.edit");
        assert_eq!(permission.as_str(), "products.edit");
        assert_eq!(permission.area(), "products");
        assert_eq!(permission.to_string(), "products.edit");
    }

    #[test]
    fn test_permission_owned_and_borrowed_compare_equal() {
        let borrowed = Permission::from(permissions::ORDERS_VIEW);
        let owned = Permission::from(String::from("orders.view"));
        assert_eq!(borrowed, owned);
    }

    #[test]
    fn test_role_constants() {
        assert_eq!(Role::TEST_MODE.as_str(), "test_mode");
        assert_eq!(Role::GENERAL.as_str(), "general");
        assert_eq!(Role::ADMIN.as_str(), "admin");
        assert_eq!(Role::SUPER_ADMIN.as_str(), "super_admin");
        assert_eq!(Role::from(String::from("admin")), Role::ADMIN);
    }

    #[test]
    fn test_role_serializes_as_plain_string() {
        let json = serde_json::to_string(&Role::SUPER_ADMIN).unwrap();
        assert_eq!(json, "\"super_admin\"");

        let role: Role = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(role.as_str(), "bogus");
    }

    #[test]
    fn test_principal_permissions_are_a_set() {
        let principal = AdminPrincipal::new("uid-1", "staff@example.com", Role::GENERAL)
            .with_name("Staff")
            .with_permissions([permissions::ORDERS_VIEW, permissions::ORDERS_VIEW]);

        assert_eq!(principal.permissions.len(), 1);
        assert!(principal.holds("orders.view"));
        assert!(!principal.holds("orders"));
        assert!(!principal.holds("orders.view.extra"));
        assert_eq!(principal.name.as_deref(), Some("Staff"));
    }

    #[test]
    fn test_principal_json_shape() {
        let principal = AdminPrincipal::new("uid-2", "ops@example.com", "admin")
            .with_permissions([permissions::PRODUCTS_VIEW]);

        let value = serde_json::to_value(&principal).unwrap();
        assert_eq!(value["role"], "admin");
        assert_eq!(value["permissions"][0], "products.view");
        assert!(value.get("name").is_none());

        let back: AdminPrincipal = serde_json::from_value(value).unwrap();
        assert_eq!(back, principal);
    }
}
