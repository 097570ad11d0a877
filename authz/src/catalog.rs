//! The permission catalog: the closed set of permission identifiers, the
//! feature-area groups built from them and the ordered list of role tiers.
//!
//! The catalog is configuration, not code. The storefront ships a builtin
//! catalog and the same document as `config/permissions.yaml`; deployments
//! may load their own copy at start-up. Once loaded it is never mutated.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AuthzError, Result};
use crate::types::{groups, permissions, Permission, Role};

const BUILTIN_VERSION: &str = "1.0.0";

/// Roles from lowest to highest tier.
const BUILTIN_ROLES: &[&str] = &["test_mode", "general", "admin", "super_admin"];

const BUILTIN_PERMISSIONS: &[(&str, &str)] = &[
    (permissions::ADMIN_LOGIN, "Sign in to the admin console"),
    (permissions::ADMIN_LIST_EDIT, "Add and remove admin accounts"),
    (permissions::ADMIN_PERMISSIONS_EDIT, "Change admin roles and permissions"),
    (permissions::PRODUCTS_VIEW, "View the product list"),
    (permissions::PRODUCTS_EDIT, "Edit products"),
    (permissions::PRODUCTS_DELETE, "Delete products"),
    (permissions::PRODUCTS_POPULARITY_VIEW, "View product popularity"),
    (permissions::ORDERS_VIEW, "View purchase history"),
    (permissions::ORDERS_EDIT, "Edit orders"),
    (permissions::ORDERS_CAPTURE, "Capture order payments"),
    (permissions::CUSTOMERS_VIEW, "View customers"),
    (permissions::CUSTOMERS_EDIT, "Edit customers"),
    (permissions::CUSTOMERS_DELETE, "Delete customers"),
    (permissions::ANALYTICS_VIEW, "View analytics"),
    (permissions::ANALYTICS_EXPORT, "Export analytics"),
    (permissions::ANALYTICS_PROFIT_VIEW, "View profit figures"),
    (permissions::ANALYTICS_PROFIT_EDIT, "Edit profit settings"),
    (permissions::SYSTEM_SETTINGS, "Change system settings"),
    (permissions::SYSTEM_MAINTENANCE, "Run maintenance tasks"),
    (permissions::REPORTS_SALES_VIEW, "View sales reports"),
    (permissions::REPORTS_INVENTORY_VIEW, "View inventory reports"),
    (permissions::REPORTS_FINANCIAL_VIEW, "View financial reports"),
    (permissions::SHIPPING_MANAGE, "Manage shipping"),
    (permissions::NOTIFICATIONS_SEND, "Send notifications"),
    (permissions::PROMOTIONS_MANAGE, "Manage promotions"),
    (permissions::INVENTORY_MANAGE, "Manage inventory"),
    (permissions::DATA_IMPORT, "Import data"),
    (permissions::DATA_EXPORT, "Export data"),
    (permissions::AUDIT_LOGS_VIEW, "View audit logs"),
    (permissions::SECURITY_MANAGE, "Manage security settings"),
];

const BUILTIN_GROUPS: &[(&str, &[&str])] = &[
    (
        groups::ADMIN_MANAGEMENT,
        &[permissions::ADMIN_PERMISSIONS_EDIT, permissions::ADMIN_LIST_EDIT],
    ),
    (
        groups::PRODUCT_MANAGEMENT,
        &[
            permissions::PRODUCTS_VIEW,
            permissions::PRODUCTS_EDIT,
            permissions::PRODUCTS_DELETE,
            permissions::PRODUCTS_POPULARITY_VIEW,
        ],
    ),
    (
        groups::ORDER_MANAGEMENT,
        &[
            permissions::ORDERS_VIEW,
            permissions::ORDERS_EDIT,
            permissions::ORDERS_CAPTURE,
        ],
    ),
    (
        groups::CUSTOMER_MANAGEMENT,
        &[
            permissions::CUSTOMERS_VIEW,
            permissions::CUSTOMERS_EDIT,
            permissions::CUSTOMERS_DELETE,
        ],
    ),
    (
        groups::ANALYTICS,
        &[
            permissions::ANALYTICS_VIEW,
            permissions::ANALYTICS_EXPORT,
            permissions::ANALYTICS_PROFIT_VIEW,
            permissions::ANALYTICS_PROFIT_EDIT,
        ],
    ),
    (
        groups::SYSTEM_MANAGEMENT,
        &[permissions::SYSTEM_SETTINGS, permissions::SYSTEM_MAINTENANCE],
    ),
    (
        groups::REPORTS,
        &[
            permissions::REPORTS_SALES_VIEW,
            permissions::REPORTS_INVENTORY_VIEW,
            permissions::REPORTS_FINANCIAL_VIEW,
        ],
    ),
    (
        groups::OPERATIONS,
        &[
            permissions::SHIPPING_MANAGE,
            permissions::NOTIFICATIONS_SEND,
            permissions::PROMOTIONS_MANAGE,
            permissions::INVENTORY_MANAGE,
        ],
    ),
    (
        groups::DATA_MANAGEMENT,
        &[permissions::DATA_IMPORT, permissions::DATA_EXPORT],
    ),
    (
        groups::SECURITY,
        &[permissions::AUDIT_LOGS_VIEW, permissions::SECURITY_MANAGE],
    ),
    (groups::BASIC_ACCESS, &[permissions::ADMIN_LOGIN]),
];

static BUILTIN: Lazy<PermissionCatalog> = Lazy::new(PermissionCatalog::builtin);

/// Returns the process-wide builtin catalog.
pub fn builtin_catalog() -> &'static PermissionCatalog {
    &BUILTIN
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDef {
    pub id: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The closed permission catalog with its groups and role order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCatalog {
    version: String,
    /// Lowest tier first
    roles: Vec<Role>,
    permissions: Vec<PermissionDef>,
    groups: BTreeMap<String, Vec<Permission>>,
}

impl PermissionCatalog {
    /// Builds the storefront catalog from the builtin tables.
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_VERSION.to_string(),
            roles: BUILTIN_ROLES.iter().map(|r| Role::from(*r)).collect(),
            permissions: BUILTIN_PERMISSIONS
                .iter()
                .map(|(id, description)| PermissionDef {
                    id: Permission::from(*id),
                    description: Some(description.to_string()),
                })
                .collect(),
            groups: BUILTIN_GROUPS
                .iter()
                .map(|(name, members)| {
                    (
                        name.to_string(),
                        members.iter().map(|p| Permission::from(*p)).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Parses and validates a catalog document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let catalog: Self =
            serde_yaml::from_str(content).map_err(|e| AuthzError::CatalogParse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads and validates a catalog file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&content)?;
        debug!(
            "Loaded permission catalog {} from {}",
            catalog.version,
            path.display()
        );
        Ok(catalog)
    }

    /// Loads the catalog at `path` when the file exists, the builtin one otherwise.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            let catalog = Self::from_file(path)?;
            info!(
                "Using permission catalog {} from {}",
                catalog.version,
                path.display()
            );
            Ok(catalog)
        } else {
            info!(
                "No permission catalog at {}, using builtin catalog",
                path.display()
            );
            Ok(Self::builtin())
        }
    }

    /// Serializes the catalog back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| AuthzError::Serialization(e.to_string()))
    }

    /// Checks the structural rules every catalog must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(AuthzError::CatalogValidation(
                "catalog version cannot be empty".to_string(),
            ));
        }

        if self.roles.is_empty() {
            return Err(AuthzError::CatalogValidation(
                "catalog must define at least one role".to_string(),
            ));
        }

        let mut seen_roles = HashSet::new();
        for role in &self.roles {
            if role.as_str().is_empty() {
                return Err(AuthzError::CatalogValidation(
                    "role names cannot be empty".to_string(),
                ));
            }
            if !seen_roles.insert(role.as_str()) {
                return Err(AuthzError::CatalogValidation(format!(
                    "duplicate role '{}'",
                    role
                )));
            }
        }

        let mut seen_permissions = HashSet::new();
        for def in &self.permissions {
            if !is_well_formed(def.id.as_str()) {
                return Err(AuthzError::CatalogValidation(format!(
                    "malformed permission id '{}'",
                    def.id
                )));
            }
            if !seen_permissions.insert(def.id.as_str()) {
                return Err(AuthzError::CatalogValidation(format!(
                    "duplicate permission '{}'",
                    def.id
                )));
            }
        }

        for (name, members) in &self.groups {
            if name.trim().is_empty() {
                return Err(AuthzError::CatalogValidation(
                    "group names cannot be empty".to_string(),
                ));
            }
            if let Some(unknown) = members
                .iter()
                .find(|p| !seen_permissions.contains(p.as_str()))
            {
                return Err(AuthzError::CatalogValidation(format!(
                    "group '{}' references unknown permission '{}'",
                    name, unknown
                )));
            }
        }

        Ok(())
    }

    /// Catalog version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Roles, lowest tier first.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Every catalog entry in declaration order.
    pub fn permissions(&self) -> &[PermissionDef] {
        &self.permissions
    }

    /// Whether `permission` is a catalog identifier.
    pub fn contains(&self, permission: &str) -> bool {
        self.permissions.iter().any(|def| def.id.as_str() == permission)
    }

    /// Whether `role` is one of the catalog's tiers.
    pub fn is_known_role(&self, role: &str) -> bool {
        self.role_tier(role) > 0
    }

    /// Integer tier of a role: its 1-based position in the role list, 0 if unknown.
    pub fn role_tier(&self, role: &str) -> usize {
        self.roles
            .iter()
            .position(|r| r.as_str() == role)
            .map_or(0, |index| index + 1)
    }

    /// Members of a named group.
    pub fn group(&self, name: &str) -> Option<&[Permission]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Group names in sorted order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `area.resource[.action]`: at least two non-empty segments of lowercase
/// letters, digits and underscores.
fn is_well_formed(id: &str) -> bool {
    let segments: Vec<&str> = id.split('.').collect();
    segments.len() >= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        })
}
