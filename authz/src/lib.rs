//! Role-based access control for the storefront admin console.
//!
//! This crate holds the permission model every privileged page and API call
//! consults: a closed catalog of permission identifiers, the feature-area
//! groups built from it, the ordered role tiers, and a pure evaluator that
//! answers yes/no questions about a possibly-absent [`AdminPrincipal`].
//!
//! # Authorization Flow
//!
//! 1. **Authentication** happens elsewhere and yields an identity
//! 2. **Resolution** turns that identity into an [`AdminPrincipal`] from the
//!    persisted admin-user record (or none)
//! 3. **Evaluation** checks the principal's permission set or role tier
//! 4. **Decision**: allow, or deny; deny is the answer to every absent,
//!    unknown or unresolved input
//!
//! # Security Architecture
//!
//! - The permission set is the source of truth; the role is a coarse tier
//! - UI checks are a usability aid; request handlers re-check before every
//!   write
//! - The catalog is immutable after start-up and safe to share across threads
//!
//! # Example
//!
//! ```rust
//! use authz::{has_permission, can_access_by_role, AdminPrincipal, Role};
//!
//! let staff = AdminPrincipal::new("uid-1", "staff@example.com", Role::GENERAL)
//!     .with_permissions(["orders.view"]);
//!
//! assert!(has_permission(Some(&staff), "orders.view"));
//! assert!(!has_permission(Some(&staff), "orders.edit"));
//! assert!(can_access_by_role(Some(&staff), "general"));
//! assert!(!can_access_by_role(None, "test_mode"));
//! ```

pub mod catalog;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod types;

pub use catalog::{builtin_catalog, PermissionCatalog, PermissionDef};
pub use decision::{Decision, DenyReason};
pub use error::{AuthzError, Result};
pub use evaluator::{
    can_access_by_role, can_access_feature, has_all_permissions, has_any_permission,
    has_permission, Evaluator,
};
pub use types::{groups, permissions, AdminPrincipal, Permission, Role};
