//! The permission evaluator.
//!
//! Every operation is a pure lookup against an immutable catalog and the
//! two fields of a principal it reads (`role`, `permissions`). Nothing here
//! blocks, allocates shared state or fails: an absent principal, an unknown
//! permission and an unknown role all come back as a deny.

use crate::catalog::{builtin_catalog, PermissionCatalog};
use crate::decision::{Decision, DenyReason};
use crate::types::AdminPrincipal;

/// Exact membership of `permission` in the principal's granted set.
pub fn has_permission(principal: Option<&AdminPrincipal>, permission: &str) -> bool {
    principal.is_some_and(|p| p.holds(permission))
}

/// True iff at least one of `permissions` is granted. An empty input is false.
pub fn has_any_permission<I>(principal: Option<&AdminPrincipal>, permissions: I) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    principal.is_some_and(|p| permissions.into_iter().any(|perm| p.holds(perm.as_ref())))
}

/// True iff every one of `permissions` is granted.
///
/// An empty input is vacuously true for a present principal. Callers that
/// mean "no requirement" must not rely on this without checking upstream
/// that the requirement list is non-empty.
pub fn has_all_permissions<I>(principal: Option<&AdminPrincipal>, permissions: I) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    principal.is_some_and(|p| permissions.into_iter().all(|perm| p.holds(perm.as_ref())))
}

/// Role threshold check against the builtin catalog's tiers.
pub fn can_access_by_role(principal: Option<&AdminPrincipal>, required_role: &str) -> bool {
    Evaluator::builtin().can_access_by_role(principal, required_role)
}

/// Feature-area check against the builtin catalog's groups.
pub fn can_access_feature(principal: Option<&AdminPrincipal>, group: &str) -> bool {
    Evaluator::builtin().can_access_feature(principal, group)
}

/// Evaluator bound to one catalog.
///
/// `Copy` and borrow-only, so it can be handed to any number of threads.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'c> {
    catalog: &'c PermissionCatalog,
}

impl<'c> Evaluator<'c> {
    pub fn new(catalog: &'c PermissionCatalog) -> Self {
        Self { catalog }
    }

    /// Evaluator over the process-wide builtin catalog.
    pub fn builtin() -> Evaluator<'static> {
        Evaluator::new(builtin_catalog())
    }

    pub fn catalog(&self) -> &'c PermissionCatalog {
        self.catalog
    }

    pub fn has_permission(&self, principal: Option<&AdminPrincipal>, permission: &str) -> bool {
        has_permission(principal, permission)
    }

    pub fn has_any_permission<I>(&self, principal: Option<&AdminPrincipal>, permissions: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        has_any_permission(principal, permissions)
    }

    pub fn has_all_permissions<I>(&self, principal: Option<&AdminPrincipal>, permissions: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        has_all_permissions(principal, permissions)
    }

    /// True iff the principal's tier is at least the tier of `required_role`.
    ///
    /// Unknown labels rank 0 on either side, so a principal with an unknown
    /// role never satisfies a known role.
    pub fn can_access_by_role(&self, principal: Option<&AdminPrincipal>, required_role: &str) -> bool {
        principal.is_some_and(|p| {
            self.catalog.role_tier(p.role.as_str()) >= self.catalog.role_tier(required_role)
        })
    }

    /// `has_any_permission` over the members of `group`; false for an unknown group.
    pub fn can_access_feature(&self, principal: Option<&AdminPrincipal>, group: &str) -> bool {
        match self.catalog.group(group) {
            Some(members) => has_any_permission(principal, members),
            None => false,
        }
    }

    /// Names of the feature groups the principal can access.
    pub fn accessible_features(&self, principal: Option<&AdminPrincipal>) -> Vec<&'c str> {
        self.catalog
            .group_names()
            .filter(|group| self.can_access_feature(principal, group))
            .collect()
    }

    /// Same answer as [`Evaluator::has_permission`], with a deny reason.
    pub fn check_permission(&self, principal: Option<&AdminPrincipal>, permission: &str) -> Decision {
        let Some(principal) = principal else {
            return Decision::Deny(DenyReason::Unauthenticated);
        };

        if principal.holds(permission) {
            Decision::Allow
        } else if self.catalog.contains(permission) {
            Decision::Deny(DenyReason::MissingPermission)
        } else {
            Decision::Deny(DenyReason::UnknownPermission)
        }
    }

    /// Same answer as [`Evaluator::has_all_permissions`]; the reason is the
    /// one of the first permission that is not granted.
    pub fn check_all_permissions<I>(&self, principal: Option<&AdminPrincipal>, permissions: I) -> Decision
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if principal.is_none() {
            return Decision::Deny(DenyReason::Unauthenticated);
        }

        permissions
            .into_iter()
            .map(|perm| self.check_permission(principal, perm.as_ref()))
            .find(|decision| !decision.is_allowed())
            .unwrap_or(Decision::Allow)
    }

    /// Same answer as [`Evaluator::can_access_by_role`], with a deny reason.
    pub fn check_role(&self, principal: Option<&AdminPrincipal>, required_role: &str) -> Decision {
        if principal.is_none() {
            Decision::Deny(DenyReason::Unauthenticated)
        } else if self.can_access_by_role(principal, required_role) {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::InsufficientRole)
        }
    }

    /// Same answer as [`Evaluator::can_access_feature`], with a deny reason.
    pub fn check_feature(&self, principal: Option<&AdminPrincipal>, group: &str) -> Decision {
        if principal.is_none() {
            Decision::Deny(DenyReason::Unauthenticated)
        } else if self.catalog.group(group).is_none() {
            Decision::Deny(DenyReason::UnknownGroup)
        } else if self.can_access_feature(principal, group) {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::MissingPermission)
        }
    }
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Evaluator::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{groups, permissions, Role};
    use rstest::rstest;

    const KNOWN_ROLES: [&str; 4] = ["test_mode", "general", "admin", "super_admin"];

    fn principal(role: &'static str, granted: &[&'static str]) -> AdminPrincipal {
        AdminPrincipal::new("uid-test", "staff@example.com", role)
            .with_permissions(granted.iter().copied())
    }

    #[test]
    fn test_has_permission_exact_membership_only() {
        let staff = principal("admin", &[permissions::PRODUCTS_EDIT]);
        let staff = Some(&staff);

        assert!(has_permission(staff, "products.edit"));
        assert!(!has_permission(staff, "products"));
        assert!(!has_permission(staff, "products.*"));
        assert!(!has_permission(staff, "products.edit.bulk"));
        assert!(!has_permission(staff, "PRODUCTS.EDIT"));
        assert!(!has_permission(staff, "not.in.catalog"));
    }

    #[test]
    fn test_ungranted_permissions_are_denied() {
        let staff = principal("super_admin", &[permissions::ORDERS_VIEW]);
        for def in builtin_catalog().permissions() {
            let expected = def.id.as_str() == permissions::ORDERS_VIEW;
            assert_eq!(has_permission(Some(&staff), def.id.as_str()), expected);
        }
    }

    #[test]
    fn test_empty_permission_set_denies_everything() {
        let staff = principal("admin", &[]);
        for def in builtin_catalog().permissions() {
            assert!(!has_permission(Some(&staff), def.id.as_str()));
        }
    }

    #[test]
    fn test_empty_input_asymmetry() {
        // any([]) is false while all([]) is vacuously true for a present principal.
        let staff = principal("general", &[permissions::ORDERS_VIEW]);
        let none: [&str; 0] = [];

        assert!(!has_any_permission(Some(&staff), none));
        assert!(has_all_permissions(Some(&staff), none));

        let bare = principal("general", &[]);
        assert!(!has_any_permission(Some(&bare), none));
        assert!(has_all_permissions(Some(&bare), none));
    }

    #[test]
    fn test_any_and_all_are_order_independent() {
        let staff = principal("admin", &[permissions::ORDERS_VIEW, permissions::ORDERS_EDIT]);
        let staff = Some(&staff);

        assert!(has_any_permission(staff, ["customers.view", "orders.view"]));
        assert!(has_any_permission(staff, ["orders.view", "customers.view"]));
        assert!(!has_any_permission(staff, ["customers.view", "customers.edit"]));

        assert!(has_all_permissions(staff, ["orders.edit", "orders.view"]));
        assert!(!has_all_permissions(staff, ["orders.view", "orders.capture"]));
        assert!(!has_all_permissions(staff, ["orders.capture", "orders.view"]));
    }

    #[rstest]
    fn test_role_ordering_all_pairs(
        #[values("test_mode", "general", "admin", "super_admin")] held: &'static str,
        #[values("test_mode", "general", "admin", "super_admin")] required: &'static str,
    ) {
        let tier = |role: &str| KNOWN_ROLES.iter().position(|r| *r == role).unwrap();
        let staff = principal(held, &[]);
        assert_eq!(
            can_access_by_role(Some(&staff), required),
            tier(held) >= tier(required),
            "{} against {}",
            held,
            required
        );
    }

    #[test]
    fn test_unknown_role_ranks_lowest() {
        let bogus = principal("bogus", &[permissions::ADMIN_LOGIN]);
        for role in KNOWN_ROLES {
            assert!(!can_access_by_role(Some(&bogus), role));
        }

        // An unknown requirement also ranks 0, which every present principal meets.
        assert!(can_access_by_role(Some(&bogus), "also_bogus"));
        assert!(can_access_by_role(Some(&principal("test_mode", &[])), "also_bogus"));
    }

    #[test]
    fn test_can_access_feature_matches_has_any_for_every_group() {
        let catalog = builtin_catalog();
        let evaluator = Evaluator::new(catalog);
        let samples = [
            principal("general", &[]),
            principal("general", &[permissions::ORDERS_VIEW]),
            principal("admin", &[permissions::PRODUCTS_DELETE, permissions::DATA_EXPORT]),
            principal("super_admin", &[permissions::ADMIN_LOGIN, permissions::SECURITY_MANAGE]),
        ];

        for sample in &samples {
            for group in catalog.group_names() {
                let members = catalog.group(group).unwrap();
                assert_eq!(
                    evaluator.can_access_feature(Some(sample), group),
                    has_any_permission(Some(sample), members),
                    "group {} for {:?}",
                    group,
                    sample.permissions
                );
            }
        }
    }

    #[test]
    fn test_unknown_group_is_denied() {
        let everything = AdminPrincipal::new("uid", "e@example.com", Role::SUPER_ADMIN)
            .with_permissions(
                builtin_catalog()
                    .permissions()
                    .iter()
                    .map(|def| def.id.clone()),
            );
        assert!(!can_access_feature(Some(&everything), "NOT_A_GROUP"));
        assert!(can_access_feature(Some(&everything), groups::SECURITY));
    }

    #[test]
    fn test_general_staff_scenario() {
        let staff = principal("general", &["orders.view"]);
        let staff = Some(&staff);

        assert!(has_permission(staff, "orders.view"));
        assert!(!has_permission(staff, "orders.edit"));
        assert!(!can_access_by_role(staff, "admin"));
        assert!(can_access_by_role(staff, "general"));
        assert!(can_access_feature(staff, groups::ORDER_MANAGEMENT));
        assert!(!can_access_feature(staff, groups::ADMIN_MANAGEMENT));
    }

    #[test]
    fn test_high_role_never_grants_a_permission() {
        let owner = principal("super_admin", &[]);
        let owner = Some(&owner);

        assert!(can_access_by_role(owner, "admin"));
        assert!(!has_permission(owner, "admin.permissions.edit"));
        assert!(!can_access_feature(owner, groups::ADMIN_MANAGEMENT));
    }

    #[test]
    fn test_absent_principal_is_always_denied() {
        let catalog = builtin_catalog();
        for def in catalog.permissions() {
            assert!(!has_permission(None, def.id.as_str()));
            assert!(!has_any_permission(None, [def.id.as_str()]));
            assert!(!has_all_permissions(None, [def.id.as_str()]));
        }
        assert!(!has_all_permissions(None, [] as [&str; 0]));
        for role in KNOWN_ROLES.iter().chain(["bogus"].iter()) {
            assert!(!can_access_by_role(None, role));
        }
        for group in catalog.group_names() {
            assert!(!can_access_feature(None, group));
        }
    }

    #[test]
    fn test_accessible_features() {
        let evaluator = Evaluator::builtin();
        let staff = principal(
            "admin",
            &[permissions::ADMIN_LOGIN, permissions::ORDERS_CAPTURE, permissions::DATA_IMPORT],
        );

        assert_eq!(
            evaluator.accessible_features(Some(&staff)),
            vec![groups::BASIC_ACCESS, groups::DATA_MANAGEMENT, groups::ORDER_MANAGEMENT]
        );
        assert!(evaluator.accessible_features(None).is_empty());
    }

    #[test]
    fn test_decisions_explain_denials() {
        let evaluator = Evaluator::builtin();
        let staff = principal("general", &[permissions::ORDERS_VIEW]);
        let staff = Some(&staff);

        assert_eq!(
            evaluator.check_permission(None, permissions::ORDERS_VIEW),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            evaluator.check_permission(staff, permissions::ORDERS_VIEW),
            Decision::Allow
        );
        assert_eq!(
            evaluator.check_permission(staff, permissions::ORDERS_EDIT),
            Decision::Deny(DenyReason::MissingPermission)
        );
        assert_eq!(
            evaluator.check_permission(staff, "orders.refund"),
            Decision::Deny(DenyReason::UnknownPermission)
        );
        assert_eq!(
            evaluator.check_role(staff, "admin"),
            Decision::Deny(DenyReason::InsufficientRole)
        );
        assert_eq!(
            evaluator.check_feature(staff, "NOT_A_GROUP"),
            Decision::Deny(DenyReason::UnknownGroup)
        );
        assert_eq!(
            evaluator.check_feature(staff, groups::ANALYTICS),
            Decision::Deny(DenyReason::MissingPermission)
        );
        assert_eq!(
            evaluator.check_all_permissions(
                staff,
                [permissions::ORDERS_VIEW, permissions::ADMIN_LIST_EDIT]
            ),
            Decision::Deny(DenyReason::MissingPermission)
        );
    }

    #[test]
    fn test_decisions_agree_with_predicates() {
        let evaluator = Evaluator::builtin();
        let catalog = evaluator.catalog();
        let samples = [
            None,
            Some(principal("bogus", &[permissions::ADMIN_LOGIN])),
            Some(principal("general", &[permissions::ORDERS_VIEW])),
            Some(principal("super_admin", &[permissions::SECURITY_MANAGE])),
        ];

        for sample in &samples {
            let sample = sample.as_ref();
            for def in catalog.permissions() {
                assert_eq!(
                    evaluator.check_permission(sample, def.id.as_str()).is_allowed(),
                    evaluator.has_permission(sample, def.id.as_str())
                );
            }
            for role in KNOWN_ROLES {
                assert_eq!(
                    evaluator.check_role(sample, role).is_allowed(),
                    evaluator.can_access_by_role(sample, role)
                );
            }
            for group in catalog.group_names() {
                assert_eq!(
                    evaluator.check_feature(sample, group).is_allowed(),
                    evaluator.can_access_feature(sample, group)
                );
                let members = catalog.group(group).unwrap();
                assert_eq!(
                    evaluator.check_all_permissions(sample, members).is_allowed(),
                    evaluator.has_all_permissions(sample, members)
                );
            }
        }
    }

    #[test]
    fn test_evaluator_is_shareable_across_threads() {
        let evaluator = Evaluator::builtin();
        let staff = std::sync::Arc::new(principal("admin", &[permissions::ORDERS_VIEW]));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let staff = staff.clone();
                std::thread::spawn(move || {
                    evaluator.has_permission(Some(&*staff), permissions::ORDERS_VIEW)
                        && evaluator.can_access_by_role(Some(&*staff), "general")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
