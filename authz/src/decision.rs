//! Access decisions with a deny reason.
//!
//! The boolean predicates collapse every negative outcome into `false`.
//! Audit logging needs to tell "not signed in" from "missing permission", so
//! the evaluator also answers with a [`Decision`]. A decision is never used
//! to grant more than the matching predicate would.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No principal was supplied
    Unauthenticated,
    /// The requested permission is not part of the catalog
    UnknownPermission,
    /// The permission exists but the principal was not granted it
    MissingPermission,
    /// The principal's role ranks below the required tier
    InsufficientRole,
    /// The requested feature group is not part of the catalog
    UnknownGroup,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::UnknownPermission => "unknown_permission",
            DenyReason::MissingPermission => "missing_permission",
            DenyReason::InsufficientRole => "insufficient_role",
            DenyReason::UnknownGroup => "unknown_group",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The deny reason, `None` when allowed.
    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }
}

impl From<Decision> for bool {
    fn from(decision: Decision) -> Self {
        decision.is_allowed()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("allow"),
            Decision::Deny(reason) => write!(f, "deny ({})", reason),
        }
    }
}
