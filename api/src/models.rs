use authz::{AdminPrincipal, PermissionCatalog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use user::AdminUser;
use utoipa::ToSchema;

/// Email/password sign-in request. Missing fields are answered with 400.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Sign-in state of the current session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatusResponse {
    pub authenticated: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CheckAccessRequest {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckAccessResponse {
    #[serde(rename = "hasAccess")]
    pub has_access: bool,
}

/// The signed-in admin with the feature areas it can open
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub features: Vec<String>,
}

impl MeResponse {
    pub fn new(principal: &AdminPrincipal, features: Vec<&str>) -> Self {
        Self {
            uid: principal.uid.clone(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: principal.role.to_string(),
            permissions: principal.permissions.iter().map(|p| p.to_string()).collect(),
            features: features.into_iter().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminUserResponse {
    pub id: String,
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AdminUser> for AdminUserResponse {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            uid: user.uid,
            email: user.email,
            name: user.name,
            role: user.role.to_string(),
            permissions: user.permissions.iter().map(|p| p.to_string()).collect(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminUserListResponse {
    pub users: Vec<AdminUserResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateAdminUserRequest {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionEntry {
    pub id: String,
    pub description: Option<String>,
}

/// The loaded permission catalog
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogResponse {
    pub version: String,
    /// Lowest tier first
    pub roles: Vec<String>,
    pub permissions: Vec<PermissionEntry>,
    pub groups: BTreeMap<String, Vec<String>>,
}

impl From<&PermissionCatalog> for CatalogResponse {
    fn from(catalog: &PermissionCatalog) -> Self {
        Self {
            version: catalog.version().to_string(),
            roles: catalog.roles().iter().map(|r| r.to_string()).collect(),
            permissions: catalog
                .permissions()
                .iter()
                .map(|def| PermissionEntry {
                    id: def.id.to_string(),
                    description: def.description.clone(),
                })
                .collect(),
            groups: catalog
                .group_names()
                .map(|name| {
                    let members = catalog
                        .group(name)
                        .unwrap_or_default()
                        .iter()
                        .map(|p| p.to_string())
                        .collect();
                    (name.to_string(), members)
                })
                .collect(),
        }
    }
}

/// Health check response; `status` is `degraded` when any component fails
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub catalog_version: String,
    pub database: ComponentHealth,
    pub audit_log: ComponentHealth,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub ok: bool,
    pub message: String,
}

impl ComponentHealth {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
