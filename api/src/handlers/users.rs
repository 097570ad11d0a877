//! Admin user management handlers

use authz::{permissions, DenyReason, Permission, Role};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::collections::BTreeSet;
use tracing::info;
use user::NewAdminUser;

use crate::{
    error::{ApiError, ApiErrorResponse, ApiResult},
    middleware_hooks::{record_denial, require_permissions, CurrentAdmin},
    models::{
        AdminUserListResponse, AdminUserResponse, CreateAdminUserRequest, SuccessResponse,
        UpdatePermissionsRequest, UpdateRoleRequest,
    },
    AppState,
};

/// Both are required for every change to the admin list
const EDIT_ADMINS: &[&str] = &[permissions::ADMIN_LIST_EDIT, permissions::ADMIN_PERMISSIONS_EDIT];

fn validate_role(state: &AppState, role: &str) -> ApiResult<Role> {
    if state.catalog.is_known_role(role) {
        Ok(Role::from(role.to_string()))
    } else {
        Err(ApiError::ValidationError(format!("Unknown role: {}", role)))
    }
}

fn validate_permissions(state: &AppState, requested: Vec<String>) -> ApiResult<BTreeSet<Permission>> {
    let unknown: Vec<&str> = requested
        .iter()
        .map(String::as_str)
        .filter(|p| !state.catalog.contains(p))
        .collect();

    if !unknown.is_empty() {
        return Err(ApiError::ValidationError(format!(
            "Unknown permissions: {}",
            unknown.join(", ")
        )));
    }

    Ok(requested.into_iter().map(Permission::from).collect())
}

/// List admin users, most recently updated first
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Admin users", body = AdminUserListResponse),
        (status = 401, description = "Not signed in", body = ApiErrorResponse),
        (status = 403, description = "Missing admin.login, or restricted for the general role", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentAdmin(ctx): CurrentAdmin,
) -> ApiResult<Json<AdminUserListResponse>> {
    require_permissions(&state, &ctx, &[permissions::ADMIN_LOGIN], "admin_users_list", None).await?;

    if ctx.role() == Some(&Role::GENERAL) && !ctx.check_permission(permissions::ADMIN_PERMISSIONS_EDIT) {
        record_denial(
            &state,
            &ctx,
            "admin_users_list",
            None,
            DenyReason::MissingPermission,
        )
        .await?;
        return Err(ApiError::Restricted);
    }

    let users: Vec<AdminUserResponse> = state
        .manager
        .database()
        .list_admin_users()
        .await?
        .into_iter()
        .map(AdminUserResponse::from)
        .collect();

    Ok(Json(AdminUserListResponse {
        total: users.len(),
        users,
    }))
}

/// Create an admin user
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateAdminUserRequest,
    responses(
        (status = 201, description = "Admin user created", body = AdminUserResponse),
        (status = 400, description = "Unknown role or permission", body = ApiErrorResponse),
        (status = 403, description = "Missing admin edit permissions", body = ApiErrorResponse),
        (status = 409, description = "uid or email already registered", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentAdmin(ctx): CurrentAdmin,
    Json(req): Json<CreateAdminUserRequest>,
) -> ApiResult<(StatusCode, Json<AdminUserResponse>)> {
    require_permissions(&state, &ctx, EDIT_ADMINS, "admin_user_create", Some(req.uid.clone()))
        .await?;

    if req.uid.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "uid and email are required".to_string(),
        ));
    }

    let role = validate_role(&state, &req.role)?;
    let granted = validate_permissions(&state, req.permissions)?;

    let mut new_user = NewAdminUser::new(req.uid, req.email, role).with_permissions(granted);
    if let Some(name) = req.name {
        new_user = new_user.with_name(name);
    }

    let created = state
        .manager
        .database()
        .create_admin_user(new_user, ctx.uid())
        .await?;

    info!("Admin user {} created by {}", created.uid, ctx.uid().unwrap_or("-"));
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Change the role of an admin user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(("id" = String, Path, description = "Admin user record id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = AdminUserResponse),
        (status = 400, description = "Unknown role", body = ApiErrorResponse),
        (status = 403, description = "Missing admin edit permissions", body = ApiErrorResponse),
        (status = 404, description = "No such admin user", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_role(
    State(state): State<AppState>,
    CurrentAdmin(ctx): CurrentAdmin,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<AdminUserResponse>> {
    require_permissions(&state, &ctx, EDIT_ADMINS, "admin_role_change", Some(id.clone())).await?;

    let role = validate_role(&state, &req.role)?;
    let updated = state
        .manager
        .database()
        .update_role(&id, role, ctx.uid())
        .await?;

    Ok(Json(updated.into()))
}

/// Replace the permission set of an admin user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/permissions",
    params(("id" = String, Path, description = "Admin user record id")),
    request_body = UpdatePermissionsRequest,
    responses(
        (status = 200, description = "Permissions replaced", body = AdminUserResponse),
        (status = 400, description = "Unknown permission", body = ApiErrorResponse),
        (status = 403, description = "Missing admin edit permissions", body = ApiErrorResponse),
        (status = 404, description = "No such admin user", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_permissions(
    State(state): State<AppState>,
    CurrentAdmin(ctx): CurrentAdmin,
    Path(id): Path<String>,
    Json(req): Json<UpdatePermissionsRequest>,
) -> ApiResult<Json<AdminUserResponse>> {
    require_permissions(
        &state,
        &ctx,
        EDIT_ADMINS,
        "admin_permissions_change",
        Some(id.clone()),
    )
    .await?;

    let granted = validate_permissions(&state, req.permissions)?;
    let updated = state
        .manager
        .database()
        .update_permissions(&id, granted, ctx.uid())
        .await?;

    Ok(Json(updated.into()))
}

/// Delete an admin user by uid
#[utoipa::path(
    delete,
    path = "/api/admin/users/{uid}",
    params(("uid" = String, Path, description = "Identity-provider uid")),
    responses(
        (status = 200, description = "Admin user deleted", body = SuccessResponse),
        (status = 403, description = "Missing admin edit permissions", body = ApiErrorResponse),
        (status = 404, description = "No such admin user", body = ApiErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentAdmin(ctx): CurrentAdmin,
    Path(uid): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    require_permissions(&state, &ctx, EDIT_ADMINS, "admin_user_delete", Some(uid.clone())).await?;

    state
        .manager
        .database()
        .delete_by_uid(&uid, ctx.uid())
        .await?;

    Ok(Json(SuccessResponse::new(format!("Admin user {} deleted", uid))))
}
