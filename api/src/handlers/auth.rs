//! Sign-in, session and admin-access handlers

use axum::{extract::State, http::HeaderMap, response::Json, Extension};
use tower_sessions::Session;
use tracing::{debug, info};
use user::{AdminSession, LoginOutcome};

use crate::{
    error::{ApiError, ApiErrorResponse, ApiResult},
    middleware_hooks::{require_signed_in, CurrentAdmin},
    models::{
        CheckAccessRequest, CheckAccessResponse, LoginBody, MeResponse, SessionStatusResponse,
        SuccessResponse,
    },
    AppState,
};

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

/// Sign in with the console email and password
#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = SuccessResponse),
        (status = 400, description = "Email or password missing", body = ApiErrorResponse),
        (status = 401, description = "Invalid email or password", body = ApiErrorResponse),
        (status = 403, description = "No admin record for this email", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    body: Option<Json<LoginBody>>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(body) = body.unwrap_or_default();

    let (Some(email), Some(password)) = (non_empty(body.email), non_empty(body.password)) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let outcome = state
        .manager
        .authenticator()
        .authenticate(&email, &password, client_ip(&headers))
        .await?;

    match outcome {
        LoginOutcome::Authenticated(user) => {
            AdminSession::sign_in(&session, &user.uid, &user.email).await?;
            info!("Admin {} signed in", user.uid);
            Ok(Json(SuccessResponse::new("Login successful")))
        }
        LoginOutcome::InvalidCredentials => Err(ApiError::InvalidCredentials),
        LoginOutcome::NotAnAdmin => Err(ApiError::Forbidden),
    }
}

/// Whether the current session is signed in
#[utoipa::path(
    get,
    path = "/api/admin/login",
    responses(
        (status = 200, description = "Session state", body = SessionStatusResponse)
    ),
    tag = "auth"
)]
pub async fn session_status(CurrentAdmin(ctx): CurrentAdmin) -> Json<SessionStatusResponse> {
    Json(SessionStatusResponse {
        authenticated: ctx.is_authenticated(),
    })
}

/// Sign out and drop the session
#[utoipa::path(
    post,
    path = "/api/admin/logout",
    responses(
        (status = 200, description = "Signed out", body = SuccessResponse)
    ),
    tag = "auth"
)]
pub async fn logout(Extension(session): Extension<Session>) -> ApiResult<Json<SuccessResponse>> {
    AdminSession::sign_out(&session).await?;

    Ok(Json(SuccessResponse::new("Logged out successfully")))
}

/// Whether an identity-provider uid may use the admin console
#[utoipa::path(
    post,
    path = "/api/admin/check-access",
    request_body = CheckAccessRequest,
    responses(
        (status = 200, description = "Access answer", body = CheckAccessResponse),
        (status = 400, description = "uid missing", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn check_access(
    State(state): State<AppState>,
    body: Option<Json<CheckAccessRequest>>,
) -> ApiResult<Json<CheckAccessResponse>> {
    let Json(body) = body.unwrap_or_default();

    let Some(uid) = non_empty(body.uid) else {
        return Err(ApiError::BadRequest("uid is required".to_string()));
    };

    let has_access = state
        .manager
        .authenticator()
        .check_access(&uid, body.email.as_deref())
        .await?;
    debug!("Access check for {}: {}", uid, has_access);

    Ok(Json(CheckAccessResponse { has_access }))
}

/// The signed-in admin and the feature areas it can open
#[utoipa::path(
    get,
    path = "/api/admin/me",
    responses(
        (status = 200, description = "Current admin", body = MeResponse),
        (status = 401, description = "Not signed in", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentAdmin(ctx): CurrentAdmin,
) -> ApiResult<Json<MeResponse>> {
    require_signed_in(&state, &ctx, "me").await?;

    let principal = ctx.principal().ok_or(ApiError::Unauthorized)?;
    Ok(Json(MeResponse::new(principal, ctx.accessible_features())))
}
