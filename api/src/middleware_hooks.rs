//! Request gates and middleware hooks for the admin API
//!
//! # Authorization Flow
//!
//! 1. [`CurrentAdmin`] reads the signed-in uid from the session
//! 2. The uid is resolved against the admin-user store on every request, so
//!    role and permission changes apply immediately
//! 3. Handlers call [`require_signed_in`] or [`require_permissions`] before
//!    doing any work
//! 4. Denials are logged with `tracing` and recorded in the audit log with
//!    their reason; the response is 401 or 403
//!
//! # Security Notes
//!
//! - Nothing the client sends besides the session cookie is used to decide
//!   access
//! - Deny-by-default: a failed lookup is an error, never an allow

use authz::{Decision, DenyReason};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};
use std::time::Instant;
use tower_sessions::Session;
use tracing::{debug, info, warn};
use user::{AdminContext, AdminSession};

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// The admin behind the current request, resolved from the session
pub struct CurrentAdmin(pub AdminContext);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Extension(session): Extension<Session> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalError("Session layer missing".to_string()))?;

        let uid = AdminSession::signed_in_uid(&session).await?;
        let context = state.manager.context(uid.as_deref()).await?;

        if uid.is_some() && !context.is_authenticated() {
            debug!("Session uid no longer has an admin record");
        }

        Ok(CurrentAdmin(context))
    }
}

/// Allow only a resolved admin
pub async fn require_signed_in(state: &AppState, ctx: &AdminContext, action: &str) -> ApiResult<()> {
    if ctx.is_authenticated() {
        return Ok(());
    }
    deny(state, ctx, action, None, DenyReason::Unauthenticated).await
}

/// Allow only an admin holding every one of `required`
pub async fn require_permissions(
    state: &AppState,
    ctx: &AdminContext,
    required: &[&str],
    action: &str,
    target: Option<String>,
) -> ApiResult<()> {
    match ctx.decide_all(required.iter().copied()) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => deny(state, ctx, action, target, reason).await,
    }
}

/// Log and record a denial, then answer with the matching error
pub async fn deny(
    state: &AppState,
    ctx: &AdminContext,
    action: &str,
    target: Option<String>,
    reason: DenyReason,
) -> ApiResult<()> {
    record_denial(state, ctx, action, target, reason).await?;

    Err(match reason {
        DenyReason::Unauthenticated => ApiError::Unauthorized,
        _ => ApiError::Forbidden,
    })
}

/// Log a denial with `tracing` and append it to the audit log
pub async fn record_denial(
    state: &AppState,
    ctx: &AdminContext,
    action: &str,
    target: Option<String>,
    reason: DenyReason,
) -> ApiResult<()> {
    warn!(
        "Access DENIED: action={}, actor={}, reason={}",
        action,
        ctx.uid().unwrap_or("-"),
        reason
    );

    state
        .manager
        .audit_log()
        .log_denial(ctx.uid(), action, target, reason)
        .await?;

    Ok(())
}

/// Request processing middleware hook
pub async fn request_middleware(
    State(_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    info!("Processing {} request to {}", method, uri);

    let response = next.run(request).await;

    debug!(
        "{} {} answered {} in {:?}",
        method,
        uri,
        response.status(),
        start.elapsed()
    );

    Ok(response)
}

/// Response processing middleware hook
pub async fn response_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Ok(version) = HeaderValue::from_str(state.catalog.version()) {
        headers.insert("X-Permission-Catalog-Version", version);
    }
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));

    Ok(response)
}
