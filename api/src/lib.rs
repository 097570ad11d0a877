use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use authz::PermissionCatalog;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use user::AdminManager;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error;
pub mod handlers;
pub mod middleware_hooks;
pub mod models;
pub mod server;

// Re-export server functions for convenience
pub use server::{spawn_server_with_config, start_server_with_config, ApiConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AdminManager>,
    pub catalog: Arc<PermissionCatalog>,
}

impl AppState {
    pub fn new(manager: Arc<AdminManager>) -> Self {
        let catalog = manager.catalog();
        Self { manager, catalog }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::session_status,
        handlers::auth::logout,
        handlers::auth::check_access,
        handlers::auth::me,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::update_role,
        handlers::users::update_permissions,
        handlers::users::delete_user,
        handlers::catalog::get_catalog,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::LoginBody,
            models::SessionStatusResponse,
            models::CheckAccessRequest,
            models::CheckAccessResponse,
            models::MeResponse,
            models::AdminUserResponse,
            models::AdminUserListResponse,
            models::CreateAdminUserRequest,
            models::UpdateRoleRequest,
            models::UpdatePermissionsRequest,
            models::PermissionEntry,
            models::CatalogResponse,
            models::HealthResponse,
            models::ComponentHealth,
            models::SuccessResponse,
            error::ApiErrorResponse,
            error::ErrorDetail,
        )
    ),
    tags(
        (name = "auth", description = "Sign-in, session and admin-access checks"),
        (name = "users", description = "Admin user management"),
        (name = "catalog", description = "Permission catalog"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Storefront Admin API",
        version = "1.0.0",
        description = "Admin console sign-in and role-based access control",
    ),
)]
pub struct ApiDoc;

/// Create the main API router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let session_layer = state
        .manager
        .session_store()
        .layer(state.manager.session_config());

    let admin = Router::new()
        .route(
            "/login",
            post(handlers::auth::login).get(handlers::auth::session_status),
        )
        .route("/logout", post(handlers::auth::logout))
        .route("/check-access", post(handlers::auth::check_access))
        .route("/me", get(handlers::auth::me))
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/users/:id/role", put(handlers::users::update_role))
        .route(
            "/users/:id/permissions",
            put(handlers::users::update_permissions),
        )
        // Deletion is keyed on the uid; axum allows one segment name per position
        .route(
            "/users/:id",
            axum::routing::delete(handlers::users::delete_user),
        )
        .route("/catalog", get(handlers::catalog::get_catalog))
        .route("/health", get(handlers::health::health_check))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::request_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::response_middleware,
        ));

    Router::new()
        .nest("/api/admin", admin)
        .merge(
            SwaggerUi::new("/api/admin/swagger").url("/api/admin/openapi.json", ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(session_layer),
        )
        .with_state(state)
}
