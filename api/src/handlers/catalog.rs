use axum::{extract::State, response::Json};

use crate::{
    error::{ApiErrorResponse, ApiResult},
    middleware_hooks::{require_signed_in, CurrentAdmin},
    models::CatalogResponse,
    AppState,
};

/// The permission catalog this server enforces
#[utoipa::path(
    get,
    path = "/api/admin/catalog",
    responses(
        (status = 200, description = "Loaded catalog", body = CatalogResponse),
        (status = 401, description = "Not signed in", body = ApiErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_catalog(
    State(state): State<AppState>,
    CurrentAdmin(ctx): CurrentAdmin,
) -> ApiResult<Json<CatalogResponse>> {
    require_signed_in(&state, &ctx, "catalog_read").await?;

    Ok(Json(CatalogResponse::from(state.catalog.as_ref())))
}
