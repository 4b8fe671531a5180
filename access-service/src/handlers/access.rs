use service_core::{
    axum::{
        extract::{Path, State},
        Json,
    },
    error::AppError,
};

use crate::{
    acl::{resource, Resource},
    dtos::access::{AccessCheckQuery, AccessCheckResponse, AlbumResponse, PageResponse},
    middleware::Access,
    services::ServiceError,
    utils::{Locale, ValidatedQuery},
    AppState,
};

/// Ask whether the caller holds `privilege` on the resource type `resource`.
pub async fn check(
    Access(access): Access,
    ValidatedQuery(query): ValidatedQuery<AccessCheckQuery>,
) -> Json<AccessCheckResponse> {
    let allowed = access.is_allowed(&query.resource, &query.privilege);
    Json(AccessCheckResponse {
        role: access.role_id().to_string(),
        resource: query.resource,
        privilege: query.privilege,
        allowed,
    })
}

pub async fn album(
    State(state): State<AppState>,
    Access(access): Access,
    locale: Locale,
    Path(id): Path<u64>,
) -> Result<Json<AlbumResponse>, AppError> {
    let album = state
        .repository
        .find_album(id)
        .await?
        .ok_or(ServiceError::AlbumNotFound(id))?;

    access
        .require_on(&Resource::album(&album), "view")
        .map_err(|denied| locale.not_allowed(denied))?;

    Ok(Json(AlbumResponse::from(&album)))
}

pub async fn page(
    State(state): State<AppState>,
    Access(access): Access,
    locale: Locale,
    Path(slug): Path<String>,
) -> Result<Json<PageResponse>, AppError> {
    let page = state
        .repository
        .find_page(&slug)
        .await?
        .ok_or_else(|| ServiceError::PageNotFound(slug.clone()))?;

    if !access.acl().has_role(&page.required_role) {
        tracing::warn!(slug = %slug, role = %page.required_role, "Page requires an unknown role");
    }

    access
        .require_on(&Resource::page(&page), "view")
        .map_err(|denied| locale.not_allowed(denied))?;

    tracing::debug!(slug = %slug, resource = resource::PAGE, "Serving page");
    Ok(Json(PageResponse::from(page)))
}
