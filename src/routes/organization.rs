//! Organization / Service Endpoints
//!
//! 목록 조회는 공개, 생성/수정/삭제는 관리자 전용.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{
    db::{Organization, Service, ServiceSummary},
    error::ApiError,
    routes::admin::AdminSession,
    services::ServiceInput,
    types::ApiResponse,
    AppState,
};

// ============ Request Types ============

#[derive(Debug, Deserialize)]
pub struct OrganizationRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub organization_id: i64,
    pub name: String,
    pub manager_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: String,
    pub manager_name: Option<String>,
}

// ============ Organizations ============

/// POST /api/organization (admin)
pub async fn create_organization(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<OrganizationRequest>,
) -> Result<Json<ApiResponse<Organization>>, ApiError> {
    let org = state.directory.create_organization(&req.name).await?;
    Ok(Json(ApiResponse::success("Organization created", org)))
}

/// GET /api/organizations
pub async fn list_organizations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Organization>>, ApiError> {
    Ok(Json(state.directory.list_organizations().await?))
}

/// PUT /api/organization/:id (admin)
pub async fn rename_organization(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
    Json(req): Json<OrganizationRequest>,
) -> Result<Json<ApiResponse<Organization>>, ApiError> {
    let org = state.directory.rename_organization(id, &req.name).await?;
    Ok(Json(ApiResponse::success("Organization updated", org)))
}

/// DELETE /api/organization/:id (admin)
///
/// 서비스나 물량이 남아 있으면 VALIDATION_ERROR
pub async fn delete_organization(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.directory.delete_organization(id).await?;
    Ok(Json(ApiResponse::message("Organization deleted")))
}

// ============ Services ============

/// POST /api/service (admin)
pub async fn create_service(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, ApiError> {
    let service = state
        .directory
        .create_service(
            req.organization_id,
            ServiceInput {
                name: req.name,
                manager_name: req.manager_name,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success("Service created", service)))
}

/// GET /api/services
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceSummary>>, ApiError> {
    Ok(Json(state.directory.list_services(None).await?))
}

/// GET /api/services/:org_id
pub async fn list_organization_services(
    State(state): State<AppState>,
    Path(organization_id): Path<i64>,
) -> Result<Json<Vec<ServiceSummary>>, ApiError> {
    state.directory.get_organization(organization_id).await?;
    Ok(Json(state.directory.list_services(Some(organization_id)).await?))
}

/// PUT /api/service/:id (admin)
pub async fn update_service(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, ApiError> {
    let service = state
        .directory
        .update_service(
            id,
            ServiceInput {
                name: req.name,
                manager_name: req.manager_name,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success("Service updated", service)))
}

/// DELETE /api/service/:id (admin)
pub async fn delete_service(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.directory.delete_service(id).await?;
    Ok(Json(ApiResponse::message("Service deleted")))
}
