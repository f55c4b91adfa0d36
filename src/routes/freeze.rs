//! Freeze Endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    routes::admin::AdminSession,
    services::FreezeStatus,
    types::{ApiResponse, YearMonth},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SetFreezeRequest {
    pub is_frozen: bool,
}

/// GET /api/freeze/:year_month
///
/// 기록이 없는 월은 열린 상태로 응답
pub async fn get_freeze(
    State(state): State<AppState>,
    Path(year_month): Path<String>,
) -> Result<Json<FreezeStatus>, ApiError> {
    let year_month: YearMonth = year_month.parse()?;
    Ok(Json(state.freezes.status(year_month).await?))
}

/// PUT /api/freeze/:year_month (admin)
///
/// frozen_by에는 세션의 관리자 이름이 기록됨
pub async fn set_freeze(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(year_month): Path<String>,
    Json(req): Json<SetFreezeRequest>,
) -> Result<Json<ApiResponse<FreezeStatus>>, ApiError> {
    let year_month: YearMonth = year_month.parse()?;
    let status = state
        .freezes
        .set_freeze(year_month, req.is_frozen, admin.admin_name())
        .await?;

    let message = if status.is_frozen {
        format!("{} frozen", year_month)
    } else {
        format!("{} unfrozen", year_month)
    };
    Ok(Json(ApiResponse::success(message, status)))
}

/// GET /api/freezes
pub async fn list_freezes(
    State(state): State<AppState>,
) -> Result<Json<Vec<FreezeStatus>>, ApiError> {
    Ok(Json(state.freezes.list().await?))
}
