//! Change Request Endpoints
//!
//! 제출/목록은 공개, 처리(approve/reject)는 관리자 전용.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    db::ChangeRequest,
    error::ApiError,
    routes::admin::AdminSession,
    services::SubmitChangeRequest,
    types::{ApiResponse, ChangeRequestStatus, ChangeRequestType, Channel},
    AppState,
};

// ============ Request Types ============

/// 변경 요청 제출
#[derive(Debug, Deserialize)]
pub struct SubmitChangeRequestBody {
    /// add | modify | delete
    pub request_type: String,
    pub original_request_id: Option<i64>,
    pub service_id: Option<i64>,
    pub send_date: Option<NaiveDate>,
    pub send_time: Option<String>,
    pub channel: Option<String>,
    pub campaign_name: Option<String>,
    pub quantity: Option<i64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub requester_name: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// approve | reject
    pub action: String,
    pub admin_memo: Option<String>,
}

// ============ Handlers ============

/// POST /api/change-request
///
/// 동결 여부와 무관하게 pending으로 저장
pub async fn submit_change_request(
    State(state): State<AppState>,
    Json(req): Json<SubmitChangeRequestBody>,
) -> Result<Json<ApiResponse<ChangeRequest>>, ApiError> {
    let request_type: ChangeRequestType = req.request_type.parse()?;
    let channel = req
        .channel
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<Channel>)
        .transpose()?;

    let submitted = state
        .change_requests
        .submit(SubmitChangeRequest {
            request_type,
            original_request_id: req.original_request_id,
            service_id: req.service_id,
            send_date: req.send_date,
            send_time: req.send_time,
            channel,
            campaign_name: req.campaign_name,
            quantity: req.quantity,
            reason: req.reason,
            requester_name: req.requester_name,
        })
        .await?;

    Ok(Json(ApiResponse::success("Change request submitted", submitted)))
}

/// GET /api/change-requests?status=
pub async fn list_change_requests(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<ChangeRequest>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty() && *s != "all")
        .map(str::parse::<ChangeRequestStatus>)
        .transpose()?;

    Ok(Json(state.change_requests.list(status).await?))
}

/// POST /api/change-request/:id/process (admin)
///
/// # Flow
///
/// 1. pending 확인 (아니면 VALIDATION_ERROR)
/// 2. approve → 원래 직접 경로가 했을 변경을 적용 (물량 재검사 없음)
/// 3. reject → 상태만 변경
/// 4. processed_by = 세션 관리자 이름
pub async fn process_change_request(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<i64>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ApiResponse<ChangeRequest>>, ApiError> {
    let processed = state
        .change_requests
        .process(id, &req.action, req.admin_memo, admin.admin_name())
        .await?;

    let message = format!("Change request {}", processed.status.as_str());
    Ok(Json(ApiResponse::success(message, processed)))
}
