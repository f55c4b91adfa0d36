//! Quota Endpoints
//!
//! 월 물량 설정/조회/복사. 조회(`GET /api/quota/...`)만 공개, 나머지는 관리자 전용.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::{MonthlyQuota, QuotaFilter, QuotaSummary},
    error::ApiError,
    routes::admin::AdminSession,
    services::CopyOutcome,
    types::{ApiResponse, Channel, YearMonth},
    AppState,
};

// ============ Request/Response Types ============

/// 물량 설정 요청
#[derive(Debug, Deserialize)]
pub struct SetQuotaRequest {
    pub organization_id: i64,
    /// YYYY-MM
    pub year_month: String,
    pub channel: String,
    pub total_quota: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuotaRequest {
    pub total_quota: i64,
}

#[derive(Debug, Deserialize)]
pub struct CopyQuotasRequest {
    pub source_month: String,
    pub target_month: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    /// naver | payco | talktalk | all (기본 naver)
    pub channel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuotaListQuery {
    pub year_month: Option<String>,
    pub channel: Option<String>,
    pub organization_id: Option<i64>,
}

/// 물량 조회 응답
#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub organization_id: i64,
    pub year_month: YearMonth,
    /// 채널명 또는 "all"
    pub channel: String,
    pub total_quota: i64,
}

// ============ Handlers ============

/// POST /api/quota (admin)
///
/// 같은 (조직, 월, 채널)이면 덮어씀
pub async fn set_quota(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<SetQuotaRequest>,
) -> Result<Json<ApiResponse<MonthlyQuota>>, ApiError> {
    let year_month: YearMonth = req.year_month.parse()?;
    let channel: Channel = req.channel.parse()?;

    let quota = state
        .quotas
        .set_quota(req.organization_id, year_month, channel, req.total_quota)
        .await?;

    Ok(Json(ApiResponse::success("Quota saved", quota)))
}

/// GET /api/quota/:org_id/:year_month?channel=
///
/// `channel=all`이면 전체 채널 합계, 생략하면 naver
pub async fn get_quota(
    State(state): State<AppState>,
    Path((organization_id, year_month)): Path<(i64, String)>,
    Query(query): Query<ChannelQuery>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let year_month: YearMonth = year_month.parse()?;
    let requested = query.channel.as_deref().unwrap_or(Channel::Naver.as_str());

    let (channel, total_quota) = match Channel::parse_filter(Some(requested))? {
        Some(channel) => (
            channel.as_str().to_string(),
            state.quotas.get_quota(organization_id, year_month, channel).await?,
        ),
        None => (
            "all".to_string(),
            state.quotas.get_total_quota(organization_id, year_month).await?,
        ),
    };

    Ok(Json(QuotaResponse {
        organization_id,
        year_month,
        channel,
        total_quota,
    }))
}

/// GET /api/quotas (admin)
pub async fn list_quotas(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<QuotaListQuery>,
) -> Result<Json<Vec<QuotaSummary>>, ApiError> {
    let filter = QuotaFilter {
        year_month: query
            .year_month
            .as_deref()
            .filter(|ym| !ym.trim().is_empty())
            .map(str::parse::<YearMonth>)
            .transpose()?,
        channel: Channel::parse_filter(query.channel.as_deref())?,
        organization_id: query.organization_id,
    };

    Ok(Json(state.quotas.list_quotas(&filter).await?))
}

/// PUT /api/quota/:id (admin)
pub async fn update_quota(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
    Json(req): Json<UpdateQuotaRequest>,
) -> Result<Json<ApiResponse<MonthlyQuota>>, ApiError> {
    let quota = state.quotas.update_quota(id, req.total_quota).await?;
    Ok(Json(ApiResponse::success("Quota updated", quota)))
}

/// DELETE /api/quota/:id (admin)
pub async fn delete_quota(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.quotas.delete_quota(id).await?;
    Ok(Json(ApiResponse::message("Quota deleted")))
}

/// POST /api/quotas/copy (admin)
///
/// 대상 월에 이미 물량이 있는 조직은 통째로 건너뜀
pub async fn copy_quotas(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<CopyQuotasRequest>,
) -> Result<Json<ApiResponse<CopyOutcome>>, ApiError> {
    let source: YearMonth = req.source_month.parse()?;
    let target: YearMonth = req.target_month.parse()?;

    let outcome = state.quotas.copy_quotas(source, target).await?;
    let message = format!(
        "Copied {} quota(s) from {} to {} ({} skipped)",
        outcome.copied, source, target, outcome.skipped
    );

    Ok(Json(ApiResponse::success(message, outcome)))
}
