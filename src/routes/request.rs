//! Send Request Endpoints
//!
//! 발송 신청 생성/삭제와 목록 조회.
//!
//! 동결된 월이면 409 FROZEN_MONTH. 클라이언트는 `/api/change-request`로 다시 제출해야 함

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    db::{RequestEntry, RequestFilter},
    error::ApiError,
    services::{CreateRequestInput, CreatedRequest, UpcomingScope},
    types::{ApiResponse, Channel, YearMonth},
    AppState,
};

// ============ Request/Response Types ============

/// 발송 신청 생성 요청
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub service_id: i64,
    /// YYYY-MM-DD
    pub send_date: NaiveDate,
    pub channel: String,
    pub quantity: i64,
    /// HH:MM, 비어 있으면 시간 미정
    pub send_time: Option<String>,
    pub campaign_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    pub year_month: Option<String>,
    pub channel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    /// true면 아직 발송되지 않은 신청만
    #[serde(default)]
    pub upcoming: bool,
}

/// 목록 항목 (채널 표시명 포함)
#[derive(Debug, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub entry: RequestEntry,
    pub channel_name: &'static str,
}

impl From<RequestEntry> for RequestView {
    fn from(entry: RequestEntry) -> Self {
        Self {
            channel_name: entry.channel.display_name(),
            entry,
        }
    }
}

fn views(entries: Vec<RequestEntry>) -> Json<Vec<RequestView>> {
    Json(entries.into_iter().map(RequestView::from).collect())
}

// ============ Handlers ============

/// POST /api/request
///
/// # Errors
///
/// - 404: 서비스 없음
/// - 409: 동결된 월
/// - 400: QUOTA_NOT_CONFIGURED / QUOTA_EXCEEDED (remaining 포함)
pub async fn create_request(
    State(state): State<AppState>,
    Json(req): Json<CreateRequestBody>,
) -> Result<Json<ApiResponse<CreatedRequest>>, ApiError> {
    let channel: Channel = req.channel.parse()?;

    let created = state
        .requests
        .create_request(CreateRequestInput {
            service_id: req.service_id,
            send_date: req.send_date,
            channel,
            quantity: req.quantity,
            send_time: req.send_time,
            campaign_name: req.campaign_name,
        })
        .await?;

    Ok(Json(ApiResponse::success("Send request created", created)))
}

/// DELETE /api/request/:id
pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.requests.delete_request(id).await?;
    Ok(Json(ApiResponse::message("Send request deleted")))
}

/// GET /api/requests?year_month=&channel=
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    let year_month = query
        .year_month
        .as_deref()
        .filter(|ym| !ym.trim().is_empty())
        .map(str::parse::<YearMonth>)
        .transpose()?;

    let filter = RequestFilter {
        channel: Channel::parse_filter(query.channel.as_deref())?,
        from: year_month.map(|ym| ym.first_day()),
        until: year_month.map(|ym| ym.next_month_start()),
        ..Default::default()
    };

    Ok(views(state.requests.list_requests(&filter).await?))
}

/// GET /api/requests/service/:id?upcoming=
pub async fn list_service_requests(
    State(state): State<AppState>,
    Path(service_id): Path<i64>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    if query.upcoming {
        let upcoming = state
            .calendar
            .upcoming_requests(UpcomingScope::Service(service_id), Local::now().naive_local())
            .await?;
        return Ok(views(upcoming));
    }

    state.directory.get_service(service_id).await?;
    let filter = RequestFilter {
        service_id: Some(service_id),
        ..Default::default()
    };
    Ok(views(state.requests.list_requests(&filter).await?))
}

/// GET /api/requests/organization/:id?upcoming=
pub async fn list_organization_requests(
    State(state): State<AppState>,
    Path(organization_id): Path<i64>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    if query.upcoming {
        let upcoming = state
            .calendar
            .upcoming_requests(
                UpcomingScope::Organization(organization_id),
                Local::now().naive_local(),
            )
            .await?;
        return Ok(views(upcoming));
    }

    state.directory.get_organization(organization_id).await?;
    let filter = RequestFilter {
        organization_id: Some(organization_id),
        ..Default::default()
    };
    Ok(views(state.requests.list_requests(&filter).await?))
}
