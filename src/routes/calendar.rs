//! Calendar Endpoints
//!
//! 읽기 전용 달력 집계. `channel` 쿼리를 생략하거나 `all`이면 전체 채널.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    services::{CalendarScope, CalendarView},
    types::{Channel, YearMonth},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub channel: Option<String>,
}

/// GET /api/calendar/organization/:org_id/:year_month?channel=
pub async fn organization_calendar(
    State(state): State<AppState>,
    Path((organization_id, year_month)): Path<(i64, String)>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarView>, ApiError> {
    let year_month: YearMonth = year_month.parse()?;
    let channel = Channel::parse_filter(query.channel.as_deref())?;

    let view = state
        .calendar
        .organization_calendar(CalendarScope::Organization(organization_id), year_month, channel)
        .await?;
    Ok(Json(view))
}

/// GET /api/calendar/all/:year_month?channel=
pub async fn all_calendar(
    State(state): State<AppState>,
    Path(year_month): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarView>, ApiError> {
    let year_month: YearMonth = year_month.parse()?;
    let channel = Channel::parse_filter(query.channel.as_deref())?;

    let view = state
        .calendar
        .organization_calendar(CalendarScope::All, year_month, channel)
        .await?;
    Ok(Json(view))
}

/// GET /api/calendar/service/:service_id/:year_month
pub async fn service_calendar(
    State(state): State<AppState>,
    Path((service_id, year_month)): Path<(i64, String)>,
) -> Result<Json<CalendarView>, ApiError> {
    let year_month: YearMonth = year_month.parse()?;
    Ok(Json(state.calendar.service_calendar(service_id, year_month).await?))
}
