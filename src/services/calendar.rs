//! Calendar / Reporting Projector
//!
//! 발송 신청 + 월 물량을 읽기 전용으로 집계.
//!
//! - 날짜별 신청 목록 (`calendar_data`)
//! - 물량 합계 / 신청 합계 / 남은 물량
//!
//! 남은 물량은 clamp하지 않음. 변경 요청 승인으로 물량을 넘긴 상태면 음수로 보임

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::{PlanRepository, QuotaFilter, RequestEntry, RequestFilter};
use crate::error::{PlanError, PlanResult};
use crate::types::{parse_send_time, Channel, YearMonth};

/// 달력 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarScope {
    Organization(i64),
    /// 전체 조직 (서비스 라벨에 조직명 포함)
    All,
}

/// 예정 신청 목록 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpcomingScope {
    Service(i64),
    Organization(i64),
}

/// 달력 한 칸의 신청
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEntry {
    pub request_id: i64,
    pub service: String,
    pub channel: Channel,
    pub channel_name: &'static str,
    pub quantity: i64,
    pub time: Option<String>,
    pub campaign: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub year_month: YearMonth,
    /// None = 전체 채널
    pub channel: Option<Channel>,
    /// "YYYY-MM-DD" → 그날 신청 목록
    pub calendar_data: BTreeMap<String, Vec<CalendarEntry>>,
    pub total_quota: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotas_by_channel: Option<BTreeMap<Channel, i64>>,
    pub total_requested: i64,
    pub remaining: i64,
}

pub struct CalendarProjector {
    repo: Arc<dyn PlanRepository>,
}

impl CalendarProjector {
    pub fn new(repo: Arc<dyn PlanRepository>) -> Self {
        Self { repo }
    }

    /// 조직(또는 전체) 월 달력
    pub async fn organization_calendar(
        &self,
        scope: CalendarScope,
        year_month: YearMonth,
        channel: Option<Channel>,
    ) -> PlanResult<CalendarView> {
        let organization_id = match scope {
            CalendarScope::Organization(id) => {
                if self.repo.get_organization(id).await?.is_none() {
                    return Err(PlanError::not_found(format!("Organization {}", id)));
                }
                Some(id)
            }
            CalendarScope::All => None,
        };

        let quotas = self
            .repo
            .list_quotas(&QuotaFilter {
                year_month: Some(year_month),
                channel,
                organization_id,
            })
            .await?;

        let total_quota: i64 = quotas.iter().map(|q| q.total_quota).sum();

        // 채널 필터가 있으면 그 채널만
        let quotas_by_channel = organization_id.map(|_| {
            let channels: &[Channel] = match &channel {
                Some(ch) => std::slice::from_ref(ch),
                None => &Channel::ALL,
            };
            let mut by_channel: BTreeMap<Channel, i64> =
                channels.iter().map(|ch| (*ch, 0)).collect();
            for quota in &quotas {
                *by_channel.entry(quota.channel).or_default() += quota.total_quota;
            }
            by_channel
        });

        let requests = self
            .repo
            .list_requests(&RequestFilter {
                organization_id,
                channel,
                from: Some(year_month.first_day()),
                until: Some(year_month.next_month_start()),
                ..Default::default()
            })
            .await?;

        let label = |r: &RequestEntry| match scope {
            CalendarScope::All => format!("{} - {}", r.organization_name, r.service_name),
            CalendarScope::Organization(_) => r.service_name.clone(),
        };

        Ok(project(year_month, channel, total_quota, quotas_by_channel, &requests, label))
    }

    /// 서비스 월 달력 (물량은 소속 조직의 전체 채널 합계)
    pub async fn service_calendar(
        &self,
        service_id: i64,
        year_month: YearMonth,
    ) -> PlanResult<CalendarView> {
        let service = self
            .repo
            .get_service(service_id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Service {}", service_id)))?;

        let total_quota: i64 = self
            .repo
            .list_quotas(&QuotaFilter {
                year_month: Some(year_month),
                channel: None,
                organization_id: Some(service.organization_id),
            })
            .await?
            .iter()
            .map(|q| q.total_quota)
            .sum();

        let requests = self
            .repo
            .list_requests(&RequestFilter {
                service_id: Some(service_id),
                from: Some(year_month.first_day()),
                until: Some(year_month.next_month_start()),
                ..Default::default()
            })
            .await?;

        Ok(project(year_month, None, total_quota, None, &requests, |r| {
            r.service_name.clone()
        }))
    }

    /// 아직 발송되지 않은 신청 (발송일, 시각 오름차순)
    ///
    /// - 오늘 이전 → 제외
    /// - 오늘 + 발송 시각이 지남 → 제외
    /// - 오늘 + 시각 미정 → 포함
    pub async fn upcoming_requests(
        &self,
        scope: UpcomingScope,
        now: NaiveDateTime,
    ) -> PlanResult<Vec<RequestEntry>> {
        let today = now.date();
        let mut filter = RequestFilter {
            from: Some(today),
            ..Default::default()
        };

        match scope {
            UpcomingScope::Service(id) => {
                if self.repo.get_service(id).await?.is_none() {
                    return Err(PlanError::not_found(format!("Service {}", id)));
                }
                filter.service_id = Some(id);
            }
            UpcomingScope::Organization(id) => {
                if self.repo.get_organization(id).await?.is_none() {
                    return Err(PlanError::not_found(format!("Organization {}", id)));
                }
                filter.organization_id = Some(id);
            }
        }

        let mut upcoming: Vec<RequestEntry> = self
            .repo
            .list_requests(&filter)
            .await?
            .into_iter()
            .filter(|r| {
                if r.send_date > today {
                    return true;
                }
                match r.send_time.as_deref().and_then(parse_send_time) {
                    Some(time) => time > now.time(),
                    None => true,
                }
            })
            .collect();

        upcoming.sort_by(|a, b| {
            a.send_date
                .cmp(&b.send_date)
                .then_with(|| a.send_time.cmp(&b.send_time))
                .then(a.id.cmp(&b.id))
        });
        Ok(upcoming)
    }
}

fn project(
    year_month: YearMonth,
    channel: Option<Channel>,
    total_quota: i64,
    quotas_by_channel: Option<BTreeMap<Channel, i64>>,
    requests: &[RequestEntry],
    label: impl Fn(&RequestEntry) -> String,
) -> CalendarView {
    let mut calendar_data: BTreeMap<String, Vec<CalendarEntry>> = BTreeMap::new();
    let mut total_requested = 0;

    for request in requests {
        total_requested += request.quantity;
        calendar_data
            .entry(request.send_date.format("%Y-%m-%d").to_string())
            .or_default()
            .push(CalendarEntry {
                request_id: request.id,
                service: label(request),
                channel: request.channel,
                channel_name: request.channel.display_name(),
                quantity: request.quantity,
                time: request.send_time.clone(),
                campaign: request.campaign_name.clone(),
            });
    }

    // 하루 안에서는 시각 순, 시각 미정은 마지막
    for entries in calendar_data.values_mut() {
        entries.sort_by(|a, b| {
            (a.time.is_none(), &a.time, a.request_id).cmp(&(b.time.is_none(), &b.time, b.request_id))
        });
    }

    CalendarView {
        year_month,
        channel,
        calendar_data,
        total_quota,
        quotas_by_channel,
        total_requested,
        remaining: total_quota - total_requested,
    }
}
