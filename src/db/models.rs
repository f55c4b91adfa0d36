//! Database Models
//!
//! 조직 → 서비스 → 발송 신청 포함 관계와, 그 트리를 참조하는
//! 월간 물량/동결/변경 요청 테이블의 행 모델.
//!
//! 채널/월/상태 컬럼은 TEXT로 저장되고 `try_from`으로 타입 변환됨

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{Channel, ChangeRequestStatus, ChangeRequestType, TypeError, YearMonth};

/// 조직
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// 서비스 (조직 소속)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    /// 담당자 이름 (선택)
    pub manager_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 서비스 목록용 (조직명 포함)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceSummary {
    pub id: i64,
    pub organization_id: i64,
    pub organization_name: String,
    pub name: String,
    pub manager_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 월간 물량
///
/// (organization_id, year_month, channel) 당 최대 1행
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyQuota {
    pub id: i64,
    pub organization_id: i64,
    #[sqlx(try_from = "String")]
    pub year_month: YearMonth,
    #[sqlx(try_from = "String")]
    pub channel: Channel,
    pub total_quota: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 물량 목록용 (조직명 포함)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuotaSummary {
    pub id: i64,
    pub organization_id: i64,
    pub organization_name: String,
    #[sqlx(try_from = "String")]
    pub year_month: YearMonth,
    #[sqlx(try_from = "String")]
    pub channel: Channel,
    pub total_quota: i64,
    pub created_at: DateTime<Utc>,
}

/// 신규 물량 (복사용)
#[derive(Debug, Clone)]
pub struct NewQuota {
    pub organization_id: i64,
    pub year_month: YearMonth,
    pub channel: Channel,
    pub total_quota: i64,
}

/// 물량 목록 필터
#[derive(Debug, Clone, Default)]
pub struct QuotaFilter {
    pub year_month: Option<YearMonth>,
    pub channel: Option<Channel>,
    pub organization_id: Option<i64>,
}

/// 발송 신청 (이미 소진된 물량)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SendRequest {
    pub id: i64,
    pub service_id: i64,
    pub send_date: NaiveDate,
    /// HH:MM, None이면 시간 미정
    pub send_time: Option<String>,
    #[sqlx(try_from = "String")]
    pub channel: Channel,
    pub campaign_name: Option<String>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 신규 발송 신청
#[derive(Debug, Clone)]
pub struct NewSendRequest {
    pub service_id: i64,
    pub send_date: NaiveDate,
    pub send_time: Option<String>,
    pub channel: Channel,
    pub campaign_name: Option<String>,
    pub quantity: i64,
}

/// 발송 신청 부분 수정 (None 필드는 유지)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendRequestPatch {
    pub send_date: Option<NaiveDate>,
    pub send_time: Option<String>,
    pub channel: Option<Channel>,
    pub campaign_name: Option<String>,
    pub quantity: Option<i64>,
}

impl SendRequestPatch {
    pub fn is_empty(&self) -> bool {
        *self == SendRequestPatch::default()
    }

    /// 대상 신청에 patch 적용
    pub fn apply_to(&self, request: &mut SendRequest) {
        if let Some(date) = self.send_date {
            request.send_date = date;
        }
        if let Some(time) = &self.send_time {
            request.send_time = Some(time.clone());
        }
        if let Some(channel) = self.channel {
            request.channel = channel;
        }
        if let Some(campaign) = &self.campaign_name {
            request.campaign_name = Some(campaign.clone());
        }
        if let Some(quantity) = self.quantity {
            request.quantity = quantity;
        }
    }
}

/// 신청 목록/달력용 (서비스명, 조직명 포함)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestEntry {
    pub id: i64,
    pub service_id: i64,
    pub service_name: String,
    pub organization_id: i64,
    pub organization_name: String,
    pub send_date: NaiveDate,
    pub send_time: Option<String>,
    #[sqlx(try_from = "String")]
    pub channel: Channel,
    pub campaign_name: Option<String>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// 신청 목록 필터
///
/// `from`(포함) ~ `until`(미포함) 발송일 구간
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub service_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub channel: Option<Channel>,
    pub from: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

/// 월 동결 상태
///
/// 행이 없으면 열린 상태와 동일
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyFreeze {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub year_month: YearMonth,
    pub is_frozen: bool,
    pub frozen_at: Option<DateTime<Utc>>,
    pub frozen_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 변경 요청
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChangeRequest {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub request_type: ChangeRequestType,
    pub original_request_id: Option<i64>,
    pub service_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub year_month: YearMonth,
    pub send_date: Option<NaiveDate>,
    pub send_time: Option<String>,
    pub channel: Option<String>,
    pub campaign_name: Option<String>,
    pub quantity: Option<i64>,
    pub reason: String,
    pub requester_name: String,
    #[sqlx(try_from = "String")]
    pub status: ChangeRequestStatus,
    pub admin_memo: Option<String>,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChangeRequest {
    /// 저장된 채널 (submit 시 검증되므로 파싱 실패는 데이터 손상)
    pub fn parsed_channel(&self) -> Result<Option<Channel>, TypeError> {
        self.channel.as_deref().map(str::parse).transpose()
    }
}

/// 신규 변경 요청 (검증 완료된 값)
#[derive(Debug, Clone)]
pub struct NewChangeRequest {
    pub request_type: ChangeRequestType,
    pub original_request_id: Option<i64>,
    pub service_id: Option<i64>,
    pub year_month: YearMonth,
    pub send_date: Option<NaiveDate>,
    pub send_time: Option<String>,
    pub channel: Option<Channel>,
    pub campaign_name: Option<String>,
    pub quantity: Option<i64>,
    pub reason: String,
    pub requester_name: String,
}

/// 변경 요청 처리 결과 (감사 필드)
#[derive(Debug, Clone)]
pub struct Resolution {
    pub status: ChangeRequestStatus,
    pub admin_memo: Option<String>,
    pub processed_by: String,
    pub processed_at: DateTime<Utc>,
}

/// 승인 시 함께 적용되는 발송 신청 변경
#[derive(Debug, Clone)]
pub enum ApprovalEffect {
    /// 거절 또는 변경 없음
    None,
    Insert(NewSendRequest),
    Update { request_id: i64, patch: SendRequestPatch },
    /// 원본이 없으면 조용히 무시
    Delete { request_id: i64 },
}
