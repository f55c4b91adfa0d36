//! Repository Pattern Implementation
//!
//! # Interview Q&A
//!
//! Q: Repository 패턴이란?
//! A: 데이터 접근 로직을 추상화하는 패턴
//!
//!    장점:
//!    - 비즈니스 로직(물량 소진 검사, 동결, 승인)과 데이터 접근 분리
//!    - 테스트 시 Mock 구현 쉬움 (DB 없이 시나리오 검증)
//!
//!    ```rust,ignore
//!    // Service 레이어
//!    let quota = repository.find_quota(org_id, year_month, channel).await?;
//!
//!    // PostgreSQL 구현: db/postgres.rs (Database)
//!    // 테스트용 Mock: mock::MockPlanRepository
//!    ```
//!
//! Q: 트랜잭션 경계는 어디에 두는가?
//! A: 여러 행을 함께 바꿔야 하는 연산은 repository 메서드 하나로 제공
//!    - `insert_quotas`: 월 물량 복사 (전부 또는 전무)
//!    - `resolve_change_request`: 상태 전이 + 발송 신청 변경을 한 트랜잭션으로

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::models::{
    ApprovalEffect, ChangeRequest, MonthlyFreeze, MonthlyQuota, NewChangeRequest, NewQuota,
    NewSendRequest, Organization, QuotaFilter, QuotaSummary, RequestEntry, RequestFilter,
    Resolution, SendRequest, Service, ServiceSummary,
};
use crate::types::{Channel, ChangeRequestStatus, YearMonth};

/// 물량 계획 저장소 인터페이스
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Health check
    async fn ping(&self) -> Result<()>;

    // ============ Organizations ============

    async fn insert_organization(&self, name: &str) -> Result<Organization>;
    async fn get_organization(&self, id: i64) -> Result<Option<Organization>>;
    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>>;
    async fn list_organizations(&self) -> Result<Vec<Organization>>;
    async fn rename_organization(&self, id: i64, name: &str) -> Result<Option<Organization>>;
    async fn delete_organization(&self, id: i64) -> Result<bool>;
    async fn count_services(&self, organization_id: i64) -> Result<i64>;
    async fn count_quotas(&self, organization_id: i64) -> Result<i64>;

    // ============ Services ============

    async fn insert_service(
        &self,
        organization_id: i64,
        name: &str,
        manager_name: Option<&str>,
    ) -> Result<Service>;
    async fn get_service(&self, id: i64) -> Result<Option<Service>>;
    async fn list_services(&self, organization_id: Option<i64>) -> Result<Vec<ServiceSummary>>;
    async fn update_service(
        &self,
        id: i64,
        name: &str,
        manager_name: Option<&str>,
    ) -> Result<Option<Service>>;
    async fn delete_service(&self, id: i64) -> Result<bool>;
    async fn count_requests(&self, service_id: i64) -> Result<i64>;

    // ============ Quotas ============

    /// (조직, 월, 채널) 키로 upsert
    async fn upsert_quota(
        &self,
        organization_id: i64,
        year_month: YearMonth,
        channel: Channel,
        total_quota: i64,
    ) -> Result<MonthlyQuota>;
    async fn find_quota(
        &self,
        organization_id: i64,
        year_month: YearMonth,
        channel: Channel,
    ) -> Result<Option<MonthlyQuota>>;
    async fn get_quota(&self, id: i64) -> Result<Option<MonthlyQuota>>;
    /// 월 내림차순 → 채널 → 조직명 순
    async fn list_quotas(&self, filter: &QuotaFilter) -> Result<Vec<QuotaSummary>>;
    async fn update_quota_total(&self, id: i64, total_quota: i64) -> Result<Option<MonthlyQuota>>;
    async fn delete_quota(&self, id: i64) -> Result<bool>;
    /// 한 트랜잭션으로 일괄 삽입, 삽입된 행 수 반환
    async fn insert_quotas(&self, quotas: &[NewQuota]) -> Result<u64>;

    // ============ Send requests ============

    async fn insert_request(&self, request: &NewSendRequest) -> Result<SendRequest>;
    async fn get_request(&self, id: i64) -> Result<Option<SendRequest>>;
    async fn delete_request(&self, id: i64) -> Result<bool>;
    /// 조직 전체 서비스의 채널별 신청 합계 (`from` 포함, `until` 미포함)
    async fn sum_requested(
        &self,
        organization_id: i64,
        channel: Channel,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<i64>;
    /// 발송일 내림차순 → 생성 시각 내림차순
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<RequestEntry>>;

    // ============ Freezes ============

    async fn get_freeze(&self, year_month: YearMonth) -> Result<Option<MonthlyFreeze>>;
    /// 동결로 바뀔 때만 frozen_at/frozen_by 기록, 해제 시에는 마지막 기록 유지
    async fn upsert_freeze(
        &self,
        year_month: YearMonth,
        is_frozen: bool,
        frozen_by: &str,
        at: DateTime<Utc>,
    ) -> Result<MonthlyFreeze>;
    async fn list_freezes(&self) -> Result<Vec<MonthlyFreeze>>;

    // ============ Change requests ============

    async fn insert_change_request(&self, request: &NewChangeRequest) -> Result<ChangeRequest>;
    async fn get_change_request(&self, id: i64) -> Result<Option<ChangeRequest>>;
    async fn list_change_requests(
        &self,
        status: Option<ChangeRequestStatus>,
    ) -> Result<Vec<ChangeRequest>>;
    /// pending 상태인 요청만 종료 상태로 전이하면서 `effect`를 함께 적용
    ///
    /// 이미 처리된 요청이면 아무것도 바꾸지 않고 None
    async fn resolve_change_request(
        &self,
        id: i64,
        resolution: &Resolution,
        effect: &ApprovalEffect,
    ) -> Result<Option<ChangeRequest>>;
}

// PostgreSQL 구현은 db/postgres.rs의 Database에 있음
// 테스트용 Mock 구현:
