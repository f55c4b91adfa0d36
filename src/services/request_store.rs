//! Request Store: 물량 소진 검사
//!
//! # Interview Q&A
//!
//! Q: 신청 생성 시 물량 초과는 어떻게 막는가?
//! A: read-sum-compare-insert 순서
//!    1. 발송일 → 월(YYYY-MM) 계산
//!    2. 동결된 월이면 FrozenMonth
//!    3. (조직, 월, 채널) 물량 조회 → 없으면 QuotaNotConfigured
//!    4. 같은 조직/채널의 해당 월 신청 합계
//!    5. 합계 + 신청량 > 물량 이면 QuotaExceeded (남은 물량 포함)
//!    6. 통과하면 insert
//!
//! Q: 동시에 두 건이 들어오면?
//! A: 2~6 단계를 (조직, 채널, 월) 키 단위 async mutex 안에서 실행
//!    - 같은 키의 두 요청은 직렬화 → 오래된 합계로 둘 다 통과하는 일 없음
//!    - 다른 키끼리는 서로 막지 않음
//!    - 단일 writer 프로세스 배포 전제

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db::{NewSendRequest, PlanRepository, RequestEntry, RequestFilter, SendRequest};
use crate::error::{PlanError, PlanResult};
use crate::services::FreezeGate;
use crate::types::{normalize_send_time, Channel, YearMonth};

/// 물량 소진 검사 직렬화 키
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumptionKey {
    pub organization_id: i64,
    pub channel: Channel,
    pub year_month: YearMonth,
}

/// 키별 async mutex 테이블
#[derive(Default)]
pub struct ConsumptionLocks {
    slots: Mutex<HashMap<ConsumptionKey, Arc<AsyncMutex<()>>>>,
}

impl ConsumptionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 키 잠금 획득 (guard가 drop될 때 해제)
    pub async fn acquire(&self, key: ConsumptionKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // 아무도 잡고 있지 않은 슬롯 정리
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key).or_default().clone()
        };
        slot.lock_owned().await
    }
}

/// 신청 생성 입력
#[derive(Debug, Clone)]
pub struct CreateRequestInput {
    pub service_id: i64,
    pub send_date: NaiveDate,
    pub channel: Channel,
    pub quantity: i64,
    pub send_time: Option<String>,
    pub campaign_name: Option<String>,
}

/// 생성 결과 (생성 직후 남은 물량 포함)
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRequest {
    pub request: SendRequest,
    pub remaining: i64,
}

pub struct RequestStore {
    repo: Arc<dyn PlanRepository>,
    freeze: FreezeGate,
    locks: ConsumptionLocks,
}

impl RequestStore {
    pub fn new(repo: Arc<dyn PlanRepository>, freeze: FreezeGate) -> Self {
        Self {
            repo,
            freeze,
            locks: ConsumptionLocks::new(),
        }
    }

    /// 발송 신청 생성
    ///
    /// 동결된 월이면 FrozenMonth로 실패할 뿐, 변경 요청으로 자동 전환하지 않음
    pub async fn create_request(&self, input: CreateRequestInput) -> PlanResult<CreatedRequest> {
        if input.quantity <= 0 {
            return Err(PlanError::validation(format!(
                "Quantity must be positive: {}",
                input.quantity
            )));
        }
        let send_time = normalize_send_time(input.send_time.as_deref())?;
        let campaign_name = input
            .campaign_name
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let service = self
            .repo
            .get_service(input.service_id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Service {}", input.service_id)))?;

        let year_month = YearMonth::of(input.send_date)?;
        let key = ConsumptionKey {
            organization_id: service.organization_id,
            channel: input.channel,
            year_month,
        };
        let _guard = self.locks.acquire(key).await;

        self.freeze.ensure_open(year_month).await?;

        let quota = self
            .repo
            .find_quota(service.organization_id, year_month, input.channel)
            .await?
            .ok_or(PlanError::QuotaNotConfigured {
                channel: input.channel,
                year_month,
            })?;

        let used = self.consumed(key).await?;
        let remaining = quota.total_quota - used;
        if input.quantity > remaining {
            tracing::warn!(
                organization_id = service.organization_id,
                channel = %input.channel,
                year_month = %year_month,
                requested = input.quantity,
                remaining,
                "Quota exceeded"
            );
            return Err(PlanError::QuotaExceeded {
                channel: input.channel,
                remaining,
            });
        }

        let request = self
            .repo
            .insert_request(&NewSendRequest {
                service_id: service.id,
                send_date: input.send_date,
                send_time,
                channel: input.channel,
                campaign_name,
                quantity: input.quantity,
            })
            .await?;

        tracing::info!(
            request_id = request.id,
            service_id = service.id,
            channel = %request.channel,
            quantity = request.quantity,
            "Send request created"
        );

        Ok(CreatedRequest {
            remaining: remaining - request.quantity,
            request,
        })
    }

    /// 발송 신청 삭제 (물량 반환)
    pub async fn delete_request(&self, id: i64) -> PlanResult<SendRequest> {
        let request = self
            .repo
            .get_request(id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Send request {}", id)))?;

        self.freeze.ensure_open(YearMonth::of(request.send_date)?).await?;

        if !self.repo.delete_request(id).await? {
            return Err(PlanError::not_found(format!("Send request {}", id)));
        }

        tracing::info!(request_id = id, quantity = request.quantity, "Send request deleted");
        Ok(request)
    }

    pub async fn get_request(&self, id: i64) -> PlanResult<SendRequest> {
        self.repo
            .get_request(id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Send request {}", id)))
    }

    /// (조직, 채널, 월) 신청 합계
    pub async fn consumed(&self, key: ConsumptionKey) -> PlanResult<i64> {
        Ok(self
            .repo
            .sum_requested(
                key.organization_id,
                key.channel,
                key.year_month.first_day(),
                key.year_month.next_month_start(),
            )
            .await?)
    }

    pub async fn list_requests(&self, filter: &RequestFilter) -> PlanResult<Vec<RequestEntry>> {
        Ok(self.repo.list_requests(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::MockPlanRepository;

    struct Fixture {
        repo: Arc<MockPlanRepository>,
        freeze: FreezeGate,
        store: Arc<RequestStore>,
        org_id: i64,
        service_id: i64,
    }

    async fn setup() -> Fixture {
        let repo = Arc::new(MockPlanRepository::new());
        let freeze = FreezeGate::new(repo.clone());
        let store = Arc::new(RequestStore::new(repo.clone(), freeze.clone()));

        let org = repo.insert_organization("대출").await.unwrap();
        let service = repo.insert_service(org.id, "신용대출비교", Some("정채연")).await.unwrap();
        repo.upsert_quota(org.id, ym("2025-03"), Channel::Naver, 100).await.unwrap();

        Fixture {
            repo,
            freeze,
            store,
            org_id: org.id,
            service_id: service.id,
        }
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn input(service_id: i64, send_date: &str, quantity: i64) -> CreateRequestInput {
        CreateRequestInput {
            service_id,
            send_date: date(send_date),
            channel: Channel::Naver,
            quantity,
            send_time: Some("10:00".to_string()),
            campaign_name: Some("봄 프로모션".to_string()),
        }
    }

    fn naver_march(org_id: i64) -> ConsumptionKey {
        ConsumptionKey {
            organization_id: org_id,
            channel: Channel::Naver,
            year_month: ym("2025-03"),
        }
    }

    #[tokio::test]
    async fn test_quota_consumption_scenario() {
        let f = setup().await;

        let first = f.store.create_request(input(f.service_id, "2025-03-05", 60)).await.unwrap();
        assert_eq!(first.remaining, 40);

        match f.store.create_request(input(f.service_id, "2025-03-06", 50)).await {
            Err(PlanError::QuotaExceeded { remaining, .. }) => assert_eq!(remaining, 40),
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }

        let third = f.store.create_request(input(f.service_id, "2025-03-31", 40)).await.unwrap();
        assert_eq!(third.remaining, 0);
        assert_eq!(f.store.consumed(naver_march(f.org_id)).await.unwrap(), 100);

        match f.store.create_request(input(f.service_id, "2025-03-01", 1)).await {
            Err(PlanError::QuotaExceeded { remaining, .. }) => assert_eq!(remaining, 0),
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_consumption_is_shared_across_services_of_organization() {
        let f = setup().await;
        let sibling = f.repo.insert_service(f.org_id, "신용점수", None).await.unwrap();

        f.store.create_request(input(f.service_id, "2025-03-05", 70)).await.unwrap();
        match f.store.create_request(input(sibling.id, "2025-03-05", 31)).await {
            Err(PlanError::QuotaExceeded { remaining, .. }) => assert_eq!(remaining, 30),
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_other_channels_and_months_do_not_count() {
        let f = setup().await;
        f.repo.upsert_quota(f.org_id, ym("2025-03"), Channel::Payco, 500).await.unwrap();
        f.repo.upsert_quota(f.org_id, ym("2025-04"), Channel::Naver, 500).await.unwrap();

        let mut payco = input(f.service_id, "2025-03-10", 400);
        payco.channel = Channel::Payco;
        f.store.create_request(payco).await.unwrap();
        f.store.create_request(input(f.service_id, "2025-04-01", 400)).await.unwrap();

        let created = f.store.create_request(input(f.service_id, "2025-03-10", 100)).await.unwrap();
        assert_eq!(created.remaining, 0);
    }

    #[tokio::test]
    async fn test_huge_quantity_is_rejected_not_wrapped() {
        let f = setup().await;
        f.store.create_request(input(f.service_id, "2025-03-05", 60)).await.unwrap();

        match f.store.create_request(input(f.service_id, "2025-03-06", i64::MAX - 10)).await {
            Err(PlanError::QuotaExceeded { remaining, .. }) => assert_eq!(remaining, 40),
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
        assert_eq!(f.store.consumed(naver_march(f.org_id)).await.unwrap(), 60);
    }

    #[tokio::test]
    async fn test_missing_quota_is_hard_error() {
        let f = setup().await;
        let mut talk = input(f.service_id, "2025-03-10", 1);
        talk.channel = Channel::Talktalk;

        assert!(matches!(
            f.store.create_request(talk).await,
            Err(PlanError::QuotaNotConfigured { channel: Channel::Talktalk, .. })
        ));
    }

    #[tokio::test]
    async fn test_input_validation() {
        let f = setup().await;

        assert!(matches!(
            f.store.create_request(input(f.service_id, "2025-03-10", 0)).await,
            Err(PlanError::Validation(_))
        ));

        let mut bad_time = input(f.service_id, "2025-03-10", 1);
        bad_time.send_time = Some("아침".to_string());
        assert!(matches!(f.store.create_request(bad_time).await, Err(PlanError::Validation(_))));

        assert!(matches!(
            f.store.create_request(input(4242, "2025-03-10", 1)).await,
            Err(PlanError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_time_means_unset() {
        let f = setup().await;
        let mut unset = input(f.service_id, "2025-03-10", 5);
        unset.send_time = Some(String::new());
        unset.campaign_name = Some("  ".to_string());

        let created = f.store.create_request(unset).await.unwrap();
        assert!(created.request.send_time.is_none());
        assert!(created.request.campaign_name.is_none());
    }

    #[tokio::test]
    async fn test_create_then_delete_restores_sum() {
        let f = setup().await;
        f.store.create_request(input(f.service_id, "2025-03-02", 30)).await.unwrap();
        let before = f.store.consumed(naver_march(f.org_id)).await.unwrap();

        let created = f.store.create_request(input(f.service_id, "2025-03-03", 25)).await.unwrap();
        f.store.delete_request(created.request.id).await.unwrap();

        assert_eq!(f.store.consumed(naver_march(f.org_id)).await.unwrap(), before);
        assert!(matches!(
            f.store.delete_request(created.request.id).await,
            Err(PlanError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_frozen_month_blocks_create_and_delete() {
        let f = setup().await;
        let created = f.store.create_request(input(f.service_id, "2025-03-02", 10)).await.unwrap();

        f.freeze.set_freeze(ym("2025-03"), true, "admin").await.unwrap();

        match f.store.create_request(input(f.service_id, "2025-03-03", 10)).await {
            Err(err @ PlanError::FrozenMonth(_)) => assert!(err.to_string().contains("2025-03")),
            other => panic!("expected FrozenMonth, got {:?}", other),
        }
        assert!(matches!(
            f.store.delete_request(created.request.id).await,
            Err(PlanError::FrozenMonth(_))
        ));

        f.freeze.set_freeze(ym("2025-03"), false, "admin").await.unwrap();
        tokio_test::assert_ok!(f.store.delete_request(created.request.id).await);
    }

    #[tokio::test]
    async fn test_concurrent_creates_never_overcommit() {
        let f = setup().await;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = f.store.clone();
                let service_id = f.service_id;
                tokio::spawn(async move {
                    store.create_request(input(service_id, "2025-03-15", 15)).await
                })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        // 100 / 15 = 6건까지만 통과
        assert_eq!(succeeded, 6);
        assert_eq!(f.store.consumed(naver_march(f.org_id)).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_lock_slots_are_pruned() {
        let locks = ConsumptionLocks::new();
        let key = ConsumptionKey {
            organization_id: 1,
            channel: Channel::Naver,
            year_month: ym("2025-03"),
        };
        drop(locks.acquire(key).await);

        let other = ConsumptionKey {
            year_month: ym("2025-04"),
            ..key
        };
        let _held = locks.acquire(other).await;
        assert_eq!(locks.slots.lock().unwrap().len(), 1);
    }
}
