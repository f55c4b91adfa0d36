//! Quota Ledger
//!
//! (조직, 월, 채널) 당 하나의 물량 값. "얼마나 보낼 수 있는가"의 기준.
//!
//! # 조회 vs 생성
//!
//! - 조회(`get_quota`): 행이 없으면 0 (설정 안 됨 = 에러 아님)
//! - 신청 생성: 행이 없으면 QuotaNotConfigured (request_store 참고)

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::db::{MonthlyQuota, NewQuota, PlanRepository, QuotaFilter, QuotaSummary};
use crate::error::{PlanError, PlanResult};
use crate::types::{Channel, YearMonth};

/// 월 물량 복사 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    pub copied: u64,
    pub skipped: u64,
}

pub struct QuotaLedger {
    repo: Arc<dyn PlanRepository>,
}

impl QuotaLedger {
    pub fn new(repo: Arc<dyn PlanRepository>) -> Self {
        Self { repo }
    }

    /// 물량 설정 (upsert)
    ///
    /// 같은 키로 다시 호출하면 값만 덮어씀
    pub async fn set_quota(
        &self,
        organization_id: i64,
        year_month: YearMonth,
        channel: Channel,
        total_quota: i64,
    ) -> PlanResult<MonthlyQuota> {
        ensure_non_negative(total_quota)?;

        if self.repo.get_organization(organization_id).await?.is_none() {
            return Err(PlanError::not_found(format!("Organization {}", organization_id)));
        }

        let quota = self
            .repo
            .upsert_quota(organization_id, year_month, channel, total_quota)
            .await?;

        tracing::info!(
            organization_id,
            year_month = %year_month,
            channel = %channel,
            total_quota,
            "Quota set"
        );
        Ok(quota)
    }

    /// 채널 물량 조회 (없으면 0)
    pub async fn get_quota(
        &self,
        organization_id: i64,
        year_month: YearMonth,
        channel: Channel,
    ) -> PlanResult<i64> {
        let quota = self.repo.find_quota(organization_id, year_month, channel).await?;
        Ok(quota.map_or(0, |q| q.total_quota))
    }

    /// 전체 채널 물량 합계
    pub async fn get_total_quota(
        &self,
        organization_id: i64,
        year_month: YearMonth,
    ) -> PlanResult<i64> {
        let filter = QuotaFilter {
            year_month: Some(year_month),
            organization_id: Some(organization_id),
            ..Default::default()
        };
        let quotas = self.repo.list_quotas(&filter).await?;
        Ok(quotas.iter().map(|q| q.total_quota).sum())
    }

    pub async fn list_quotas(&self, filter: &QuotaFilter) -> PlanResult<Vec<QuotaSummary>> {
        Ok(self.repo.list_quotas(filter).await?)
    }

    pub async fn update_quota(&self, id: i64, total_quota: i64) -> PlanResult<MonthlyQuota> {
        ensure_non_negative(total_quota)?;

        let quota = self
            .repo
            .update_quota_total(id, total_quota)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Quota {}", id)))?;

        tracing::info!(quota_id = id, total_quota, "Quota updated");
        Ok(quota)
    }

    pub async fn delete_quota(&self, id: i64) -> PlanResult<()> {
        if !self.repo.delete_quota(id).await? {
            return Err(PlanError::not_found(format!("Quota {}", id)));
        }
        tracing::info!(quota_id = id, "Quota deleted");
        Ok(())
    }

    /// 월 물량 복사
    ///
    /// 대상 월에 이미 물량 행이 하나라도 있는 조직은 채널과 무관하게
    /// 그 조직의 원본 행 전체를 건너뜀 (조직 단위 충돌 검사)
    pub async fn copy_quotas(&self, source: YearMonth, target: YearMonth) -> PlanResult<CopyOutcome> {
        if source == target {
            return Err(PlanError::validation(
                "Source and target month must differ",
            ));
        }

        let source_rows = self
            .repo
            .list_quotas(&QuotaFilter {
                year_month: Some(source),
                ..Default::default()
            })
            .await?;
        if source_rows.is_empty() {
            return Err(PlanError::validation(format!(
                "No quotas configured for {}",
                source
            )));
        }

        let existing_orgs: HashSet<i64> = self
            .repo
            .list_quotas(&QuotaFilter {
                year_month: Some(target),
                ..Default::default()
            })
            .await?
            .into_iter()
            .map(|q| q.organization_id)
            .collect();

        let (to_copy, skipped): (Vec<_>, Vec<_>) = source_rows
            .into_iter()
            .partition(|q| !existing_orgs.contains(&q.organization_id));

        let new_rows: Vec<NewQuota> = to_copy
            .iter()
            .map(|q| NewQuota {
                organization_id: q.organization_id,
                year_month: target,
                channel: q.channel,
                total_quota: q.total_quota,
            })
            .collect();

        let copied = if new_rows.is_empty() {
            0
        } else {
            self.repo.insert_quotas(&new_rows).await?
        };

        let outcome = CopyOutcome {
            copied,
            skipped: skipped.len() as u64,
        };
        tracing::info!(
            source = %source,
            target = %target,
            copied = outcome.copied,
            skipped = outcome.skipped,
            "Quotas copied"
        );
        Ok(outcome)
    }
}

fn ensure_non_negative(total_quota: i64) -> PlanResult<()> {
    if total_quota < 0 {
        return Err(PlanError::validation(format!(
            "Quota must be non-negative: {}",
            total_quota
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::MockPlanRepository;

    struct Fixture {
        repo: Arc<MockPlanRepository>,
        ledger: QuotaLedger,
    }

    fn setup() -> Fixture {
        let repo = Arc::new(MockPlanRepository::new());
        let ledger = QuotaLedger::new(repo.clone());
        Fixture { repo, ledger }
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_set_quota_is_upsert() {
        let f = setup();
        let org = f.repo.insert_organization("대출").await.unwrap();

        let first = f.ledger.set_quota(org.id, ym("2025-03"), Channel::Naver, 100).await.unwrap();
        let second = f.ledger.set_quota(org.id, ym("2025-03"), Channel::Naver, 250).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.ledger.get_quota(org.id, ym("2025-03"), Channel::Naver).await.unwrap(), 250);
        assert_eq!(f.ledger.list_quotas(&QuotaFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_quota_reads_as_zero() {
        let f = setup();
        let org = f.repo.insert_organization("대출").await.unwrap();
        assert_eq!(f.ledger.get_quota(org.id, ym("2025-03"), Channel::Payco).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_quota_validation() {
        let f = setup();
        let org = f.repo.insert_organization("대출").await.unwrap();

        assert!(matches!(
            f.ledger.set_quota(org.id, ym("2025-03"), Channel::Naver, -1).await,
            Err(PlanError::Validation(_))
        ));
        assert!(matches!(
            f.ledger.set_quota(9999, ym("2025-03"), Channel::Naver, 10).await,
            Err(PlanError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_total_quota_sums_channels() {
        let f = setup();
        let org = f.repo.insert_organization("페이앱").await.unwrap();
        f.ledger.set_quota(org.id, ym("2025-03"), Channel::Naver, 100).await.unwrap();
        f.ledger.set_quota(org.id, ym("2025-03"), Channel::Payco, 30).await.unwrap();
        f.ledger.set_quota(org.id, ym("2025-04"), Channel::Payco, 999).await.unwrap();

        assert_eq!(f.ledger.get_total_quota(org.id, ym("2025-03")).await.unwrap(), 130);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_quota() {
        let f = setup();
        assert!(matches!(f.ledger.update_quota(42, 10).await, Err(PlanError::NotFound(_))));
        assert!(matches!(f.ledger.delete_quota(42).await, Err(PlanError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_copy_rejects_same_or_empty_source() {
        let f = setup();
        assert!(matches!(
            f.ledger.copy_quotas(ym("2025-03"), ym("2025-03")).await,
            Err(PlanError::Validation(_))
        ));
        assert!(matches!(
            f.ledger.copy_quotas(ym("2025-03"), ym("2025-04")).await,
            Err(PlanError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_copy_keeps_channels() {
        let f = setup();
        let org = f.repo.insert_organization("보험").await.unwrap();
        f.ledger.set_quota(org.id, ym("2025-03"), Channel::Naver, 100).await.unwrap();
        f.ledger.set_quota(org.id, ym("2025-03"), Channel::Talktalk, 20).await.unwrap();

        let outcome = f.ledger.copy_quotas(ym("2025-03"), ym("2025-04")).await.unwrap();
        assert_eq!(outcome, CopyOutcome { copied: 2, skipped: 0 });

        assert_eq!(f.ledger.get_quota(org.id, ym("2025-04"), Channel::Naver).await.unwrap(), 100);
        assert_eq!(f.ledger.get_quota(org.id, ym("2025-04"), Channel::Talktalk).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_copy_collision_is_per_organization() {
        let f = setup();
        let a = f.repo.insert_organization("A").await.unwrap();
        let b = f.repo.insert_organization("B").await.unwrap();

        f.ledger.set_quota(a.id, ym("2025-03"), Channel::Naver, 100).await.unwrap();
        f.ledger.set_quota(a.id, ym("2025-03"), Channel::Payco, 50).await.unwrap();
        f.ledger.set_quota(b.id, ym("2025-03"), Channel::Naver, 70).await.unwrap();

        // A는 대상 월에 payco만 있지만 naver까지 전부 건너뜀
        f.ledger.set_quota(a.id, ym("2025-04"), Channel::Talktalk, 5).await.unwrap();

        let outcome = f.ledger.copy_quotas(ym("2025-03"), ym("2025-04")).await.unwrap();
        assert_eq!(outcome, CopyOutcome { copied: 1, skipped: 2 });
        assert_eq!(f.ledger.get_quota(a.id, ym("2025-04"), Channel::Naver).await.unwrap(), 0);
        assert_eq!(f.ledger.get_quota(b.id, ym("2025-04"), Channel::Naver).await.unwrap(), 70);

        // 모든 조직이 이미 있으면 no-op
        let again = f.ledger.copy_quotas(ym("2025-03"), ym("2025-04")).await.unwrap();
        assert_eq!(again, CopyOutcome { copied: 0, skipped: 3 });
    }
}
