//! Freeze Gate
//!
//! 월 단위 동결 스위치. 동결된 월의 발송 신청은 직접 생성/삭제할 수 없고
//! 변경 요청 워크플로우를 거쳐야 함.
//!
//! 행이 없는 월은 열린 상태(is_frozen = false)로 취급

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{MonthlyFreeze, PlanRepository};
use crate::error::{PlanError, PlanResult};
use crate::types::YearMonth;

/// 월 동결 상태 응답
#[derive(Debug, Clone, Serialize)]
pub struct FreezeStatus {
    pub year_month: YearMonth,
    pub is_frozen: bool,
    pub frozen_at: Option<DateTime<Utc>>,
    pub frozen_by: Option<String>,
}

impl FreezeStatus {
    fn open(year_month: YearMonth) -> Self {
        Self {
            year_month,
            is_frozen: false,
            frozen_at: None,
            frozen_by: None,
        }
    }
}

impl From<MonthlyFreeze> for FreezeStatus {
    fn from(row: MonthlyFreeze) -> Self {
        Self {
            year_month: row.year_month,
            is_frozen: row.is_frozen,
            frozen_at: row.frozen_at,
            frozen_by: row.frozen_by,
        }
    }
}

#[derive(Clone)]
pub struct FreezeGate {
    repo: Arc<dyn PlanRepository>,
}

impl FreezeGate {
    pub fn new(repo: Arc<dyn PlanRepository>) -> Self {
        Self { repo }
    }

    pub async fn is_frozen(&self, year_month: YearMonth) -> PlanResult<bool> {
        let freeze = self.repo.get_freeze(year_month).await?;
        Ok(freeze.map_or(false, |f| f.is_frozen))
    }

    /// 동결된 월이면 FrozenMonth
    pub async fn ensure_open(&self, year_month: YearMonth) -> PlanResult<()> {
        if self.is_frozen(year_month).await? {
            return Err(PlanError::FrozenMonth(year_month));
        }
        Ok(())
    }

    pub async fn status(&self, year_month: YearMonth) -> PlanResult<FreezeStatus> {
        let freeze = self.repo.get_freeze(year_month).await?;
        Ok(freeze.map_or_else(|| FreezeStatus::open(year_month), FreezeStatus::from))
    }

    /// 동결/해제 (upsert)
    ///
    /// 동결로 바뀔 때 frozen_at/frozen_by 기록
    pub async fn set_freeze(
        &self,
        year_month: YearMonth,
        frozen: bool,
        admin_name: &str,
    ) -> PlanResult<FreezeStatus> {
        let row = self
            .repo
            .upsert_freeze(year_month, frozen, admin_name, Utc::now())
            .await?;

        tracing::info!(
            year_month = %year_month,
            frozen,
            admin = admin_name,
            "Month freeze updated"
        );

        Ok(row.into())
    }

    pub async fn list(&self) -> PlanResult<Vec<FreezeStatus>> {
        let rows = self.repo.list_freezes().await?;
        Ok(rows.into_iter().map(FreezeStatus::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::MockPlanRepository;

    fn gate() -> FreezeGate {
        FreezeGate::new(Arc::new(MockPlanRepository::new()))
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_absent_month_is_open() {
        let gate = gate();
        assert!(!gate.is_frozen(ym("2025-04")).await.unwrap());
        tokio_test::assert_ok!(gate.ensure_open(ym("2025-04")).await);

        let status = gate.status(ym("2025-04")).await.unwrap();
        assert!(!status.is_frozen);
        assert!(status.frozen_at.is_none());
    }

    #[tokio::test]
    async fn test_freeze_stamps_audit_fields() {
        let gate = gate();
        let status = gate.set_freeze(ym("2025-04"), true, "ops").await.unwrap();
        assert!(status.is_frozen);
        assert!(status.frozen_at.is_some());
        assert_eq!(status.frozen_by.as_deref(), Some("ops"));

        match gate.ensure_open(ym("2025-04")).await {
            Err(PlanError::FrozenMonth(month)) => assert_eq!(month.to_string(), "2025-04"),
            other => panic!("expected FrozenMonth, got {:?}", other),
        }

        // 다른 월은 영향 없음
        tokio_test::assert_ok!(gate.ensure_open(ym("2025-05")).await);
    }

    #[tokio::test]
    async fn test_unfreeze_keeps_last_stamp() {
        let gate = gate();
        gate.set_freeze(ym("2025-04"), true, "ops").await.unwrap();
        let status = gate.set_freeze(ym("2025-04"), false, "other").await.unwrap();

        assert!(!status.is_frozen);
        assert_eq!(status.frozen_by.as_deref(), Some("ops"));
        assert!(!gate.is_frozen(ym("2025-04")).await.unwrap());
        assert_eq!(gate.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refreeze_keeps_original_stamp() {
        let gate = gate();
        let first = gate.set_freeze(ym("2025-04"), true, "ops").await.unwrap();
        let again = gate.set_freeze(ym("2025-04"), true, "other").await.unwrap();

        assert!(again.is_frozen);
        assert_eq!(again.frozen_by.as_deref(), Some("ops"));
        assert_eq!(again.frozen_at, first.frozen_at);

        // 해제 후 다시 동결하면 새로 찍힘
        gate.set_freeze(ym("2025-04"), false, "ops").await.unwrap();
        let refrozen = gate.set_freeze(ym("2025-04"), true, "other").await.unwrap();
        assert_eq!(refrozen.frozen_by.as_deref(), Some("other"));
    }
}
