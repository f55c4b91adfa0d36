//! PostgreSQL `PlanRepository` 구현
//!
//! 채널/월/상태는 TEXT 컬럼으로 bind, 조회 시 models의 `try_from`으로 복원

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::models::{
    ApprovalEffect, ChangeRequest, MonthlyFreeze, MonthlyQuota, NewChangeRequest, NewQuota,
    NewSendRequest, Organization, QuotaFilter, QuotaSummary, RequestEntry, RequestFilter,
    Resolution, SendRequest, Service, ServiceSummary,
};
use super::repository::PlanRepository;
use super::Database;
use crate::types::{Channel, ChangeRequestStatus, YearMonth};

#[async_trait]
impl PlanRepository for Database {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ============ Organizations ============

    async fn insert_organization(&self, name: &str) -> Result<Organization> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, created_at)
            VALUES ($1, NOW())
            RETURNING id, name, created_at
            "#
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(org)
    }

    async fn get_organization(&self, id: i64) -> Result<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations WHERE name = $1"
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let orgs = sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at FROM organizations ORDER BY id"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(orgs)
    }

    async fn rename_organization(&self, id: i64, name: &str) -> Result<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2
            WHERE id = $1
            RETURNING id, name, created_at
            "#
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    async fn delete_organization(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_services(&self, organization_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM services WHERE organization_id = $1"
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_quotas(&self, organization_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM monthly_quotas WHERE organization_id = $1"
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ============ Services ============

    async fn insert_service(
        &self,
        organization_id: i64,
        name: &str,
        manager_name: Option<&str>,
    ) -> Result<Service> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (organization_id, name, manager_name, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, organization_id, name, manager_name, created_at
            "#
        )
        .bind(organization_id)
        .bind(name)
        .bind(manager_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(service)
    }

    async fn get_service(&self, id: i64) -> Result<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, organization_id, name, manager_name, created_at
            FROM services
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(service)
    }

    async fn list_services(&self, organization_id: Option<i64>) -> Result<Vec<ServiceSummary>> {
        let services = sqlx::query_as::<_, ServiceSummary>(
            r#"
            SELECT
                s.id,
                s.organization_id,
                o.name AS organization_name,
                s.name,
                s.manager_name,
                s.created_at
            FROM services s
            JOIN organizations o ON o.id = s.organization_id
            WHERE ($1::BIGINT IS NULL OR s.organization_id = $1)
            ORDER BY s.id
            "#
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }

    async fn update_service(
        &self,
        id: i64,
        name: &str,
        manager_name: Option<&str>,
    ) -> Result<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET name = $2, manager_name = $3
            WHERE id = $1
            RETURNING id, organization_id, name, manager_name, created_at
            "#
        )
        .bind(id)
        .bind(name)
        .bind(manager_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(service)
    }

    async fn delete_service(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_requests(&self, service_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM send_requests WHERE service_id = $1"
        )
        .bind(service_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // ============ Quotas ============

    async fn upsert_quota(
        &self,
        organization_id: i64,
        year_month: YearMonth,
        channel: Channel,
        total_quota: i64,
    ) -> Result<MonthlyQuota> {
        let quota = sqlx::query_as::<_, MonthlyQuota>(
            r#"
            INSERT INTO monthly_quotas (
                organization_id, year_month, channel, total_quota, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (organization_id, year_month, channel)
            DO UPDATE SET
                total_quota = EXCLUDED.total_quota,
                updated_at = NOW()
            RETURNING id, organization_id, year_month, channel, total_quota, created_at, updated_at
            "#
        )
        .bind(organization_id)
        .bind(year_month.to_string())
        .bind(channel.as_str())
        .bind(total_quota)
        .fetch_one(&self.pool)
        .await?;

        Ok(quota)
    }

    async fn find_quota(
        &self,
        organization_id: i64,
        year_month: YearMonth,
        channel: Channel,
    ) -> Result<Option<MonthlyQuota>> {
        let quota = sqlx::query_as::<_, MonthlyQuota>(
            r#"
            SELECT id, organization_id, year_month, channel, total_quota, created_at, updated_at
            FROM monthly_quotas
            WHERE organization_id = $1 AND year_month = $2 AND channel = $3
            "#
        )
        .bind(organization_id)
        .bind(year_month.to_string())
        .bind(channel.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(quota)
    }

    async fn get_quota(&self, id: i64) -> Result<Option<MonthlyQuota>> {
        let quota = sqlx::query_as::<_, MonthlyQuota>(
            r#"
            SELECT id, organization_id, year_month, channel, total_quota, created_at, updated_at
            FROM monthly_quotas
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quota)
    }

    async fn list_quotas(&self, filter: &QuotaFilter) -> Result<Vec<QuotaSummary>> {
        let quotas = sqlx::query_as::<_, QuotaSummary>(
            r#"
            SELECT
                q.id,
                q.organization_id,
                o.name AS organization_name,
                q.year_month,
                q.channel,
                q.total_quota,
                q.created_at
            FROM monthly_quotas q
            JOIN organizations o ON o.id = q.organization_id
            WHERE ($1::TEXT IS NULL OR q.year_month = $1)
              AND ($2::TEXT IS NULL OR q.channel = $2)
              AND ($3::BIGINT IS NULL OR q.organization_id = $3)
            ORDER BY q.year_month DESC, q.channel, o.name
            "#
        )
        .bind(filter.year_month.map(|ym| ym.to_string()))
        .bind(filter.channel.map(|c| c.as_str()))
        .bind(filter.organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(quotas)
    }

    async fn update_quota_total(&self, id: i64, total_quota: i64) -> Result<Option<MonthlyQuota>> {
        let quota = sqlx::query_as::<_, MonthlyQuota>(
            r#"
            UPDATE monthly_quotas
            SET total_quota = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, organization_id, year_month, channel, total_quota, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(total_quota)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quota)
    }

    async fn delete_quota(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM monthly_quotas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_quotas(&self, quotas: &[NewQuota]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for quota in quotas {
            let result = sqlx::query(
                r#"
                INSERT INTO monthly_quotas (
                    organization_id, year_month, channel, total_quota, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, NOW(), NOW())
                "#
            )
            .bind(quota.organization_id)
            .bind(quota.year_month.to_string())
            .bind(quota.channel.as_str())
            .bind(quota.total_quota)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    // ============ Send requests ============

    async fn insert_request(&self, request: &NewSendRequest) -> Result<SendRequest> {
        let row = sqlx::query_as::<_, SendRequest>(
            r#"
            INSERT INTO send_requests (
                service_id, send_date, send_time, channel, campaign_name, quantity,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING
                id, service_id, send_date, send_time, channel, campaign_name, quantity,
                created_at, updated_at
            "#
        )
        .bind(request.service_id)
        .bind(request.send_date)
        .bind(&request.send_time)
        .bind(request.channel.as_str())
        .bind(&request.campaign_name)
        .bind(request.quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_request(&self, id: i64) -> Result<Option<SendRequest>> {
        let row = sqlx::query_as::<_, SendRequest>(
            r#"
            SELECT
                id, service_id, send_date, send_time, channel, campaign_name, quantity,
                created_at, updated_at
            FROM send_requests
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_request(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM send_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn sum_requested(
        &self,
        organization_id: i64,
        channel: Channel,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<i64> {
        // SUM(BIGINT)은 NUMERIC을 반환하므로 캐스팅
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(r.quantity), 0)::BIGINT
            FROM send_requests r
            JOIN services s ON s.id = r.service_id
            WHERE s.organization_id = $1
              AND r.channel = $2
              AND r.send_date >= $3
              AND r.send_date < $4
            "#
        )
        .bind(organization_id)
        .bind(channel.as_str())
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<RequestEntry>> {
        let rows = sqlx::query_as::<_, RequestEntry>(
            r#"
            SELECT
                r.id,
                r.service_id,
                s.name AS service_name,
                s.organization_id,
                o.name AS organization_name,
                r.send_date,
                r.send_time,
                r.channel,
                r.campaign_name,
                r.quantity,
                r.created_at
            FROM send_requests r
            JOIN services s ON s.id = r.service_id
            JOIN organizations o ON o.id = s.organization_id
            WHERE ($1::BIGINT IS NULL OR r.service_id = $1)
              AND ($2::BIGINT IS NULL OR s.organization_id = $2)
              AND ($3::TEXT IS NULL OR r.channel = $3)
              AND ($4::DATE IS NULL OR r.send_date >= $4)
              AND ($5::DATE IS NULL OR r.send_date < $5)
            ORDER BY r.send_date DESC, r.created_at DESC, r.id DESC
            "#
        )
        .bind(filter.service_id)
        .bind(filter.organization_id)
        .bind(filter.channel.map(|c| c.as_str()))
        .bind(filter.from)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============ Freezes ============

    async fn get_freeze(&self, year_month: YearMonth) -> Result<Option<MonthlyFreeze>> {
        let freeze = sqlx::query_as::<_, MonthlyFreeze>(
            r#"
            SELECT id, year_month, is_frozen, frozen_at, frozen_by, updated_at
            FROM monthly_freezes
            WHERE year_month = $1
            "#
        )
        .bind(year_month.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(freeze)
    }

    async fn upsert_freeze(
        &self,
        year_month: YearMonth,
        is_frozen: bool,
        frozen_by: &str,
        at: DateTime<Utc>,
    ) -> Result<MonthlyFreeze> {
        // 해제 시 frozen_at/frozen_by는 NULL로 넘기고 기존 값 유지
        // 이미 동결된 월을 다시 동결하면 최초 스탬프 유지
        let freeze = sqlx::query_as::<_, MonthlyFreeze>(
            r#"
            INSERT INTO monthly_freezes (year_month, is_frozen, frozen_at, frozen_by, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (year_month)
            DO UPDATE SET
                is_frozen = EXCLUDED.is_frozen,
                frozen_at = CASE WHEN monthly_freezes.is_frozen
                    THEN monthly_freezes.frozen_at
                    ELSE COALESCE(EXCLUDED.frozen_at, monthly_freezes.frozen_at) END,
                frozen_by = CASE WHEN monthly_freezes.is_frozen
                    THEN monthly_freezes.frozen_by
                    ELSE COALESCE(EXCLUDED.frozen_by, monthly_freezes.frozen_by) END,
                updated_at = EXCLUDED.updated_at
            RETURNING id, year_month, is_frozen, frozen_at, frozen_by, updated_at
            "#
        )
        .bind(year_month.to_string())
        .bind(is_frozen)
        .bind(is_frozen.then_some(at))
        .bind(is_frozen.then_some(frozen_by))
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(freeze)
    }

    async fn list_freezes(&self) -> Result<Vec<MonthlyFreeze>> {
        let freezes = sqlx::query_as::<_, MonthlyFreeze>(
            r#"
            SELECT id, year_month, is_frozen, frozen_at, frozen_by, updated_at
            FROM monthly_freezes
            ORDER BY year_month DESC
            "#
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(freezes)
    }

    // ============ Change requests ============

    async fn insert_change_request(&self, request: &NewChangeRequest) -> Result<ChangeRequest> {
        let row = sqlx::query_as::<_, ChangeRequest>(
            r#"
            INSERT INTO change_requests (
                request_type, original_request_id, service_id, year_month,
                send_date, send_time, channel, campaign_name, quantity,
                reason, requester_name, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', NOW())
            RETURNING
                id, request_type, original_request_id, service_id, year_month,
                send_date, send_time, channel, campaign_name, quantity,
                reason, requester_name, status, admin_memo, processed_by, processed_at,
                created_at
            "#
        )
        .bind(request.request_type.as_str())
        .bind(request.original_request_id)
        .bind(request.service_id)
        .bind(request.year_month.to_string())
        .bind(request.send_date)
        .bind(&request.send_time)
        .bind(request.channel.map(|c| c.as_str()))
        .bind(&request.campaign_name)
        .bind(request.quantity)
        .bind(&request.reason)
        .bind(&request.requester_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_change_request(&self, id: i64) -> Result<Option<ChangeRequest>> {
        let row = sqlx::query_as::<_, ChangeRequest>(
            r#"
            SELECT
                id, request_type, original_request_id, service_id, year_month,
                send_date, send_time, channel, campaign_name, quantity,
                reason, requester_name, status, admin_memo, processed_by, processed_at,
                created_at
            FROM change_requests
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_change_requests(
        &self,
        status: Option<ChangeRequestStatus>,
    ) -> Result<Vec<ChangeRequest>> {
        let rows = sqlx::query_as::<_, ChangeRequest>(
            r#"
            SELECT
                id, request_type, original_request_id, service_id, year_month,
                send_date, send_time, channel, campaign_name, quantity,
                reason, requester_name, status, admin_memo, processed_by, processed_at,
                created_at
            FROM change_requests
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            "#
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn resolve_change_request(
        &self,
        id: i64,
        resolution: &Resolution,
        effect: &ApprovalEffect,
    ) -> Result<Option<ChangeRequest>> {
        let mut tx = self.pool.begin().await?;

        // status = 'pending' 조건으로 중복 처리 방지
        let resolved = sqlx::query_as::<_, ChangeRequest>(
            r#"
            UPDATE change_requests
            SET status = $2, admin_memo = $3, processed_by = $4, processed_at = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING
                id, request_type, original_request_id, service_id, year_month,
                send_date, send_time, channel, campaign_name, quantity,
                reason, requester_name, status, admin_memo, processed_by, processed_at,
                created_at
            "#
        )
        .bind(id)
        .bind(resolution.status.as_str())
        .bind(&resolution.admin_memo)
        .bind(&resolution.processed_by)
        .bind(resolution.processed_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(resolved) = resolved else {
            tx.rollback().await?;
            return Ok(None);
        };

        match effect {
            ApprovalEffect::None => {}
            ApprovalEffect::Insert(request) => {
                sqlx::query(
                    r#"
                    INSERT INTO send_requests (
                        service_id, send_date, send_time, channel, campaign_name, quantity,
                        created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
                    "#
                )
                .bind(request.service_id)
                .bind(request.send_date)
                .bind(&request.send_time)
                .bind(request.channel.as_str())
                .bind(&request.campaign_name)
                .bind(request.quantity)
                .execute(&mut *tx)
                .await?;
            }
            ApprovalEffect::Update { request_id, patch } => {
                // NULL 파라미터는 기존 값 유지 (부분 수정)
                let result = sqlx::query(
                    r#"
                    UPDATE send_requests
                    SET
                        send_date = COALESCE($2, send_date),
                        send_time = COALESCE($3, send_time),
                        channel = COALESCE($4, channel),
                        campaign_name = COALESCE($5, campaign_name),
                        quantity = COALESCE($6, quantity),
                        updated_at = NOW()
                    WHERE id = $1
                    "#
                )
                .bind(request_id)
                .bind(patch.send_date)
                .bind(&patch.send_time)
                .bind(patch.channel.map(|c| c.as_str()))
                .bind(&patch.campaign_name)
                .bind(patch.quantity)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    bail!("send request {} disappeared during approval", request_id);
                }
            }
            ApprovalEffect::Delete { request_id } => {
                sqlx::query("DELETE FROM send_requests WHERE id = $1")
                    .bind(request_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(resolved))
    }
}
