//! Organization / Service Directory
//!
//! 조직 → 서비스 포함 관계 관리.
//!
//! # Referential Integrity
//!
//! 삭제 가드는 애플리케이션 레이어에서 먼저 검사 (FK는 최후 방어선)
//! - 조직: 소속 서비스 0개 + 설정된 물량 0개일 때만 삭제
//! - 서비스: 발송 신청 0개일 때만 삭제

use std::sync::Arc;

use crate::db::{Organization, PlanRepository, Service, ServiceSummary};
use crate::error::{PlanError, PlanResult};

/// 서비스 생성/수정 입력
#[derive(Debug, Clone)]
pub struct ServiceInput {
    pub name: String,
    pub manager_name: Option<String>,
}

pub struct Directory {
    repo: Arc<dyn PlanRepository>,
}

impl Directory {
    pub fn new(repo: Arc<dyn PlanRepository>) -> Self {
        Self { repo }
    }

    // ============ Organizations ============

    pub async fn create_organization(&self, name: &str) -> PlanResult<Organization> {
        let name = required(name, "Organization name")?;
        self.ensure_unique_name(name, None).await?;

        let org = self.repo.insert_organization(name).await?;
        tracing::info!(organization_id = org.id, name = %org.name, "Organization created");
        Ok(org)
    }

    pub async fn list_organizations(&self) -> PlanResult<Vec<Organization>> {
        Ok(self.repo.list_organizations().await?)
    }

    pub async fn get_organization(&self, id: i64) -> PlanResult<Organization> {
        self.repo
            .get_organization(id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Organization {}", id)))
    }

    pub async fn rename_organization(&self, id: i64, name: &str) -> PlanResult<Organization> {
        let name = required(name, "Organization name")?;
        self.ensure_unique_name(name, Some(id)).await?;

        self.repo
            .rename_organization(id, name)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Organization {}", id)))
    }

    pub async fn delete_organization(&self, id: i64) -> PlanResult<()> {
        self.get_organization(id).await?;

        let services = self.repo.count_services(id).await?;
        let quotas = self.repo.count_quotas(id).await?;
        if services > 0 || quotas > 0 {
            return Err(PlanError::validation(format!(
                "Organization {} still owns {} service(s) and {} quota(s)",
                id, services, quotas
            )));
        }

        if !self.repo.delete_organization(id).await? {
            return Err(PlanError::not_found(format!("Organization {}", id)));
        }
        tracing::info!(organization_id = id, "Organization deleted");
        Ok(())
    }

    async fn ensure_unique_name(&self, name: &str, except: Option<i64>) -> PlanResult<()> {
        match self.repo.find_organization_by_name(name).await? {
            Some(existing) if Some(existing.id) != except => Err(PlanError::validation(format!(
                "Organization name already exists: {}",
                name
            ))),
            _ => Ok(()),
        }
    }

    // ============ Services ============

    pub async fn create_service(
        &self,
        organization_id: i64,
        input: ServiceInput,
    ) -> PlanResult<Service> {
        let name = required(&input.name, "Service name")?;
        self.get_organization(organization_id).await?;

        let service = self
            .repo
            .insert_service(organization_id, name, optional(input.manager_name.as_deref()))
            .await?;
        tracing::info!(service_id = service.id, organization_id, "Service created");
        Ok(service)
    }

    pub async fn get_service(&self, id: i64) -> PlanResult<Service> {
        self.repo
            .get_service(id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Service {}", id)))
    }

    /// 전체 또는 조직별 서비스 목록
    pub async fn list_services(&self, organization_id: Option<i64>) -> PlanResult<Vec<ServiceSummary>> {
        Ok(self.repo.list_services(organization_id).await?)
    }

    pub async fn update_service(&self, id: i64, input: ServiceInput) -> PlanResult<Service> {
        let name = required(&input.name, "Service name")?;

        self.repo
            .update_service(id, name, optional(input.manager_name.as_deref()))
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Service {}", id)))
    }

    pub async fn delete_service(&self, id: i64) -> PlanResult<()> {
        self.get_service(id).await?;

        let requests = self.repo.count_requests(id).await?;
        if requests > 0 {
            return Err(PlanError::validation(format!(
                "Service {} still owns {} send request(s)",
                id, requests
            )));
        }

        if !self.repo.delete_service(id).await? {
            return Err(PlanError::not_found(format!("Service {}", id)));
        }
        tracing::info!(service_id = id, "Service deleted");
        Ok(())
    }
}

fn required<'a>(value: &'a str, field: &str) -> PlanResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlanError::validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
