//! Change-Request Workflow
//!
//! 동결된 월의 발송 신청을 바꾸는 유일한 경로.
//!
//! # Interview Q&A
//!
//! Q: 제출 시점에 물량/동결 검사를 하지 않는 이유?
//! A: 직접 경로가 막혔을 때 쓰는 우회 경로이므로
//!    - 제출은 필수 필드 검증만
//!    - 승인은 관리자 override (물량 재검증 없음)
//!    - 따라서 승인된 add/modify는 물량을 초과할 수 있음
//!
//! Q: 상태 전이와 데이터 변경이 어긋나지 않게 하려면?
//! A: `resolve_change_request` 한 트랜잭션에서 처리
//!    - `WHERE status = 'pending'` 조건으로 전이
//!    - 같은 트랜잭션에서 insert/update/delete 적용
//!    - 동시에 두 번 처리돼도 한쪽만 반영

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::db::{
    ApprovalEffect, ChangeRequest, NewChangeRequest, NewSendRequest, PlanRepository, Resolution,
    SendRequestPatch,
};
use crate::error::{PlanError, PlanResult};
use crate::types::{
    normalize_send_time, ChangeRequestStatus, ChangeRequestType, Channel, ProcessAction, YearMonth,
};

/// 변경 요청 제출 입력
#[derive(Debug, Clone)]
pub struct SubmitChangeRequest {
    pub request_type: ChangeRequestType,
    pub original_request_id: Option<i64>,
    pub service_id: Option<i64>,
    pub send_date: Option<NaiveDate>,
    pub send_time: Option<String>,
    pub channel: Option<Channel>,
    pub campaign_name: Option<String>,
    pub quantity: Option<i64>,
    pub reason: String,
    pub requester_name: String,
}

pub struct ChangeRequestWorkflow {
    repo: Arc<dyn PlanRepository>,
}

impl ChangeRequestWorkflow {
    pub fn new(repo: Arc<dyn PlanRepository>) -> Self {
        Self { repo }
    }

    /// 변경 요청 제출 (항상 pending으로 생성)
    pub async fn submit(&self, input: SubmitChangeRequest) -> PlanResult<ChangeRequest> {
        let reason = required(&input.reason, "Reason")?;
        let requester_name = required(&input.requester_name, "Requester name")?;
        let send_time = normalize_send_time(input.send_time.as_deref())?;
        let campaign_name = trimmed(input.campaign_name.clone());

        if let Some(quantity) = input.quantity {
            if quantity <= 0 {
                return Err(PlanError::validation(format!(
                    "Quantity must be positive: {}",
                    quantity
                )));
            }
        }

        let (service_id, year_month) = match input.request_type {
            ChangeRequestType::Add => self.resolve_add_target(&input).await?,
            ChangeRequestType::Modify | ChangeRequestType::Delete => {
                self.resolve_existing_target(&input).await?
            }
        };

        let row = self
            .repo
            .insert_change_request(&NewChangeRequest {
                request_type: input.request_type,
                original_request_id: input.original_request_id,
                service_id,
                year_month,
                send_date: input.send_date,
                send_time,
                channel: input.channel,
                campaign_name,
                quantity: input.quantity,
                reason,
                requester_name,
            })
            .await?;

        tracing::info!(
            change_request_id = row.id,
            request_type = row.request_type.as_str(),
            year_month = %row.year_month,
            requester = %row.requester_name,
            "Change request submitted"
        );
        Ok(row)
    }

    async fn resolve_add_target(
        &self,
        input: &SubmitChangeRequest,
    ) -> PlanResult<(Option<i64>, YearMonth)> {
        let service_id = input
            .service_id
            .ok_or_else(|| PlanError::validation("Service is required for add"))?;
        let send_date = input
            .send_date
            .ok_or_else(|| PlanError::validation("Send date is required for add"))?;
        if input.channel.is_none() {
            return Err(PlanError::validation("Channel is required for add"));
        }
        if input.quantity.is_none() {
            return Err(PlanError::validation("Quantity is required for add"));
        }

        if self.repo.get_service(service_id).await?.is_none() {
            return Err(PlanError::not_found(format!("Service {}", service_id)));
        }

        Ok((Some(service_id), YearMonth::of(send_date)?))
    }

    /// modify/delete: 서비스는 원본에서, 월은 새 발송일 또는 원본 발송일에서
    async fn resolve_existing_target(
        &self,
        input: &SubmitChangeRequest,
    ) -> PlanResult<(Option<i64>, YearMonth)> {
        let original_id = input.original_request_id.ok_or_else(|| {
            PlanError::validation(format!(
                "Original request is required for {}",
                input.request_type.as_str()
            ))
        })?;

        let original = self.repo.get_request(original_id).await?;
        let service_id = original.as_ref().map(|r| r.service_id).or(input.service_id);

        let send_date = input
            .send_date
            .or(original.as_ref().map(|r| r.send_date))
            .ok_or_else(|| PlanError::not_found(format!("Send request {}", original_id)))?;

        Ok((service_id, YearMonth::of(send_date)?))
    }

    /// 관리자 승인/거절
    pub async fn process(
        &self,
        id: i64,
        action: &str,
        admin_memo: Option<String>,
        admin_name: &str,
    ) -> PlanResult<ChangeRequest> {
        let change = self
            .repo
            .get_change_request(id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Change request {}", id)))?;

        let action = ProcessAction::parse(action)
            .ok_or_else(|| PlanError::InvalidAction(action.to_string()))?;

        if change.status.is_terminal() {
            return Err(already_processed(&change));
        }

        let effect = match action {
            ProcessAction::Reject => ApprovalEffect::None,
            ProcessAction::Approve => self.approval_effect(&change).await?,
        };

        let resolution = Resolution {
            status: action.resulting_status(),
            admin_memo: trimmed(admin_memo),
            processed_by: admin_name.to_string(),
            processed_at: Utc::now(),
        };

        let resolved = self
            .repo
            .resolve_change_request(id, &resolution, &effect)
            .await?
            .ok_or_else(|| already_processed(&change))?;

        tracing::info!(
            change_request_id = id,
            status = resolved.status.as_str(),
            admin = admin_name,
            "Change request processed"
        );
        Ok(resolved)
    }

    /// 승인 시 적용할 발송 신청 변경
    async fn approval_effect(&self, change: &ChangeRequest) -> PlanResult<ApprovalEffect> {
        let channel = change.parsed_channel()?;

        match change.request_type {
            ChangeRequestType::Add => {
                let (Some(service_id), Some(send_date), Some(channel), Some(quantity)) =
                    (change.service_id, change.send_date, channel, change.quantity)
                else {
                    return Err(PlanError::validation(format!(
                        "Change request {} is missing fields required for add",
                        change.id
                    )));
                };
                Ok(ApprovalEffect::Insert(NewSendRequest {
                    service_id,
                    send_date,
                    send_time: change.send_time.clone(),
                    channel,
                    campaign_name: change.campaign_name.clone(),
                    quantity,
                }))
            }
            ChangeRequestType::Modify => {
                let request_id = original_id(change)?;
                if self.repo.get_request(request_id).await?.is_none() {
                    return Err(PlanError::not_found(format!("Send request {}", request_id)));
                }

                let patch = SendRequestPatch {
                    send_date: change.send_date,
                    send_time: change.send_time.clone(),
                    channel,
                    campaign_name: change.campaign_name.clone(),
                    quantity: change.quantity,
                };
                if patch.is_empty() {
                    return Ok(ApprovalEffect::None);
                }
                Ok(ApprovalEffect::Update { request_id, patch })
            }
            ChangeRequestType::Delete => Ok(ApprovalEffect::Delete {
                request_id: original_id(change)?,
            }),
        }
    }

    /// 최신순, 상태 필터 선택
    pub async fn list(&self, status: Option<ChangeRequestStatus>) -> PlanResult<Vec<ChangeRequest>> {
        Ok(self.repo.list_change_requests(status).await?)
    }

    pub async fn get(&self, id: i64) -> PlanResult<ChangeRequest> {
        self.repo
            .get_change_request(id)
            .await?
            .ok_or_else(|| PlanError::not_found(format!("Change request {}", id)))
    }
}

fn original_id(change: &ChangeRequest) -> PlanResult<i64> {
    change.original_request_id.ok_or_else(|| {
        PlanError::validation(format!(
            "Change request {} has no original request",
            change.id
        ))
    })
}

fn already_processed(change: &ChangeRequest) -> PlanError {
    PlanError::validation(format!("Change request {} was already processed", change.id))
}

fn required(value: &str, field: &str) -> PlanResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlanError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
