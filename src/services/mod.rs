//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `QuotaLedger`: 조직/월/채널 물량
//! - `RequestStore`: 발송 신청 + 물량 소진 검사
//! - `FreezeGate`: 월 동결 스위치
//! - `ChangeRequestWorkflow`: 동결된 월의 승인 기반 변경
//! - `CalendarProjector`: 달력/잔여 물량 집계 (읽기 전용)
//! - `Directory`: 조직/서비스 관리
//! - `AdminSessions`: 관리자 토큰

mod admin_sessions;
mod calendar;
mod change_requests;
mod directory;
mod freeze_gate;
mod quota_ledger;
mod request_store;

pub use admin_sessions::{AdminClaims, AdminSessions, IssuedToken};
pub use calendar::{CalendarEntry, CalendarProjector, CalendarScope, CalendarView, UpcomingScope};
pub use change_requests::{ChangeRequestWorkflow, SubmitChangeRequest};
pub use directory::{Directory, ServiceInput};
pub use freeze_gate::{FreezeGate, FreezeStatus};
pub use quota_ledger::{CopyOutcome, QuotaLedger};
pub use request_store::{ConsumptionKey, ConsumptionLocks, CreateRequestInput, CreatedRequest, RequestStore};
