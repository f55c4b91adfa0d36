//! Quota Plan API Library
//!
//! # Overview
//!
//! 조직별 월간 발송 물량을 배분하고 서비스의 발송 일정을 관리하는 백엔드 API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐    │
//! │  │ Routes  │  │Services │  │   DB    │  │  Types  │    │
//! │  └────┬────┘  └────┬────┘  └────┬────┘  └────┬────┘    │
//! │       │            │            │            │          │
//! │       └────────────┴────────────┴────────────┘          │
//! │                         │                                │
//! └─────────────────────────┼────────────────────────────────┘
//!                           │
//!                           ▼
//!                  ┌────────────────┐
//!                  │   PostgreSQL   │
//!                  └────────────────┘
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! create/delete ─► FreezeGate ─ open ─► RequestStore ─► QuotaLedger 검사 ─► commit
//!                      │
//!                   frozen ─► FrozenMonth (호출자가 ChangeRequestWorkflow로 제출)
//!                                              │
//!                                     관리자 approve ─► 같은 변경 적용
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 (물량, 신청, 동결, 변경 요청, 달력)
//! - `db`: 데이터베이스 연동
//! - `types`: 공통 타입 정의
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quota_plan_api::{config::Config, db::Database, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(&config.database_url).await?;
//!     let state = AppState::new(Arc::new(db), config);
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod db;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ApiError, PlanError};
pub use db::{Database, PlanRepository};

use services::{
    AdminSessions, CalendarProjector, ChangeRequestWorkflow, Directory, FreezeGate, QuotaLedger,
    RequestStore,
};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn PlanRepository>,
    pub quotas: Arc<QuotaLedger>,
    pub requests: Arc<RequestStore>,
    pub freezes: FreezeGate,
    pub change_requests: Arc<ChangeRequestWorkflow>,
    pub calendar: Arc<CalendarProjector>,
    pub directory: Arc<Directory>,
    pub sessions: Arc<AdminSessions>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Arc<dyn PlanRepository>, config: Config) -> Self {
        let freezes = FreezeGate::new(repo.clone());

        Self {
            quotas: Arc::new(QuotaLedger::new(repo.clone())),
            requests: Arc::new(RequestStore::new(repo.clone(), freezes.clone())),
            change_requests: Arc::new(ChangeRequestWorkflow::new(repo.clone())),
            calendar: Arc::new(CalendarProjector::new(repo.clone())),
            directory: Arc::new(Directory::new(repo.clone())),
            sessions: Arc::new(AdminSessions::new(&config.admin_password, config.session_ttl)),
            freezes,
            repo,
            config: Arc::new(config),
        }
    }
}
