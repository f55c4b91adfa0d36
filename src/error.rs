//! Error Handling Module
//!
//! Provides type-safe error handling with proper HTTP status code mapping.
//! Uses thiserror for domain errors and integrates with tracing for structured logging.
//!
//! - `PlanError`: 서비스 레이어(물량/동결/변경 요청) 도메인 에러
//! - `ApiError`: HTTP 경계 에러 (`IntoResponse`)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::types::{Channel, TypeError, YearMonth};

pub type PlanResult<T> = Result<T, PlanError>;

/// 도메인 에러
///
/// 모든 에러는 해당 요청에 대해 종료 상태 (자동 재시도 없음)
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0} is frozen; submit a change request instead")]
    FrozenMonth(YearMonth),

    #[error("No {channel} quota configured for {year_month}")]
    QuotaNotConfigured { channel: Channel, year_month: YearMonth },

    #[error("{channel} quota exceeded: {remaining} remaining")]
    QuotaExceeded { channel: Channel, remaining: i64 },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl PlanError {
    pub fn not_found(what: impl Into<String>) -> Self {
        PlanError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PlanError::Validation(message.into())
    }
}

impl From<TypeError> for PlanError {
    fn from(err: TypeError) -> Self {
        PlanError::Validation(err.to_string())
    }
}

/// API 에러 타입
///
/// # Design Decision
///
/// 각 에러 variant는 적절한 HTTP 상태 코드에 매핑됨
/// - 클라이언트 에러: 4xx (잘못된 요청, 인증 실패, 동결된 월 등)
/// - 서버 에러: 5xx (내부 오류)
///
/// 민감한 내부 정보는 클라이언트에 노출하지 않음
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Quota not configured: {0}")]
    QuotaNotConfigured(String),

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String, remaining: i64 },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    // ============ 401 Unauthorized ============
    #[error("Authentication required")]
    Unauthorized,

    // ============ 404 Not Found ============
    #[error("Resource not found: {0}")]
    NotFound(String),

    // ============ 409 Conflict ============
    #[error("Month is frozen: {0}")]
    FrozenMonth(String),

    // ============ 500 Internal Server Error ============
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    InternalError,
}

/// API 에러 응답 구조
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// QUOTA_EXCEEDED 일 때 남은 물량
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut remaining = None;

        let (status, code, message, details) = match &self {
            // 4xx 클라이언트 에러
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            ApiError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(msg.clone()),
            ),
            ApiError::QuotaNotConfigured(msg) => (
                StatusCode::BAD_REQUEST,
                "QUOTA_NOT_CONFIGURED",
                msg.clone(),
                None,
            ),
            ApiError::QuotaExceeded { message, remaining: left } => {
                remaining = Some(*left);
                (
                    StatusCode::BAD_REQUEST,
                    "QUOTA_EXCEEDED",
                    message.clone(),
                    None,
                )
            }
            ApiError::InvalidAction(action) => (
                StatusCode::BAD_REQUEST,
                "INVALID_ACTION",
                format!("Unknown action: {}", action),
                None,
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
                None,
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
                None,
            ),
            ApiError::FrozenMonth(msg) => (
                StatusCode::CONFLICT,
                "FROZEN_MONTH",
                msg.clone(),
                None,
            ),

            // 5xx 서버 에러
            ApiError::DatabaseError(_) => {
                // 내부 에러는 클라이언트에 상세 정보 노출 안 함
                tracing::error!("Database error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                )
            }
            ApiError::InternalError => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
            remaining,
        };

        (status, Json(body)).into_response()
    }
}

/// 도메인 에러를 ApiError로 변환
impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::NotFound(what) => ApiError::NotFound(what),
            PlanError::Validation(msg) => ApiError::ValidationError(msg),
            err @ PlanError::FrozenMonth(_) => ApiError::FrozenMonth(err.to_string()),
            err @ PlanError::QuotaNotConfigured { .. } => {
                ApiError::QuotaNotConfigured(err.to_string())
            }
            PlanError::QuotaExceeded { channel, remaining } => ApiError::QuotaExceeded {
                message: PlanError::QuotaExceeded { channel, remaining }.to_string(),
                remaining,
            },
            PlanError::InvalidAction(action) => ApiError::InvalidAction(action),
            PlanError::Storage(err) => {
                tracing::error!("Storage error: {:?}", err);
                ApiError::DatabaseError(err.to_string())
            }
        }
    }
}

impl From<TypeError> for ApiError {
    fn from(err: TypeError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// SQLx 에러를 ApiError로 변환
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("SQLx error: {:?}", err);
        ApiError::DatabaseError(err.to_string())
    }
}

/// anyhow 에러를 ApiError로 변환
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Anyhow error: {:?}", err);
        ApiError::InternalError
    }
}
