//! Admin Endpoints
//!
//! 관리자 로그인/로그아웃과 관리자 전용 핸들러가 쓰는 `AdminSession` extractor.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
    Json,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    services::{AdminClaims, IssuedToken},
    types::ApiResponse,
    AppState,
};

/// 검증된 관리자 세션
///
/// 핸들러 인자에 두면 `Authorization: Bearer <token>` 검증이 선행됨
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub claims: AdminClaims,
}

impl AdminSession {
    pub fn admin_name(&self) -> &str {
        &self.claims.admin_name
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let claims = state.sessions.verify(token).ok_or(ApiError::Unauthorized)?;

        Ok(AdminSession {
            token: token.to_string(),
            claims,
        })
    }
}

/// 로그인 요청
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
    /// 감사 필드(frozen_by, processed_by)에 남을 이름
    pub admin_name: Option<String>,
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<IssuedToken>>, ApiError> {
    let issued = state
        .sessions
        .login(&req.password, req.admin_name.as_deref())
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(ApiResponse::success("Logged in", issued)))
}

/// POST /api/admin/logout
pub async fn logout(
    State(state): State<AppState>,
    session: AdminSession,
) -> Json<ApiResponse<()>> {
    state.sessions.logout(&session.token);
    tracing::info!(admin = %session.admin_name(), "Admin logged out");
    Json(ApiResponse::message("Logged out"))
}
