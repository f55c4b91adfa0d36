//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/api/admin/*` - 관리자 로그인/로그아웃
//! - `/api/quota*` - 월 물량
//! - `/api/organization*`, `/api/service*` - 조직/서비스
//! - `/api/request*` - 발송 신청
//! - `/api/freeze*` - 월 동결
//! - `/api/change-request*` - 변경 요청
//! - `/api/calendar/*` - 달력 집계

pub mod admin;
pub mod calendar;
pub mod change_request;
pub mod freeze;
pub mod health;
pub mod organization;
pub mod quota;
pub mod request;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// 개발 환경 기본 허용 origin
const DEV_ORIGINS: [&str; 3] = [
    "http://localhost:5173", // Vite dev server
    "http://localhost:3000",
    "http://127.0.0.1:5173",
];

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                                   - 서버 상태 확인
///
/// POST /api/admin/login                          - 관리자 토큰 발급
/// POST /api/admin/logout                         - 토큰 폐기 (admin)
///
/// POST /api/quota                                - 물량 설정 (admin)
/// GET  /api/quota/:org_id/:year_month            - 물량 조회
/// GET  /api/quotas                               - 물량 목록 (admin)
/// PUT  /api/quota/:id, DELETE                    - 물량 수정/삭제 (admin)
/// POST /api/quotas/copy                          - 월 물량 복사 (admin)
///
/// POST /api/request, DELETE /api/request/:id     - 발송 신청 생성/삭제
/// GET  /api/requests[/service/:id|/organization/:id]
///
/// GET  /api/freeze/:year_month, PUT (admin)      - 월 동결
/// POST /api/change-request                       - 변경 요청 제출
/// POST /api/change-request/:id/process           - 승인/거절 (admin)
///
/// GET  /api/calendar/{organization/:id|all}/:year_month
/// GET  /api/calendar/service/:id/:year_month
/// ```
pub fn create_router(state: AppState) -> Router {
    // CORS 설정
    // 프로덕션: ALLOWED_ORIGINS만 허용
    // 개발: localhost 허용
    let origins: Vec<HeaderValue> = if state.config.is_production() {
        state
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect()
    } else {
        DEV_ORIGINS.iter().filter_map(|origin| origin.parse().ok()).collect()
    };

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Admin
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout))

        // Quota
        .route("/api/quota", post(quota::set_quota))
        .route("/api/quota/:org_id/:year_month", get(quota::get_quota))
        .route("/api/quota/:id", put(quota::update_quota).delete(quota::delete_quota))
        .route("/api/quotas", get(quota::list_quotas))
        .route("/api/quotas/copy", post(quota::copy_quotas))

        // Organization / Service
        .route("/api/organization", post(organization::create_organization))
        .route("/api/organizations", get(organization::list_organizations))
        .route(
            "/api/organization/:id",
            put(organization::rename_organization).delete(organization::delete_organization),
        )
        .route("/api/service", post(organization::create_service))
        .route("/api/services", get(organization::list_services))
        .route("/api/services/:org_id", get(organization::list_organization_services))
        .route(
            "/api/service/:id",
            put(organization::update_service).delete(organization::delete_service),
        )

        // Send requests
        .route("/api/request", post(request::create_request))
        .route("/api/request/:id", axum::routing::delete(request::delete_request))
        .route("/api/requests", get(request::list_requests))
        .route("/api/requests/service/:id", get(request::list_service_requests))
        .route("/api/requests/organization/:id", get(request::list_organization_requests))

        // Freeze
        .route("/api/freeze/:year_month", get(freeze::get_freeze).put(freeze::set_freeze))
        .route("/api/freezes", get(freeze::list_freezes))

        // Change requests
        .route("/api/change-request", post(change_request::submit_change_request))
        .route("/api/change-requests", get(change_request::list_change_requests))
        .route("/api/change-request/:id/process", post(change_request::process_change_request))

        // Calendar
        .route(
            "/api/calendar/organization/:org_id/:year_month",
            get(calendar::organization_calendar),
        )
        .route("/api/calendar/all/:year_month", get(calendar::all_calendar))
        .route(
            "/api/calendar/service/:service_id/:year_month",
            get(calendar::service_calendar),
        )

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, Environment};
    use crate::db::mock::MockPlanRepository;

    fn test_config() -> Config {
        Config {
            port: 0,
            database_url: String::new(),
            admin_password: "secret".to_string(),
            session_ttl: Duration::from_secs(600),
            allowed_origins: Vec::new(),
            environment: Environment::Development,
        }
    }

    fn app() -> Router {
        create_router(AppState::new(Arc::new(MockPlanRepository::new()), test_config()))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(app: &Router) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/api/admin/login",
            None,
            Some(json!({ "password": "secret", "admin_name": "ops" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// 조직 + 서비스 + 2025-03 naver 물량 100
    async fn seed(app: &Router, token: &str) -> (i64, i64) {
        let (_, org) = call(app, "POST", "/api/organization", Some(token), Some(json!({ "name": "대출" }))).await;
        let org_id = org["data"]["id"].as_i64().unwrap();

        let (_, service) = call(
            app,
            "POST",
            "/api/service",
            Some(token),
            Some(json!({ "organization_id": org_id, "name": "신용대출비교" })),
        )
        .await;
        let service_id = service["data"]["id"].as_i64().unwrap();

        let (status, _) = call(
            app,
            "POST",
            "/api/quota",
            Some(token),
            Some(json!({
                "organization_id": org_id,
                "year_month": "2025-03",
                "channel": "naver",
                "total_quota": 100
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        (org_id, service_id)
    }

    fn send(service_id: i64, date: &str, quantity: i64) -> Value {
        json!({
            "service_id": service_id,
            "send_date": date,
            "channel": "naver",
            "quantity": quantity,
            "send_time": "10:00"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let app = app();

        let (status, body) = call(&app, "GET", "/api/quotas", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = call(&app, "GET", "/api/quotas", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &app,
            "POST",
            "/api/admin/login",
            None,
            Some(json!({ "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login(&app).await;
        let (status, _) = call(&app, "GET", "/api/quotas", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "POST", "/api/admin/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "GET", "/api/quotas", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_quota_exceeded_response_carries_remaining() {
        let app = app();
        let token = login(&app).await;
        let (org_id, service_id) = seed(&app, &token).await;

        let (status, body) =
            call(&app, "POST", "/api/request", None, Some(send(service_id, "2025-03-05", 60))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["remaining"], 40);

        let (status, body) =
            call(&app, "POST", "/api/request", None, Some(send(service_id, "2025-03-06", 50))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "QUOTA_EXCEEDED");
        assert_eq!(body["remaining"], 40);

        let uri = format!("/api/quota/{}/2025-03?channel=naver", org_id);
        let (_, body) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(body["total_quota"], 100);
    }

    #[tokio::test]
    async fn test_missing_quota_and_bad_input() {
        let app = app();
        let token = login(&app).await;
        let (_, service_id) = seed(&app, &token).await;

        let (status, body) =
            call(&app, "POST", "/api/request", None, Some(send(service_id, "2025-05-01", 1))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "QUOTA_NOT_CONFIGURED");

        let mut bad_channel = send(service_id, "2025-03-01", 1);
        bad_channel["channel"] = json!("kakao");
        let (status, body) = call(&app, "POST", "/api/request", None, Some(bad_channel)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = call(&app, "GET", "/api/freeze/2025-13", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_freeze_and_change_request_flow() {
        let app = app();
        let token = login(&app).await;
        let (org_id, service_id) = seed(&app, &token).await;

        let (status, body) = call(
            &app,
            "PUT",
            "/api/freeze/2025-03",
            Some(&token),
            Some(json!({ "is_frozen": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["frozen_by"], "ops");

        let (status, body) =
            call(&app, "POST", "/api/request", None, Some(send(service_id, "2025-03-05", 10))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "FROZEN_MONTH");
        assert!(body["error"].as_str().unwrap().contains("2025-03"));

        let (status, body) = call(
            &app,
            "POST",
            "/api/change-request",
            None,
            Some(json!({
                "request_type": "add",
                "service_id": service_id,
                "send_date": "2025-03-05",
                "channel": "naver",
                "quantity": 10,
                "reason": "누락분 추가",
                "requester_name": "김담당"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pending");
        let change_id = body["data"]["id"].as_i64().unwrap();

        let process_uri = format!("/api/change-request/{}/process", change_id);
        let (status, _) = call(&app, "POST", &process_uri, None, Some(json!({ "action": "approve" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &app,
            "POST",
            &process_uri,
            Some(&token),
            Some(json!({ "action": "hold" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_ACTION");

        let (status, body) = call(
            &app,
            "POST",
            &process_uri,
            Some(&token),
            Some(json!({ "action": "approve", "admin_memo": "ok" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "approved");
        assert!(body["data"]["processed_at"].is_string());

        let uri = format!("/api/calendar/organization/{}/2025-03", org_id);
        let (status, body) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_requested"], 10);
        assert_eq!(body["remaining"], 90);
        assert_eq!(body["calendar_data"]["2025-03-05"][0]["service"], "신용대출비교");

        let (_, body) = call(&app, "GET", "/api/change-requests?status=approved", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_request_listing_and_delete() {
        let app = app();
        let token = login(&app).await;
        let (_, service_id) = seed(&app, &token).await;

        let (_, created) =
            call(&app, "POST", "/api/request", None, Some(send(service_id, "2025-03-05", 5))).await;
        let request_id = created["data"]["request"]["id"].as_i64().unwrap();

        let (status, body) = call(&app, "GET", "/api/requests?year_month=2025-03&channel=all", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["channel_name"], "네이버앱");
        assert_eq!(body[0]["organization_name"], "대출");

        let uri = format!("/api/request/{}", request_id);
        let (status, _) = call(&app, "DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, "DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_organization_delete_guard_over_http() {
        let app = app();
        let token = login(&app).await;
        let (org_id, _) = seed(&app, &token).await;

        let uri = format!("/api/organization/{}", org_id);
        let (status, body) = call(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = call(&app, "GET", "/api/services", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["organization_name"], "대출");
    }
}
