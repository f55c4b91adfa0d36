//! Admin Sessions
//!
//! # Interview Q&A
//!
//! Q: 관리자 여부를 어떻게 판단하는가?
//! A: 요청마다 Bearer 토큰을 검증 (전역 플래그 없음)
//!    - 로그인 성공 → 32바이트 랜덤 토큰 발급 (hex)
//!    - 서버는 토큰 원문이 아닌 Keccak-256 digest만 보관
//!    - 만료된 토큰은 검증 시점에 제거
//!
//! Q: 서버 재시작 시?
//! A: 세션은 메모리에만 있으므로 모두 무효화 → 다시 로그인

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use sha3::{Digest, Keccak256};

/// 기본 관리자 이름
pub const DEFAULT_ADMIN_NAME: &str = "admin";

/// 기본 세션 유효 시간 (8시간)
const DEFAULT_TTL_HOURS: i64 = 8;

/// 토큰에 묶인 관리자 정보
#[derive(Debug, Clone, Serialize)]
pub struct AdminClaims {
    pub admin_name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// 로그인 응답
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub admin_name: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AdminSessions {
    password_digest: [u8; 32],
    ttl: chrono::Duration,
    sessions: RwLock<HashMap<String, AdminClaims>>,
}

impl AdminSessions {
    pub fn new(password: &str, ttl: Duration) -> Self {
        Self {
            password_digest: keccak(password.as_bytes()),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(DEFAULT_TTL_HOURS)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 비밀번호 확인 후 토큰 발급 (틀리면 None)
    pub fn login(&self, password: &str, admin_name: Option<&str>) -> Option<IssuedToken> {
        if keccak(password.as_bytes()) != self.password_digest {
            tracing::warn!("Admin login failed");
            return None;
        }

        let admin_name = admin_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_ADMIN_NAME)
            .to_string();

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let issued_at = Utc::now();
        let claims = AdminClaims {
            admin_name: admin_name.clone(),
            issued_at,
            // 날짜 범위를 넘는 TTL이면 기본값으로
            expires_at: issued_at
                .checked_add_signed(self.ttl)
                .unwrap_or(issued_at + chrono::Duration::hours(DEFAULT_TTL_HOURS)),
        };
        let expires_at = claims.expires_at;

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, c| c.expires_at > issued_at);
        sessions.insert(token_key(&token), claims);

        tracing::info!(admin = %admin_name, "Admin logged in");
        Some(IssuedToken {
            token,
            admin_name,
            expires_at,
        })
    }

    /// 토큰 검증 (없거나 만료면 None)
    pub fn verify(&self, token: &str) -> Option<AdminClaims> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<AdminClaims> {
        let key = token_key(token);
        {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            match sessions.get(&key) {
                Some(claims) if claims.expires_at > now => return Some(claims.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // 만료
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        None
    }

    /// 토큰 폐기 (이미 없으면 false)
    pub fn logout(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token_key(token))
            .is_some()
    }
}

fn keccak(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

fn token_key(token: &str) -> String {
    hex::encode(keccak(token.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions() -> AdminSessions {
        AdminSessions::new("secret", Duration::from_secs(60))
    }

    #[test]
    fn test_login_issues_verifiable_token() {
        let sessions = sessions();
        let issued = sessions.login("secret", Some("ops")).unwrap();
        assert_eq!(issued.token.len(), 64);

        let claims = sessions.verify(&issued.token).unwrap();
        assert_eq!(claims.admin_name, "ops");
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        assert!(sessions().login("nope", None).is_none());
    }

    #[test]
    fn test_default_admin_name() {
        let sessions = sessions();
        let issued = sessions.login("secret", Some("  ")).unwrap();
        assert_eq!(issued.admin_name, DEFAULT_ADMIN_NAME);
    }

    #[test]
    fn test_tokens_are_stored_as_digests() {
        let sessions = sessions();
        let issued = sessions.login("secret", None).unwrap();

        let stored = sessions.sessions.read().unwrap();
        assert!(!stored.contains_key(&issued.token));
        assert!(stored.contains_key(&token_key(&issued.token)));
    }

    #[test]
    fn test_expired_token_is_evicted() {
        let sessions = sessions();
        let issued = sessions.login("secret", None).unwrap();

        let later = issued.expires_at + chrono::Duration::seconds(1);
        assert!(sessions.verify_at(&issued.token, later).is_none());
        assert!(sessions.sessions.read().unwrap().is_empty());
    }

    #[test]
    fn test_oversized_ttl_falls_back_to_default() {
        let sessions = AdminSessions::new("secret", Duration::from_secs(1_000_000_000_000_000));
        let issued = sessions.login("secret", None).unwrap();

        let lifetime = issued.expires_at - Utc::now();
        assert!(lifetime <= chrono::Duration::hours(DEFAULT_TTL_HOURS));
        assert!(lifetime > chrono::Duration::hours(DEFAULT_TTL_HOURS - 1));
        assert!(sessions.verify(&issued.token).is_some());
    }

    #[test]
    fn test_logout_revokes() {
        let sessions = sessions();
        let issued = sessions.login("secret", None).unwrap();

        assert!(sessions.logout(&issued.token));
        assert!(sessions.verify(&issued.token).is_none());
        assert!(!sessions.logout(&issued.token));
    }
}
