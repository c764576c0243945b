//! 세션 관리자
//!
//! 공유 비밀(앱 비밀번호)을 세션 ID로 교환하고 메모리에 캐시합니다.
//! 캐시가 있으면 네트워크 호출 없이 그대로 반환하고, 인증 실패 시
//! 오케스트레이터가 `invalidate()`로 비웁니다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::transport::Transport;
use crate::error::ApplianceError;
use crate::metrics::refresh_metrics;

/// 로그인 엔드포인트
pub const AUTH_PATH: &str = "/api/auth";

/// 세션 ID 영속화 협력자
///
/// 실패는 호출자에게 전파되지 않고 경고 로그로만 남습니다.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn persist(&self, sid: &str) -> std::io::Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    sid: String,
}

/// 세션 ID를 JSON 파일에 기록하는 저장소
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 이전에 저장된 세션 ID 로드 (없거나 읽을 수 없으면 None)
    pub fn load(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        let persisted: PersistedSession = serde_json::from_str(&contents).ok()?;
        Some(persisted.sid).filter(|sid| !sid.is_empty())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn persist(&self, sid: &str) -> std::io::Result<()> {
        let payload = serde_json::to_vec(&PersistedSession {
            sid: sid.to_string(),
        })?;
        tokio::fs::write(&self.path, payload).await
    }
}

/// 세션 ID 캐시와 로그인 수명주기 관리
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    secret: String,
    login_timeout: Duration,
    token: Option<String>,
    store: Option<Arc<dyn SessionStore>>,
}

impl SessionManager {
    /// 새 세션 관리자 생성
    ///
    /// # Arguments
    /// * `transport` - 어플라이언스 Transport
    /// * `secret` - 공유 비밀
    /// * `login_timeout` - 로그인 호출 타임아웃
    pub fn new(
        transport: Arc<dyn Transport>,
        secret: impl Into<String>,
        login_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            secret: secret.into(),
            login_timeout,
            token: None,
            store: None,
        }
    }

    /// 이전에 저장된 세션 ID로 시작
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// 영속화 협력자 설정
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 현재 캐시된 세션 ID
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// 유효한 세션 ID 반환, 없으면 로그인
    ///
    /// # Errors
    /// - 자격 증명 거부 또는 세션 ID 누락: `ApplianceError::Authentication`
    /// - 네트워크 오류 또는 타임아웃: `ApplianceError::Connectivity`
    pub async fn ensure_token(&mut self) -> Result<String, ApplianceError> {
        if let Some(ref token) = self.token {
            debug!("Reusing cached session");
            return Ok(token.clone());
        }

        let sid = self.login().await?;
        self.token = Some(sid.clone());
        refresh_metrics().record_login();
        info!("Logged in to appliance");

        if let Some(store) = self.store.clone() {
            let persisted = sid.clone();
            tokio::spawn(async move {
                if let Err(e) = store.persist(&persisted).await {
                    warn!(error = %e, "Failed to persist session id");
                }
            });
        }

        Ok(sid)
    }

    /// 캐시된 세션 ID 제거 (멱등)
    pub fn invalidate(&mut self) {
        if self.token.take().is_some() {
            debug!("Session invalidated");
        }
    }

    #[instrument(skip(self))]
    async fn login(&self) -> Result<String, ApplianceError> {
        let body = json!({ "password": self.secret });

        let reply = tokio::time::timeout(self.login_timeout, self.transport.post(AUTH_PATH, &body))
            .await
            .map_err(|_| {
                ApplianceError::Connectivity(format!(
                    "login timed out after {}ms",
                    self.login_timeout.as_millis()
                ))
            })??;

        if reply.is_unauthorized() {
            return Err(ApplianceError::Authentication(format!(
                "credential rejected (HTTP {})",
                reply.status
            )));
        }

        if !reply.is_success() {
            return Err(ApplianceError::Connectivity(format!(
                "login returned HTTP {}",
                reply.status
            )));
        }

        reply
            .body
            .as_ref()
            .and_then(parse_session_id)
            .ok_or_else(|| {
                ApplianceError::Authentication(
                    "login response carried no valid session id".to_string(),
                )
            })
    }
}

/// 로그인 응답에서 세션 ID 추출
///
/// `{"session": {"valid": true, "sid": "..."}}` 형태만 허용합니다.
pub fn parse_session_id(body: &Value) -> Option<String> {
    let session = body.get("session")?;

    if session.get("valid").and_then(Value::as_bool) == Some(false) {
        return None;
    }

    session
        .get("sid")
        .and_then(Value::as_str)
        .filter(|sid| !sid.is_empty())
        .map(str::to_string)
}
