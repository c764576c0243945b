//! 어플라이언스 HTTP Transport
//!
//! 세션/조회 로직이 네트워크와 분리되도록 "GET/POST 후 상태 코드와 JSON 본문 반환"
//! 기능만 추상화합니다. 테스트에서는 가짜 구현으로 대체할 수 있습니다.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::TransportError;

/// 세션 ID를 전달하는 요청 헤더
pub const SID_HEADER: &str = "X-FTL-SID";

/// HTTP 응답 요약
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    /// HTTP 상태 코드
    pub status: u16,
    /// JSON 본문 (JSON이 아니면 None)
    pub body: Option<Value>,
}

impl HttpReply {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// 2xx 여부
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 세션 거부 (401/403) 여부
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

/// 어플라이언스와 통신하는 최소 Transport 인터페이스
#[async_trait]
pub trait Transport: Send + Sync {
    /// 세션 ID를 헤더에 실어 GET 요청
    async fn get(&self, path: &str, sid: &str) -> Result<HttpReply, TransportError>;

    /// JSON 본문으로 POST 요청
    async fn post(&self, path: &str, body: &Value) -> Result<HttpReply, TransportError>;
}

/// reqwest 기반 Transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// 새 Transport 생성
    ///
    /// # Arguments
    /// * `base_url` - 어플라이언스 주소 (예: "http://pi.hole:80")
    /// * `timeout_ms` - 요청별 타임아웃 (밀리초)
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url).map_err(|e| TransportError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Init(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// 기본 URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl {
                url: path.to_string(),
                reason: e.to_string(),
            })
    }
}

async fn read_reply(response: Response) -> Result<HttpReply, TransportError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    let body = serde_json::from_str::<Value>(&text).ok();
    Ok(HttpReply { status, body })
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, sid))]
    async fn get(&self, path: &str, sid: &str) -> Result<HttpReply, TransportError> {
        let url = self.url(path)?;
        debug!(url = %url, "Sending GET request");

        let response = self
            .client
            .get(url)
            .header(SID_HEADER, sid)
            .send()
            .await?;

        read_reply(response).await
    }

    #[instrument(skip(self, body))]
    async fn post(&self, path: &str, body: &Value) -> Result<HttpReply, TransportError> {
        let url = self.url(path)?;
        debug!(url = %url, "Sending POST request");

        let response = self.client.post(url).json(body).send().await?;

        read_reply(response).await
    }
}
