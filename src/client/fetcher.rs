//! 엔드포인트 조회기
//!
//! 고정된 엔드포인트 목록을 동시에 조회하고 엔드포인트별 JSON 본문을 모읍니다.

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::transport::Transport;
use crate::error::ApplianceError;

/// 어플라이언스 읽기 엔드포인트
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    System,
    Sensors,
    Summary,
    Gateway,
    Version,
    Host,
    Messages,
    Blocking,
    RecentBlocked,
    Ftl,
}

impl Endpoint {
    /// 전체 엔드포인트 (조회 순서)
    pub const ALL: [Endpoint; 10] = [
        Endpoint::System,
        Endpoint::Sensors,
        Endpoint::Summary,
        Endpoint::Gateway,
        Endpoint::Version,
        Endpoint::Host,
        Endpoint::Messages,
        Endpoint::Blocking,
        Endpoint::RecentBlocked,
        Endpoint::Ftl,
    ];

    /// 엔드포인트 이름
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::System => "system",
            Endpoint::Sensors => "sensors",
            Endpoint::Summary => "summary",
            Endpoint::Gateway => "gateway",
            Endpoint::Version => "version",
            Endpoint::Host => "host",
            Endpoint::Messages => "messages",
            Endpoint::Blocking => "blocking",
            Endpoint::RecentBlocked => "recent_blocked",
            Endpoint::Ftl => "ftl",
        }
    }

    /// Pi-hole v6 기본 경로
    pub fn default_path(&self) -> &'static str {
        match self {
            Endpoint::System => "/api/info/system",
            Endpoint::Sensors => "/api/info/sensors",
            Endpoint::Summary => "/api/stats/summary",
            Endpoint::Gateway => "/api/network/gateway",
            Endpoint::Version => "/api/info/version",
            Endpoint::Host => "/api/info/host",
            Endpoint::Messages => "/api/info/messages",
            Endpoint::Blocking => "/api/dns/blocking",
            Endpoint::RecentBlocked => "/api/stats/recent_blocked?count=3",
            Endpoint::Ftl => "/api/info/ftl",
        }
    }

    /// 이름으로 엔드포인트 찾기
    pub fn from_name(name: &str) -> Option<Endpoint> {
        Endpoint::ALL.iter().copied().find(|e| e.name() == name)
    }

    /// 기본 경로 테이블
    pub fn default_table() -> Vec<(Endpoint, String)> {
        Endpoint::ALL
            .iter()
            .map(|e| (*e, e.default_path().to_string()))
            .collect()
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 한 번의 갱신 주기에서 받은 엔드포인트별 원본 JSON
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSet {
    bodies: BTreeMap<Endpoint, Value>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, endpoint: Endpoint, body: Value) {
        self.bodies.insert(endpoint, body);
    }

    pub fn get(&self, endpoint: Endpoint) -> Option<&Value> {
        self.bodies.get(&endpoint)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Endpoint, &Value)> {
        self.bodies.iter().map(|(e, v)| (*e, v))
    }
}

impl FromIterator<(Endpoint, Value)> for ResponseSet {
    fn from_iter<I: IntoIterator<Item = (Endpoint, Value)>>(iter: I) -> Self {
        Self {
            bodies: iter.into_iter().collect(),
        }
    }
}

/// 인증된 GET 요청을 동시에 보내는 조회기
pub struct EndpointFetcher {
    transport: Arc<dyn Transport>,
    endpoints: Vec<(Endpoint, String)>,
}

impl EndpointFetcher {
    /// 새 조회기 생성
    ///
    /// # Arguments
    /// * `transport` - 어플라이언스 Transport
    /// * `endpoints` - (엔드포인트, 경로) 목록, 순서가 에러 우선순위가 됨
    pub fn new(transport: Arc<dyn Transport>, endpoints: Vec<(Endpoint, String)>) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// 전체 엔드포인트 동시 조회
    ///
    /// 모든 엔드포인트가 성공해야 결과를 반환합니다. 401/403 응답이 도착하면
    /// 남은 요청을 기다리지 않고 즉시 `AuthorizationExpired`를 반환하며, 그 외
    /// 실패는 모든 요청이 끝난 뒤 목록 순서상 첫 번째 것을 반환합니다.
    #[instrument(skip(self, sid), fields(count = self.endpoints.len()))]
    pub async fn fetch_all(&self, sid: &str) -> Result<ResponseSet, ApplianceError> {
        let mut pending: FuturesUnordered<_> = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(index, (endpoint, path))| async move {
                (index, self.fetch_one(*endpoint, path, sid).await)
            })
            .collect();

        let mut set = ResponseSet::new();
        let mut first_error: Option<(usize, ApplianceError)> = None;

        while let Some((index, result)) = pending.next().await {
            match result {
                Ok((endpoint, body)) => set.insert(endpoint, body),
                Err(e @ ApplianceError::AuthorizationExpired { .. }) => {
                    debug!(in_flight = pending.len(), "Session rejected, abandoning fetch");
                    return Err(e);
                }
                Err(e) => {
                    if first_error.as_ref().map_or(true, |(first, _)| index < *first) {
                        first_error = Some((index, e));
                    }
                }
            }
        }

        match first_error {
            Some((_, e)) => Err(e),
            None => {
                debug!(endpoints = set.len(), "All endpoints fetched");
                Ok(set)
            }
        }
    }

    async fn fetch_one(
        &self,
        endpoint: Endpoint,
        path: &str,
        sid: &str,
    ) -> Result<(Endpoint, Value), ApplianceError> {
        let reply = self.transport.get(path, sid).await.map_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "Endpoint request failed");
            ApplianceError::Connectivity(format!("{}: {}", endpoint, e))
        })?;

        if reply.is_unauthorized() {
            return Err(ApplianceError::AuthorizationExpired {
                endpoint: endpoint.name().to_string(),
                status: reply.status,
            });
        }

        if !reply.is_success() {
            return Err(ApplianceError::malformed(
                endpoint.name(),
                format!("HTTP {}", reply.status),
            ));
        }

        match reply.body {
            Some(body @ (Value::Object(_) | Value::Array(_))) => {
                debug!(endpoint = %endpoint, "Endpoint fetched");
                Ok((endpoint, body))
            }
            Some(_) => Err(ApplianceError::malformed(
                endpoint.name(),
                "body is not a JSON object or array",
            )),
            None => Err(ApplianceError::malformed(endpoint.name(), "body is not JSON")),
        }
    }
}
