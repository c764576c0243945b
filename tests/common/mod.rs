//! Shared fixtures for integration tests
//!
//! Realistic Pi-hole v6 response bodies and an in-memory transport.

#![allow(dead_code)]

use async_trait::async_trait;
use pihole_stats::client::{Endpoint, HttpReply, ResponseSet, Transport, AUTH_PATH};
use pihole_stats::error::TransportError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const SID: &str = "vFA+EP4MQ5JJvJg+3Q2Jnw=";

pub fn body(endpoint: Endpoint) -> Value {
    match endpoint {
        Endpoint::System => json!({
            "system": {
                "uptime": 172800,
                "memory": {
                    "ram": {"total": 3884, "free": 2975, "used": 909, "%used": 23.456},
                    "swap": {"total": 100, "used": 0, "%used": 0.0}
                },
                "procs": 180,
                "cpu": {
                    "nprocs": 4,
                    "%cpu": 7.84,
                    "load": {"raw": [0.214, 0.3, 0.25], "percent": [5.35, 7.5, 6.25]}
                }
            },
            "took": 0.0001
        }),
        Endpoint::Sensors => json!({
            "sensors": {"list": [], "cpu_temp": 48.312, "hot_limit": 60, "unit": "C"},
            "took": 0.0002
        }),
        Endpoint::Summary => json!({
            "queries": {
                "total": 28800,
                "blocked": 2880,
                "percent_blocked": 10.0,
                "unique_domains": 900
            },
            "clients": {"active": 7, "total": 12},
            "gravity": {"domains_being_blocked": 150000, "last_update": 1700000000}
        }),
        Endpoint::Gateway => json!({
            "gateway": [
                {"family": "inet", "interface": "eth0", "address": "192.168.1.1", "local": ["192.168.1.2"]},
                {"family": "inet6", "interface": "eth0", "address": "fe80::1", "local": []}
            ]
        }),
        Endpoint::Version => json!({
            "version": {
                "core": {"local": {"version": "v6.0.4"}, "remote": {"version": "v6.0.5"}},
                "web": {"local": {"version": "v6.0.2"}, "remote": {"version": "v6.0.2"}},
                "ftl": {"local": {"version": "v6.0.1"}, "remote": {"version": "v6.0.1"}}
            }
        }),
        Endpoint::Host => json!({
            "host": {
                "uname": {
                    "sysname": "Linux",
                    "release": "6.6.31",
                    "version": "#1 SMP PREEMPT",
                    "machine": "aarch64"
                },
                "model": "Raspberry Pi 4 Model B Rev 1.4"
            }
        }),
        Endpoint::Messages => json!({
            "messages": [
                {"id": 3, "type": "RATE_LIMIT", "plain": "Client 10.0.0.5 has been rate-limited"},
                {"id": 5, "type": "GRAVITY", "plain": "Gravity database is empty"}
            ]
        }),
        Endpoint::Blocking => json!({"blocking": "enabled", "timer": null}),
        Endpoint::RecentBlocked => json!({
            "blocked": ["ads.example.com", "tracker.example.net", "telemetry.example.org"]
        }),
        Endpoint::Ftl => json!({
            "ftl": {"clients": {"total": 12, "active": 6}, "pid": 1234}
        }),
    }
}

/// Every endpoint with its fixture body
pub fn full_response_set() -> ResponseSet {
    Endpoint::ALL.iter().map(|e| (*e, body(*e))).collect()
}

pub fn login_ok() -> HttpReply {
    HttpReply::new(
        200,
        Some(json!({"session": {"valid": true, "totp": false, "sid": SID, "validity": 1800}})),
    )
}

/// In-memory transport that answers from a route table
pub struct FakeTransport {
    login: Mutex<Result<HttpReply, TransportError>>,
    routes: Mutex<HashMap<String, HttpReply>>,
    delay: Mutex<Option<Duration>>,
    route_delays: Mutex<HashMap<String, Duration>>,
    login_calls: AtomicUsize,
    get_calls: AtomicUsize,
    seen_sids: Mutex<Vec<String>>,
}

impl FakeTransport {
    /// Healthy appliance serving every fixture at its default path
    pub fn healthy() -> Self {
        let routes = Endpoint::ALL
            .iter()
            .map(|e| (e.default_path().to_string(), HttpReply::new(200, Some(body(*e)))))
            .collect();

        Self {
            login: Mutex::new(Ok(login_ok())),
            routes: Mutex::new(routes),
            delay: Mutex::new(None),
            route_delays: Mutex::new(HashMap::new()),
            login_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            seen_sids: Mutex::new(Vec::new()),
        }
    }

    pub fn set_login(&self, reply: Result<HttpReply, TransportError>) {
        *self.login.lock().unwrap() = reply;
    }

    pub fn set_route(&self, endpoint: Endpoint, reply: HttpReply) {
        self.routes
            .lock()
            .unwrap()
            .insert(endpoint.default_path().to_string(), reply);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Delay answers for a single endpoint
    pub fn set_route_delay(&self, endpoint: Endpoint, delay: Duration) {
        self.route_delays
            .lock()
            .unwrap()
            .insert(endpoint.default_path().to_string(), delay);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn seen_sids(&self) -> Vec<String> {
        self.seen_sids.lock().unwrap().clone()
    }

    async fn maybe_wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, path: &str, sid: &str) -> Result<HttpReply, TransportError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_sids.lock().unwrap().push(sid.to_string());
        self.maybe_wait().await;

        let route_delay = self.route_delays.lock().unwrap().get(path).copied();
        if let Some(delay) = route_delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.routes.lock().unwrap().get(path).cloned();
        Ok(reply.unwrap_or_else(|| HttpReply::new(404, None)))
    }

    async fn post(&self, path: &str, _body: &Value) -> Result<HttpReply, TransportError> {
        assert_eq!(path, AUTH_PATH);
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_wait().await;
        self.login.lock().unwrap().clone()
    }
}
