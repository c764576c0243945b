//! Session lifecycle tests with an in-memory transport

mod common;

use async_trait::async_trait;
use common::FakeTransport;
use pihole_stats::client::{HttpReply, SessionManager, SessionStore};
use pihole_stats::error::{ApplianceError, FailureKind, TransportError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn manager(transport: &Arc<FakeTransport>) -> SessionManager {
    SessionManager::new(transport.clone(), "app-password", Duration::from_secs(2))
}

#[tokio::test]
async fn test_login_once_then_cached() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut session = manager(&transport);

    let sid = session.ensure_token().await.unwrap();
    assert_eq!(sid, common::SID);
    assert_eq!(transport.login_calls(), 1);

    let again = session.ensure_token().await.unwrap();
    assert_eq!(again, common::SID);
    assert_eq!(transport.login_calls(), 1);
    assert_eq!(transport.get_calls(), 0);
}

#[tokio::test]
async fn test_persisted_token_skips_login() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut session = manager(&transport).with_token(Some("persisted".to_string()));

    assert_eq!(session.ensure_token().await.unwrap(), "persisted");
    assert_eq!(transport.login_calls(), 0);
}

#[tokio::test]
async fn test_empty_persisted_token_is_ignored() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut session = manager(&transport).with_token(Some(String::new()));

    assert_eq!(session.token(), None);
    session.ensure_token().await.unwrap();
    assert_eq!(transport.login_calls(), 1);
}

#[tokio::test]
async fn test_invalidate_forces_new_login() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut session = manager(&transport);

    session.ensure_token().await.unwrap();
    session.invalidate();
    session.invalidate();
    assert_eq!(session.token(), None);

    session.ensure_token().await.unwrap();
    assert_eq!(transport.login_calls(), 2);
}

#[tokio::test]
async fn test_rejected_credential() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_login(Ok(HttpReply::new(
        401,
        Some(json!({"session": {"valid": false, "sid": null, "message": "password incorrect"}})),
    )));
    let mut session = manager(&transport);

    let err = session.ensure_token().await.unwrap_err();
    assert!(matches!(err, ApplianceError::Authentication(_)));
    assert_eq!(err.kind(), FailureKind::Authentication);
    assert_eq!(session.token(), None);
}

#[tokio::test]
async fn test_response_without_sid() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_login(Ok(HttpReply::new(
        200,
        Some(json!({"session": {"valid": true, "sid": null}})),
    )));
    let mut session = manager(&transport);

    let err = session.ensure_token().await.unwrap_err();
    assert!(matches!(err, ApplianceError::Authentication(_)));
}

#[tokio::test]
async fn test_non_json_login_response() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_login(Ok(HttpReply::new(200, None)));
    let mut session = manager(&transport);

    let err = session.ensure_token().await.unwrap_err();
    assert!(matches!(err, ApplianceError::Authentication(_)));
}

#[tokio::test]
async fn test_network_failure_is_connectivity() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_login(Err(TransportError::ConnectionFailed(
        "connection refused".to_string(),
    )));
    let mut session = manager(&transport);

    let err = session.ensure_token().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Connectivity);
    assert!(!err.clears_session());
}

#[tokio::test]
async fn test_login_timeout_is_connectivity() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_delay(Some(Duration::from_millis(500)));
    let mut session =
        SessionManager::new(transport.clone(), "app-password", Duration::from_millis(50));

    let err = session.ensure_token().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Connectivity);
    assert_eq!(session.token(), None);
}

struct RecordingStore {
    written: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn persist(&self, sid: &str) -> std::io::Result<()> {
        self.written.lock().unwrap().push(sid.to_string());
        if self.fail {
            Err(std::io::Error::other("read-only config store"))
        } else {
            Ok(())
        }
    }
}

async fn wait_for_write(store: &RecordingStore) -> Vec<String> {
    for _ in 0..50 {
        let written = store.written.lock().unwrap().clone();
        if !written.is_empty() {
            return written;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Vec::new()
}

#[tokio::test]
async fn test_login_writes_back_session() {
    let transport = Arc::new(FakeTransport::healthy());
    let store = Arc::new(RecordingStore {
        written: Mutex::new(Vec::new()),
        fail: false,
    });
    let mut session = manager(&transport).with_store(store.clone());

    session.ensure_token().await.unwrap();
    assert_eq!(wait_for_write(&store).await, vec![common::SID.to_string()]);
}

#[tokio::test]
async fn test_failed_write_back_is_swallowed() {
    let transport = Arc::new(FakeTransport::healthy());
    let store = Arc::new(RecordingStore {
        written: Mutex::new(Vec::new()),
        fail: true,
    });
    let mut session = manager(&transport).with_store(store.clone());

    let sid = session.ensure_token().await.unwrap();
    assert_eq!(sid, common::SID);
    assert_eq!(wait_for_write(&store).await.len(), 1);
    assert_eq!(session.token(), Some(common::SID));
}
