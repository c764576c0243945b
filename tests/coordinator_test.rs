//! Refresh cycle tests with an in-memory transport

mod common;

use common::FakeTransport;
use pihole_stats::client::{Endpoint, EndpointFetcher, HttpReply, SessionManager};
use pihole_stats::coordinator::{Coordinator, CycleState};
use pihole_stats::error::{ApplianceError, FailureKind};
use pihole_stats::normalizer::{MetricValue, Normalizer};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn coordinator(transport: &Arc<FakeTransport>, cycle_timeout: Duration) -> Coordinator {
    let session = SessionManager::new(transport.clone(), "app-password", Duration::from_secs(2));
    let fetcher = EndpointFetcher::new(transport.clone(), Endpoint::default_table());

    Coordinator::new(
        session,
        fetcher,
        Normalizer::default(),
        Duration::from_secs(3600),
        cycle_timeout,
    )
}

#[tokio::test]
async fn test_successful_cycle_publishes() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));
    let handle = coordinator.handle();

    assert!(handle.snapshot().is_none());
    assert!(!handle.available());

    let snapshot = coordinator.refresh().await.unwrap();
    assert_eq!(coordinator.state(), CycleState::Published);
    assert_eq!(snapshot.get("queries_total"), Some(&MetricValue::Integer(28800)));

    let published = handle.snapshot().unwrap();
    assert!(Arc::ptr_eq(&published, &snapshot));

    let status = handle.status();
    assert!(status.last_update_success);
    assert_eq!(status.last_failure, None);
    assert_eq!(status.consecutive_failures, 0);
    assert!(status.last_success_unix.is_some());

    assert_eq!(transport.login_calls(), 1);
    assert_eq!(transport.get_calls(), Endpoint::ALL.len());
    assert_eq!(coordinator.session().token(), Some(common::SID));
    assert!(transport.seen_sids().iter().all(|sid| sid == common::SID));
}

#[tokio::test]
async fn test_second_cycle_reuses_session() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));

    coordinator.refresh().await.unwrap();
    coordinator.refresh().await.unwrap();

    assert_eq!(transport.login_calls(), 1);
    assert_eq!(transport.get_calls(), 2 * Endpoint::ALL.len());
}

#[tokio::test]
async fn test_expired_session_clears_token() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));
    let handle = coordinator.handle();

    coordinator.refresh().await.unwrap();
    let before = handle.snapshot().unwrap();

    transport.set_route(Endpoint::Summary, HttpReply::new(401, None));
    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(err, ApplianceError::AuthorizationExpired { .. }));
    assert_eq!(coordinator.state(), CycleState::IdleReauth);
    assert_eq!(coordinator.session().token(), None);

    let status = handle.status();
    assert!(!status.last_update_success);
    assert_eq!(
        status.last_failure.map(|f| f.kind),
        Some(FailureKind::Authentication)
    );
    assert!(Arc::ptr_eq(&handle.snapshot().unwrap(), &before));

    // Next cycle logs in again
    transport.set_route(
        Endpoint::Summary,
        HttpReply::new(200, Some(common::body(Endpoint::Summary))),
    );
    coordinator.refresh().await.unwrap();
    assert_eq!(transport.login_calls(), 2);
    assert!(handle.available());
}

#[tokio::test]
async fn test_expired_session_does_not_wait_for_slow_endpoints() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut coordinator = coordinator(&transport, Duration::from_millis(500));
    let handle = coordinator.handle();

    coordinator.refresh().await.unwrap();

    transport.set_route(Endpoint::Summary, HttpReply::new(401, None));
    transport.set_route_delay(Endpoint::Ftl, Duration::from_secs(2));
    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(err, ApplianceError::AuthorizationExpired { ref endpoint, .. } if endpoint == "summary"));
    assert_eq!(coordinator.state(), CycleState::IdleReauth);
    assert_eq!(coordinator.session().token(), None);
    assert_eq!(
        handle.status().last_failure.map(|f| f.kind),
        Some(FailureKind::Authentication)
    );
}

#[tokio::test]
async fn test_other_failures_report_first_in_table_order() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_route(Endpoint::Sensors, HttpReply::new(500, None));
    transport.set_route_delay(Endpoint::Sensors, Duration::from_millis(100));
    transport.set_route(Endpoint::Ftl, HttpReply::new(502, None));
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));

    let err = coordinator.refresh().await.unwrap_err();

    assert!(matches!(err, ApplianceError::MalformedData { ref endpoint, .. } if endpoint == "sensors"));
    assert_eq!(coordinator.session().token(), Some(common::SID));
}

#[tokio::test]
async fn test_rejected_login_reports_authentication() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_login(Ok(HttpReply::new(
        401,
        Some(json!({"session": {"valid": false, "sid": null}})),
    )));
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));
    let handle = coordinator.handle();

    let err = coordinator.refresh().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Authentication);
    assert_eq!(coordinator.state(), CycleState::IdleReauth);
    assert_eq!(transport.get_calls(), 0);
    assert!(handle.snapshot().is_none());
}

#[tokio::test]
async fn test_timeout_keeps_snapshot_and_session() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut coordinator = coordinator(&transport, Duration::from_millis(100));
    let handle = coordinator.handle();

    coordinator.refresh().await.unwrap();
    let before = handle.snapshot().unwrap();

    transport.set_delay(Some(Duration::from_millis(500)));
    let err = coordinator.refresh().await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Connectivity);
    assert!(err.to_string().contains("timed out"));
    assert_eq!(coordinator.state(), CycleState::Idle);
    assert_eq!(coordinator.session().token(), Some(common::SID));
    assert!(Arc::ptr_eq(&handle.snapshot().unwrap(), &before));

    let status = handle.status();
    assert!(!status.last_update_success);
    assert_eq!(
        status.last_failure.map(|f| f.kind),
        Some(FailureKind::Connectivity)
    );
}

#[tokio::test]
async fn test_malformed_body_keeps_session() {
    let transport = Arc::new(FakeTransport::healthy());
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));
    let handle = coordinator.handle();

    coordinator.refresh().await.unwrap();
    let before = handle.snapshot().unwrap();

    transport.set_route(Endpoint::Version, HttpReply::new(200, None));
    let err = coordinator.refresh().await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Data);
    assert_eq!(coordinator.state(), CycleState::Idle);
    assert_eq!(coordinator.session().token(), Some(common::SID));
    assert!(Arc::ptr_eq(&handle.snapshot().unwrap(), &before));
}

#[tokio::test]
async fn test_scalar_body_is_data_failure() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_route(Endpoint::Blocking, HttpReply::new(200, Some(json!("enabled"))));
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));

    let err = coordinator.refresh().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Data);
}

#[tokio::test]
async fn test_consecutive_failures_reset_on_success() {
    let transport = Arc::new(FakeTransport::healthy());
    transport.set_route(Endpoint::Host, HttpReply::new(500, None));
    let mut coordinator = coordinator(&transport, Duration::from_secs(5));
    let handle = coordinator.handle();

    for expected in 1..=3 {
        coordinator.refresh().await.unwrap_err();
        assert_eq!(handle.status().consecutive_failures, expected);
    }

    transport.set_route(
        Endpoint::Host,
        HttpReply::new(200, Some(common::body(Endpoint::Host))),
    );
    coordinator.refresh().await.unwrap();

    let status = handle.status();
    assert_eq!(status.consecutive_failures, 0);
    assert!(status.last_update_success);
    assert_eq!(status.last_failure, None);
}

#[tokio::test]
async fn test_run_loop_publishes_and_honours_refresh_requests() {
    let transport = Arc::new(FakeTransport::healthy());
    let coordinator = coordinator(&transport, Duration::from_secs(5));
    let handle = coordinator.handle();
    let mut updates = handle.subscribe();

    let task = tokio::spawn(coordinator.run());

    tokio::time::timeout(Duration::from_secs(5), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(handle.available());
    assert_eq!(transport.get_calls(), Endpoint::ALL.len());

    handle.request_refresh();
    tokio::time::timeout(Duration::from_secs(5), updates.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transport.get_calls(), 2 * Endpoint::ALL.len());
    assert_eq!(transport.login_calls(), 1);

    task.abort();
}
