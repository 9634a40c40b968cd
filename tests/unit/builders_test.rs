//! Tests for building sessions from configuration

use std::sync::Arc;

use capture_relay::builders::build_capture_session;
use capture_relay::config::RelayConfig;
use capture_relay::core::{Fault, NetworkError, Recovery, RecoveryAction, SchedulerError};
use capture_relay::infra::{SharedFrameSource, SharedPositionSource};
use capture_relay::runtime::TokioSpawner;

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let cfg = RelayConfig::new("not-a-url");
    let result = build_capture_session(
        &cfg,
        Arc::new(SharedFrameSource::new()),
        Arc::new(SharedPositionSource::new()),
        None,
        TokioSpawner::current().unwrap(),
    );
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_build_uses_configured_reauth_path() {
    let mut cfg = RelayConfig::new("http://127.0.0.1:9");
    cfg.reauth_path = "/signin".into();

    let session = build_capture_session(
        &cfg,
        Arc::new(SharedFrameSource::new()),
        Arc::new(SharedPositionSource::new()),
        None,
        TokioSpawner::current().unwrap(),
    )
    .unwrap();
    assert_eq!(session.scheduler().name(), "http://127.0.0.1:9/api/actions");

    session
        .boundary()
        .intercept(Fault::from(NetworkError::transport("offline")))
        .unwrap();
    assert_eq!(
        session.recover(RecoveryAction::ReAuthenticate).unwrap(),
        Recovery::Redirect("/signin".into())
    );
    session.shutdown();
}
