//! Tests for error types

use std::time::Duration;

use capture_relay::core::{Cause, Fault, NetworkError, NetworkErrorKind, SchedulerError};

#[test]
fn test_scheduler_error_display() {
    let err = SchedulerError::InvalidConfig("interval_ms must be greater than 0".into());
    assert_eq!(
        err.to_string(),
        "invalid configuration: interval_ms must be greater than 0"
    );
    assert_eq!(
        SchedulerError::DriverGone.to_string(),
        "scheduler driver has shut down"
    );
}

#[test]
fn test_network_error_kinds() {
    let transport = NetworkError::transport("connection reset");
    assert_eq!(transport.kind(), NetworkErrorKind::Transport);
    assert_eq!(transport.consecutive_failure_count(), 0);
    assert!(transport.original_cause().is_none());

    let timeout = NetworkError::timeout(Duration::from_millis(3000));
    assert!(timeout.is_timeout());
    assert_eq!(timeout.to_string(), "request timed out after 3000 ms");

    let escalation = NetworkError::consecutive_failures(5, Some(Cause::new(timeout)));
    assert!(escalation.is_consecutive_failure());
    assert_eq!(
        escalation.to_string(),
        "network connection unstable (5 consecutive failures)"
    );
    assert_eq!(
        escalation.original_cause().map(ToString::to_string).as_deref(),
        Some("request timed out after 3000 ms")
    );
}

#[test]
fn test_kind_labels() {
    assert_eq!(NetworkErrorKind::Transport.as_label(), "network_transport");
    assert_eq!(NetworkErrorKind::Timeout.as_label(), "network_timeout");
    assert_eq!(
        NetworkErrorKind::ConsecutiveFailure.as_label(),
        "network_consecutive_failure"
    );
    assert_eq!(
        serde_json::to_string(&NetworkErrorKind::ConsecutiveFailure).unwrap(),
        "\"consecutive_failure\""
    );
}

#[test]
fn test_builders_and_timestamp() {
    let err = NetworkError::transport("bad gateway")
        .with_consecutive_failures(2)
        .with_cause(Cause::new(anyhow::anyhow!("502")));
    assert_eq!(err.consecutive_failure_count(), 2);
    assert_eq!(err.original_cause().unwrap().to_string(), "502");
    assert!(err.timestamp_ms() > 0);
}

#[test]
fn test_fault_classification() {
    let fault = Fault::classify(anyhow::Error::new(NetworkError::transport("reset")));
    assert!(fault.as_network().is_some());

    let fault = Fault::classify(anyhow::anyhow!("permission denied"));
    assert!(fault.as_network().is_none());
    assert_eq!(fault.to_string(), "permission denied");
}
