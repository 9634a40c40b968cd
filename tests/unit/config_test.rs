//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use capture_relay::config::{PollingConfig, RelayConfig};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_polling_config_validation() {
    assert!(PollingConfig::default().validate().is_ok());
    assert!(PollingConfig::capture_defaults().validate().is_ok());
    assert!(PollingConfig::new()
        .with_interval(Duration::ZERO)
        .validate()
        .is_err());
}

#[test]
fn test_capture_defaults() {
    let cfg = PollingConfig::capture_defaults();
    assert_eq!(cfg.interval(), Duration::from_millis(1000));
    assert!(cfg.wait_for_previous);
    assert_eq!(cfg.max_consecutive_failures, Some(5));
    assert!(cfg.escalate_on_max_failures);
    assert!(!cfg.run_immediately);
}

#[test]
fn test_polling_config_from_json() {
    let cfg = PollingConfig::from_json_str(
        r#"{"interval_ms": 500, "wait_for_previous": true, "max_consecutive_failures": 3}"#,
    )
    .unwrap();
    assert_eq!(cfg.interval_ms, 500);
    assert!(cfg.wait_for_previous);
    assert_eq!(cfg.max_consecutive_failures, Some(3));
    assert!(!cfg.escalate_on_max_failures);

    assert!(PollingConfig::from_json_str(r#"{"interval_ms": 0}"#).is_err());
    assert!(PollingConfig::from_json_str("not json").is_err());
}

#[test]
fn test_relay_config_from_json() {
    let cfg = RelayConfig::from_json_str(r#"{"endpoint": "https://api.example.com"}"#).unwrap();
    assert_eq!(cfg.submit_deadline(), Duration::from_millis(3000));
    assert_eq!(cfg.reauth_path, "/");
    assert_eq!(cfg.polling, PollingConfig::capture_defaults());
    assert_eq!(cfg.actions_url(), "https://api.example.com/api/actions");
}

#[test]
fn test_relay_config_validation() {
    assert!(RelayConfig::new("ftp://example.com").validate().is_err());

    let mut cfg = RelayConfig::new("http://localhost:8080");
    assert!(cfg.validate().is_ok());
    cfg.submit_deadline_ms = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = RelayConfig::new("http://localhost:8080");
    cfg.polling.interval_ms = 0;
    assert!(cfg.validate().unwrap_err().starts_with("polling invalid"));
}

#[test]
fn test_relay_config_from_lookup() {
    let cfg = RelayConfig::from_lookup(lookup(&[
        ("CAPTURE_RELAY_ENDPOINT", "https://api.example.com/"),
        ("CAPTURE_RELAY_SUBMIT_DEADLINE_MS", "1500"),
        ("CAPTURE_RELAY_REAUTH_PATH", "/login"),
        ("CAPTURE_RELAY_INTERVAL_MS", "250"),
        ("CAPTURE_RELAY_WAIT_FOR_PREVIOUS", "false"),
        ("CAPTURE_RELAY_MAX_CONSECUTIVE_FAILURES", "none"),
        ("CAPTURE_RELAY_ESCALATE", "false"),
    ]))
    .unwrap();

    assert_eq!(cfg.actions_url(), "https://api.example.com/api/actions");
    assert_eq!(cfg.submit_deadline_ms, 1500);
    assert_eq!(cfg.reauth_path, "/login");
    assert_eq!(cfg.polling.interval_ms, 250);
    assert!(!cfg.polling.wait_for_previous);
    assert_eq!(cfg.polling.max_consecutive_failures, None);
    assert!(!cfg.polling.escalate_on_max_failures);
}

#[test]
fn test_relay_config_from_lookup_errors() {
    let missing = RelayConfig::from_lookup(lookup(&[])).unwrap_err();
    assert!(missing.contains("CAPTURE_RELAY_ENDPOINT"));

    let bad = RelayConfig::from_lookup(lookup(&[
        ("CAPTURE_RELAY_ENDPOINT", "https://api.example.com"),
        ("CAPTURE_RELAY_INTERVAL_MS", "soon"),
    ]))
    .unwrap_err();
    assert!(bad.starts_with("CAPTURE_RELAY_INTERVAL_MS=`soon`"));
}
