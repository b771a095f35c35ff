//! Tests for configuration parsing and validation

use std::collections::HashMap;

use prometheus_dispatch_pool::config::{ThreadPoolConfig, ENV_PREFIX};
use prometheus_dispatch_pool::core::{PoolError, ThreadPool};

fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
    vars.iter()
        .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), (*v).to_string()))
        .collect()
}

#[test]
fn test_config_builder() {
    let cfg = ThreadPoolConfig::new()
        .with_max_executors(3)
        .with_max_queue(7)
        .with_thread_stack_size(512 * 1024)
        .with_thread_name_prefix("mailer");
    assert_eq!(cfg.max_executors, 3);
    assert_eq!(cfg.max_queue, 7);
    assert_eq!(cfg.thread_stack_size, 512 * 1024);
    assert_eq!(cfg.thread_name_prefix, "mailer");
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_invalid_executor_count() {
    let cfg = ThreadPoolConfig::new().with_max_executors(0);
    assert!(cfg.validate().is_err());
    assert!(matches!(ThreadPool::new(cfg), Err(PoolError::InvalidConfig(_))));
}

#[test]
fn test_config_invalid_prefix() {
    let cfg = ThreadPoolConfig::new().with_thread_name_prefix("  ");
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{ "max_executors": 4, "max_queue": 0 }"#;
    let cfg = ThreadPoolConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.max_executors, 4);
    assert_eq!(cfg.max_queue, 0);
    // Unspecified fields keep their defaults.
    assert_eq!(cfg.thread_name_prefix, ThreadPoolConfig::default().thread_name_prefix);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(ThreadPoolConfig::from_json_str(r#"{ "max_executors": 0 }"#).is_err());
    let err = ThreadPoolConfig::from_json_str("not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_config_json_roundtrip() {
    let cfg = ThreadPoolConfig::new().with_max_executors(2).with_max_queue(5);
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(ThreadPoolConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_config_from_env_lookup() {
    let vars = env(&[
        ("MAX_EXECUTORS", "6"),
        ("MAX_QUEUE", " 12 "),
        ("THREAD_NAME_PREFIX", "audit"),
    ]);
    let cfg = ThreadPoolConfig::from_env_with(|k| vars.get(k).cloned()).unwrap();
    assert_eq!(cfg.max_executors, 6);
    assert_eq!(cfg.max_queue, 12);
    assert_eq!(cfg.thread_name_prefix, "audit");
    assert_eq!(cfg.thread_stack_size, ThreadPoolConfig::default().thread_stack_size);
}

#[test]
fn test_config_from_env_bad_number() {
    let vars = env(&[("MAX_QUEUE", "lots")]);
    let err = ThreadPoolConfig::from_env_with(|k| vars.get(k).cloned()).unwrap_err();
    assert!(err.contains("DISPATCH_POOL_MAX_QUEUE"));
}

#[test]
fn test_config_from_env_defaults_when_unset() {
    let cfg = ThreadPoolConfig::from_env_with(|_| None).unwrap();
    assert_eq!(cfg, ThreadPoolConfig::default());
}
