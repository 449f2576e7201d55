use super::*;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_validation() {
    let config = ShroudConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.port, DEFAULT_PORT);
    assert!(config.server.require_signature);
    assert!(config.fetch.block_private_networks);
    assert_eq!(config.fetch.timeout_ms, 2_000);
}

#[test]
fn test_defaults_to_localhost() {
    let config = ShroudConfig::default();
    assert!(config.is_localhost_only());
    assert_eq!(config.server.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
}

#[test]
fn test_invalid_port() {
    let mut config = ShroudConfig::default();
    config.server.port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_timeouts_rejected() {
    let mut config = ShroudConfig::default();
    config.fetch.timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = ShroudConfig::default();
    config.server.request_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_small_body_limit_rejected() {
    let mut config = ShroudConfig::default();
    config.fetch.max_body_bytes = 512;
    assert!(config.validate().is_err());
}

#[test]
fn test_endpoint_paths_validated() {
    let mut config = ShroudConfig::default();
    config.rewrite.proxy_path = "proxy".into();
    assert!(config.validate().is_err());

    let mut config = ShroudConfig::default();
    config.rewrite.image_path = "/img".into();
    assert!(config.validate().is_err());

    let mut config = ShroudConfig::default();
    config.rewrite.image_path = "/proxy/".into();
    config.rewrite.proxy_path = "/proxy/".into();
    assert!(config.validate().is_err());

    let mut config = ShroudConfig::default();
    config.rewrite.proxy_path = "/p".into();
    config.rewrite.image_path = "/i/".into();
    assert!(config.validate().is_ok());
}

#[test]
fn test_short_secret_rejected() {
    let mut config = ShroudConfig::default();
    config.security.signing_secret = Some("short".into());
    assert!(config.validate().is_err());

    config.security.signing_secret = Some("a-long-enough-signing-secret".into());
    assert!(config.validate().is_ok());
}

#[test]
fn test_env_overrides() {
    let mut config = ShroudConfig::default();
    config.apply_overrides(env(&[
        ("SHROUD_SIGNING_SECRET", "0123456789abcdef0123"),
        ("SHROUD_BIND", "0.0.0.0"),
        ("SHROUD_PORT", "9000"),
        ("SHROUD_LOG_LEVEL", "DEBUG"),
        ("SHROUD_LOG_JSON", "1"),
        ("SHROUD_FETCH_TIMEOUT_MS", "750"),
    ]));

    assert_eq!(config.security.signing_secret.as_deref(), Some("0123456789abcdef0123"));
    assert_eq!(config.server.bind_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert!(config.logging.json);
    assert_eq!(config.fetch.timeout_ms, 750);
    assert!(!config.is_localhost_only());
}

#[test]
fn test_unparseable_env_overrides_ignored() {
    let mut config = ShroudConfig::default();
    config.apply_overrides(env(&[
        ("SHROUD_BIND", "not-an-ip"),
        ("SHROUD_PORT", "eighty"),
        ("SHROUD_FETCH_TIMEOUT_MS", "-1"),
    ]));

    assert_eq!(config.server.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.server.port, DEFAULT_PORT);
    assert_eq!(config.fetch.timeout_ms, 2_000);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = ShroudConfig::from_toml(
        r#"
        [server]
        port = 9999

        [rewrite]
        removed_elements = ["script", "iframe"]

        [logging]
        level = "warn"
        "#,
    )
    .unwrap();

    assert_eq!(config.server.port, 9999);
    assert!(config.server.require_signature);
    assert_eq!(config.rewrite.removed_elements, vec!["script", "iframe"]);
    assert_eq!(config.rewrite.proxy_path, "/proxy");
    assert_eq!(config.logging.level, LogLevel::Warn);
}

#[test]
fn test_invalid_toml() {
    assert!(ShroudConfig::from_toml("[server\nport = ").is_err());
}

#[test]
fn test_secret_never_serialized() {
    let mut config = ShroudConfig::default();
    config.security.signing_secret = Some("super-secret-value-1234".into());

    let toml_str = toml::to_string_pretty(&config).unwrap();
    assert!(!toml_str.contains("super-secret-value-1234"));
    assert!(!format!("{:?}", config).contains("super-secret-value-1234"));
    assert!(!config.redacted().to_string().contains("super-secret-value-1234"));
}

#[test]
fn test_secret_read_from_toml() {
    let config = ShroudConfig::from_toml(
        r#"
        [security]
        signing_secret = "from-the-config-file"
        "#,
    )
    .unwrap();
    assert!(config.security.has_secret());
}

#[test]
fn test_configured_signer_is_stable() {
    let mut config = ShroudConfig::default();
    config.security.signing_secret = Some("a-long-enough-signing-secret".into());

    let url = "https://ex.com/";
    assert_eq!(config.security.signer().sign(url), config.security.signer().sign(url));
}

#[test]
fn test_ephemeral_signers_differ() {
    let config = ShroudConfig::default();
    let url = "https://ex.com/";
    assert_ne!(config.security.signer().sign(url), config.security.signer().sign(url));
}

#[test]
fn test_security_warnings() {
    let config = ShroudConfig::default();
    let warnings = config.check_security_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, WarningSeverity::Low);

    let mut config = ShroudConfig::default();
    config.server.require_signature = false;
    config.fetch.block_private_networks = false;
    let high = config
        .check_security_warnings()
        .into_iter()
        .filter(|w| w.severity == WarningSeverity::High)
        .count();
    assert_eq!(high, 2);
}

#[test]
fn test_redacted_config() {
    let config = ShroudConfig::default();
    let redacted = config.redacted().to_string();
    assert!(redacted.contains("Listen: 127.0.0.1:8430"));
    assert!(redacted.contains("<ephemeral>"));
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = ShroudConfig::default();
    config.server.port = 8555;
    config.rewrite.strip_event_handlers = false;
    config.save(&path).unwrap();

    let loaded = ShroudConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.server.port, 8555);
    assert!(!loaded.rewrite.strip_event_handlers);
    assert_eq!(loaded.fetch.user_agent, config.fetch.user_agent);
}

#[test]
fn test_fetch_options_mapping() {
    let mut config = FetchConfig::default();
    config.timeout_ms = 1500;
    config.max_redirects = 2;
    let options = config.options();
    assert_eq!(options.timeout, std::time::Duration::from_millis(1500));
    assert_eq!(options.max_redirects, 2);
    assert!(options.block_private_networks);
}

#[test]
fn test_log_level_parsing() {
    assert_eq!(LogLevel::parse_lenient("trace"), LogLevel::Trace);
    assert_eq!(LogLevel::parse_lenient(" Warning "), LogLevel::Warn);
    assert_eq!(LogLevel::parse_lenient("loud"), LogLevel::Info);
    assert_eq!(LogLevel::Error.to_string(), "error");
}
