use std::time::Duration;

use super::*;

fn base_raw() -> RawSettings {
    RawSettings::default()
}

#[test]
fn defaults_resolve() {
    let settings = Settings::from_raw(base_raw()).expect("defaults are valid");
    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.database.max_connections.get(), 8);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.page_ttl, Duration::from_secs(20));
    assert_eq!(settings.sessions.ttl, Duration::from_secs(14 * 24 * 60 * 60));
}

#[test]
fn serve_overrides_take_precedence() {
    let mut raw = base_raw();
    raw.apply_serve_overrides(&ServeOverrides {
        server_host: Some("0.0.0.0".to_string()),
        server_port: Some(8080),
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        database_url: Some("postgres://example/brusio".to_string()),
        database_max_connections: Some(4),
        cache_enabled: Some(false),
        cache_page_ttl_seconds: Some(5),
        sessions_ttl_minutes: Some(30),
    });

    let settings = Settings::from_raw(raw).expect("overrides are valid");
    assert_eq!(settings.server.addr.to_string(), "0.0.0.0:8080");
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://example/brusio")
    );
    assert_eq!(settings.database.max_connections.get(), 4);
    assert!(!settings.cache.enabled);
    assert_eq!(settings.cache.page_ttl, Duration::from_secs(5));
    assert_eq!(settings.sessions.ttl, Duration::from_secs(30 * 60));
}

#[test]
#[serial_test::serial]
fn environment_variables_override_defaults() {
    unsafe {
        std::env::set_var("BRUSIO__SERVER__PORT", "4001");
    }

    let cli = CliArgs {
        config_file: None,
        command: None,
    };
    let settings = load(&cli).expect("settings load");
    assert_eq!(settings.server.addr.port(), 4001);

    unsafe {
        std::env::remove_var("BRUSIO__SERVER__PORT");
    }
}

#[test]
fn invalid_host_is_rejected() {
    let mut raw = base_raw();
    raw.server.host = Some("not a host".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid host rejected");
    assert!(matches!(err, LoadError::Invalid { key: "server.host", .. }));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = base_raw();
    raw.cache.page_ttl_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero ttl rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.page_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = base_raw();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("invalid level rejected");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}
