use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn config_with(pairs: &[(&'static str, &'static str)]) -> Result<AppConfig, ConfigError> {
    let map: HashMap<&str, &str> = pairs.iter().copied().collect();
    build_app_config(lookup_from_map(&map))
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let cfg = config_with(&[]).expect("defaults should be valid");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.headless);
    assert!(cfg.chromium_path.is_none());
    assert_eq!(cfg.navigation_timeout_secs, 30);
    assert_eq!(cfg.extraction_timeout_secs, 300);
    assert_eq!(cfg.page_settle_ms, 2000);
    assert_eq!(cfg.scroll_wait_ms, 1500);
    assert_eq!(cfg.max_empty_scrolls, 4);
    assert_eq!(cfg.max_idle_scrolls, 3);
    assert_eq!(cfg.max_total_scrolls, Some(200));
    assert_eq!(cfg.container_timeout_ms, 10_000);
    assert_eq!(cfg.sentinel_min_bytes, 200);
    assert_eq!(cfg.payload_marker, "pb=");
    assert!((cfg.wheel_delta - 2400.0).abs() < f64::EPSILON);
    assert_eq!(cfg.venues_path.to_str(), Some("./config/venues.yaml"));
    assert_eq!(cfg.output_dir.to_str(), Some("."));
    assert_eq!(cfg.max_concurrent_venues, 1);
}

#[test]
fn headless_accepts_common_boolean_spellings() {
    for raw in ["false", "0", "no", "OFF"] {
        let map: HashMap<&str, &str> = [("VENUEDIR_HEADLESS", raw)].into_iter().collect();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert!(!cfg.headless, "'{raw}' should disable headless mode");
    }
}

#[test]
fn headless_rejects_garbage() {
    let result = config_with(&[("VENUEDIR_HEADLESS", "sometimes")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VENUEDIR_HEADLESS"),
        "expected InvalidEnvVar(VENUEDIR_HEADLESS), got: {result:?}"
    );
}

#[test]
fn chromium_path_override() {
    let cfg = config_with(&[("VENUEDIR_CHROMIUM_PATH", "/opt/chrome/chrome")]).unwrap();
    assert_eq!(
        cfg.chromium_path.as_deref().and_then(|p| p.to_str()),
        Some("/opt/chrome/chrome")
    );
}

#[test]
fn blank_chromium_path_is_ignored() {
    let cfg = config_with(&[("VENUEDIR_CHROMIUM_PATH", "  ")]).unwrap();
    assert!(cfg.chromium_path.is_none());
}

#[test]
fn scroll_thresholds_override() {
    let cfg = config_with(&[
        ("VENUEDIR_MAX_EMPTY_SCROLLS", "6"),
        ("VENUEDIR_MAX_IDLE_SCROLLS", "2"),
        ("VENUEDIR_MAX_TOTAL_SCROLLS", "50"),
    ])
    .unwrap();
    assert_eq!(cfg.max_empty_scrolls, 6);
    assert_eq!(cfg.max_idle_scrolls, 2);
    assert_eq!(cfg.max_total_scrolls, Some(50));
}

#[test]
fn zero_total_scrolls_disables_the_cap() {
    let cfg = config_with(&[("VENUEDIR_MAX_TOTAL_SCROLLS", "0")]).unwrap();
    assert!(cfg.max_total_scrolls.is_none());
}

#[test]
fn zero_empty_scroll_threshold_is_rejected() {
    let result = config_with(&[("VENUEDIR_MAX_EMPTY_SCROLLS", "0")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VENUEDIR_MAX_EMPTY_SCROLLS"),
        "expected InvalidEnvVar(VENUEDIR_MAX_EMPTY_SCROLLS), got: {result:?}"
    );
}

#[test]
fn zero_idle_scroll_threshold_is_rejected() {
    let result = config_with(&[("VENUEDIR_MAX_IDLE_SCROLLS", "0")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VENUEDIR_MAX_IDLE_SCROLLS"),
        "expected InvalidEnvVar(VENUEDIR_MAX_IDLE_SCROLLS), got: {result:?}"
    );
}

#[test]
fn scroll_wait_invalid() {
    let result = config_with(&[("VENUEDIR_SCROLL_WAIT_MS", "soon")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VENUEDIR_SCROLL_WAIT_MS"),
        "expected InvalidEnvVar(VENUEDIR_SCROLL_WAIT_MS), got: {result:?}"
    );
}

#[test]
fn sentinel_min_bytes_override() {
    let cfg = config_with(&[("VENUEDIR_SENTINEL_MIN_BYTES", "512")]).unwrap();
    assert_eq!(cfg.sentinel_min_bytes, 512);
}

#[test]
fn empty_payload_marker_is_rejected() {
    let result = config_with(&[("VENUEDIR_PAYLOAD_MARKER", "")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VENUEDIR_PAYLOAD_MARKER"),
        "expected InvalidEnvVar(VENUEDIR_PAYLOAD_MARKER), got: {result:?}"
    );
}

#[test]
fn wheel_delta_must_be_positive() {
    let result = config_with(&[("VENUEDIR_WHEEL_DELTA", "-100")]);
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VENUEDIR_WHEEL_DELTA"),
        "expected InvalidEnvVar(VENUEDIR_WHEEL_DELTA), got: {result:?}"
    );
}

#[test]
fn max_concurrent_venues_override() {
    let cfg = config_with(&[("VENUEDIR_MAX_CONCURRENT_VENUES", "4")]).unwrap();
    assert_eq!(cfg.max_concurrent_venues, 4);
}

#[test]
fn unrelated_variables_do_not_change_defaults() {
    let cfg = config_with(&[("VENUEDIR_ENV", "production"), ("RUST_LOG", "trace")]).unwrap();
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.headless);
    assert_eq!(cfg.max_total_scrolls, Some(200));
}
