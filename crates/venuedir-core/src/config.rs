use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(invalid(var, format!("expected a positive number, got {value}")))
        }
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let log_level = or_default("VENUEDIR_LOG_LEVEL", "info");

    let headless = parse_bool("VENUEDIR_HEADLESS", "true")?;
    let chromium_path = lookup("VENUEDIR_CHROMIUM_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let navigation_timeout_secs = parse_u64("VENUEDIR_NAVIGATION_TIMEOUT_SECS", "30")?;
    let extraction_timeout_secs = parse_u64("VENUEDIR_EXTRACTION_TIMEOUT_SECS", "300")?;
    let page_settle_ms = parse_u64("VENUEDIR_PAGE_SETTLE_MS", "2000")?;
    let scroll_wait_ms = parse_u64("VENUEDIR_SCROLL_WAIT_MS", "1500")?;

    let max_empty_scrolls = parse_u32("VENUEDIR_MAX_EMPTY_SCROLLS", "4")?;
    let max_idle_scrolls = parse_u32("VENUEDIR_MAX_IDLE_SCROLLS", "3")?;
    if max_empty_scrolls == 0 {
        return Err(invalid("VENUEDIR_MAX_EMPTY_SCROLLS", "must be at least 1".to_string()));
    }
    if max_idle_scrolls == 0 {
        return Err(invalid("VENUEDIR_MAX_IDLE_SCROLLS", "must be at least 1".to_string()));
    }
    let max_total_scrolls = match parse_u32("VENUEDIR_MAX_TOTAL_SCROLLS", "200")? {
        0 => None,
        n => Some(n),
    };

    let container_timeout_ms = parse_u64("VENUEDIR_CONTAINER_TIMEOUT_MS", "10000")?;
    let sentinel_min_bytes = parse_usize("VENUEDIR_SENTINEL_MIN_BYTES", "200")?;
    let payload_marker = or_default("VENUEDIR_PAYLOAD_MARKER", "pb=");
    if payload_marker.is_empty() {
        return Err(invalid("VENUEDIR_PAYLOAD_MARKER", "must be non-empty".to_string()));
    }
    let wheel_delta = parse_f64("VENUEDIR_WHEEL_DELTA", "2400")?;

    let venues_path = PathBuf::from(or_default("VENUEDIR_VENUES_PATH", "./config/venues.yaml"));
    let output_dir = PathBuf::from(or_default("VENUEDIR_OUTPUT_DIR", "."));
    let max_concurrent_venues = parse_usize("VENUEDIR_MAX_CONCURRENT_VENUES", "1")?;

    Ok(AppConfig {
        log_level,
        headless,
        chromium_path,
        navigation_timeout_secs,
        extraction_timeout_secs,
        page_settle_ms,
        scroll_wait_ms,
        max_empty_scrolls,
        max_idle_scrolls,
        max_total_scrolls,
        container_timeout_ms,
        sentinel_min_bytes,
        payload_marker,
        wheel_delta,
        venues_path,
        output_dir,
        max_concurrent_venues,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
