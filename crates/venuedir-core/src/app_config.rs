use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub headless: bool,
    /// Explicit Chromium binary; `None` searches the usual locations.
    pub chromium_path: Option<PathBuf>,
    pub navigation_timeout_secs: u64,
    /// Upper bound on the scroll phase of one extraction.
    pub extraction_timeout_secs: u64,
    pub page_settle_ms: u64,
    pub scroll_wait_ms: u64,
    pub max_empty_scrolls: u32,
    pub max_idle_scrolls: u32,
    /// `None` when the circuit breaker is disabled (`0` in the environment).
    pub max_total_scrolls: Option<u32>,
    pub container_timeout_ms: u64,
    pub sentinel_min_bytes: usize,
    pub payload_marker: String,
    pub wheel_delta: f64,
    pub venues_path: PathBuf,
    pub output_dir: PathBuf,
    pub max_concurrent_venues: usize,
}
