use thiserror::Error;

/// Failures raised by a browser page operation.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("no element matches {locator}")]
    NotFound { locator: String },

    #[error("operation not supported by this page: {0}")]
    Unsupported(&'static str),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser error: {0}")]
    Browser(String),
}

/// Failures parsing an intercepted data payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload top level is {found}, expected an array or object")]
    NotContainer { found: &'static str },
}

/// Orchestration-level failures of one extraction.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("no scrollable directory container found (tried {tried} selectors)")]
    ContainerNotFound { tried: usize },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("still on a consent interstitial after retry: {url}")]
    ConsentBlocked { url: String },

    #[error("page operation failed: {0}")]
    Page(#[from] PageError),
}
