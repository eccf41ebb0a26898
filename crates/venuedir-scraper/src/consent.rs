//! Consent interstitial handling.

use async_trait::async_trait;

use crate::activation::click_first_available;
use crate::error::PageError;
use crate::page::{DirectoryPage, Locator};

const CONSENT_HOST: &str = "consent.google.com";

/// Clears consent screens so extraction sees the target page.
#[async_trait]
pub trait ConsentHandler: Send + Sync {
    /// Whether `url` is a consent interstitial.
    fn is_interstitial(&self, url: &str) -> bool;

    /// Try to dismiss the interstitial the page is parked on. Returns `true`
    /// when an accept control was clicked.
    async fn clear(&self, page: &dyn DirectoryPage) -> Result<bool, PageError>;
}

/// Accepts everything on Google's consent screen.
#[derive(Debug, Clone)]
pub struct AcceptAllConsent {
    settle_ms: u64,
}

impl AcceptAllConsent {
    #[must_use]
    pub fn new(settle_ms: u64) -> Self {
        Self { settle_ms }
    }

    fn strategies() -> Vec<Locator> {
        vec![
            Locator::role("button", "Accept all"),
            Locator::text("button", "Accept all", false),
            Locator::text("button", "I agree", false),
            Locator::css(r#"[aria-label*="Accept"]"#),
            Locator::text("button", "Accept", false),
            Locator::text("button", "Agree", false),
            Locator::css(r#"form[action*="consent"] input[type="submit"]"#),
        ]
    }
}

impl Default for AcceptAllConsent {
    fn default() -> Self {
        Self::new(2_000)
    }
}

#[async_trait]
impl ConsentHandler for AcceptAllConsent {
    fn is_interstitial(&self, url: &str) -> bool {
        url.contains(CONSENT_HOST)
    }

    async fn clear(&self, page: &dyn DirectoryPage) -> Result<bool, PageError> {
        let url = page.current_url().await?;
        if !self.is_interstitial(&url) {
            return Ok(false);
        }
        match click_first_available(page, &Self::strategies(), self.settle_ms).await {
            Some(index) => {
                tracing::info!(strategy = index + 1, "accepted consent");
                Ok(true)
            }
            None => {
                tracing::warn!(url, "no consent accept control found");
                Ok(false)
            }
        }
    }
}
