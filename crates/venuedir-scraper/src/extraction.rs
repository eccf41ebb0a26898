//! End-to-end extraction of one venue directory.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use venuedir_core::AppConfig;

use crate::activation::{
    activate_directory_tab, click_view_all, directory_tab_locators, view_all_locators,
};
use crate::aggregate::{aggregate_cards, brand_names};
use crate::cards::parse_cards;
use crate::collector::{ResponseCollector, DEFAULT_PAYLOAD_MARKER, DEFAULT_SENTINEL_MIN_BYTES};
use crate::consent::ConsentHandler;
use crate::error::{PageError, ScraperError};
use crate::page::{DirectoryPage, Locator, PageProvider};
use crate::scroll::{
    css_locators, scroll_until_complete, IterationSnapshot, ScrollObserver, ScrollOptions,
    DIRECTORY_CONTAINER_SELECTORS,
};
use crate::types::{DirectoryCard, DirectoryScrape, ScrollTelemetry};

/// Everything that tunes one extraction.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub scroll: ScrollOptions,
    /// Wait after navigation and after each UI activation.
    pub page_settle_ms: u64,
    /// Deadline for the scroll phase.
    pub extraction_timeout: Duration,
    pub payload_marker: String,
    pub sentinel_min_bytes: usize,
    pub container_selectors: Vec<Locator>,
    pub tab_strategies: Vec<Locator>,
    pub view_all_strategies: Vec<Locator>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            scroll: ScrollOptions::default(),
            page_settle_ms: 2_000,
            extraction_timeout: Duration::from_secs(300),
            payload_marker: DEFAULT_PAYLOAD_MARKER.to_string(),
            sentinel_min_bytes: DEFAULT_SENTINEL_MIN_BYTES,
            container_selectors: css_locators(DIRECTORY_CONTAINER_SELECTORS),
            tab_strategies: directory_tab_locators(),
            view_all_strategies: view_all_locators(),
        }
    }
}

impl From<&AppConfig> for ScrapeOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            scroll: ScrollOptions {
                scroll_wait_ms: config.scroll_wait_ms,
                max_empty_scrolls: config.max_empty_scrolls,
                max_idle_scrolls: config.max_idle_scrolls,
                max_total_scrolls: config.max_total_scrolls,
                container_timeout_ms: config.container_timeout_ms,
                wheel_delta: config.wheel_delta,
                ..ScrollOptions::default()
            },
            page_settle_ms: config.page_settle_ms,
            extraction_timeout: Duration::from_secs(config.extraction_timeout_secs),
            payload_marker: config.payload_marker.clone(),
            sentinel_min_bytes: config.sentinel_min_bytes,
            ..Self::default()
        }
    }
}

/// Drives a page through activation, scrolling, and aggregation.
pub struct DirectoryScraper {
    provider: Arc<dyn PageProvider>,
    consent: Option<Arc<dyn ConsentHandler>>,
    options: ScrapeOptions,
}

impl DirectoryScraper {
    #[must_use]
    pub fn new(
        provider: Arc<dyn PageProvider>,
        consent: Option<Arc<dyn ConsentHandler>>,
        options: ScrapeOptions,
    ) -> Self {
        Self {
            provider,
            consent,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Brand names for `url`. Failures are logged and yield an empty list.
    pub async fn scrape_brands(&self, url: &str) -> Vec<String> {
        match self.scrape(url).await {
            Ok(scrape) => scrape.brands,
            Err(e) => {
                tracing::error!(url, error = %e, "directory extraction failed");
                Vec::new()
            }
        }
    }

    /// Full extraction of `url` on a fresh page from the provider. The page
    /// is closed before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Navigation`] if no page can be opened or
    /// navigation fails, [`ScraperError::ConsentBlocked`] if a consent screen
    /// cannot be cleared, and [`ScraperError::ContainerNotFound`] if there is
    /// nothing to scroll.
    pub async fn scrape(&self, url: &str) -> Result<DirectoryScrape, ScraperError> {
        let page = self
            .provider
            .get_page(url)
            .await
            .map_err(|e| navigation_error(url, &e))?;
        let result = self.scrape_page(page.as_ref(), url).await;
        page.close().await;
        result
    }

    /// Full extraction of `url` on a caller-supplied page.
    ///
    /// # Errors
    ///
    /// See [`DirectoryScraper::scrape`].
    pub async fn scrape_page(
        &self,
        page: &dyn DirectoryPage,
        url: &str,
    ) -> Result<DirectoryScrape, ScraperError> {
        let settle_ms = self.options.page_settle_ms;

        tracing::info!(url, "navigating to venue");
        page.navigate(url)
            .await
            .map_err(|e| navigation_error(url, &e))?;
        self.ensure_past_consent(page, url).await?;
        page.wait(settle_ms).await;

        activate_directory_tab(page, &self.options.tab_strategies, settle_ms).await;
        click_view_all(page, &self.options.view_all_strategies, settle_ms).await;
        self.ensure_past_consent(page, url).await?;

        let collector = Arc::new(ResponseCollector::new(
            self.options.payload_marker.clone(),
            self.options.sentinel_min_bytes,
        ));
        let mut snapshots = SnapshotObserver::default();

        let scroll = scroll_until_complete(
            page,
            &self.options.container_selectors,
            &collector,
            &self.options.scroll,
            Some(&mut snapshots),
        );
        let outcome = tokio::time::timeout(self.options.extraction_timeout, scroll).await;
        let (telemetry, timed_out) = match outcome {
            Ok(result) => (result?, false),
            Err(_) => {
                tracing::warn!(
                    url,
                    timeout_secs = self.options.extraction_timeout.as_secs(),
                    captured = snapshots.cards.len(),
                    "extraction timed out; keeping partial results"
                );
                let (scrolls_performed, final_card_count) =
                    snapshots.capture_after_timeout(page).await;
                let partial = ScrollTelemetry {
                    scrolls_performed,
                    final_card_count,
                    sentinel_triggered: collector.sentinel().is_some(),
                    responses_observed: collector.total_seen(),
                };
                (partial, true)
            }
        };

        let payload_cards = collector.extract_cards();
        let cards = aggregate_cards(&snapshots.cards, &payload_cards);
        let brands = brand_names(&cards);

        tracing::info!(
            url,
            brands = brands.len(),
            dom_cards = snapshots.cards.len(),
            payload_cards = payload_cards.len(),
            payloads = collector.total_stored(),
            timed_out,
            "directory extraction complete"
        );

        Ok(DirectoryScrape {
            brands,
            cards,
            telemetry,
            timed_out,
        })
    }

    /// Clear a consent interstitial, allowing one retry.
    async fn ensure_past_consent(
        &self,
        page: &dyn DirectoryPage,
        url: &str,
    ) -> Result<(), ScraperError> {
        let Some(consent) = &self.consent else {
            return Ok(());
        };

        for attempt in 1..=2 {
            let current = page.current_url().await?;
            if !consent.is_interstitial(&current) {
                return Ok(());
            }
            tracing::info!(attempt, "consent interstitial detected");
            match consent.clear(page).await {
                Ok(true) => page.wait(self.options.page_settle_ms).await,
                Ok(false) => {}
                Err(e) => tracing::debug!(attempt, error = %e, "consent handler failed"),
            }
        }

        let current = page.current_url().await?;
        if consent.is_interstitial(&current) {
            return Err(ScraperError::ConsentBlocked {
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

fn navigation_error(url: &str, error: &PageError) -> ScraperError {
    ScraperError::Navigation {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

/// Parses the directory (or the whole document when no container is known)
/// after every scroll and keeps each distinct card once.
#[derive(Default)]
struct SnapshotObserver {
    cards: Vec<DirectoryCard>,
    seen: HashSet<DirectoryCard>,
    last: Option<IterationSnapshot>,
}

impl SnapshotObserver {
    /// Re-measure and re-parse the container of the interrupted scroll loop.
    /// Returns the scrolls performed and the last known child count.
    async fn capture_after_timeout(&mut self, page: &dyn DirectoryPage) -> (u32, u64) {
        let Some(mut last) = self.last.clone() else {
            return (0, 0);
        };
        if let Some(container) = &last.container {
            match page.measure(container).await {
                Ok(metrics) => last.metrics = metrics,
                Err(e) => tracing::debug!(error = %e, "final container measurement failed"),
            }
        }
        if let Err(e) = self.on_iteration(page, &last).await {
            tracing::debug!(error = %e, "final directory snapshot failed");
        }
        (last.iteration, last.metrics.child_count)
    }
}

#[async_trait]
impl ScrollObserver for SnapshotObserver {
    async fn on_iteration(
        &mut self,
        page: &dyn DirectoryPage,
        snapshot: &IterationSnapshot,
    ) -> Result<(), PageError> {
        self.last = Some(snapshot.clone());
        let markup = match &snapshot.container {
            Some(container) => match page.outer_html(container).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(container = %container, error = %e, "container snapshot failed, using document");
                    page.content().await?
                }
            },
            None => page.content().await?,
        };

        let before = self.cards.len();
        for card in parse_cards(&markup) {
            if self.seen.insert(card.clone()) {
                self.cards.push(card);
            }
        }
        tracing::debug!(
            iteration = snapshot.iteration,
            new_cards = self.cards.len() - before,
            total_cards = self.cards.len(),
            "directory snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "extraction_test.rs"]
mod tests;
