//! Scroll convergence: drive a virtualized list until it stops growing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::collector::{ResponseCollector, Sentinel};
use crate::error::{PageError, ScraperError};
use crate::page::{
    ContainerMetrics, DirectoryPage, Locator, ResponseSink, ResponseSubscription,
};
use crate::types::ScrollTelemetry;

/// Candidate directory scroll containers, most specific first.
pub const DIRECTORY_CONTAINER_SELECTORS: &[&str] = &[
    "#directory",
    r#"[aria-label~="Directory"]"#,
    r#"div[role="list"]"#,
    r#"div[jslog*="11886"]"#,
    r#"div[role="feed"]"#,
];

/// Convergence thresholds and timings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollOptions {
    /// Settle interval after each scroll action.
    pub scroll_wait_ms: u64,
    /// Consecutive iterations without child-count growth.
    pub max_empty_scrolls: u32,
    /// Consecutive iterations without scroll-extent growth.
    pub max_idle_scrolls: u32,
    /// Hard iteration cap; `None` disables it.
    pub max_total_scrolls: Option<u32>,
    /// Budget for locating the container.
    pub container_timeout_ms: u64,
    /// Poll interval while locating the container.
    pub container_poll_ms: u64,
    pub wheel_delta: f64,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            scroll_wait_ms: 1_500,
            max_empty_scrolls: 4,
            max_idle_scrolls: 3,
            max_total_scrolls: Some(200),
            container_timeout_ms: 10_000,
            container_poll_ms: 250,
            wheel_delta: 2_400.0,
        }
    }
}

impl ScrollOptions {
    /// Idle iterations required before a stall or short-body sentinel is
    /// trusted. Never exceeds the empty-scroll threshold.
    #[must_use]
    pub fn idle_threshold(&self) -> u32 {
        self.max_idle_scrolls.min(self.max_empty_scrolls)
    }
}

/// State handed to the observer after each iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSnapshot {
    /// Scrolls performed so far.
    pub iteration: u32,
    /// `None` when no container could be located.
    pub container: Option<Locator>,
    pub metrics: ContainerMetrics,
}

/// Per-iteration callback, typically capturing a DOM snapshot.
#[async_trait]
pub trait ScrollObserver: Send {
    async fn on_iteration(
        &mut self,
        page: &dyn DirectoryPage,
        snapshot: &IterationSnapshot,
    ) -> Result<(), PageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    NoContent,
    ShortBodyAndIdle,
    Stagnant,
    Cap,
}

/// Scroll the first usable container in `container_selectors` until the
/// list converges.
///
/// `collector` is subscribed to the page for the duration of the call and
/// detached on every exit path. `observer` runs after each iteration and one
/// final time on exit; its failures are logged and ignored.
///
/// # Errors
///
/// Returns [`ScraperError::ContainerNotFound`] when no candidate resolves to a
/// visible, scrollable element within `container_timeout_ms`.
pub async fn scroll_until_complete(
    page: &dyn DirectoryPage,
    container_selectors: &[Locator],
    collector: &Arc<ResponseCollector>,
    options: &ScrollOptions,
    mut observer: Option<&mut dyn ScrollObserver>,
) -> Result<ScrollTelemetry, ScraperError> {
    let sink: Arc<dyn ResponseSink> = Arc::clone(collector) as Arc<dyn ResponseSink>;
    let _subscription = ResponseSubscription::attach(page, sink);

    let Some((container, _)) = locate_container(page, container_selectors, options).await else {
        tracing::error!(
            tried = container_selectors.len(),
            "no scrollable directory container found"
        );
        let snapshot = IterationSnapshot {
            iteration: 0,
            container: None,
            metrics: ContainerMetrics::default(),
        };
        notify(&mut observer, page, &snapshot).await;
        return Err(ScraperError::ContainerNotFound {
            tried: container_selectors.len(),
        });
    };

    let mut last = page.measure(&container).await.unwrap_or_else(|e| {
        tracing::debug!(container = %container, error = %e, "baseline measurement failed");
        ContainerMetrics::default()
    });
    tracing::info!(
        container = %container,
        child_count = last.child_count,
        scroll_height = last.scroll_height,
        "scrolling directory container"
    );

    let idle_threshold = options.idle_threshold();
    let mut scrolls: u32 = 0;
    let mut empty_scrolls: u32 = 0;
    let mut idle_scrolls: u32 = 0;

    let reason = loop {
        scroll_forward(page, &container, options.wheel_delta).await;
        scrolls += 1;
        page.wait(options.scroll_wait_ms).await;

        let current = match page.measure(&container).await {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::debug!(container = %container, error = %e, "measurement failed");
                last
            }
        };

        let snapshot = IterationSnapshot {
            iteration: scrolls,
            container: Some(container.clone()),
            metrics: current,
        };
        notify(&mut observer, page, &snapshot).await;

        if current.child_count > last.child_count {
            empty_scrolls = 0;
        } else {
            empty_scrolls += 1;
        }
        if current.scroll_height > last.scroll_height {
            idle_scrolls = 0;
        } else {
            idle_scrolls += 1;
        }
        last = current;

        tracing::debug!(
            iteration = scrolls,
            child_count = current.child_count,
            scroll_height = current.scroll_height,
            empty_scrolls,
            idle_scrolls,
            "scroll iteration"
        );

        match collector.sentinel() {
            Some(Sentinel::NoContent) => break StopReason::NoContent,
            Some(Sentinel::ShortBody) if idle_scrolls >= idle_threshold => {
                break StopReason::ShortBodyAndIdle
            }
            _ => {}
        }
        if empty_scrolls >= options.max_empty_scrolls && idle_scrolls >= idle_threshold {
            break StopReason::Stagnant;
        }
        if options.max_total_scrolls.is_some_and(|cap| scrolls >= cap) {
            break StopReason::Cap;
        }
    };

    let telemetry = ScrollTelemetry {
        scrolls_performed: scrolls,
        final_card_count: last.child_count,
        sentinel_triggered: collector.sentinel().is_some(),
        responses_observed: collector.total_seen(),
    };
    tracing::info!(
        ?reason,
        scrolls = telemetry.scrolls_performed,
        final_card_count = telemetry.final_card_count,
        sentinel = telemetry.sentinel_triggered,
        responses = telemetry.responses_observed,
        "scroll converged"
    );

    let snapshot = IterationSnapshot {
        iteration: scrolls,
        container: Some(container),
        metrics: last,
    };
    notify(&mut observer, page, &snapshot).await;

    Ok(telemetry)
}

/// First candidate that is present, visible, and overflowing, polled until
/// the container budget runs out.
async fn locate_container(
    page: &dyn DirectoryPage,
    candidates: &[Locator],
    options: &ScrollOptions,
) -> Option<(Locator, ContainerMetrics)> {
    let poll_ms = options.container_poll_ms.max(1);
    let mut waited_ms: u64 = 0;

    loop {
        for candidate in candidates {
            if let Some(metrics) = inspect_container(page, candidate).await {
                tracing::debug!(container = %candidate, waited_ms, "directory container located");
                return Some((candidate.clone(), metrics));
            }
        }
        if waited_ms >= options.container_timeout_ms {
            return None;
        }
        page.wait(poll_ms).await;
        waited_ms += poll_ms;
    }
}

async fn inspect_container(page: &dyn DirectoryPage, candidate: &Locator) -> Option<ContainerMetrics> {
    match page.count(candidate).await {
        Ok(0) => return None,
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(container = %candidate, error = %e, "container inspection failed");
            return None;
        }
    }
    if !page.is_visible(candidate).await.unwrap_or(false) {
        return None;
    }
    match page.measure(candidate).await {
        Ok(metrics) if metrics.is_scrollable() => Some(metrics),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(container = %candidate, error = %e, "container measurement failed");
            None
        }
    }
}

async fn scroll_forward(page: &dyn DirectoryPage, container: &Locator, delta: f64) {
    match page.wheel(container, delta).await {
        Ok(()) => return,
        Err(PageError::Unsupported(what)) => {
            tracing::trace!(what, "wheel unsupported, adjusting scrollTop");
        }
        Err(e) => {
            tracing::debug!(container = %container, error = %e, "wheel failed, adjusting scrollTop");
        }
    }
    if let Err(e) = page.scroll_by(container, delta).await {
        tracing::debug!(container = %container, error = %e, "scrollTop adjustment failed");
    }
}

async fn notify(
    observer: &mut Option<&mut dyn ScrollObserver>,
    page: &dyn DirectoryPage,
    snapshot: &IterationSnapshot,
) {
    if let Some(observer) = observer.as_deref_mut() {
        if let Err(e) = observer.on_iteration(page, snapshot).await {
            tracing::warn!(iteration = snapshot.iteration, error = %e, "snapshot callback failed");
        }
    }
}

/// Parse `selectors` into CSS locators.
#[must_use]
pub fn css_locators(selectors: &[&str]) -> Vec<Locator> {
    selectors.iter().map(|s| Locator::css(*s)).collect()
}

#[cfg(test)]
#[path = "scroll_test.rs"]
mod tests;
