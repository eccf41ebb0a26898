//! Browser page abstraction the extraction engine drives.
//!
//! The engine never talks to a browser directly: everything goes through
//! [`DirectoryPage`], so the convergence logic runs unchanged against the
//! Chromium backend and against in-memory fakes in tests.

pub mod chromium;
mod locator;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PageError;

pub use locator::Locator;

/// Geometry of a scroll container at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerMetrics {
    pub child_count: u64,
    pub scroll_height: u64,
    pub client_height: u64,
}

impl ContainerMetrics {
    /// `true` when the content overflows the viewport of the container.
    #[must_use]
    pub fn is_scrollable(&self) -> bool {
        self.scroll_height > self.client_height
    }
}

/// Handle returned by [`DirectoryPage::subscribe_responses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// One completed network exchange observed by the page.
#[async_trait]
pub trait NetworkResponse: Send + Sync {
    fn url(&self) -> &str;
    fn status(&self) -> u16;
    fn header_value(&self, name: &str) -> Option<String>;

    /// Read the response body.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] when the body is gone or cannot be decoded.
    async fn text(&self) -> Result<String, PageError>;
}

/// Receiver of network responses while subscribed to a page.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn on_response(&self, response: &dyn NetworkResponse);
}

/// A live document the engine can inspect and drive.
///
/// Element-level operations resolve the locator to its first match.
#[async_trait]
pub trait DirectoryPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PageError>;
    async fn current_url(&self) -> Result<String, PageError>;

    /// Sleep for `ms` milliseconds of page time.
    async fn wait(&self, ms: u64);

    async fn count(&self, locator: &Locator) -> Result<usize, PageError>;
    async fn is_visible(&self, locator: &Locator) -> Result<bool, PageError>;
    async fn is_enabled(&self, locator: &Locator) -> Result<bool, PageError>;
    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), PageError>;
    async fn click(&self, locator: &Locator) -> Result<(), PageError>;

    /// Mouse-wheel gesture over the element. May fail with
    /// [`PageError::Unsupported`], in which case callers fall back to
    /// [`DirectoryPage::scroll_by`].
    async fn wheel(&self, locator: &Locator, delta_y: f64) -> Result<(), PageError>;

    /// Direct `scrollTop` adjustment.
    async fn scroll_by(&self, locator: &Locator, delta_y: f64) -> Result<(), PageError>;

    async fn measure(&self, locator: &Locator) -> Result<ContainerMetrics, PageError>;
    async fn outer_html(&self, locator: &Locator) -> Result<String, PageError>;

    /// Serialized markup of the whole document.
    async fn content(&self) -> Result<String, PageError>;

    fn subscribe_responses(&self, sink: Arc<dyn ResponseSink>) -> SubscriptionId;
    fn unsubscribe_responses(&self, id: SubscriptionId);

    /// Release the underlying tab. Failures are logged, never returned.
    async fn close(&self);
}

/// Subscription that detaches its sink when dropped.
pub struct ResponseSubscription<'a> {
    page: &'a dyn DirectoryPage,
    id: SubscriptionId,
}

impl<'a> ResponseSubscription<'a> {
    #[must_use = "dropping the subscription detaches the sink immediately"]
    pub fn attach(page: &'a dyn DirectoryPage, sink: Arc<dyn ResponseSink>) -> Self {
        let id = page.subscribe_responses(sink);
        tracing::trace!(subscription = id.0, "response sink attached");
        Self { page, id }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for ResponseSubscription<'_> {
    fn drop(&mut self) {
        self.page.unsubscribe_responses(self.id);
        tracing::trace!(subscription = self.id.0, "response sink detached");
    }
}

/// Source of pages for a target URL. The returned page is not yet navigated.
#[async_trait]
pub trait PageProvider: Send + Sync {
    async fn get_page(&self, target_url: &str) -> Result<Box<dyn DirectoryPage>, PageError>;
}
