//! [`DirectoryPage`] backed by a real Chromium instance over CDP.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::task::JoinHandle;

use super::{
    ContainerMetrics, DirectoryPage, Locator, NetworkResponse, PageProvider, ResponseSink,
    SubscriptionId,
};
use crate::error::PageError;

const BINARY_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const MACOS_CHROME: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";

/// Locate a Chromium binary: the explicit path if it exists, then `PATH`,
/// then the default macOS install location.
#[must_use]
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "configured chromium path does not exist");
    }

    for name in BINARY_NAMES {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from(MACOS_CHROME);
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch settings for [`ChromiumSession`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// A launched browser that hands out pages.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    /// Launch Chromium.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Browser`] if no binary is found or it fails to
    /// start.
    pub async fn launch(options: &BrowserOptions) -> Result<Self, PageError> {
        let chrome_path = find_chromium(options.chromium_path.as_deref()).ok_or_else(|| {
            PageError::Browser("chromium not found; set VENUEDIR_CHROMIUM_PATH".to_string())
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--lang=en-US")
            .request_timeout(options.navigation_timeout);
        builder = if options.headless {
            builder.headless_mode(HeadlessMode::New)
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| PageError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PageError::Browser(format!("failed to launch chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "cdp handler error");
                }
            }
        });

        tracing::info!(
            path = %chrome_path.display(),
            headless = options.headless,
            "chromium launched"
        );

        Ok(Self {
            browser,
            handler,
            navigation_timeout: options.navigation_timeout,
        })
    }

    /// Close the browser and stop the CDP handler.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }
        self.handler.abort();
    }
}

#[async_trait]
impl PageProvider for ChromiumSession {
    async fn get_page(&self, target_url: &str) -> Result<Box<dyn DirectoryPage>, PageError> {
        tracing::debug!(target_url, "opening page");
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| PageError::Browser(format!("failed to create page: {e}")))?;
        let page = ChromiumPage::attach(page, self.navigation_timeout).await?;
        Ok(Box::new(page))
    }
}

type SinkList = Arc<Mutex<Vec<(SubscriptionId, Arc<dyn ResponseSink>)>>>;

/// One Chromium tab with network observation enabled.
pub struct ChromiumPage {
    page: Page,
    sinks: SinkList,
    next_subscription: AtomicU64,
    network_task: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumPage {
    /// Enable network events on `page` and start dispatching completed
    /// responses to subscribed sinks.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Browser`] if the network domain cannot be enabled.
    pub async fn attach(page: Page, navigation_timeout: Duration) -> Result<Self, PageError> {
        page.execute(EnableParams::default())
            .await
            .map_err(|e| PageError::Browser(format!("failed to enable network events: {e}")))?;

        let received = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_error)?;
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(browser_error)?;
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(browser_error)?;

        let sinks: SinkList = Arc::new(Mutex::new(Vec::new()));
        let events = futures::stream::select(
            received.map(NetworkEvent::Received),
            futures::stream::select(
                finished.map(|e| NetworkEvent::Finished(e.request_id.clone())),
                failed.map(|e| NetworkEvent::Failed(e.request_id.clone())),
            ),
        );
        let network_task = tokio::spawn(dispatch_responses(
            page.clone(),
            Box::pin(events),
            Arc::clone(&sinks),
        ));

        Ok(Self {
            page,
            sinks,
            next_subscription: AtomicU64::new(1),
            network_task,
            navigation_timeout,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, PageError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| PageError::Script(format!("unexpected script result: {e}")))
    }

    /// Run `body` with `el` bound to the first match; a missing element is
    /// [`PageError::NotFound`].
    async fn with_element<T: DeserializeOwned>(
        &self,
        locator: &Locator,
        body: &str,
    ) -> Result<T, PageError> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return {{ found: false }}; \
             return {{ found: true, value: (() => {{ {body} }})() }}; }})()",
            locator.to_js_first("document")
        );
        let outcome: ElementOutcome<T> = self.eval(script).await?;
        match outcome {
            ElementOutcome {
                found: true,
                value: Some(value),
            } => Ok(value),
            ElementOutcome { found: true, .. } => Err(PageError::Script(format!(
                "script returned no value for {locator}"
            ))),
            ElementOutcome { found: false, .. } => Err(PageError::NotFound {
                locator: locator.to_string(),
            }),
        }
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.network_task.abort();
    }
}

#[derive(Debug, Deserialize)]
struct ElementOutcome<T> {
    found: bool,
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

#[async_trait]
impl DirectoryPage for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let timeout_ms = u64::try_from(self.navigation_timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {
                if let Err(e) = self.page.wait_for_navigation().await {
                    tracing::debug!(url, error = %e, "wait for navigation failed");
                }
                Ok(())
            }
            Ok(Err(e)) => Err(PageError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(PageError::Timeout {
                what: format!("navigation to {url}"),
                timeout_ms,
            }),
        }
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let url = self.page.url().await.map_err(browser_error)?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn wait(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn count(&self, locator: &Locator) -> Result<usize, PageError> {
        self.eval(format!("{}.length", locator.to_js_all("document")))
            .await
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, PageError> {
        self.with_element(
            locator,
            "const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';",
        )
        .await
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool, PageError> {
        self.with_element(
            locator,
            "return !el.disabled && el.getAttribute('aria-disabled') !== 'true';",
        )
        .await
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), PageError> {
        self.with_element::<bool>(
            locator,
            "el.scrollIntoView({ block: 'center', inline: 'nearest' }); return true;",
        )
        .await
        .map(|_| ())
    }

    async fn click(&self, locator: &Locator) -> Result<(), PageError> {
        self.with_element::<bool>(locator, "el.click(); return true;")
            .await
            .map(|_| ())
    }

    async fn wheel(&self, locator: &Locator, delta_y: f64) -> Result<(), PageError> {
        let centre: Point = self
            .with_element(
                locator,
                "const r = el.getBoundingClientRect(); \
                 return { x: r.left + r.width / 2, y: r.top + r.height / 2 };",
            )
            .await?;

        let mut params =
            DispatchMouseEventParams::new(DispatchMouseEventType::MouseWheel, centre.x, centre.y);
        params.delta_x = Some(0.0);
        params.delta_y = Some(delta_y);
        self.page
            .execute(params)
            .await
            .map_err(|e| PageError::Browser(format!("mouse wheel dispatch failed: {e}")))?;
        Ok(())
    }

    async fn scroll_by(&self, locator: &Locator, delta_y: f64) -> Result<(), PageError> {
        self.with_element::<bool>(
            locator,
            &format!("el.scrollTop = el.scrollTop + ({delta_y}); return true;"),
        )
        .await
        .map(|_| ())
    }

    async fn measure(&self, locator: &Locator) -> Result<ContainerMetrics, PageError> {
        self.with_element(
            locator,
            "return { child_count: el.childElementCount, \
             scroll_height: Math.round(el.scrollHeight), \
             client_height: Math.round(el.clientHeight) };",
        )
        .await
    }

    async fn outer_html(&self, locator: &Locator) -> Result<String, PageError> {
        self.with_element(locator, "return el.outerHTML;").await
    }

    async fn content(&self) -> Result<String, PageError> {
        self.page.content().await.map_err(browser_error)
    }

    fn subscribe_responses(&self, sink: Arc<dyn ResponseSink>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, sink));
        id
    }

    fn unsubscribe_responses(&self, id: SubscriptionId) {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    async fn close(&self) {
        self.network_task.abort();
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!(error = %e, "page close failed");
        }
    }
}

enum NetworkEvent {
    Received(Arc<EventResponseReceived>),
    Finished(RequestId),
    Failed(RequestId),
}

struct PendingResponse {
    url: String,
    status: u16,
    headers: serde_json::Value,
}

/// Pair `responseReceived` with `loadingFinished` so bodies are complete
/// before sinks see them.
async fn dispatch_responses(
    page: Page,
    mut events: impl futures::Stream<Item = NetworkEvent> + Unpin,
    sinks: SinkList,
) {
    let mut pending: HashMap<RequestId, PendingResponse> = HashMap::new();

    while let Some(event) = events.next().await {
        match event {
            NetworkEvent::Received(event) => {
                let response = &event.response;
                pending.insert(
                    event.request_id.clone(),
                    PendingResponse {
                        url: response.url.clone(),
                        status: u16::try_from(response.status).unwrap_or(0),
                        headers: response.headers.inner().clone(),
                    },
                );
            }
            NetworkEvent::Failed(request_id) => {
                pending.remove(&request_id);
            }
            NetworkEvent::Finished(request_id) => {
                let Some(done) = pending.remove(&request_id) else {
                    continue;
                };
                let current: Vec<Arc<dyn ResponseSink>> = sinks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .map(|(_, sink)| Arc::clone(sink))
                    .collect();
                if current.is_empty() {
                    continue;
                }
                let response = ChromiumResponse {
                    page: page.clone(),
                    request_id,
                    url: done.url,
                    status: done.status,
                    headers: done.headers,
                };
                for sink in current {
                    sink.on_response(&response).await;
                }
            }
        }
    }
}

struct ChromiumResponse {
    page: Page,
    request_id: RequestId,
    url: String,
    status: u16,
    headers: serde_json::Value,
}

#[async_trait]
impl NetworkResponse for ChromiumResponse {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn header_value(&self, name: &str) -> Option<String> {
        self.headers.as_object()?.iter().find_map(|(key, value)| {
            key.eq_ignore_ascii_case(name)
                .then(|| value.as_str().map(str::to_string))
                .flatten()
        })
    }

    async fn text(&self) -> Result<String, PageError> {
        let body = self
            .page
            .execute(GetResponseBodyParams::new(self.request_id.clone()))
            .await
            .map_err(|e| PageError::Browser(format!("failed to read response body: {e}")))?;
        if body.base64_encoded {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(body.body.as_bytes())
                .map_err(|e| PageError::Browser(format!("invalid base64 body: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| PageError::Browser(format!("response body is not utf-8: {e}")))
        } else {
            Ok(body.body.clone())
        }
    }
}

fn browser_error(e: chromiumoxide::error::CdpError) -> PageError {
    PageError::Browser(e.to_string())
}
