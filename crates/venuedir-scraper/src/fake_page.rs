//! In-memory [`DirectoryPage`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::PageError;
use crate::page::{
    ContainerMetrics, DirectoryPage, Locator, NetworkResponse, ResponseSink, SubscriptionId,
};

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub count: usize,
    pub visible: bool,
    pub enabled: bool,
    pub html: String,
}

impl FakeElement {
    pub fn visible() -> Self {
        Self {
            count: 1,
            visible: true,
            enabled: true,
            html: String::new(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::visible()
        }
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FakeResponse {
    pub fn new(url: &str, status: u16, body: &str) -> Self {
        Self {
            url: url.to_string(),
            status,
            body: body.to_string(),
        }
    }
}

#[async_trait]
impl NetworkResponse for FakeResponse {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn header_value(&self, _name: &str) -> Option<String> {
        None
    }

    async fn text(&self) -> Result<String, PageError> {
        Ok(self.body.clone())
    }
}

/// What clicking an element does to the fake document.
#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// Make these elements present and visible.
    Reveal(Vec<(Locator, FakeElement)>),
    /// Change the current URL.
    SetUrl(String),
}

#[derive(Default)]
struct FakeState {
    url: String,
    elements: HashMap<Locator, FakeElement>,
    click_effects: HashMap<Locator, ClickEffect>,
    metrics: Vec<ContainerMetrics>,
    metrics_index: usize,
    responses_per_wait: VecDeque<Vec<FakeResponse>>,
    content: String,
    wheel_supported: bool,
    navigations: Vec<String>,
    clicks: Vec<Locator>,
    waits: Vec<u64>,
    wheels: usize,
    scroll_bys: usize,
    failing: Vec<Locator>,
    real_waits: bool,
}

pub struct FakePage {
    state: Mutex<FakeState>,
    sinks: Mutex<Vec<(SubscriptionId, Arc<dyn ResponseSink>)>>,
    next_id: AtomicU64,
    unsubscribed: Mutex<Vec<SubscriptionId>>,
    closed: Arc<AtomicBool>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                url: "about:blank".to_string(),
                wheel_supported: true,
                ..FakeState::default()
            }),
            sinks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            unsubscribed: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_element(self, locator: Locator, element: FakeElement) -> Self {
        self.state.lock().unwrap().elements.insert(locator, element);
        self
    }

    /// Container readings returned by successive `measure` calls; the last
    /// one repeats.
    pub fn with_metrics(self, counts: &[u64], heights: &[u64], client_height: u64) -> Self {
        let metrics = counts
            .iter()
            .enumerate()
            .map(|(i, &child_count)| ContainerMetrics {
                child_count,
                scroll_height: heights
                    .get(i)
                    .or(heights.last())
                    .copied()
                    .unwrap_or_default(),
                client_height,
            })
            .collect();
        self.state.lock().unwrap().metrics = metrics;
        self
    }

    /// Responses delivered to subscribers during the next `wait` call; each
    /// call queues one more batch.
    pub fn with_responses_on_wait(self, batch: Vec<FakeResponse>) -> Self {
        self.state.lock().unwrap().responses_per_wait.push_back(batch);
        self
    }

    pub fn with_click_effect(self, locator: Locator, effect: ClickEffect) -> Self {
        self.state.lock().unwrap().click_effects.insert(locator, effect);
        self
    }

    pub fn with_content(self, html: &str) -> Self {
        self.state.lock().unwrap().content = html.to_string();
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.state.lock().unwrap().url = url.to_string();
        self
    }

    pub fn without_wheel(self) -> Self {
        self.state.lock().unwrap().wheel_supported = false;
        self
    }

    /// Make `wait` actually sleep, so deadlines around the page can fire.
    pub fn with_real_waits(self) -> Self {
        self.state.lock().unwrap().real_waits = true;
        self
    }

    /// Every page operation on `locator` fails with a script error.
    pub fn failing_on(self, locator: Locator) -> Self {
        self.state.lock().unwrap().failing.push(locator);
        self
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn waits(&self) -> Vec<u64> {
        self.state.lock().unwrap().waits.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn wheel_count(&self) -> usize {
        self.state.lock().unwrap().wheels
    }

    pub fn scroll_by_count(&self) -> usize {
        self.state.lock().unwrap().scroll_bys
    }

    pub fn active_subscriptions(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    pub fn unsubscribed(&self) -> Vec<SubscriptionId> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shared close flag that outlives the page once it is boxed away.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn element(&self, locator: &Locator) -> Result<FakeElement, PageError> {
        let state = self.state.lock().unwrap();
        if state.failing.contains(locator) {
            return Err(PageError::Script(format!("scripted failure for {locator}")));
        }
        state
            .elements
            .get(locator)
            .filter(|e| e.count > 0)
            .cloned()
            .ok_or_else(|| PageError::NotFound {
                locator: locator.to_string(),
            })
    }
}

#[async_trait]
impl DirectoryPage for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if state.url == "about:blank" {
            state.url = url.to_string();
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn wait(&self, ms: u64) {
        let (batch, real) = {
            let mut state = self.state.lock().unwrap();
            state.waits.push(ms);
            let batch = state.responses_per_wait.pop_front().unwrap_or_default();
            (batch, state.real_waits)
        };
        if real {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
        let sinks: Vec<Arc<dyn ResponseSink>> = self
            .sinks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, sink)| Arc::clone(sink))
            .collect();
        for response in &batch {
            for sink in &sinks {
                sink.on_response(response).await;
            }
        }
    }

    async fn count(&self, locator: &Locator) -> Result<usize, PageError> {
        match self.element(locator) {
            Ok(element) => Ok(element.count),
            Err(PageError::NotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, PageError> {
        Ok(self.element(locator)?.visible)
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool, PageError> {
        Ok(self.element(locator)?.enabled)
    }

    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), PageError> {
        self.element(locator).map(|_| ())
    }

    async fn click(&self, locator: &Locator) -> Result<(), PageError> {
        self.element(locator)?;
        let mut state = self.state.lock().unwrap();
        state.clicks.push(locator.clone());
        match state.click_effects.get(locator).cloned() {
            Some(ClickEffect::Reveal(revealed)) => state.elements.extend(revealed),
            Some(ClickEffect::SetUrl(url)) => state.url = url,
            None => {}
        }
        Ok(())
    }

    async fn wheel(&self, locator: &Locator, _delta_y: f64) -> Result<(), PageError> {
        self.element(locator)?;
        let mut state = self.state.lock().unwrap();
        if !state.wheel_supported {
            return Err(PageError::Unsupported("mouse wheel"));
        }
        state.wheels += 1;
        Ok(())
    }

    async fn scroll_by(&self, locator: &Locator, _delta_y: f64) -> Result<(), PageError> {
        self.element(locator)?;
        self.state.lock().unwrap().scroll_bys += 1;
        Ok(())
    }

    async fn measure(&self, locator: &Locator) -> Result<ContainerMetrics, PageError> {
        self.element(locator)?;
        let mut state = self.state.lock().unwrap();
        let Some(last) = state.metrics.last().copied() else {
            return Ok(ContainerMetrics::default());
        };
        let reading = state.metrics.get(state.metrics_index).copied().unwrap_or(last);
        state.metrics_index += 1;
        Ok(reading)
    }

    async fn outer_html(&self, locator: &Locator) -> Result<String, PageError> {
        Ok(self.element(locator)?.html)
    }

    async fn content(&self) -> Result<String, PageError> {
        Ok(self.state.lock().unwrap().content.clone())
    }

    fn subscribe_responses(&self, sink: Arc<dyn ResponseSink>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks.lock().unwrap().push((id, sink));
        id
    }

    fn unsubscribe_responses(&self, id: SubscriptionId) {
        self.sinks.lock().unwrap().retain(|(existing, _)| *existing != id);
        self.unsubscribed.lock().unwrap().push(id);
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
