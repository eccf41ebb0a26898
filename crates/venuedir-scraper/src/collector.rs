//! Passive accumulation of internal API payloads seen while scrolling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::page::{NetworkResponse, ResponseSink};
use crate::payload;
use crate::types::DirectoryCard;

pub const DEFAULT_PAYLOAD_MARKER: &str = "pb=";
pub const DEFAULT_SENTINEL_MIN_BYTES: usize = 200;

/// Kind of end-of-data signal observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Sentinel {
    /// A payload request answered with a body under the byte threshold.
    /// Trusted only once the DOM has also stopped growing.
    ShortBody,
    /// A payload request answered `204 No Content`.
    NoContent,
}

/// Buffers payload bodies and tracks sentinel replies.
#[derive(Debug)]
pub struct ResponseCollector {
    marker: String,
    sentinel_min_bytes: usize,
    payloads: Mutex<Vec<String>>,
    sentinel: Mutex<Option<Sentinel>>,
    total_seen: AtomicUsize,
    total_stored: AtomicUsize,
}

impl Default for ResponseCollector {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_MARKER, DEFAULT_SENTINEL_MIN_BYTES)
    }
}

impl ResponseCollector {
    #[must_use]
    pub fn new(marker: impl Into<String>, sentinel_min_bytes: usize) -> Self {
        Self {
            marker: marker.into(),
            sentinel_min_bytes,
            payloads: Mutex::new(Vec::new()),
            sentinel: Mutex::new(None),
            total_seen: AtomicUsize::new(0),
            total_stored: AtomicUsize::new(0),
        }
    }

    /// Strongest sentinel observed so far.
    #[must_use]
    pub fn sentinel(&self) -> Option<Sentinel> {
        *self.sentinel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn total_seen(&self) -> usize {
        self.total_seen.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_stored(&self) -> usize {
        self.total_stored.load(Ordering::Relaxed)
    }

    /// Copy of the buffered bodies in arrival order.
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cards from every buffered payload. Buffers are left in place, so
    /// repeated calls return the same list.
    #[must_use]
    pub fn extract_cards(&self) -> Vec<DirectoryCard> {
        payload::extract_cards(self.payloads().as_slice())
    }

    /// Filter and record one response.
    pub async fn observe(&self, response: &dyn NetworkResponse) {
        self.total_seen.fetch_add(1, Ordering::Relaxed);

        let url = response.url();
        if !url.contains(self.marker.as_str()) {
            return;
        }

        let status = response.status();
        match status {
            204 => {
                tracing::debug!(url, "payload request returned no content");
                self.record_sentinel(Sentinel::NoContent);
                return;
            }
            200 => {}
            _ => {
                tracing::debug!(url, status, "ignoring payload response status");
                return;
            }
        }

        // Content-Length counts encoded bytes; only trust it for identity bodies.
        let encoded = response
            .header_value("content-encoding")
            .is_some_and(|v| !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case("identity"));
        let declared_len = response
            .header_value("content-length")
            .filter(|_| !encoded)
            .and_then(|v| v.trim().parse::<usize>().ok());
        if declared_len.is_some_and(|len| len < self.sentinel_min_bytes) {
            tracing::debug!(url, declared_len, "short payload treated as sentinel");
            self.record_sentinel(Sentinel::ShortBody);
            return;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(url, error = %e, "failed to read payload body");
                return;
            }
        };
        if body.len() < self.sentinel_min_bytes {
            tracing::debug!(url, bytes = body.len(), "short payload treated as sentinel");
            self.record_sentinel(Sentinel::ShortBody);
            return;
        }

        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(body);
        let stored = self.total_stored.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(url, stored, "payload buffered");
    }

    fn record_sentinel(&self, kind: Sentinel) {
        let mut current = self.sentinel.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_none_or(|existing| existing < kind) {
            *current = Some(kind);
        }
    }
}

#[async_trait]
impl ResponseSink for ResponseCollector {
    async fn on_response(&self, response: &dyn NetworkResponse) {
        self.observe(response).await;
    }
}
