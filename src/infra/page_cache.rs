//! Whole-response cache for the rendered index page.
//!
//! The cache holds at most one entry (the index response) and serves it until
//! a fixed TTL elapses. Creating a post does not invalidate the slot: a new
//! post becomes visible on the index only once the TTL expires, which trades
//! freshness inside the window for never serving a partial page. Concurrent
//! misses may both recompute and both write; the content is deterministic for
//! the same window, so last write wins.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use metrics::counter;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Clock consulted for TTL checks; tests substitute a manual clock.
pub trait CacheClock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl CacheClock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock advanced by hand.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().expect("manual clock offset lock");
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheClock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().expect("manual clock offset lock")
    }
}

struct Entry {
    stored_at: Instant,
    page: CachedPage,
}

/// Single-slot TTL cache for the rendered index response.
pub struct PageCache {
    slot: RwLock<Option<Entry>>,
    ttl: Duration,
    clock: Arc<dyn CacheClock>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn CacheClock>) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
            clock,
        }
    }

    /// The cached response when present and unexpired.
    pub async fn get(&self) -> Option<Response> {
        let guard = self.slot.read().await;
        let entry = guard.as_ref()?;
        if self.clock.now().duration_since(entry.stored_at) >= self.ttl {
            return None;
        }
        Some(entry.page.clone().into_response())
    }

    /// Store a buffered page and reset the expiry window.
    pub async fn put(&self, page: CachedPage) {
        let entry = Entry {
            stored_at: self.clock.now(),
            page,
        };
        *self.slot.write().await = Some(entry);
    }

    /// Buffer `response` into the slot, handing back an equivalent response.
    pub async fn store_response(
        &self,
        response: Response,
    ) -> Result<Response, (Response, CacheStoreError)> {
        match buffer_response(response).await {
            Ok((rebuilt, page)) => {
                self.put(page).await;
                Ok(rebuilt)
            }
            Err((rebuilt, error)) => Err((rebuilt, error)),
        }
    }

    /// Explicit clear, used by administrative and test flows.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
        counter!("brusio_page_cache_invalidate_total").increment(1);
    }
}

/// Buffered response bytes stored in the cache slot.
#[derive(Clone)]
pub struct CachedPage {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedPage {
    pub fn new(status: StatusCode, headers: &axum::http::HeaderMap, body: Bytes) -> Self {
        let mut stored_headers = Vec::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            stored_headers.push((name.clone(), value.clone()));
        }

        Self {
            status,
            headers: stored_headers,
            body,
        }
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Only complete successful pages are worth keeping; cookie-bearing responses
/// would replay one visitor's session to everyone.
pub fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedPage), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let page = CachedPage::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, page))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}

/// Middleware applied to the index route only: serve the cached page when
/// fresh, otherwise run the handler and keep its rendering.
pub async fn page_cache_layer(
    State(cache): State<Arc<PageCache>>,
    request: Request,
    next: Next,
) -> Response {
    // The slot holds exactly one entry: the bare index page. Paginated reads
    // carry a query string and bypass the cache entirely.
    if request.method() != Method::GET || request.uri().query().is_some() {
        return next.run(request).await;
    }

    if let Some(hit) = cache.get().await {
        counter!("brusio_page_cache_hit_total").increment(1);
        debug!(target = "brusio::page_cache", outcome = "hit", "serving cached index page");
        return hit;
    }

    counter!("brusio_page_cache_miss_total").increment(1);
    let response = next.run(request).await;

    if !should_store_response(&response) {
        return response;
    }

    match cache.store_response(response).await {
        Ok(rebuilt) => {
            counter!("brusio_page_cache_store_total").increment(1);
            rebuilt
        }
        Err((rebuilt, error)) => {
            warn!(
                target = "brusio::page_cache",
                error = %error,
                "failed to buffer index response for caching"
            );
            rebuilt
        }
    }
}
