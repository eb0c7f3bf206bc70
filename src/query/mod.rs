//! Client-side query cache
//!
//! Every logical query (transactions, metrics, ...) owns one cached value with
//! its own staleness window. A fetch serves the cached value while it is fresh
//! and goes to the network otherwise. Concurrent fetches of the same query queue
//! on the fetch lock, so the waiting callers reuse the first caller's result
//! instead of issuing their own request. Failed fetches are retried `retry`
//! times; if they still fail, the last successful value keeps being served.
//! `peek` reads the cached value without waiting, so a view can show its
//! loading state while the first fetch is in flight.

pub mod poller;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::api::paysim::{ApiError, HealthStatus, Metrics, Transaction, WebhookEndpoint, WebhookEvent};

pub use poller::spawn_refetch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Transactions,
    Metrics,
    WebhookEvents,
    WebhookEndpoints,
    Health,
}

impl QueryKey {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKey::Transactions => "transactions",
            QueryKey::Metrics => "metrics",
            QueryKey::WebhookEvents => "webhook-events",
            QueryKey::WebhookEndpoints => "webhook-endpoints",
            QueryKey::Health => "health",
        }
    }

    pub fn options(&self) -> QueryOptions {
        let defaults = QueryOptions::default();
        match self {
            QueryKey::Transactions => QueryOptions {
                stale_time: Duration::from_secs(30),
                ..defaults
            },
            QueryKey::Metrics => QueryOptions {
                stale_time: Duration::from_secs(10),
                refetch_interval: Some(Duration::from_secs(10)),
                ..defaults
            },
            QueryKey::WebhookEvents | QueryKey::WebhookEndpoints => QueryOptions {
                stale_time: Duration::from_secs(15),
                ..defaults
            },
            QueryKey::Health => QueryOptions {
                stale_time: Duration::from_secs(30),
                refetch_interval: Some(Duration::from_secs(30)),
                ..defaults
            },
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Duration,
    pub refetch_interval: Option<Duration>,
    /// Extra attempts after a failed fetch
    pub retry: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            stale_time: Duration::from_secs(5 * 60),
            refetch_interval: None,
            retry: 1,
        }
    }
}

/// What a view renders from
#[derive(Debug)]
pub enum QueryState<T> {
    Loading,
    Failed(ApiError),
    Ready(Arc<T>),
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::Failed(e) => QueryState::Failed(e.clone()),
            QueryState::Ready(data) => QueryState::Ready(Arc::clone(data)),
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data.as_ref()),
            _ => None,
        }
    }
}

/// When the cached value was fetched, and against which invalidation generation
struct Freshness {
    updated_at: Option<Instant>,
    generation: u64,
}

/// Last outcome of the query
struct Cached<T> {
    data: Option<Arc<T>>,
    last_error: Option<ApiError>,
}

/// Clears the in-flight flag even when the fetching task is aborted
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        InFlight(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Query<T> {
    key: QueryKey,
    options: QueryOptions,
    generation: AtomicU64,
    fetching: AtomicBool,
    // held across the network call, so concurrent fetches queue here
    fetch_lock: Mutex<Freshness>,
    // never held across an await; readable while a fetch is in flight
    cached: StdMutex<Cached<T>>,
}

impl<T> Query<T> {
    pub fn new(key: QueryKey) -> Self {
        Self::with_options(key, key.options())
    }

    pub fn with_options(key: QueryKey, options: QueryOptions) -> Self {
        Query {
            key,
            options,
            generation: AtomicU64::new(0),
            fetching: AtomicBool::new(false),
            fetch_lock: Mutex::new(Freshness {
                updated_at: None,
                generation: 0,
            }),
            cached: StdMutex::new(Cached {
                data: None,
                last_error: None,
            }),
        }
    }

    pub fn key(&self) -> QueryKey {
        self.key
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Mark the cached value stale; the next `fetch` goes to the network
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!(query = self.key.name(), "invalidated");
    }

    fn cached(&self) -> MutexGuard<'_, Cached<T>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, freshness: &Freshness) -> bool {
        match freshness.updated_at {
            Some(at) => {
                freshness.generation == self.generation.load(Ordering::SeqCst)
                    && at.elapsed() < self.options.stale_time
            }
            None => false,
        }
    }

    /// Whether a network fetch is running right now
    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::SeqCst)
    }

    /// Current cache state without touching the network or waiting on a fetch.
    ///
    /// `Loading` until the first value arrives, and again while a retry after a
    /// failure is in flight.
    pub fn peek(&self) -> QueryState<T> {
        let cached = self.cached();
        match (&cached.data, &cached.last_error) {
            (Some(data), _) => QueryState::Ready(Arc::clone(data)),
            (None, Some(e)) if !self.is_fetching() => QueryState::Failed(e.clone()),
            _ => QueryState::Loading,
        }
    }

    /// Whether the cached value is missing, stale or invalidated
    pub async fn is_stale(&self) -> bool {
        let freshness = self.fetch_lock.lock().await;
        !self.is_fresh(&freshness)
    }

    /// Serve fresh cached data, or fetch
    pub async fn fetch<F, Fut>(&self, fetcher: F) -> QueryState<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut freshness = self.fetch_lock.lock().await;
        if self.is_fresh(&freshness) {
            let data = self.cached().data.clone();
            if let Some(data) = data {
                debug!(query = self.key.name(), "cache hit");
                return QueryState::Ready(data);
            }
        }
        self.run(&mut freshness, fetcher).await
    }

    /// Fetch regardless of staleness
    pub async fn refetch<F, Fut>(&self, fetcher: F) -> QueryState<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut freshness = self.fetch_lock.lock().await;
        self.run(&mut freshness, fetcher).await
    }

    async fn run<F, Fut>(&self, freshness: &mut Freshness, fetcher: F) -> QueryState<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        // Read before the request so an invalidation during it still counts
        let generation = self.generation.load(Ordering::SeqCst);
        let _in_flight = InFlight::start(&self.fetching);
        let mut attempt = 0;

        loop {
            match fetcher().await {
                Ok(value) => {
                    freshness.updated_at = Some(Instant::now());
                    freshness.generation = generation;
                    debug!(query = self.key.name(), "fetched");
                    return QueryState::Ready(self.store_value(value));
                }
                Err(e) if attempt < self.options.retry => {
                    attempt += 1;
                    warn!(
                        query = self.key.name(),
                        status = ?e.status(),
                        "fetch failed, retrying ({}/{}): {}",
                        attempt,
                        self.options.retry,
                        e
                    );
                }
                Err(e) => {
                    error!(query = self.key.name(), status = ?e.status(), "fetch failed: {}", e);
                    return self.store_error(e);
                }
            }
        }
    }

    fn store_value(&self, value: T) -> Arc<T> {
        let data = Arc::new(value);
        let mut cached = self.cached();
        cached.data = Some(Arc::clone(&data));
        cached.last_error = None;
        data
    }

    /// Record a failure; the last good value, if any, keeps being served
    fn store_error(&self, e: ApiError) -> QueryState<T> {
        let mut cached = self.cached();
        cached.last_error = Some(e.clone());
        match &cached.data {
            Some(data) => QueryState::Ready(Arc::clone(data)),
            None => QueryState::Failed(e),
        }
    }
}

/// All queries the console uses
pub struct QueryClient {
    pub transactions: Query<Vec<Transaction>>,
    pub metrics: Query<Metrics>,
    pub webhook_events: Query<Vec<WebhookEvent>>,
    pub webhook_endpoints: Query<Vec<WebhookEndpoint>>,
    pub health: Query<HealthStatus>,
}

impl QueryClient {
    pub fn new() -> Self {
        QueryClient {
            transactions: Query::new(QueryKey::Transactions),
            metrics: Query::new(QueryKey::Metrics),
            webhook_events: Query::new(QueryKey::WebhookEvents),
            webhook_endpoints: Query::new(QueryKey::WebhookEndpoints),
            health: Query::new(QueryKey::Health),
        }
    }

    pub fn invalidate(&self, key: QueryKey) {
        match key {
            QueryKey::Transactions => self.transactions.invalidate(),
            QueryKey::Metrics => self.metrics.invalidate(),
            QueryKey::WebhookEvents => self.webhook_events.invalidate(),
            QueryKey::WebhookEndpoints => self.webhook_endpoints.invalidate(),
            QueryKey::Health => self.health.invalidate(),
        }
    }

    /// Whether the query has nothing to show yet
    pub fn is_loading(&self, key: QueryKey) -> bool {
        match key {
            QueryKey::Transactions => self.transactions.peek().is_loading(),
            QueryKey::Metrics => self.metrics.peek().is_loading(),
            QueryKey::WebhookEvents => self.webhook_events.peek().is_loading(),
            QueryKey::WebhookEndpoints => self.webhook_endpoints.peek().is_loading(),
            QueryKey::Health => self.health.peek().is_loading(),
        }
    }

    pub async fn is_stale(&self, key: QueryKey) -> bool {
        match key {
            QueryKey::Transactions => self.transactions.is_stale().await,
            QueryKey::Metrics => self.metrics.is_stale().await,
            QueryKey::WebhookEvents => self.webhook_events.is_stale().await,
            QueryKey::WebhookEndpoints => self.webhook_endpoints.is_stale().await,
            QueryKey::Health => self.health.is_stale().await,
        }
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}
