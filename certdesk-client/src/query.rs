//! Query and mutation adapters
//!
//! Reads go through a keyed cache with a staleness window and a small retry
//! policy. Writes never retry and invalidate cached reads when they succeed.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{BodyPagination, ListEnvelope};

use crate::client::ApiClient;
use crate::endpoint;
use crate::error::{ClientError, ClientResult, ErrorKind};
use crate::normalize::NormalizedResponse;
use crate::request::{RequestData, RequestOptions};

/// Default freshness window for cached reads
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(10 * 60);

/// Unused entries older than this are dropped by [`QueryClient::collect_garbage`]
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(30 * 60);

/// Cache identity of a read: `[endpoint, slug?, sorted-params-json?]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(endpoint: &str, slug: Option<&str>, params: &BTreeMap<String, String>) -> Self {
        let mut parts = vec![endpoint.to_string()];
        if let Some(slug) = slug.filter(|s| !s.is_empty()) {
            parts.push(slug.to_string());
        }
        if !params.is_empty() {
            // BTreeMap serializes with sorted keys
            parts.push(serde_json::to_string(params).unwrap_or_default());
        }
        Self(parts)
    }

    /// Key naming every query of an endpoint
    pub fn endpoint(endpoint: &str) -> Self {
        Self(vec![endpoint.to_string()])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

/// Observable state of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error(ErrorKind),
}

/// Retry policy for reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub const NEVER: Self = Self {
        max_retries: 0,
        delay: Duration::ZERO,
    };

    /// Whether a failure after `failures` earlier failures is retried
    ///
    /// 4xx answers are final, as are errors raised before anything was sent
    /// (unknown endpoint, configuration). Everything else, including an
    /// undecodable body, gets another attempt.
    pub fn should_retry(&self, error: &ClientError, failures: u32) -> bool {
        if failures >= self.max_retries {
            return false;
        }
        match error.kind() {
            ErrorKind::Network => true,
            ErrorKind::Server | ErrorKind::Validation | ErrorKind::Auth | ErrorKind::Decode => {
                !matches!(error.status(), Some(400..=499))
            }
            ErrorKind::UnknownEndpoint | ErrorKind::Config => false,
        }
    }
}

/// Read options
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub params: BTreeMap<String, String>,
    pub slug: Option<String>,
    pub show_success_notification: bool,
    pub stale_time: Duration,
    pub retry: RetryPolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            params: BTreeMap::new(),
            slug: None,
            show_success_notification: false,
            stale_time: DEFAULT_STALE_TIME,
            retry: RetryPolicy::default(),
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn key(&self, endpoint: &str) -> QueryKey {
        QueryKey::new(endpoint, self.slug.as_deref(), &self.params)
    }

    fn to_request(&self) -> RequestOptions {
        RequestOptions {
            params: self.params.clone(),
            slug: self.slug.clone(),
            show_success_notification: self.show_success_notification,
            ..RequestOptions::default()
        }
    }
}

/// Which cached reads a successful write makes stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub key: QueryKey,
    /// Only the key itself, not every key under it
    pub exact: bool,
}

impl Invalidation {
    /// Every query of `endpoint`, whatever its slug or params
    pub fn endpoint(endpoint: &str) -> Self {
        Self {
            key: QueryKey::endpoint(endpoint),
            exact: false,
        }
    }

    pub fn exact(key: QueryKey) -> Self {
        Self { key, exact: true }
    }

    fn matches(&self, key: &QueryKey) -> bool {
        if self.exact { *key == self.key } else { key.starts_with(&self.key) }
    }
}

/// Write options
#[derive(Debug, Clone)]
pub struct MutationOptions {
    pub use_form_data: bool,
    pub show_success_notification: bool,
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub invalidate: Vec<Invalidation>,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            use_form_data: true,
            show_success_notification: true,
            method: None,
            headers: Vec::new(),
            invalidate: Vec::new(),
        }
    }
}

impl MutationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self) -> Self {
        self.use_form_data = false;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.show_success_notification = false;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn invalidate(mut self, invalidation: Invalidation) -> Self {
        self.invalidate.push(invalidation);
        self
    }
}

/// Per-call write input
#[derive(Debug, Clone, Default)]
pub struct MutationInput {
    pub slug: Option<String>,
    pub data: Option<RequestData>,
}

impl MutationInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    status: QueryStatus,
    response: Option<NormalizedResponse>,
    fetched_at: Option<Instant>,
    stale: bool,
}

impl CacheEntry {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            response: None,
            fetched_at: None,
            stale: false,
        }
    }

    fn fresh_response(&self, stale_time: Duration) -> Option<&NormalizedResponse> {
        let fetched_at = self.fetched_at?;
        if self.stale || fetched_at.elapsed() >= stale_time {
            return None;
        }
        self.response.as_ref()
    }
}

/// Cached reads and cache-invalidating writes over an [`ApiClient`]
#[derive(Debug, Clone)]
pub struct QueryClient {
    api: ApiClient,
    cache: std::sync::Arc<DashMap<QueryKey, CacheEntry>>,
}

impl QueryClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: Default::default(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        self.cache
            .get(key)
            .map(|entry| entry.status)
            .unwrap_or(QueryStatus::Idle)
    }

    /// Last successful response for `key`, fresh or not
    pub fn cached(&self, key: &QueryKey) -> Option<NormalizedResponse> {
        self.cache.get(key).and_then(|entry| entry.response.clone())
    }

    /// Read `endpoint`, serving fresh cache entries without a request
    pub async fn fetch(&self, endpoint: &str, options: &QueryOptions) -> ClientResult<NormalizedResponse> {
        endpoint::resolve(endpoint)?;
        let key = options.key(endpoint);

        if let Some(entry) = self.cache.get(&key)
            && let Some(response) = entry.fresh_response(options.stale_time)
        {
            tracing::trace!(key = ?key.parts(), "Query served from cache");
            return Ok(response.clone());
        }

        self.set_status(&key, QueryStatus::Loading);
        let result = self.fetch_with_retry(endpoint, options).await;

        let mut entry = self.cache.entry(key).or_insert_with(CacheEntry::idle);
        match &result {
            Ok(response) => {
                entry.status = QueryStatus::Success;
                entry.response = Some(response.clone());
                entry.fetched_at = Some(Instant::now());
                entry.stale = false;
            }
            Err(e) => entry.status = QueryStatus::Error(e.kind()),
        }
        result
    }

    async fn fetch_with_retry(&self, endpoint: &str, options: &QueryOptions) -> ClientResult<NormalizedResponse> {
        let mut failures = 0;
        loop {
            match self.api.request(endpoint, options.to_request()).await {
                Ok(response) => return Ok(response),
                Err(e) if options.retry.should_retry(&e, failures) => {
                    failures += 1;
                    tracing::warn!(endpoint = %endpoint, attempt = failures, error = %e, "Retrying query");
                    tokio::time::sleep(options.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read a list endpoint into `{data, pagination, message, status}`
    ///
    /// A body without `data` reads as an empty list.
    pub async fn fetch_list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &QueryOptions,
    ) -> ClientResult<ListEnvelope<T>> {
        let response = self.fetch(endpoint, options).await?;
        select_list(&response.data)
    }

    /// Run a write; on success the configured queries become stale
    pub async fn mutate(
        &self,
        endpoint: &str,
        options: &MutationOptions,
        input: MutationInput,
    ) -> ClientResult<NormalizedResponse> {
        let registered = endpoint::resolve(endpoint)?;
        let method = options.method.clone().unwrap_or_else(|| registered.method.clone());
        let is_delete = method == Method::DELETE;

        let request = RequestOptions {
            params: BTreeMap::new(),
            slug: input.slug,
            method: Some(method),
            headers: options.headers.clone(),
            data: if is_delete { None } else { input.data },
            use_form_data: !is_delete && options.use_form_data,
            show_success_notification: options.show_success_notification,
        };

        let response = self.api.request(endpoint, request).await?;
        for invalidation in &options.invalidate {
            self.invalidate(invalidation);
        }
        Ok(response)
    }

    /// Mark matching cached reads stale; returns how many were marked
    pub fn invalidate(&self, invalidation: &Invalidation) -> usize {
        let mut marked = 0;
        for mut entry in self.cache.iter_mut() {
            if invalidation.matches(entry.key()) {
                entry.stale = true;
                marked += 1;
            }
        }
        tracing::debug!(key = ?invalidation.key.parts(), exact = invalidation.exact, marked, "Queries invalidated");
        marked
    }

    /// Drop entries not refreshed within `gc_time`
    pub fn collect_garbage(&self, gc_time: Duration) {
        self.cache.retain(|_, entry| match entry.fetched_at {
            Some(at) => at.elapsed() < gc_time,
            None => !matches!(entry.status, QueryStatus::Error(_) | QueryStatus::Idle),
        });
    }

    /// Forget every cached read
    pub fn clear(&self) {
        self.cache.clear();
    }

    fn set_status(&self, key: &QueryKey, status: QueryStatus) {
        self.cache
            .entry(key.clone())
            .or_insert_with(CacheEntry::idle)
            .status = status;
    }
}

/// `{data: body.data or [], pagination, message, status}` of a list body
pub fn select_list<T: DeserializeOwned>(body: &Value) -> ClientResult<ListEnvelope<T>> {
    let field = |name: &str| body.get(name).filter(|v| !v.is_null());

    let data = match field("data") {
        Some(data) => serde_json::from_value(data.clone())?,
        None => Vec::new(),
    };
    let pagination = match field("pagination") {
        Some(pagination) => Some(serde_json::from_value::<BodyPagination>(pagination.clone())?),
        None => None,
    };

    Ok(ListEnvelope {
        data,
        pagination,
        message: field("message").and_then(Value::as_str).map(str::to_string),
        status: field("status").cloned(),
    })
}
