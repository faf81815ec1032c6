//! HTTP client core
//!
//! Runs every request through the interceptor [`Pipeline`], resends on
//! client-side timeouts with linear backoff, and classifies failures once
//! the retries are spent. Cached GETs combine the [`TtlCache`] with the
//! [`RequestDeduplicator`] so concurrent identical reads hit the network once.

use crate::cache::TtlCache;
use crate::config::ClientConfig;
use crate::dedup::RequestDeduplicator;
use crate::error::{ClientError, Result};
use crate::metrics::ClientMetrics;
use crate::middleware::{Pipeline, RequestContext};
use crate::models::{ApiResponse, RequestDescriptor};
use crate::retry::RetryPolicy;
use crate::session::Session;
use crate::transport::{ReqwestTransport, Transport, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Client for the course-evaluation REST API
///
/// Cheap to clone; clones share the transport, session, cache and metrics.
#[derive(Clone)]
pub struct HttpClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
    retry_policy: RetryPolicy,
    session: Arc<Session>,
    metrics: Arc<ClientMetrics>,
    cache: Arc<TtlCache<ApiResponse>>,
    pending: Arc<RequestDeduplicator<ApiResponse, ClientError>>,
}

impl HttpClient {
    /// Create a client over `reqwest` with the standard pipeline
    pub fn new(config: ClientConfig, session: Arc<Session>) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, session, transport))
    }

    /// Create a client over a custom transport with the standard pipeline
    pub fn with_transport(config: ClientConfig, session: Arc<Session>, transport: Arc<dyn Transport>) -> Self {
        let pipeline = Pipeline::standard(Arc::clone(&session), config.login_view.clone());
        let retry_policy = RetryPolicy::new(config.max_retries, config.retry_delay());
        let cache = TtlCache::new(config.cache_capacity, config.cache_ttl());

        HttpClient {
            config: Arc::new(config),
            transport,
            pipeline,
            retry_policy,
            session,
            metrics: Arc::new(ClientMetrics::new()),
            cache: Arc::new(cache),
            pending: Arc::new(RequestDeduplicator::new()),
        }
    }

    /// Replace the interceptor pipeline
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    pub fn cache(&self) -> &TtlCache<ApiResponse> {
        &self.cache
    }

    /// Send one request
    ///
    /// # Returns
    /// * `Ok(ApiResponse)` for a 2xx response, possibly after timeout retries
    /// * `Err(ClientError)` carrying a user-facing message otherwise
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<ApiResponse> {
        let started = Instant::now();
        let ctx = RequestContext {
            method: descriptor.method.clone(),
            path: descriptor.path.clone(),
            login: descriptor.is_login(&self.config.login_endpoint),
        };

        let outcome = match self.pipeline.apply_request(descriptor) {
            Ok(request) => self
                .execute_with_retry(&request)
                .await
                .map_err(ClientError::from),
            Err(e) => Err(e),
        };
        let outcome = self.pipeline.apply_response(&ctx, outcome);

        if let Err(e) = &outcome {
            if e.is_unauthorized() {
                self.metrics.record_auth_failure();
            }
            debug!("{} {} failed: {}", ctx.method, ctx.path, e);
        }
        self.metrics.record_request(outcome.is_ok(), started.elapsed());
        outcome
    }

    /// Send the request, resending on timeout per the retry policy
    async fn execute_with_retry(&self, request: &RequestDescriptor) -> std::result::Result<ApiResponse, TransportError> {
        let mut retries = 0;

        loop {
            match self.transport.execute(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let next = retries + 1;
                    if !self.retry_policy.should_retry(next, &e) {
                        return Err(e);
                    }

                    let backoff = self.retry_policy.backoff_duration(next);
                    warn!(
                        "{} {} timed out, retry {}/{} after {:?}",
                        request.method, request.path, next, self.retry_policy.max_retries, backoff
                    );
                    self.metrics.record_retry();
                    sleep(backoff).await;
                    retries = next;
                }
            }
        }
    }

    /// Send and decode the JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        self.send(descriptor).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(RequestDescriptor::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(RequestDescriptor::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(RequestDescriptor::put(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(RequestDescriptor::patch(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(RequestDescriptor::delete(path)).await.map(|_| ())
    }

    /// GET through the response cache
    ///
    /// A fresh cached response is returned without touching the network.
    /// Otherwise concurrent callers for the same path and query share one
    /// request; only successful responses are cached.
    pub async fn get_cached<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        let key = cache_key(&descriptor);

        if let Some(response) = self.cache.get(&key) {
            self.metrics.record_cache_hit();
            debug!("cache hit for {}", key);
            return response.json();
        }
        self.metrics.record_cache_miss();

        if self.pending.is_pending(&key) {
            self.metrics.record_deduplicated();
        }

        let client = self.clone();
        let store_key = key.clone();
        let response = self
            .pending
            .dedupe(&key, move || async move {
                let response = client.send(descriptor).await?;
                client.cache.set(store_key, response.clone());
                Ok(response)
            })
            .await?;

        response.json()
    }

    /// Drop every cached response
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }
}

fn cache_key(descriptor: &RequestDescriptor) -> String {
    let mut key = format!("{} {}", descriptor.method, descriptor.path);
    for (i, (name, value)) in descriptor.query.iter().enumerate() {
        key.push(if i == 0 { '?' } else { '&' });
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StoredUser;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Plays back a fixed list of outcomes and records what it was sent
    struct ScriptedTransport {
        script: Mutex<VecDeque<std::result::Result<ApiResponse, TransportError>>>,
        sent: Mutex<Vec<(RequestDescriptor, tokio::time::Instant)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<std::result::Result<ApiResponse, TransportError>>) -> Arc<Self> {
            Arc::new(ScriptedTransport {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: &RequestDescriptor) -> std::result::Result<ApiResponse, TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((request.clone(), tokio::time::Instant::now()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse::new(200, "null")))
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> HttpClient {
        HttpClient::with_transport(ClientConfig::default(), Arc::new(Session::in_memory()), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_then_success_uses_linear_backoff() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Ok(ApiResponse::new(200, r#"{"ok":true}"#)),
        ]);
        let client = client(Arc::clone(&transport));

        let value: serde_json::Value = client.get("faculties").await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(transport.attempts(), 3);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[1].1 - sent[0].1, Duration::from_millis(1000));
        assert_eq!(sent[2].1 - sent[1].1, Duration::from_millis(2000));
        assert_eq!(client.metrics().get_stats().retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_exhaust_after_max_retries() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::Timeout); 5]);
        let client = client(Arc::clone(&transport));

        let err = client.send(RequestDescriptor::get("faculties")).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));
        assert_eq!(err.message(), crate::error::MSG_NO_RESPONSE);
        assert_eq!(transport.attempts(), 4);
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(500, ""))]);
        let client = client(Arc::clone(&transport));

        let err = client.send(RequestDescriptor::get("faculties")).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.message(), crate::error::MSG_SERVER_ERROR);
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_no_response_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(TransportError::NoResponse("refused".into()))]);
        let client = client(Arc::clone(&transport));

        let err = client.send(RequestDescriptor::get("faculties")).await.unwrap_err();
        assert!(matches!(err, ClientError::NoResponse { .. }));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_bearer_and_skip_auth_reach_transport() {
        let transport = ScriptedTransport::new(vec![]);
        let client = client(Arc::clone(&transport));
        client.session().login(&StoredUser::new(1, "a", "tok")).unwrap();

        client.send(RequestDescriptor::get("faculties")).await.unwrap();
        client.send(RequestDescriptor::get("faculties").skip_auth()).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].0.headers.get("authorization").unwrap(), "Bearer tok");
        assert!(sent[1].0.headers.get("authorization").is_none());
        assert!(!sent[1].0.skip_auth);
        assert_eq!(sent[0].0.headers.get("content-type").unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_get_cached_serves_second_read_from_cache() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::new(200, "[1,2]"))]);
        let client = client(Arc::clone(&transport));

        let first: Vec<u32> = client.get_cached(RequestDescriptor::get("faculties")).await.unwrap();
        let second: Vec<u32> = client.get_cached(RequestDescriptor::get("faculties")).await.unwrap();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![1, 2]);
        assert_eq!(transport.attempts(), 1);

        let stats = client.metrics().get_stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_get_cached_does_not_cache_failures() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::new(404, "")),
            Ok(ApiResponse::new(200, "[3]")),
        ]);
        let client = client(Arc::clone(&transport));

        let err = client
            .get_cached::<Vec<u32>>(RequestDescriptor::get("faculties/9"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));

        let ok: Vec<u32> = client.get_cached(RequestDescriptor::get("faculties/9")).await.unwrap();
        assert_eq!(ok, vec![3]);
    }

    #[test]
    fn test_cache_key_includes_query() {
        let key = cache_key(&RequestDescriptor::get("reviews").query("page", 1).query("size", 10));
        assert_eq!(key, "GET reviews?page=1&size=10");
    }
}
