//! Request coordinator - the single gateway for outbound provider lookups.
//!
//! Guarantees:
//! - One physical request per canonical key while it is in flight. Later
//!   callers with the same key attach to the pending request and receive the
//!   same response (or the same error).
//! - A bounded number of concurrent requests per host, enforced with a
//!   counting semaphore. Excess callers wait for a free slot.
//!
//! The in-flight registry entry is removed under the registry lock at the
//! same moment the result is published, so attaching and removal never
//! interleave. A call made after completion always starts a fresh request.
//!
//! The coordinator is constructed explicitly and shared via `Arc`; tests build
//! their own isolated instances over a stub [`HttpTransport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, trace};

use super::domain::EnrichmentError;

/// Default per-host concurrency bound.
pub const DEFAULT_HOST_LIMIT: usize = 50;

/// Status code and decoded JSON body of one provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Low-level HTTP GET returning decoded JSON.
///
/// Implement this trait to substitute a stub in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<ProviderResponse, EnrichmentError>;
}

/// Production transport backed by reqwest.
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport that identifies itself with `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self, EnrichmentError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(|e| EnrichmentError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<ProviderResponse, EnrichmentError> {
        let response = self
            .http_client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| EnrichmentError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| EnrichmentError::Parse(e.to_string()))?;

        Ok(ProviderResponse { status, body })
    }
}

/// Per-host concurrency limits.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub default_host_limit: usize,
    /// Overrides keyed by host name, e.g. `www.omdbapi.com`
    pub host_limits: HashMap<String, usize>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_host_limit: DEFAULT_HOST_LIMIT,
            host_limits: HashMap::new(),
        }
    }
}

type FetchResult = Result<Arc<ProviderResponse>, EnrichmentError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;
type Registry = Arc<Mutex<HashMap<String, SharedFetch>>>;

/// Deduplicating, host-bounded request gateway.
pub struct RequestCoordinator {
    transport: Arc<dyn HttpTransport>,
    config: CoordinatorConfig,
    in_flight: Registry,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    dispatched: Arc<AtomicUsize>,
}

impl std::fmt::Debug for RequestCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight.lock().len())
            .field("dispatched", &self.dispatched.load(Ordering::Relaxed))
            .finish()
    }
}

impl RequestCoordinator {
    pub fn new(transport: Arc<dyn HttpTransport>, config: CoordinatorConfig) -> Self {
        Self {
            transport,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            gates: Mutex::new(HashMap::new()),
            dispatched: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of physical requests handed to the transport so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Number of distinct requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// GET `url` with `params`, sharing any identical request already in flight.
    pub async fn fetch(&self, url: &str, params: &[(String, String)]) -> FetchResult {
        let key = canonical_key(url, params);

        let (shared, sender) = {
            let mut in_flight = self.in_flight.lock();
            if let Some(existing) = in_flight.get(&key) {
                trace!(target: "enrichment::coordinator", key = %key, "Attaching to in-flight request");
                (existing.clone(), None)
            } else {
                let (tx, rx) = oneshot::channel::<FetchResult>();
                let shared = async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(EnrichmentError::Network("request task dropped".to_string()))
                    })
                }
                .boxed()
                .shared();
                in_flight.insert(key.clone(), shared.clone());
                (shared, Some(tx))
            }
        };

        if let Some(tx) = sender {
            self.dispatch(key, url.to_string(), params.to_vec(), tx);
        }

        shared.await
    }

    /// GET and deserialize a successful JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<T, EnrichmentError> {
        let response = self.fetch(url, params).await?;
        if !response.is_success() {
            return Err(EnrichmentError::Http {
                status: response.status,
                url: url.to_string(),
            });
        }
        serde_json::from_value(response.body.clone())
            .map_err(|e| EnrichmentError::Parse(format!("{url}: {e}")))
    }

    fn dispatch(
        &self,
        key: String,
        url: String,
        params: Vec<(String, String)>,
        tx: oneshot::Sender<FetchResult>,
    ) {
        let gate = self.gate_for(&host_of(&url));
        let transport = Arc::clone(&self.transport);
        let registry = Arc::clone(&self.in_flight);
        let dispatched = Arc::clone(&self.dispatched);

        tokio::spawn(async move {
            let result = match gate.acquire_owned().await {
                Ok(_permit) => {
                    dispatched.fetch_add(1, Ordering::Relaxed);
                    debug!(target: "enrichment::coordinator", url = %url, "Dispatching request");
                    transport.get(&url, &params).await.map(Arc::new)
                }
                Err(e) => Err(EnrichmentError::Network(format!("host gate closed: {e}"))),
            };

            let mut in_flight = registry.lock();
            in_flight.remove(&key);
            // Receiver only disappears if every waiter gave up.
            let _ = tx.send(result);
        });
    }

    fn gate_for(&self, host: &str) -> Arc<Semaphore> {
        let mut gates = self.gates.lock();
        let gate = gates.entry(host.to_string()).or_insert_with(|| {
            let limit = self
                .config
                .host_limits
                .get(host)
                .copied()
                .unwrap_or(self.config.default_host_limit)
                .max(1);
            Arc::new(Semaphore::new(limit))
        });
        Arc::clone(gate)
    }
}

/// Deterministic identity of a request: the URL followed by its parameters
/// sorted by key (then value) and joined with `&`.
pub fn canonical_key(url: &str, params: &[(String, String)]) -> String {
    let mut pairs: Vec<_> = params.iter().collect();
    pairs.sort();
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{url}?{query}")
}

/// Host component of a URL, or the whole string if it doesn't parse.
fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Build an owned parameter list from string pairs.
pub fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubTransport;
    use serde_json::json;
    use std::time::Duration;

    fn coordinator(stub: &Arc<StubTransport>, config: CoordinatorConfig) -> RequestCoordinator {
        let transport: Arc<dyn HttpTransport> = stub.clone();
        RequestCoordinator::new(transport, config)
    }

    #[test]
    fn test_canonical_key_sorts_params() {
        let a = canonical_key(
            "http://www.omdbapi.com/",
            &params(&[("t", "Up"), ("type", "movie"), ("y", "2009")]),
        );
        let b = canonical_key(
            "http://www.omdbapi.com/",
            &params(&[("y", "2009"), ("t", "Up"), ("type", "movie")]),
        );
        assert_eq!(a, b);
        assert_eq!(a, "http://www.omdbapi.com/?t=Up&type=movie&y=2009");
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("http://www.omdbapi.com/"), "www.omdbapi.com");
        assert_eq!(host_of("https://kitsu.io/api/edge/anime"), "kitsu.io");
        assert_eq!(host_of("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_concurrent_identical_fetches_share_one_request() {
        let stub = Arc::new(
            StubTransport::new()
                .with_delay(Duration::from_millis(50))
                .route(&[("s", "Firefly")], json!({"Response": "True"})),
        );
        let coord = Arc::new(coordinator(&stub, CoordinatorConfig::default()));
        let p = params(&[("s", "Firefly"), ("type", "series")]);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let coord = Arc::clone(&coord);
                let p = p.clone();
                tokio::spawn(async move { coord.fetch("http://www.omdbapi.com/", &p).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(stub.calls(), 1);
        assert_eq!(coord.dispatched(), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(results[0].body["Response"], "True");
        assert_eq!(coord.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_completed_request_is_not_replayed() {
        let stub = Arc::new(StubTransport::new().route(&[("i", "tt1")], json!({"Response": "True"})));
        let coord = coordinator(&stub, CoordinatorConfig::default());
        let p = params(&[("i", "tt1")]);

        coord.fetch("http://www.omdbapi.com/", &p).await.unwrap();
        coord.fetch("http://www.omdbapi.com/", &p).await.unwrap();

        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_host_bound_limits_simultaneous_dispatches() {
        let stub = Arc::new(
            StubTransport::new()
                .with_delay(Duration::from_millis(30))
                .fallback(json!({"Response": "True"})),
        );
        let config = CoordinatorConfig {
            default_host_limit: 50,
            host_limits: HashMap::from([("www.omdbapi.com".to_string(), 2)]),
        };
        let coord = Arc::new(coordinator(&stub, config));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let coord = Arc::clone(&coord);
                tokio::spawn(async move {
                    let id = format!("tt{i}");
                    let p = params(&[("i", id.as_str())]);
                    coord.fetch("http://www.omdbapi.com/", &p).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(stub.calls(), 6);
        assert!(stub.max_concurrent() <= 2, "saw {}", stub.max_concurrent());
        assert!(stub.max_concurrent() >= 1);
    }

    #[tokio::test]
    async fn test_other_hosts_use_their_own_gate() {
        let stub = Arc::new(
            StubTransport::new()
                .with_delay(Duration::from_millis(30))
                .fallback(json!({})),
        );
        let config = CoordinatorConfig {
            default_host_limit: 4,
            host_limits: HashMap::from([("www.omdbapi.com".to_string(), 1)]),
        };
        let coord = Arc::new(coordinator(&stub, config));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let coord = Arc::clone(&coord);
                tokio::spawn(async move {
                    let title = format!("show {i}");
                    let p = params(&[("filter[text]", title.as_str())]);
                    coord.fetch("https://kitsu.io/api/edge/anime", &p).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(stub.calls(), 4);
        assert!(stub.max_concurrent() > 1);
    }

    #[tokio::test]
    async fn test_errors_reach_every_waiter() {
        let stub = Arc::new(
            StubTransport::new()
                .with_delay(Duration::from_millis(30))
                .fail_with(EnrichmentError::Network("connection refused".to_string())),
        );
        let coord = Arc::new(coordinator(&stub, CoordinatorConfig::default()));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let coord = Arc::clone(&coord);
                tokio::spawn(async move {
                    coord
                        .fetch("http://www.omdbapi.com/", &params(&[("s", "x")]))
                        .await
                })
            })
            .collect();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, EnrichmentError::Network(_)));
        }
        assert_eq!(stub.calls(), 1);
        assert_eq!(coord.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_get_json_rejects_error_status() {
        let stub = Arc::new(StubTransport::new().route_with_status(
            &[("i", "tt404")],
            404,
            json!({"error": "not found"}),
        ));
        let coord = coordinator(&stub, CoordinatorConfig::default());

        let result: Result<serde_json::Value, _> = coord
            .get_json("http://www.omdbapi.com/", &params(&[("i", "tt404")]))
            .await;
        assert!(matches!(result, Err(EnrichmentError::Http { status: 404, .. })));
    }
}
