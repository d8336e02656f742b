//! Test utilities and fixtures for media-minder tests.
//!
//! This module provides a migrated scratch database, a stub HTTP transport
//! for the request coordinator, a stub filename parser, and small helpers
//! for building media trees on disk.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{temp_db, StubTransport};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     let stub = Arc::new(StubTransport::new().fallback(json!({})));
//!     // ... test logic
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::enrichment::EnrichmentError;
use crate::enrichment::coordinator::{HttpTransport, ProviderResponse};
use crate::hints::{FilenameParser, ParsedName};

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Create an empty file (and its parent directories) under `root`.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create directories");
    }
    std::fs::write(&path, b"").expect("Failed to create file");
    path
}

enum Matcher {
    /// Every listed pair must be present in the request parameters.
    Params(Vec<(String, String)>),
    /// Exact URL, parameters ignored.
    Url(String),
}

struct Route {
    matcher: Matcher,
    status: u16,
    body: Value,
}

impl Route {
    fn matches(&self, url: &str, params: &[(String, String)]) -> bool {
        match &self.matcher {
            Matcher::Params(wanted) => wanted.iter().all(|pair| params.contains(pair)),
            Matcher::Url(wanted) => wanted == url,
        }
    }
}

/// Canned-response transport.
///
/// Routes are checked in insertion order; the first match wins. Unrouted
/// requests get the fallback body, or a 404 when there is none. Every request
/// is recorded and concurrency is tracked, so tests can assert on
/// deduplication and per-host bounds.
#[derive(Default)]
pub struct StubTransport {
    routes: Vec<Route>,
    fallback: Option<Value>,
    failure: Option<EnrichmentError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    current: AtomicUsize,
    max_concurrent: AtomicUsize,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every request this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer 200 with `body` when all `params` are present.
    pub fn route(self, params: &[(&str, &str)], body: Value) -> Self {
        self.route_with_status(params, 200, body)
    }

    pub fn route_with_status(mut self, params: &[(&str, &str)], status: u16, body: Value) -> Self {
        self.routes.push(Route {
            matcher: Matcher::Params(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            status,
            body,
        });
        self
    }

    /// Answer 200 with `body` for this exact URL.
    pub fn route_url(mut self, url: &str, body: Value) -> Self {
        self.routes.push(Route {
            matcher: Matcher::Url(url.to_string()),
            status: 200,
            body,
        });
        self
    }

    /// Body for requests no route matches.
    pub fn fallback(mut self, body: Value) -> Self {
        self.fallback = Some(body);
        self
    }

    /// Fail every request with `error`.
    pub fn fail_with(mut self, error: EnrichmentError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Physical requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of requests seen in flight at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    /// Every request as (url, params), in arrival order.
    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().clone()
    }

    fn respond(&self, url: &str, params: &[(String, String)]) -> Result<ProviderResponse, EnrichmentError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let response = match self.routes.iter().find(|r| r.matches(url, params)) {
            Some(route) => ProviderResponse {
                status: route.status,
                body: route.body.clone(),
            },
            None => match &self.fallback {
                Some(body) => ProviderResponse {
                    status: 200,
                    body: body.clone(),
                },
                None => ProviderResponse {
                    status: 404,
                    body: Value::Null,
                },
            },
        };
        Ok(response)
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<ProviderResponse, EnrichmentError> {
        self.requests.lock().push((url.to_string(), params.to_vec()));
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.respond(url, params);
        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Filename parser returning one canned answer and recording what it saw.
#[derive(Default)]
pub struct StubParser {
    answer: ParsedName,
    seen: Mutex<Vec<PathBuf>>,
}

impl StubParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.answer.title = Some(title.to_string());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.answer.year = Some(year);
        self
    }

    pub fn with_episodes(mut self, episodes: &[i32]) -> Self {
        self.answer.episodes = episodes.to_vec();
        self
    }

    /// Paths passed to `parse`, in call order.
    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().clone()
    }
}

impl FilenameParser for StubParser {
    fn parse(&self, path: &Path, _episodic: bool) -> ParsedName {
        self.seen.lock().push(path.to_path_buf());
        self.answer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;
        let movies = crate::db::all_movies(&pool).await.unwrap();
        assert!(movies.is_empty());
    }

    #[tokio::test]
    async fn test_stub_routes_by_param_subset() {
        let stub = StubTransport::new()
            .route(&[("s", "Up")], json!({"hit": 1}))
            .fallback(json!({"hit": 0}));

        let hit = stub
            .get("http://x/", &[("s".into(), "Up".into()), ("type".into(), "movie".into())])
            .await
            .unwrap();
        assert_eq!(hit.body["hit"], 1);

        let miss = stub.get("http://x/", &[("s".into(), "Down".into())]).await.unwrap();
        assert_eq!(miss.body["hit"], 0);
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_unrouted_without_fallback_is_404() {
        let stub = StubTransport::new();
        let response = stub.get("http://x/", &[]).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_touch_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "a/b/c.mkv");
        assert!(path.is_file());
    }
}
