//! Test doubles for the network and resolver seams.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ETAG, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};

use crate::error::{FetchError, TokenError};
use crate::http::{HttpResponse, HttpTransport};
use crate::resolver::TokenResolver;

/// Macro to initialize tracing for tests
#[macro_export]
macro_rules! init_test_tracing {
    () => {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    };
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

/// Transport replaying scripted responses per URL, in order
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<HttpResponse, FetchError>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delays: Mutex<HashMap<String, Duration>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next reply for `url`
    pub fn push(&self, url: &str, response: Result<HttpResponse, FetchError>) {
        self.responses
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Make every request to `url` wait before answering
    pub fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().insert(url.to_string(), delay);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url == url).count()
    }

    /// Highest number of requests observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn ok(body: &str) -> HttpResponse {
        HttpResponse::new(StatusCode::OK, HeaderMap::new(), body.to_string())
    }

    pub fn status(status: StatusCode) -> HttpResponse {
        HttpResponse::new(status, HeaderMap::new(), "")
    }

    pub fn not_modified() -> HttpResponse {
        Self::status(StatusCode::NOT_MODIFIED)
    }
}

pub fn ok_with_etag(body: &str, etag: &str) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(ETAG, HeaderValue::from_str(etag).unwrap());
    HttpResponse::new(StatusCode::OK, headers, body.to_string())
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
    ) -> Result<HttpResponse, FetchError> {
        self.requests.lock().push(RecordedRequest {
            method,
            url: url.to_string(),
            headers,
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.lock().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .responses
            .lock()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(FetchError::Transport(format!(
                    "no response scripted for {url}"
                )))
            });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Resolver echoing the request position back as a token.
///
/// The source map text is used as `src`. Lines listed in `fail_lines` fail, lines in
/// `malformed_lines` produce a token with a negative line number.
#[derive(Default)]
pub struct EchoResolver {
    pub fail_lines: Vec<u32>,
    pub malformed_lines: Vec<u32>,
    pub fail_init: bool,
    pub init_calls: AtomicUsize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenResolver for EchoResolver {
    async fn init(&self) -> Result<(), TokenError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(TokenError::Resolver("wasm module missing".to_string()));
        }
        Ok(())
    }

    async fn generate_token(
        &self,
        line: u32,
        column: u32,
        source_map: &str,
        _context_lines: u32,
    ) -> Result<String, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lines.contains(&line) {
            return Err(TokenError::Resolver(format!("no mapping at {line}:{column}")));
        }
        if self.malformed_lines.contains(&line) {
            return Ok(serde_json::json!({"line": -1, "column": column, "src": source_map})
                .to_string());
        }
        Ok(serde_json::json!({
            "line": line,
            "column": column,
            "src": source_map,
            "source_code": [],
        })
        .to_string())
    }
}
