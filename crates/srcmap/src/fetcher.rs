//! # Revalidating Fetcher
//!
//! Conditional GET on top of [`CacheStore`]. A cached entry's ETag is sent as
//! `If-None-Match`; a `304 Not Modified` reply is answered from the cache with the
//! status rewritten to `200 OK`. Successful replies carrying an ETag are written back.
//!
//! Caching is advisory: the outcome is reported next to the response and a failed
//! cache write never turns a successful fetch into an error.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheStore, extract_etag};
use crate::error::FetchError;
use crate::http::{HttpResponse, HttpTransport};

/// What happened to the cache while serving a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Not a GET; the cache was not consulted
    Bypassed,
    /// The server answered 304 and the cached payload was served
    Revalidated,
    /// The response body was stored under its ETag
    Stored,
    /// The response was not eligible for caching
    NotCacheable,
    /// The cache refused the write
    Rejected(CacheError),
}

/// A response together with its advisory cache outcome
#[derive(Debug, Clone)]
pub struct Fetched {
    pub response: HttpResponse,
    pub cache: CacheOutcome,
}

pub struct RevalidatingFetcher {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<CacheStore>,
}

impl RevalidatingFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<CacheStore>) -> Self {
        Self { transport, cache }
    }

    /// The store backing this fetcher
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Fetch `url` with GET, revalidating against the cache
    pub async fn get(&self, url: &str) -> Result<Fetched, FetchError> {
        self.fetch(url, Method::GET).await
    }

    /// Fetch `url`. Only GET requests touch the cache.
    pub async fn fetch(&self, url: &str, method: Method) -> Result<Fetched, FetchError> {
        if method != Method::GET {
            let response = self.transport.send(method, url, HeaderMap::new()).await?;
            return Ok(Fetched {
                response,
                cache: CacheOutcome::Bypassed,
            });
        }

        let cached = self.cache.get(url);
        let mut headers = HeaderMap::new();
        if let Some(entry) = &cached {
            match HeaderValue::from_str(&entry.etag) {
                Ok(value) => {
                    headers.insert(IF_NONE_MATCH, value);
                }
                Err(_) => debug!(url = %url, "Cached ETag is not a valid header value"),
            }
        }

        let response = self.transport.send(Method::GET, url, headers).await?;

        if response.status == StatusCode::NOT_MODIFIED
            && let Some(entry) = cached
        {
            debug!(url = %url, "Content not modified, using cache");
            return Ok(Fetched {
                response: HttpResponse {
                    status: StatusCode::OK,
                    headers: response.headers,
                    body: entry.payload,
                },
                cache: CacheOutcome::Revalidated,
            });
        }

        if !response.is_success() {
            return Ok(Fetched {
                response,
                cache: CacheOutcome::NotCacheable,
            });
        }

        let Some(etag) = extract_etag(&response.headers) else {
            debug!(url = %url, "Response has no ETag, not caching");
            return Ok(Fetched {
                response,
                cache: CacheOutcome::NotCacheable,
            });
        };

        let outcome = match self.cache.set(url, response.body.clone(), etag) {
            Ok(()) => {
                debug!(url = %url, size = response.body.len(), "Cached response");
                CacheOutcome::Stored
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to cache response");
                CacheOutcome::Rejected(e)
            }
        };

        Ok(Fetched {
            response,
            cache: outcome,
        })
    }
}
