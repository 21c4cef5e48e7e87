//! # Batch Resolver
//!
//! Resolves many stack positions in one call. Each distinct source map URL is
//! fetched once per batch, fetches run concurrently, and every request gets its own
//! result at the same index as the input. A failure for one URL or position never
//! affects the others.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cache::{CacheStats, CacheStore};
use crate::config::ResolverConfig;
use crate::error::{FetchError, ResolveError};
use crate::fetcher::RevalidatingFetcher;
use crate::http::{HttpTransport, ReqwestTransport};
use crate::resolver::{SourceMapResolver, TokenResolver};
use crate::sourcemap::{ContextSnippet, SourceMap, UnpackedSources};
use crate::token::{Token, parse_raw_token};

/// A generated position to resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    /// 1-based line in the generated file
    pub line: u32,
    /// 0-based column in the generated file
    pub column: u32,
    /// Where the source map for the generated file lives
    #[serde(rename = "sourceMapUrl", alias = "resourceUrl")]
    pub resource_url: String,
}

impl ResolutionRequest {
    pub fn new(line: u32, column: u32, resource_url: impl Into<String>) -> Self {
        Self {
            line,
            column,
            resource_url: resource_url.into(),
        }
    }
}

/// Outcome for a single request of a batch
#[derive(Debug, Clone)]
pub enum ResolutionResult {
    Success { token: Token },
    Failure { error: ResolveError },
}

impl ResolutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionResult::Success { .. })
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            ResolutionResult::Success { token } => Some(token),
            ResolutionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ResolveError> {
        match self {
            ResolutionResult::Success { .. } => None,
            ResolutionResult::Failure { error } => Some(error),
        }
    }
}

impl From<Result<Token, ResolveError>> for ResolutionResult {
    fn from(result: Result<Token, ResolveError>) -> Self {
        match result {
            Ok(token) => ResolutionResult::Success { token },
            Err(error) => ResolutionResult::Failure { error },
        }
    }
}

#[derive(Serialize)]
struct ResultWire<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a Token>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Serialized as `{"success": true, "token": ...}` or
/// `{"success": false, "error": "..."}` with the error text sanitized.
impl Serialize for ResolutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            ResolutionResult::Success { token } => ResultWire {
                success: true,
                token: Some(token),
                error: None,
            },
            ResolutionResult::Failure { error } => ResultWire {
                success: false,
                token: None,
                error: Some(error.sanitized()),
            },
        };
        wire.serialize(serializer)
    }
}

type FetchOutcome = Result<Arc<str>, FetchError>;

/// Resolves batches of stack positions against remote source maps
pub struct BatchResolver {
    config: ResolverConfig,
    fetcher: RevalidatingFetcher,
    resolver: Arc<dyn TokenResolver>,
    ready: OnceCell<()>,
}

impl BatchResolver {
    /// Resolver using reqwest, the built-in source map decoder and a cache sized by
    /// `config.cache_max_size_mb`.
    pub fn new(config: ResolverConfig) -> Result<Self, FetchError> {
        let transport = Arc::new(ReqwestTransport::from_config(&config)?);
        let cache = Arc::new(CacheStore::with_capacity_mb(config.cache_max_size_mb));
        Ok(Self::with_parts(
            config,
            transport,
            cache,
            Arc::new(SourceMapResolver),
        ))
    }

    pub fn with_parts(
        config: ResolverConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<CacheStore>,
        resolver: Arc<dyn TokenResolver>,
    ) -> Self {
        Self {
            config,
            fetcher: RevalidatingFetcher::new(transport, cache),
            resolver,
            ready: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        self.fetcher.cache()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    pub fn clear_cache(&self) {
        self.cache().clear();
        info!("Resource cache cleared");
    }

    /// Run the resolver's one-time setup.
    ///
    /// Concurrent callers share a single attempt. A failed attempt is not
    /// remembered, so the next call tries again.
    pub async fn ensure_ready(&self) -> Result<(), ResolveError> {
        self.ready
            .get_or_try_init(|| async {
                debug!("Initializing token resolver");
                self.resolver
                    .init()
                    .await
                    .map_err(|e| ResolveError::Init(e.to_string()))
            })
            .await
            .map(|_| ())
    }

    /// Resolve every request. The output has one entry per request, in input
    /// order, and never fails as a whole.
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub async fn resolve(&self, requests: &[ResolutionRequest]) -> Vec<ResolutionResult> {
        if requests.is_empty() {
            return Vec::new();
        }

        if let Err(e) = self.ensure_ready().await {
            warn!(error = %e, "Token resolver unavailable");
            return requests
                .iter()
                .map(|_| ResolutionResult::Failure { error: e.clone() })
                .collect();
        }

        let mut seen = HashSet::new();
        let unique: Vec<&str> = requests
            .iter()
            .map(|r| r.resource_url.as_str())
            .filter(|url| seen.insert(*url))
            .collect();

        let fetched = self.fetch_all(&unique).await;

        let results: Vec<ResolutionResult> = join_all(requests.iter().map(|request| {
            let outcome = fetched.get(request.resource_url.as_str());
            async move {
                match outcome {
                    Some(Ok(text)) => {
                        ResolutionResult::from(self.resolve_position(request, text).await)
                    }
                    Some(Err(e)) => ResolutionResult::Failure {
                        error: ResolveError::Fetch(e.clone()),
                    },
                    None => ResolutionResult::Failure {
                        error: ResolveError::Fetch(FetchError::Transport(
                            "source map was not fetched".to_string(),
                        )),
                    },
                }
            }
        }))
        .await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            requests = requests.len(),
            unique_urls = unique.len(),
            succeeded,
            failed = results.len() - succeeded,
            "Batch resolved"
        );

        results
    }

    /// Resolve a single position
    pub async fn resolve_one(&self, request: &ResolutionRequest) -> Result<Token, ResolveError> {
        self.ensure_ready().await?;
        let text = self.fetch_source_map(&request.resource_url).await?;
        self.resolve_position(request, &text).await
    }

    /// Original position, symbol name and surrounding lines for a generated
    /// position. `Ok(None)` when nothing in the map covers it.
    pub async fn lookup_context(
        &self,
        url: &str,
        line: u32,
        column: u32,
        context_lines: u32,
    ) -> Result<Option<ContextSnippet>, ResolveError> {
        let text = self.fetch_source_map(url).await?;
        let map = SourceMap::parse(&text)?;
        Ok(map.lookup_context(line, column, context_lines)?)
    }

    /// Every source listed in the map with its embedded content
    pub async fn unpack_sources(&self, url: &str) -> Result<UnpackedSources, ResolveError> {
        let text = self.fetch_source_map(url).await?;
        let map = SourceMap::parse(&text)?;
        Ok(map.unpack())
    }

    async fn resolve_position(
        &self,
        request: &ResolutionRequest,
        source_map: &str,
    ) -> Result<Token, ResolveError> {
        let raw = self
            .resolver
            .generate_token(
                request.line,
                request.column,
                source_map,
                self.config.context_lines,
            )
            .await?;
        Ok(parse_raw_token(&raw)?)
    }

    async fn fetch_all<'a>(&self, urls: &[&'a str]) -> HashMap<&'a str, FetchOutcome> {
        let limit = self
            .config
            .max_concurrent_fetches
            .unwrap_or(urls.len())
            .max(1);

        stream::iter(urls.iter().copied())
            .map(|url| async move { (url, self.fetch_source_map(url).await) })
            .buffer_unordered(limit)
            .collect()
            .await
    }

    async fn fetch_source_map(&self, url: &str) -> FetchOutcome {
        validate_url(url)?;

        let fetched = match self.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.get(url))
                .await
                .map_err(|_| FetchError::Timeout(limit))??,
            None => self.fetcher.get(url).await?,
        };

        let status = fetched.response.status;
        if !status.is_success() {
            debug!(url = %url, status = %status, "Source map fetch rejected");
            return Err(FetchError::StatusCode(status));
        }

        debug!(
            url = %url,
            cache = ?fetched.cache,
            size = fetched.response.body.len(),
            "Fetched source map"
        );
        Ok(Arc::from(String::from_utf8_lossy(&fetched.response.body).as_ref()))
    }
}

/// Accept only absolute http(s) URLs
pub fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::UnsupportedProtocol(format!("{other}:"))),
    }
}
