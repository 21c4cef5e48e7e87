use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::cache::DEFAULT_CACHE_SIZE_MB;

const DEFAULT_USER_AGENT: &str = concat!("srcmap/", env!("CARGO_PKG_VERSION"));

/// Default number of source lines shown either side of a resolved position
pub const DEFAULT_CONTEXT_LINES: u32 = 1;

/// Configurable options for the resolver and its HTTP client
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Resource cache capacity in megabytes
    pub cache_max_size_mb: u64,

    /// Source lines included before and after each resolved line
    pub context_lines: u32,

    /// Per-URL fetch deadline. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,

    /// Upper bound on fetches in flight during one batch. `None` fetches every
    /// distinct URL at once.
    pub max_concurrent_fetches: Option<usize>,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_max_size_mb: DEFAULT_CACHE_SIZE_MB,
            context_lines: DEFAULT_CONTEXT_LINES,
            fetch_timeout: None,
            max_concurrent_fetches: None,
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: ResolverConfig::get_default_headers(),
        }
    }
}

impl ResolverConfig {
    pub fn builder() -> crate::builder::ResolverConfigBuilder {
        crate::builder::ResolverConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json, */*;q=0.8"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers
    }
}
