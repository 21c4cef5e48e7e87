//! # Builder for ResolverConfig
//!
//! Fluent construction of [`ResolverConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use srcmap_engine::ResolverConfig;
//!
//! let config = ResolverConfig::builder()
//!     .with_cache_max_size_mb(64)
//!     .with_context_lines(3)
//!     .with_fetch_timeout(Duration::from_secs(15))
//!     .with_max_concurrent_fetches(8)
//!     .with_header("Authorization", "Bearer token")
//!     .build();
//!
//! assert_eq!(config.context_lines, 3);
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::ResolverConfig;

/// Builder for creating ResolverConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct ResolverConfigBuilder {
    /// Internal config being built
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ResolverConfig::default(),
        }
    }

    /// Set the resource cache capacity in megabytes
    pub fn with_cache_max_size_mb(mut self, megabytes: u64) -> Self {
        self.config.cache_max_size_mb = megabytes;
        self
    }

    /// Set how many source lines surround each resolved line
    pub fn with_context_lines(mut self, lines: u32) -> Self {
        self.config.context_lines = lines;
        self
    }

    /// Set a deadline for each source map fetch
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = if timeout.is_zero() {
            None
        } else {
            Some(timeout)
        };
        self
    }

    /// Bound the number of concurrent fetches per batch. Zero removes the bound.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.config.max_concurrent_fetches = (limit > 0).then_some(limit);
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Merge headers into the defaults, replacing values for the same names
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Build the ResolverConfig instance
    pub fn build(self) -> ResolverConfig {
        self.config
    }
}

impl Default for ResolverConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ResolverConfigBuilder::new().build();
        assert_eq!(config.cache_max_size_mb, 200);
        assert_eq!(config.context_lines, 1);
        assert_eq!(config.fetch_timeout, None);
        assert_eq!(config.max_concurrent_fetches, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_customization() {
        let config = ResolverConfigBuilder::new()
            .with_cache_max_size_mb(16)
            .with_context_lines(4)
            .with_fetch_timeout(Duration::from_secs(5))
            .with_max_concurrent_fetches(2)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .build();

        assert_eq!(config.cache_max_size_mb, 16);
        assert_eq!(config.context_lines, 4);
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.max_concurrent_fetches, Some(2));
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
        assert!(config.headers.contains_key(reqwest::header::ACCEPT));
    }

    #[test]
    fn test_zero_disables_hardening_limits() {
        let config = ResolverConfigBuilder::new()
            .with_fetch_timeout(Duration::ZERO)
            .with_max_concurrent_fetches(0)
            .build();

        assert_eq!(config.fetch_timeout, None);
        assert_eq!(config.max_concurrent_fetches, None);
    }

    #[test]
    fn test_invalid_header_is_ignored() {
        let config = ResolverConfigBuilder::new()
            .with_header("bad header", "value")
            .build();
        assert!(!config.headers.contains_key("bad header"));
    }
}
