use std::time::Duration;

use srcmap_engine::ResolverConfig;
use tracing::info;

use crate::cli::CliArgs;
use crate::error::AppError;
use crate::utils::{format_bytes, parse_headers};

/// Configuration for the entire program, read once at start
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    pub resolver: ResolverConfig,
}

impl ProgramConfig {
    pub fn from_args(args: &CliArgs) -> Result<Self, AppError> {
        let resolver = ResolverConfig::builder()
            .with_context_lines(args.context_lines)
            .with_cache_max_size_mb(args.cache_size)
            .with_fetch_timeout(Duration::from_secs(args.fetch_timeout))
            .with_connect_timeout(Duration::from_secs(args.connect_timeout))
            .with_max_concurrent_fetches(args.max_concurrent_fetches)
            .with_headers(parse_headers(&args.headers)?)
            .build();

        info!(
            context_lines = resolver.context_lines,
            cache = %format_bytes(resolver.cache_max_size_mb.saturating_mul(1024 * 1024)),
            fetch_timeout = ?resolver.fetch_timeout,
            max_concurrent_fetches = ?resolver.max_concurrent_fetches,
            "Resolver configuration"
        );

        Ok(Self { resolver })
    }
}
