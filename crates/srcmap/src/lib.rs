//! # srcmap-engine
//!
//! Resolves minified stack positions back to original source locations using
//! remote source maps.
//!
//! ## Features
//!
//! - Batch resolution with one fetch per distinct source map URL
//! - Byte-bounded LRU cache of fetched resources
//! - ETag revalidation with `If-None-Match`
//! - Built-in Source Map v3 decoder, or any [`TokenResolver`] you plug in
//! - Context lookup and source unpacking for a single map

pub mod batch;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod resolver;
pub mod sourcemap;
pub mod token;

#[cfg(test)]
mod test_utils;

pub use batch::{BatchResolver, ResolutionRequest, ResolutionResult, validate_url};
pub use builder::ResolverConfigBuilder;
pub use cache::{CacheError, CacheStats, CacheStore};
pub use config::ResolverConfig;
pub use error::{FetchError, ResolveError, TokenError};
pub use fetcher::{CacheOutcome, Fetched, RevalidatingFetcher};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport, create_client};
pub use resolver::{SourceMapResolver, TokenResolver};
pub use sourcemap::{ContextSnippet, SourceMap, SourceMapError, UnpackedSources};
pub use token::{SourceCodeLine, Token};
