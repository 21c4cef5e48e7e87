use std::error::Error as StdError;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use url::Url;

use crate::sourcemap::SourceMapError;

/// Failure to obtain a resource over the network
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Invalid protocol: {0}. Only HTTP and HTTPS are allowed")]
    UnsupportedProtocol(String),

    #[error("HTTP request failed")]
    Network(#[source] Arc<reqwest::Error>),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(Arc::new(err))
    }
}

/// Structural problem in the output of a token resolver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenValidationError {
    #[error("expected an object")]
    NotAnObject,

    #[error("{0} must be a non-negative integer")]
    NotNonNegativeInteger(&'static str),

    #[error("{0} must be a string")]
    NotAString(&'static str),

    #[error("{0} must be a boolean")]
    NotABoolean(&'static str),

    #[error("{0} must be an array")]
    NotAnArray(&'static str),

    #[error("source code entry {index}: {reason}")]
    Entry {
        index: usize,
        reason: Box<TokenValidationError>,
    },
}

/// Failure to turn a position into a token
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    #[error("resolver failed: {0}")]
    Resolver(String),

    #[error("unexpected token response")]
    Malformed(#[source] Arc<serde_json::Error>),

    #[error("invalid token")]
    Invalid(#[source] TokenValidationError),

    #[error("invalid source map")]
    SourceMap(#[source] SourceMapError),
}

impl From<SourceMapError> for TokenError {
    fn from(err: SourceMapError) -> Self {
        TokenError::SourceMap(err)
    }
}

impl From<TokenValidationError> for TokenError {
    fn from(err: TokenValidationError) -> Self {
        TokenError::Invalid(err)
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        TokenError::Malformed(Arc::new(err))
    }
}

/// Per-request failure reported by the batch resolver
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("source map fetch failed")]
    Fetch(#[source] FetchError),

    #[error("parse token error")]
    Token(#[source] TokenError),

    #[error("invalid source map")]
    SourceMap(#[source] SourceMapError),

    #[error("parser init error: {0}")]
    Init(String),
}

impl From<FetchError> for ResolveError {
    fn from(err: FetchError) -> Self {
        ResolveError::Fetch(err)
    }
}

impl From<TokenError> for ResolveError {
    fn from(err: TokenError) -> Self {
        ResolveError::Token(err)
    }
}

impl From<SourceMapError> for ResolveError {
    fn from(err: SourceMapError) -> Self {
        ResolveError::SourceMap(err)
    }
}

impl ResolveError {
    /// Description safe to hand back to callers.
    ///
    /// Walks the source chain and joins each level with `": "`. Any URL in the text
    /// loses its credentials, query and fragment.
    pub fn sanitized(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut current: Option<&dyn StdError> = Some(self);
        while let Some(err) = current {
            let text = err.to_string();
            // Wrappers that already print their cause would otherwise repeat it.
            if !parts.last().is_some_and(|prev| prev.contains(&text)) {
                parts.push(text);
            }
            current = err.source();
        }
        redact_urls(&parts.join(": "))
    }
}

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[a-zA-Z][a-zA-Z0-9+.-]*://[^\s"'<>()]+"#).expect("valid URL pattern")
});

/// Strip userinfo, query and fragment from every URL found in `text`.
pub fn redact_urls(text: &str) -> String {
    URL_PATTERN
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let raw = &caps[0];
            match Url::parse(raw) {
                Ok(mut url) => {
                    let _ = url.set_username("");
                    let _ = url.set_password(None);
                    url.set_query(None);
                    url.set_fragment(None);
                    url.to_string()
                }
                Err(_) => raw.to_string(),
            }
        })
        .into_owned()
}
