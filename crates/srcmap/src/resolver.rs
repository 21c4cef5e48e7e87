//! # Token Resolvers
//!
//! The seam between the batch layer and whatever turns a generated position into an
//! original one. Implementations return raw JSON which the batch layer validates
//! before it reaches callers.

use async_trait::async_trait;
use tracing::debug;

use crate::error::TokenError;
use crate::sourcemap::SourceMap;

#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// One-time setup, called before the first resolution.
    async fn init(&self) -> Result<(), TokenError> {
        Ok(())
    }

    /// Resolve `line:column` in the generated file described by `source_map`.
    ///
    /// Returns the snake_case token JSON:
    /// `{line, column, src, source_code: [{line, is_stack_line, raw}]}`.
    async fn generate_token(
        &self,
        line: u32,
        column: u32,
        source_map: &str,
        context_lines: u32,
    ) -> Result<String, TokenError>;
}

/// Resolver backed by the built-in Source Map v3 decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceMapResolver;

#[async_trait]
impl TokenResolver for SourceMapResolver {
    async fn generate_token(
        &self,
        line: u32,
        column: u32,
        source_map: &str,
        context_lines: u32,
    ) -> Result<String, TokenError> {
        let map = SourceMap::parse(source_map)?;
        let token = map.token_for(line, column, context_lines)?;
        debug!(line, column, src = %token.src, "Resolved token");
        Ok(serde_json::to_string(&token)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sourcemap::tests::APP_MAP;
    use crate::token::parse_raw_token;

    #[tokio::test]
    async fn test_source_map_resolver_output_validates() {
        let raw = SourceMapResolver
            .generate_token(1, 9, APP_MAP, 1)
            .await
            .unwrap();
        let token = parse_raw_token(&raw).unwrap();

        assert_eq!(token.src, "webpack:///src/app.ts");
        assert_eq!((token.line, token.column), (2, 2));
        assert_eq!(token.source_code.len(), 3);
    }

    #[tokio::test]
    async fn test_source_map_resolver_rejects_garbage() {
        let err = SourceMapResolver
            .generate_token(1, 0, "not a map", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::SourceMap(_)));
    }
}
