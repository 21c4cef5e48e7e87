//! Line-delimited JSON tool loop.
//!
//! Each input line is `{"id"?, "tool", "arguments"}`; each output line is
//! `{"id"?, "result"}` or `{"id"?, "error"}`. One resolver, and so one cache, serves
//! the whole session.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use srcmap_engine::error::redact_urls;
use srcmap_engine::{BatchResolver, ResolutionRequest};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::AppError;

pub const TOOLS: [&str; 5] = [
    "parse_stack",
    "lookup_context",
    "unpack_sources",
    "cache_stats",
    "cache_clear",
];

const DEFAULT_LOOKUP_CONTEXT_LINES: u32 = 5;

/// Which tools a session exposes. A non-empty allow list wins over the block list.
#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    allow: Vec<String>,
    block: Vec<String>,
}

impl ToolFilter {
    pub fn new(allow: Vec<String>, block: Vec<String>) -> Self {
        Self { allow, block }
    }

    pub fn permits(&self, tool: &str) -> bool {
        if !self.allow.is_empty() {
            return self.allow.iter().any(|t| t == tool);
        }
        !self.block.iter().any(|t| t == tool)
    }

    pub fn enabled(&self) -> Vec<&'static str> {
        TOOLS.into_iter().filter(|t| self.permits(t)).collect()
    }
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    #[serde(default)]
    id: Option<Value>,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ToolReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolReply {
    fn from_outcome(id: Option<Value>, outcome: Result<Value, String>) -> Self {
        match outcome {
            Ok(result) => Self {
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Self {
                id,
                result: None,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ParseStackArgs {
    stacks: Vec<ResolutionRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupContextArgs {
    line: u32,
    column: u32,
    source_map_url: String,
    #[serde(default = "default_lookup_context_lines")]
    context_lines: u32,
}

fn default_lookup_context_lines() -> u32 {
    DEFAULT_LOOKUP_CONTEXT_LINES
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnpackSourcesArgs {
    source_map_url: String,
}

pub struct ToolServer {
    resolver: BatchResolver,
    filter: ToolFilter,
}

impl ToolServer {
    pub fn new(resolver: BatchResolver, filter: ToolFilter) -> Self {
        Self { resolver, filter }
    }

    /// Serve until `input` reaches end of file.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = ?self.filter.enabled(), "Tool server ready");

        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let reply = self.handle_line(&line).await;
            let mut encoded = serde_json::to_vec(&reply)?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
            output.flush().await?;
        }

        info!("Input closed, tool server stopping");
        Ok(())
    }

    pub async fn handle_line(&self, line: &str) -> ToolReply {
        let call: ToolCall = match serde_json::from_str(line) {
            Ok(call) => call,
            Err(e) => {
                warn!(error = %e, "Malformed tool call");
                return ToolReply::from_outcome(None, Err(format!("malformed request: {e}")));
            }
        };

        debug!(tool = %call.tool, "Tool call");
        let outcome = if !TOOLS.contains(&call.tool.as_str()) {
            Err(format!("unknown tool '{}'", call.tool))
        } else if !self.filter.permits(&call.tool) {
            Err(format!("tool '{}' is disabled", call.tool))
        } else {
            self.dispatch(&call.tool, call.arguments).await
        };

        ToolReply::from_outcome(call.id, outcome)
    }

    async fn dispatch(&self, tool: &str, arguments: Value) -> Result<Value, String> {
        match tool {
            "parse_stack" => {
                let args: ParseStackArgs = decode_arguments(arguments)?;
                let results = self.resolver.resolve(&args.stacks).await;
                if results.is_empty() {
                    return Err("No data could be parsed from the provided stack traces.".into());
                }
                to_value(&results)
            }
            "lookup_context" => {
                let args: LookupContextArgs = decode_arguments(arguments)?;
                let snippet = self
                    .resolver
                    .lookup_context(
                        &args.source_map_url,
                        args.line,
                        args.column,
                        args.context_lines,
                    )
                    .await
                    .map_err(|e| e.sanitized())?;
                to_value(&snippet)
            }
            "unpack_sources" => {
                let args: UnpackSourcesArgs = decode_arguments(arguments)?;
                let unpacked = self
                    .resolver
                    .unpack_sources(&args.source_map_url)
                    .await
                    .map_err(|e| e.sanitized())?;
                to_value(&unpacked)
            }
            "cache_stats" => to_value(&self.resolver.cache_stats()),
            "cache_clear" => {
                self.resolver.clear_cache();
                Ok(json!({ "cleared": true }))
            }
            other => Err(format!("unknown tool '{other}'")),
        }
    }
}

fn decode_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, String> {
    serde_json::from_value(arguments)
        .map_err(|e| redact_urls(&format!("invalid arguments: {e}")))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("failed to encode result: {e}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use reqwest::Method;
    use reqwest::header::HeaderMap;
    use srcmap_engine::{
        CacheStore, FetchError, HttpResponse, HttpTransport, ResolverConfig, SourceMapResolver,
    };

    use super::*;

    /// Transport for sessions that must never reach the network
    struct UnreachableTransport;

    #[async_trait]
    impl HttpTransport for UnreachableTransport {
        async fn send(
            &self,
            _method: Method,
            url: &str,
            _headers: HeaderMap,
        ) -> Result<HttpResponse, FetchError> {
            Err(FetchError::Transport(format!("offline: {url}")))
        }
    }

    fn server(filter: ToolFilter) -> ToolServer {
        let resolver = BatchResolver::with_parts(
            ResolverConfig::default(),
            Arc::new(UnreachableTransport),
            Arc::new(CacheStore::new(1024)),
            Arc::new(SourceMapResolver),
        );
        ToolServer::new(resolver, filter)
    }

    #[test]
    fn test_allow_list_wins_over_block_list() {
        let filter = ToolFilter::new(
            vec!["parse_stack".to_string()],
            vec!["parse_stack".to_string()],
        );
        assert!(filter.permits("parse_stack"));
        assert!(!filter.permits("unpack_sources"));

        let filter = ToolFilter::new(Vec::new(), vec!["unpack_sources".to_string()]);
        assert!(filter.permits("parse_stack"));
        assert!(!filter.permits("unpack_sources"));
        assert_eq!(filter.enabled().len(), TOOLS.len() - 1);
    }

    #[tokio::test]
    async fn test_cache_tools() {
        let server = server(ToolFilter::default());

        let reply = server
            .handle_line(r#"{"id": 1, "tool": "cache_stats"}"#)
            .await;
        assert_eq!(reply.id, Some(json!(1)));
        assert_eq!(
            reply.result,
            Some(json!({"entries": 0, "totalSize": 0, "maxSize": 1024}))
        );

        let reply = server.handle_line(r#"{"tool": "cache_clear"}"#).await;
        assert_eq!(reply.result, Some(json!({"cleared": true})));
    }

    #[tokio::test]
    async fn test_blocked_and_unknown_tools() {
        let server = server(ToolFilter::new(Vec::new(), vec!["unpack_sources".into()]));

        let call = json!({
            "tool": "unpack_sources",
            "arguments": {"sourceMapUrl": "https://a.test/x.map"}
        });
        let reply = server.handle_line(&call.to_string()).await;
        assert_eq!(reply.error.as_deref(), Some("tool 'unpack_sources' is disabled"));

        let reply = server.handle_line(r#"{"tool": "bogus"}"#).await;
        assert_eq!(reply.error.as_deref(), Some("unknown tool 'bogus'"));

        let reply = server.handle_line("not json").await;
        assert!(reply.error.unwrap().starts_with("malformed request"));
    }

    #[tokio::test]
    async fn test_parse_stack_reports_per_request_failures() {
        let server = server(ToolFilter::default());

        let reply = server
            .handle_line(
                r#"{"tool": "parse_stack", "arguments": {"stacks": [
                    {"line": 1, "column": 0, "sourceMapUrl": "ftp://files.test/a.map"},
                    {"line": 1, "column": 0, "sourceMapUrl": "https://cdn.test/a.map?sig=secret"}
                ]}}"#,
            )
            .await;

        let results = reply.result.unwrap();
        let results = results.as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["success"], json!(false));
        assert!(results[1]["error"].as_str().unwrap().contains("offline"));
        assert!(!results[1]["error"].as_str().unwrap().contains("secret"));

        let reply = server
            .handle_line(r#"{"tool": "parse_stack", "arguments": {"stacks": []}}"#)
            .await;
        assert!(reply.error.is_some());

        let reply = server
            .handle_line(r#"{"tool": "parse_stack", "arguments": {"stacks": [{"line": -1}]}}"#)
            .await;
        assert!(reply.error.unwrap().starts_with("invalid arguments"));
    }

    #[tokio::test]
    async fn test_run_writes_one_reply_per_line() {
        let server = server(ToolFilter::default());
        let input: &[u8] =
            b"{\"id\":\"a\",\"tool\":\"cache_stats\"}\n\n{\"id\":\"b\",\"tool\":\"nope\"}\n";
        let mut output = Vec::new();

        server.run(input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let replies: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], json!("a"));
        assert_eq!(replies[1]["error"], json!("unknown tool 'nope'"));
    }
}
