use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceMapError {
    #[error("source map is not valid JSON")]
    Json(#[source] Arc<serde_json::Error>),
    #[error("unsupported source map version {0}")]
    UnsupportedVersion(u64),
    #[error("indexed source maps are not supported")]
    IndexedMap,
    #[error("missing or invalid sources array")]
    MissingSources,
    #[error("invalid base64 character {0:?} in mappings")]
    InvalidBase64(char),
    #[error("truncated VLQ value in mappings")]
    TruncatedVlq,
    #[error("VLQ value does not fit in 32 bits")]
    VlqOverflow,
    #[error("mapping segment with {0} fields")]
    InvalidSegment(usize),
    #[error("mapping field out of range")]
    OutOfRange,
    #[error("line numbers start at 1")]
    InvalidLine,
    #[error("no mapping found for {line}:{column}")]
    NoMapping { line: u32, column: u32 },
}

impl From<serde_json::Error> for SourceMapError {
    fn from(err: serde_json::Error) -> Self {
        SourceMapError::Json(Arc::new(err))
    }
}
