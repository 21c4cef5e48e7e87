//! # Cache Types
//!
//! This module defines common types used across the caching system.

use bytes::Bytes;
use serde::Serialize;

/// Number of bytes in one megabyte of cache capacity
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default cache capacity in megabytes
pub const DEFAULT_CACHE_SIZE_MB: u64 = 200;

/// A fetched resource held by the [`CacheStore`](super::CacheStore)
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// URL of the resource
    pub key: String,
    /// ETag returned with the payload, replayed as `If-None-Match`
    pub etag: String,
    /// Response body bytes
    pub payload: Bytes,
    /// Byte length of `payload`
    pub size: u64,
    /// Logical timestamp of the last read or write
    pub last_accessed: u64,
}

impl CacheEntry {
    pub(crate) fn new(key: String, payload: Bytes, etag: String, tick: u64) -> Self {
        Self {
            key,
            etag,
            size: payload.len() as u64,
            payload,
            last_accessed: tick,
        }
    }
}

/// Snapshot of the cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entries currently stored
    pub entries: usize,
    /// Sum of all entry sizes in bytes
    pub total_size: u64,
    /// Capacity in bytes
    pub max_size: u64,
}

/// Errors raised when writing to the cache
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Resource size {size} bytes exceeds maximum cache size {max_size} bytes")]
    CapacityExceeded { size: u64, max_size: u64 },
}

/// Result of a cache write
pub type CacheResult<T> = std::result::Result<T, CacheError>;
