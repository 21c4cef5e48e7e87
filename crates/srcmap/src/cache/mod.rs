//! # Cache System
//!
//! In-memory storage for fetched source maps. Entries keep the validator they were
//! served with so that later fetches can be revalidated instead of re-downloaded.

// Module declarations
mod store;
mod types;
mod utils;

// Re-export primary types from our various modules
pub use store::CacheStore;
pub use types::{
    BYTES_PER_MB, CacheEntry, CacheError, CacheResult, CacheStats, DEFAULT_CACHE_SIZE_MB,
};
pub use utils::extract_etag;
