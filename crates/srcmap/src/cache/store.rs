//! # Cache Store
//!
//! Bounded in-memory store of fetched resources keyed by URL. Entries carry the ETag
//! they were served with so the fetch layer can revalidate them later.
//!
//! Capacity is a byte budget. When a write would overflow it, entries are evicted in
//! ascending order of last access until the new entry fits. Size is never considered
//! when picking victims.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::types::{BYTES_PER_MB, CacheEntry, CacheError, CacheResult, CacheStats};

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, CacheEntry>,
    current_size: u64,
    /// Logical clock; every read hit and write takes the next tick.
    clock: u64,
}

impl StoreState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.current_size -= entry.size;
        Some(entry)
    }

    /// Drop least recently used entries until `needed` more bytes fit under `max_size`.
    fn evict_for(&mut self, needed: u64, max_size: u64) {
        if self.current_size + needed <= max_size {
            return;
        }

        let mut victims: Vec<(u64, String)> = self
            .entries
            .values()
            .map(|entry| (entry.last_accessed, entry.key.clone()))
            .collect();
        victims.sort_unstable();

        for (_, key) in victims {
            if self.current_size + needed <= max_size {
                break;
            }
            if let Some(evicted) = self.remove(&key) {
                debug!(url = %evicted.key, size = evicted.size, "Evicted cache entry");
            }
        }
    }
}

/// Size-bounded LRU cache of fetched resources
#[derive(Debug)]
pub struct CacheStore {
    state: Mutex<StoreState>,
    max_size: u64,
}

impl CacheStore {
    /// Create a store holding at most `max_size` bytes
    pub fn new(max_size: u64) -> Self {
        debug!(max_size, "Resource cache created");
        Self {
            state: Mutex::new(StoreState::default()),
            max_size,
        }
    }

    /// Create a store with its capacity given in megabytes
    pub fn with_capacity_mb(megabytes: u64) -> Self {
        Self::new(megabytes.saturating_mul(BYTES_PER_MB))
    }

    /// Look up an entry, refreshing its access time on a hit
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut state = self.state.lock();
        let tick = state.tick();
        let entry = state.entries.get_mut(key)?;
        entry.last_accessed = tick;
        Some(entry.clone())
    }

    /// Insert or replace the entry for `key`.
    ///
    /// Fails with [`CacheError::CapacityExceeded`] without touching the store when the
    /// payload alone is larger than the capacity.
    pub fn set(
        &self,
        key: impl Into<String>,
        payload: Bytes,
        etag: impl Into<String>,
    ) -> CacheResult<()> {
        let size = payload.len() as u64;
        if size > self.max_size {
            return Err(CacheError::CapacityExceeded {
                size,
                max_size: self.max_size,
            });
        }

        let key = key.into();
        let mut state = self.state.lock();

        // The old version of this key no longer counts against the budget.
        state.remove(&key);
        state.evict_for(size, self.max_size);

        let tick = state.tick();
        let entry = CacheEntry::new(key.clone(), payload, etag.into(), tick);
        state.current_size += entry.size;
        state.entries.insert(key, entry);

        debug_assert!(state.current_size <= self.max_size);
        Ok(())
    }

    /// Current occupancy
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            total_size: state.current_size,
            max_size: self.max_size,
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.current_size = 0;
        debug!("Resource cache cleared");
    }

    /// Capacity in bytes
    pub fn max_size(&self) -> u64 {
        self.max_size
    }
}
