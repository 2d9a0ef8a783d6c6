//! Append-only history of observed inconsistency facts.
//!
//! Facts are persisted on detection and immutable thereafter; the live set
//! itself stays derived (recomputed each poll). Paged reads go through the
//! audit cache to bound read amplification from history views.

use std::sync::Mutex;
use std::time::Duration;

use custodia_core::error::{Error, Result};
use custodia_core::types::Inconsistency;

use crate::cache::{AuditCache, CacheStats};

/// Default TTL for memoized history pages.
const HISTORY_CACHE_MAX_AGE: Duration = Duration::from_secs(60);

/// Default capacity of the history page cache.
const HISTORY_CACHE_MAX_SIZE: usize = 64;

/// In-memory log of every inconsistency the monitor has detected.
pub struct InconsistencyHistory {
    entries: Mutex<Vec<Inconsistency>>,
    page_cache: AuditCache<(usize, usize, usize), Vec<Inconsistency>>,
}

impl InconsistencyHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            page_cache: AuditCache::new(HISTORY_CACHE_MAX_AGE, HISTORY_CACHE_MAX_SIZE),
        }
    }

    /// Append newly detected facts.
    pub fn append(&self, facts: &[Inconsistency]) {
        if facts.is_empty() {
            return;
        }
        self.lock().extend_from_slice(facts);
    }

    /// Total facts recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no fact has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// One page of history, newest first. Pages are memoized keyed by the
    /// current log length, so a page can never serve entries from before an
    /// append it should include.
    pub fn page(&self, page: usize, page_size: usize) -> Result<Vec<Inconsistency>> {
        if page_size == 0 {
            return Err(Error::Validation("Page size must be positive".into()));
        }

        let entries = self.lock();
        let key = (entries.len(), page, page_size);
        if let Some(cached) = self.page_cache.get(&key) {
            return Ok(cached);
        }

        let records: Vec<Inconsistency> = entries
            .iter()
            .rev()
            .skip(page * page_size)
            .take(page_size)
            .cloned()
            .collect();
        drop(entries);

        self.page_cache.set(key, records.clone());
        Ok(records)
    }

    /// Hit/miss accounting for the history page cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.page_cache.stats()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Inconsistency>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for InconsistencyHistory {
    fn default() -> Self {
        Self::new()
    }
}
