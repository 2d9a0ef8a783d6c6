//! Audit session lifecycle: `open → (scan)* → closed`.
//!
//! One session per scope may be open at a time. The expected inventory
//! snapshot is frozen at open so a count is not chasing a moving target;
//! scans classify against that snapshot and append immutable records.
//! Closing computes the final `not_found` set and freezes the session.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;

use custodia_core::error::{Error, Result};
use custodia_core::ports::LedgerPort;
use custodia_core::types::{
    AuditSession, InventoryRecord, ScanOutcome, ScanRecord, SessionId, SessionStatus,
};

use crate::cache::AuditCache;
use crate::classifier;
use crate::events::{SessionEvent, SessionEvents};

/// Default TTL for memoized closed-session scan pages.
const PAGE_CACHE_MAX_AGE: Duration = Duration::from_secs(300);

/// Default capacity of the scan page cache.
const PAGE_CACHE_MAX_SIZE: usize = 128;

/// Per-outcome tallies returned when a session closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSummary {
    /// Expected in store and scanned.
    pub found_expected: usize,
    /// Scanned but absent from the ledger.
    pub unexpected_present: usize,
    /// Repeat scans.
    pub duplicate: usize,
    /// Ledger status contradicted physical presence.
    pub status_incongruent: usize,
    /// Expected in store, never scanned.
    pub not_found: usize,
    /// Serials that were never scanned, in no particular order.
    pub missing_serials: Vec<String>,
}

impl AuditSummary {
    fn record(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::FoundExpected => self.found_expected += 1,
            ScanOutcome::UnexpectedPresent => self.unexpected_present += 1,
            ScanOutcome::Duplicate => self.duplicate += 1,
            ScanOutcome::StatusIncongruent => self.status_incongruent += 1,
            ScanOutcome::NotFound => self.not_found += 1,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    info: AuditSession,
    /// Full inventory snapshot keyed by serial, frozen at open.
    expected: HashMap<String, InventoryRecord>,
    /// Serials scanned so far, for dedup.
    seen: HashSet<String>,
    /// Append-only scan list, ordered by arrival.
    scans: Vec<ScanRecord>,
}

/// Owns audit session state and drives the open/scan/close lifecycle.
pub struct AuditSessionManager {
    ledger: Arc<dyn LedgerPort>,
    events: SessionEvents,
    sessions: RwLock<HashMap<SessionId, SessionState>>,
    open_by_scope: RwLock<HashMap<String, SessionId>>,
    page_cache: AuditCache<(SessionId, usize, usize), Vec<ScanRecord>>,
}

impl AuditSessionManager {
    /// Create a manager reading expected state through the given ledger.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerPort>) -> Self {
        Self {
            ledger,
            events: SessionEvents::default(),
            sessions: RwLock::new(HashMap::new()),
            open_by_scope: RwLock::new(HashMap::new()),
            page_cache: AuditCache::new(PAGE_CACHE_MAX_AGE, PAGE_CACHE_MAX_SIZE),
        }
    }

    /// Subscribe to live session events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Open an audit session for a scope, freezing the expected inventory
    /// snapshot. A second open for the same scope is a conflict.
    pub async fn open(&self, scope: &str) -> Result<AuditSession> {
        if let Some(existing) = self.open_by_scope.read().await.get(scope) {
            return Err(Error::Conflict(format!(
                "Audit session {existing} already open for scope {scope}"
            )));
        }

        let snapshot = self.ledger.list_inventory().await?;
        let expected: HashMap<String, InventoryRecord> = snapshot
            .into_iter()
            .map(|record| (record.serial.clone(), record))
            .collect();

        let mut by_scope = self.open_by_scope.write().await;
        // Re-check under the write lock: another open may have won the race
        // while the snapshot was being fetched.
        if let Some(existing) = by_scope.get(scope) {
            return Err(Error::Conflict(format!(
                "Audit session {existing} already open for scope {scope}"
            )));
        }

        let info = AuditSession {
            id: SessionId::new(),
            scope: scope.to_string(),
            opened_at: Utc::now(),
            closed_at: None,
            status: SessionStatus::Open,
            scan_count: 0,
        };

        tracing::info!(
            session_id = %info.id,
            scope,
            expected = expected.len(),
            "Opened audit session"
        );

        by_scope.insert(scope.to_string(), info.id);
        self.sessions.write().await.insert(
            info.id,
            SessionState {
                info: info.clone(),
                expected,
                seen: HashSet::new(),
                scans: Vec::new(),
            },
        );

        Ok(info)
    }

    /// Classify and append one scan. Scanning a closed or unknown session
    /// fails with a conflict rather than being silently dropped.
    pub async fn record_scan(&self, session_id: SessionId, serial: &str) -> Result<ScanRecord> {
        if serial.is_empty() {
            return Err(Error::Validation("Empty scan serial".into()));
        }

        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::Conflict(format!("Unknown audit session: {session_id}")))?;

        if state.info.status == SessionStatus::Closed {
            return Err(Error::Conflict(format!(
                "Audit session {session_id} is closed"
            )));
        }

        let outcome = classifier::classify(serial, &state.expected, &state.seen);
        let record = ScanRecord {
            session_id,
            serial: serial.to_string(),
            outcome,
            scanned_at: Utc::now(),
        };

        state.seen.insert(serial.to_string());
        state.scans.push(record.clone());
        state.info.scan_count = state.scans.len();

        tracing::debug!(
            session_id = %session_id,
            serial,
            outcome = %outcome,
            "Recorded audit scan"
        );

        self.events.publish(SessionEvent::ScanAppended {
            session_id,
            serial: record.serial.clone(),
            outcome,
            scanned_at: record.scanned_at,
        });

        Ok(record)
    }

    /// Close a session: compute the `not_found` set, freeze the scan list,
    /// and publish the closure. Closing twice is a conflict.
    pub async fn close(&self, session_id: SessionId) -> Result<AuditSummary> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::Conflict(format!("Unknown audit session: {session_id}")))?;

        if state.info.status == SessionStatus::Closed {
            return Err(Error::Conflict(format!(
                "Audit session {session_id} is already closed"
            )));
        }

        let closed_at = Utc::now();
        let mut summary = AuditSummary::default();
        for scan in &state.scans {
            summary.record(scan.outcome);
        }

        let mut missing: Vec<String> = classifier::expected_in_store(&state.expected)
            .into_iter()
            .filter(|serial| !state.seen.contains(serial))
            .collect();
        missing.sort();

        for serial in &missing {
            let record = ScanRecord {
                session_id,
                serial: serial.clone(),
                outcome: ScanOutcome::NotFound,
                scanned_at: closed_at,
            };
            summary.record(record.outcome);
            state.scans.push(record);
        }
        summary.missing_serials = missing;

        state.info.status = SessionStatus::Closed;
        state.info.closed_at = Some(closed_at);
        state.info.scan_count = state.scans.len();

        self.open_by_scope
            .write()
            .await
            .remove(&state.info.scope);

        tracing::info!(
            session_id = %session_id,
            scope = %state.info.scope,
            scans = state.info.scan_count,
            not_found = summary.not_found,
            "Closed audit session"
        );

        self.events.publish(SessionEvent::SessionClosed {
            session_id,
            scan_count: state.info.scan_count,
            closed_at,
        });

        Ok(summary)
    }

    /// Current session metadata, if the session exists.
    pub async fn session(&self, session_id: SessionId) -> Option<AuditSession> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|state| state.info.clone())
    }

    /// One page of a session's scan list, ordered by arrival. Pages of
    /// closed sessions are memoized through the audit cache; the session is
    /// immutable once closed, so cached pages cannot go stale.
    pub async fn scan_page(
        &self,
        session_id: SessionId,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<ScanRecord>> {
        if page_size == 0 {
            return Err(Error::Validation("Page size must be positive".into()));
        }

        let key = (session_id, page, page_size);
        let sessions = self.sessions.read().await;
        let state = sessions
            .get(&session_id)
            .ok_or_else(|| Error::Conflict(format!("Unknown audit session: {session_id}")))?;

        let closed = state.info.status == SessionStatus::Closed;
        if closed {
            if let Some(cached) = self.page_cache.get(&key) {
                return Ok(cached);
            }
        }

        let records: Vec<ScanRecord> = state
            .scans
            .iter()
            .skip(page * page_size)
            .take(page_size)
            .cloned()
            .collect();

        if closed {
            self.page_cache.set(key, records.clone());
        }

        Ok(records)
    }

    /// Hit/miss accounting for the scan page cache.
    #[must_use]
    pub fn page_cache_stats(&self) -> crate::cache::CacheStats {
        self.page_cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custodia_core::memory::InMemoryLedger;
    use custodia_core::types::{InventoryStatus, ItemId};

    async fn ledger_with(serials: &[(&str, InventoryStatus)]) -> Arc<InMemoryLedger> {
        let ledger = Arc::new(InMemoryLedger::new());
        for (serial, status) in serials {
            ledger
                .put_inventory(InventoryRecord {
                    item_id: ItemId::new(),
                    serial: (*serial).to_string(),
                    status: *status,
                    last_seen_at: Utc::now(),
                })
                .await;
        }
        ledger
    }

    #[tokio::test]
    async fn test_second_open_same_scope_conflicts() {
        let ledger = ledger_with(&[]).await;
        let manager = AuditSessionManager::new(ledger);

        manager.open("store-1").await.unwrap();
        let err = manager.open("store-1").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // A different scope is fine.
        manager.open("store-2").await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_against_closed_session_fails() {
        let ledger = ledger_with(&[("A", InventoryStatus::InStore)]).await;
        let manager = AuditSessionManager::new(ledger);

        let session = manager.open("store-1").await.unwrap();
        manager.close(session.id).await.unwrap();

        let err = manager.record_scan(session.id, "A").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_close_computes_not_found_set() {
        let ledger = ledger_with(&[
            ("A", InventoryStatus::InStore),
            ("B", InventoryStatus::InStore),
            ("C", InventoryStatus::InStore),
            ("L", InventoryStatus::Loaned),
        ])
        .await;
        let manager = AuditSessionManager::new(ledger);

        let session = manager.open("store-1").await.unwrap();
        manager.record_scan(session.id, "A").await.unwrap();

        let summary = manager.close(session.id).await.unwrap();
        assert_eq!(summary.found_expected, 1);
        assert_eq!(summary.not_found, 2);
        assert_eq!(summary.missing_serials, vec!["B", "C"]);
        // Loaned items are not expected in store and do not become not_found.
    }

    #[tokio::test]
    async fn test_duplicate_scans_counted_once() {
        let ledger = ledger_with(&[("A", InventoryStatus::InStore)]).await;
        let manager = AuditSessionManager::new(ledger);

        let session = manager.open("store-1").await.unwrap();
        let first = manager.record_scan(session.id, "A").await.unwrap();
        let second = manager.record_scan(session.id, "A").await.unwrap();

        assert_eq!(first.outcome, ScanOutcome::FoundExpected);
        assert_eq!(second.outcome, ScanOutcome::Duplicate);

        let summary = manager.close(session.id).await.unwrap();
        assert_eq!(summary.found_expected, 1);
        assert_eq!(summary.duplicate, 1);
        assert_eq!(summary.not_found, 0);
    }

    #[tokio::test]
    async fn test_snapshot_frozen_at_open() {
        let ledger = ledger_with(&[("A", InventoryStatus::InStore)]).await;
        let manager = AuditSessionManager::new(ledger.clone());

        let session = manager.open("store-1").await.unwrap();

        // The ledger moves mid-audit; the session snapshot must not.
        ledger
            .put_inventory(InventoryRecord {
                item_id: ItemId::new(),
                serial: "NEW".into(),
                status: InventoryStatus::InStore,
                last_seen_at: Utc::now(),
            })
            .await;

        let scan = manager.record_scan(session.id, "NEW").await.unwrap();
        assert_eq!(scan.outcome, ScanOutcome::UnexpectedPresent);

        let summary = manager.close(session.id).await.unwrap();
        assert_eq!(summary.not_found, 1); // "A" only; "NEW" is not expected
    }

    #[tokio::test]
    async fn test_realtime_events_emitted() {
        let ledger = ledger_with(&[("A", InventoryStatus::InStore)]).await;
        let manager = AuditSessionManager::new(ledger);
        let mut rx = manager.subscribe();

        let session = manager.open("store-1").await.unwrap();
        manager.record_scan(session.id, "A").await.unwrap();
        manager.close(session.id).await.unwrap();

        match rx.recv().await.unwrap() {
            SessionEvent::ScanAppended { serial, .. } => assert_eq!(serial, "A"),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            SessionEvent::SessionClosed { scan_count, .. } => assert_eq!(scan_count, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scan_page_caches_closed_sessions_only() {
        let ledger = ledger_with(&[
            ("A", InventoryStatus::InStore),
            ("B", InventoryStatus::InStore),
        ])
        .await;
        let manager = AuditSessionManager::new(ledger);

        let session = manager.open("store-1").await.unwrap();
        manager.record_scan(session.id, "A").await.unwrap();

        // Open session: direct read, no cache writes.
        let page = manager.scan_page(session.id, 0, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(manager.page_cache_stats().len, 0);

        manager.close(session.id).await.unwrap();

        let first = manager.scan_page(session.id, 0, 10).await.unwrap();
        let second = manager.scan_page(session.id, 0, 10).await.unwrap();
        assert_eq!(first.len(), 2); // "A" + not_found "B"
        assert_eq!(first.len(), second.len());

        let stats = manager.page_cache_stats();
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_open_surfaces_ledger_failure() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_unavailable(true).await;
        let manager = AuditSessionManager::new(ledger);

        let err = manager.open("store-1").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_serial_rejected() {
        let ledger = ledger_with(&[]).await;
        let manager = AuditSessionManager::new(ledger);
        let session = manager.open("store-1").await.unwrap();

        let err = manager.record_scan(session.id, "").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
