//! Audit session behavior across a full physical count.

use std::sync::Arc;

use chrono::Utc;

use custodia_core::memory::InMemoryLedger;
use custodia_core::types::{InventoryRecord, InventoryStatus, ItemId, ScanOutcome};
use custodia_reconcile::{AuditSessionManager, SessionEvent};

async fn seeded_ledger() -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    let rows = [
        ("STOCK-1", InventoryStatus::InStore),
        ("STOCK-2", InventoryStatus::InStore),
        ("STOCK-3", InventoryStatus::InStore),
        ("OUT-1", InventoryStatus::Loaned),
        ("GONE-1", InventoryStatus::Sold),
    ];
    for (serial, status) in rows {
        ledger
            .put_inventory(InventoryRecord {
                item_id: ItemId::new(),
                serial: serial.to_string(),
                status,
                last_seen_at: Utc::now(),
            })
            .await;
    }
    ledger
}

#[tokio::test]
async fn full_count_produces_all_outcome_kinds() {
    let manager = AuditSessionManager::new(seeded_ledger().await);
    let session = manager.open("store-main").await.unwrap();

    // One expected scan, one repeat, one item the ledger says is loaned,
    // and one serial the ledger has never heard of.
    let outcomes = [
        ("STOCK-1", ScanOutcome::FoundExpected),
        ("STOCK-1", ScanOutcome::Duplicate),
        ("OUT-1", ScanOutcome::StatusIncongruent),
        ("GONE-1", ScanOutcome::StatusIncongruent),
        ("MYSTERY", ScanOutcome::UnexpectedPresent),
    ];
    for (serial, expected) in outcomes {
        let record = manager.record_scan(session.id, serial).await.unwrap();
        assert_eq!(record.outcome, expected, "serial {serial}");
    }

    // STOCK-2 and STOCK-3 were never scanned.
    let summary = manager.close(session.id).await.unwrap();
    assert_eq!(summary.found_expected, 1);
    assert_eq!(summary.duplicate, 1);
    assert_eq!(summary.status_incongruent, 2);
    assert_eq!(summary.unexpected_present, 1);
    assert_eq!(summary.not_found, 2);
    assert_eq!(summary.missing_serials, vec!["STOCK-2", "STOCK-3"]);

    let session = manager.session(session.id).await.unwrap();
    assert_eq!(session.scan_count, 7);
}

#[tokio::test]
async fn dedup_holds_for_any_arrival_order() {
    for order in [
        ["STOCK-1", "OUT-1", "STOCK-1", "OUT-1"],
        ["OUT-1", "STOCK-1", "OUT-1", "STOCK-1"],
    ] {
        let manager = AuditSessionManager::new(seeded_ledger().await);
        let session = manager.open("store-main").await.unwrap();

        let mut primaries = 0;
        let mut duplicates = 0;
        for serial in order {
            let record = manager.record_scan(session.id, serial).await.unwrap();
            if record.outcome == ScanOutcome::Duplicate {
                duplicates += 1;
            } else {
                primaries += 1;
            }
        }

        assert_eq!(primaries, 2, "one primary outcome per serial");
        assert_eq!(duplicates, 2, "one duplicate per repeat");
    }
}

#[tokio::test]
async fn subscribers_see_live_scans_and_closure() {
    let manager = AuditSessionManager::new(seeded_ledger().await);
    let mut rx = manager.subscribe();

    let session = manager.open("store-main").await.unwrap();
    manager.record_scan(session.id, "STOCK-1").await.unwrap();
    manager.record_scan(session.id, "STOCK-2").await.unwrap();
    manager.close(session.id).await.unwrap();

    let mut appended = 0;
    let mut closed = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            SessionEvent::ScanAppended { .. } => appended += 1,
            SessionEvent::SessionClosed { scan_count, .. } => {
                closed += 1;
                // Two live scans plus the close-time not_found row.
                assert_eq!(scan_count, 3);
            }
        }
    }
    assert_eq!(appended, 2);
    assert_eq!(closed, 1);
}

#[tokio::test]
async fn scope_reopens_after_close() {
    let manager = AuditSessionManager::new(seeded_ledger().await);

    let first = manager.open("store-main").await.unwrap();
    manager.close(first.id).await.unwrap();

    // Closing released the scope; a fresh count may begin.
    let second = manager.open("store-main").await.unwrap();
    assert_ne!(first.id, second.id);
}
