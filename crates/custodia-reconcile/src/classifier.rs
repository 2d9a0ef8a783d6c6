//! Scan classification.
//!
//! Pure mapping from one physical scan plus the expected ledger snapshot to
//! a [`ScanOutcome`]. No side effects; session-scoped dedup state is passed
//! in by the caller.

use std::collections::{HashMap, HashSet};

use custodia_core::types::{InventoryRecord, InventoryStatus, ScanOutcome};

/// Classify one scanned serial against the expected snapshot.
///
/// `expected` is the full inventory ledger frozen at session open; `seen`
/// holds the serials already scanned in this session.
///
/// Dedup wins over every other rule: a serial seen twice yields exactly one
/// non-duplicate outcome plus `Duplicate` for each repeat, regardless of
/// arrival order. `NotFound` is never produced here — it is assigned at
/// session close to expected in-store serials that were never scanned.
#[must_use]
pub fn classify(
    serial: &str,
    expected: &HashMap<String, InventoryRecord>,
    seen: &HashSet<String>,
) -> ScanOutcome {
    if seen.contains(serial) {
        return ScanOutcome::Duplicate;
    }

    match expected.get(serial) {
        None => ScanOutcome::UnexpectedPresent,
        Some(record) if record.status == InventoryStatus::InStore => ScanOutcome::FoundExpected,
        // Ledger says the item is loaned, sold, or archived, yet it was
        // just scanned inside the store.
        Some(_) => ScanOutcome::StatusIncongruent,
    }
}

/// The expected in-store serials: the subset of the frozen snapshot a
/// physical count should encounter. Serials from this set that were never
/// scanned become `NotFound` at session close.
#[must_use]
pub fn expected_in_store(expected: &HashMap<String, InventoryRecord>) -> HashSet<String> {
    expected
        .iter()
        .filter(|(_, record)| record.status == InventoryStatus::InStore)
        .map(|(serial, _)| serial.clone())
        .collect()
}
