//! Reconciliation side of the Custodia engine.
//!
//! Keeps the loan ledger and the inventory ledger honest against each other
//! and against physical reality:
//!
//! - [`classifier`] — pure mapping from one physical scan plus the expected
//!   ledger snapshot to a scan outcome.
//! - [`session`] — audit session lifecycle (`open → scan* → closed`) with a
//!   frozen expected snapshot, live broadcast events, and close-time
//!   `not_found` computation.
//! - [`monitor`] — the consistency monitor: per-poll divergence detection,
//!   snapshot diffing, notify-once semantics, severity tiers.
//! - [`history`] — append-only log of detected inconsistency facts.
//! - [`cache`] — bounded TTL memoization for read-heavy query surfaces.
//! - [`runner`] — background poll loop owning its cancellation token.
//!
//! Resolution of flagged discrepancies lives in `custodia-workflow`.

pub mod cache;
pub mod classifier;
pub mod events;
pub mod history;
pub mod monitor;
pub mod runner;
pub mod session;

pub use cache::{AuditCache, CacheStats};
pub use classifier::{classify, expected_in_store};
pub use events::{SessionEvent, SessionEvents};
pub use history::InconsistencyHistory;
pub use monitor::{
    default_divergence, ConsistencyMonitor, DivergencePredicate, MonitorConfig, MonitorReport,
};
pub use runner::MonitorRunner;
pub use session::{AuditSessionManager, AuditSummary};
