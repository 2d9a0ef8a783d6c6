//! Workflow side of the Custodia engine.
//!
//! Consumes inconsistency facts produced by `custodia-reconcile` and drives
//! them to resolution under a service-level deadline:
//!
//! - [`scheduler`] — workflow step execution (approval / notification /
//!   auto-action), role-gated movement approvals, expiry sweeps, and the
//!   router from inconsistency kinds to resolution reasons.
//! - [`sla`] — deadline clocks, overdue detection, monotone escalation with
//!   interval-gated re-notification.
//! - [`store`] — the backing-store contract plus an in-memory
//!   implementation.
//! - [`decision`] — the pure role-gating predicate.
//! - [`job`] — the background tick expiring approvals and escalating
//!   overdue trackers.
//!
//! Rejected or expired approvals cancel the owning instance entirely; see
//! the crate's design notes for the rationale.

pub mod decision;
pub mod job;
pub mod scheduler;
pub mod sla;
pub mod store;

pub use decision::role_permits;
pub use job::{EscalationJob, EscalationJobError, EscalationStats, DEFAULT_POLL_INTERVAL_SECS};
pub use scheduler::{ApprovalScheduler, InconsistencyRouter, ResolutionOutcome};
pub use sla::{SlaConfig, SlaTickStats, SlaTracker};
pub use store::{InMemoryWorkflowStore, WorkflowStore};
