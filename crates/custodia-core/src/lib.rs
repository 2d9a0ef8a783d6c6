//! Shared domain model for the Custodia reconciliation and workflow engine.
//!
//! Custodia tracks physical assets that move between a secure store and the
//! outside world via loans. Two independently updated records — the loan
//! ledger and the inventory ledger — must stay mutually consistent despite
//! asynchronous writers, partial failures, and periodic physical audits.
//!
//! This crate holds what every other Custodia crate shares:
//!
//! - the domain records and status enums ([`types`]),
//! - the error taxonomy ([`error`]),
//! - the port traits the host environment implements ([`ports`]),
//! - in-memory port implementations for tests and embedding ([`memory`]).
//!
//! The reconciliation side (scan classification, audit sessions, the
//! consistency monitor) lives in `custodia-reconcile`; the resolution side
//! (approval scheduling, SLA tracking, escalation) in `custodia-workflow`.

pub mod error;
pub mod memory;
pub mod ports;
pub mod types;

pub use error::{Error, Result};
pub use ports::{
    AutoActionPort, InconsistencySink, LedgerPort, NotificationPort, RoleResolver,
    WorkflowDefinitionStore,
};
pub use types::{
    ApprovalDecision, ApprovalId, ApprovalStatus, AuditSession, Inconsistency, InconsistencyKind,
    InstanceId, InstanceStatus, InventoryRecord, InventoryStatus, ItemId, LoanId, LoanRecord,
    LoanStatus, MovementApproval, ReasonDefinition, ReasonId, Role, ScanOutcome, ScanRecord,
    SessionId, SessionStatus, Severity, SeverityThresholds, SlaId, SlaStatus, SlaTracking,
    StepDefinition, StepId, StepKind, WorkflowInstance,
};
