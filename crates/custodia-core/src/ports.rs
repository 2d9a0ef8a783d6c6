//! External port contracts.
//!
//! The host environment owns authentication, storage, notification delivery,
//! and workflow configuration; Custodia consumes them through these traits
//! only. The monitor and the scheduler never bypass the ledger port to
//! mutate ledgers from cached state.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    Inconsistency, InventoryRecord, ItemId, LoanId, LoanRecord, LoanStatus, ReasonDefinition,
    ReasonId, Role, Severity, StepDefinition,
};

/// Read/write access to the loan and inventory ledgers.
///
/// The single source of truth for asset state. Reads during a monitor poll
/// may fail transiently (the previous snapshot is retained); write failures
/// always surface so the caller can retry explicitly.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// All loans whose status keeps the device outside the store.
    async fn active_loans(&self) -> Result<Vec<LoanRecord>>;

    /// The inventory row for one asset, if the ledger knows it.
    async fn inventory(&self, item_id: ItemId) -> Result<Option<InventoryRecord>>;

    /// The full inventory ledger. Audit sessions freeze this as the
    /// expected snapshot at open time.
    async fn list_inventory(&self) -> Result<Vec<InventoryRecord>>;

    /// Propose an administrative correction to a loan.
    async fn apply_correction(
        &self,
        loan_id: LoanId,
        new_status: LoanStatus,
        reason: &str,
    ) -> Result<LoanRecord>;
}

/// Ordered step definitions per discrepancy reason.
#[async_trait]
pub trait WorkflowDefinitionStore: Send + Sync {
    /// The reason definition, including its SLA window.
    async fn reason(&self, reason_id: ReasonId) -> Result<Option<ReasonDefinition>>;

    /// Steps for a reason, ordered by `step_order`.
    async fn steps_for_reason(&self, reason_id: ReasonId) -> Result<Vec<StepDefinition>>;
}

/// Fire-and-forget notification delivery. The core never consumes a return
/// value; delivery failures are the transport's problem.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, severity: Severity, message: &str, payload: serde_json::Value);
}

/// Role resolution for acting principals, consulted before an approval
/// decision is accepted.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// The current role of a principal.
    async fn current_role(&self, principal: Uuid) -> Result<Role>;
}

/// External effect invoked by an `auto_action` workflow step. Retry policy
/// is the host's: on failure the instance stays on the step and a later
/// `advance` call retries.
#[async_trait]
pub trait AutoActionPort: Send + Sync {
    /// Execute the effect for one step.
    async fn execute(
        &self,
        loan_id: LoanId,
        step: &StepDefinition,
    ) -> Result<()>;
}

/// Consumer of newly detected inconsistency facts. The monitor runner feeds
/// each new fact here; the workflow side routes it to a reason and opens a
/// resolution workflow.
#[async_trait]
pub trait InconsistencySink: Send + Sync {
    /// Handle one newly detected fact.
    async fn on_inconsistency(&self, fact: &Inconsistency) -> Result<()>;
}
