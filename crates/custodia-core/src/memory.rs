//! In-memory port implementations.
//!
//! Used as test fixtures and as defaults for embedding hosts that keep
//! ledger state in process. Backed by `tokio::sync::RwLock` maps.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ports::{
    AutoActionPort, InconsistencySink, LedgerPort, NotificationPort, RoleResolver,
    WorkflowDefinitionStore,
};
use crate::types::{
    Inconsistency, InventoryRecord, ItemId, LoanId, LoanRecord, LoanStatus, ReasonDefinition,
    ReasonId, Role, Severity, StepDefinition,
};

/// In-memory loan and inventory ledgers.
///
/// A poisoned flag simulates transient backend unavailability for failure
/// path tests: while set, every read and write fails with
/// [`Error::TransientFetch`].
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    loans: Arc<RwLock<HashMap<LoanId, LoanRecord>>>,
    inventory: Arc<RwLock<HashMap<ItemId, InventoryRecord>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl InMemoryLedger {
    /// Create empty ledgers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a loan row.
    pub async fn put_loan(&self, loan: LoanRecord) {
        self.loans.write().await.insert(loan.id, loan);
    }

    /// Insert or replace an inventory row.
    pub async fn put_inventory(&self, record: InventoryRecord) {
        self.inventory.write().await.insert(record.item_id, record);
    }

    /// Overwrite the status of an inventory row.
    pub async fn set_inventory_status(
        &self,
        item_id: ItemId,
        status: crate::types::InventoryStatus,
    ) {
        if let Some(record) = self.inventory.write().await.get_mut(&item_id) {
            record.status = status;
        }
    }

    /// Toggle simulated backend unavailability.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    async fn check_available(&self) -> Result<()> {
        if *self.unavailable.read().await {
            return Err(Error::TransientFetch("ledger backend unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerPort for InMemoryLedger {
    async fn active_loans(&self) -> Result<Vec<LoanRecord>> {
        self.check_available().await?;
        let loans = self.loans.read().await;
        Ok(loans
            .values()
            .filter(|loan| loan.status.is_out())
            .cloned()
            .collect())
    }

    async fn inventory(&self, item_id: ItemId) -> Result<Option<InventoryRecord>> {
        self.check_available().await?;
        Ok(self.inventory.read().await.get(&item_id).cloned())
    }

    async fn list_inventory(&self) -> Result<Vec<InventoryRecord>> {
        self.check_available().await?;
        Ok(self.inventory.read().await.values().cloned().collect())
    }

    async fn apply_correction(
        &self,
        loan_id: LoanId,
        new_status: LoanStatus,
        reason: &str,
    ) -> Result<LoanRecord> {
        self.check_available().await?;
        let mut loans = self.loans.write().await;
        let loan = loans
            .get_mut(&loan_id)
            .ok_or_else(|| Error::Validation(format!("Unknown loan: {loan_id}")))?;

        loan.status = new_status;
        loan.corrected_at = Some(Utc::now());
        loan.correction_reason = Some(reason.to_string());
        if matches!(new_status, LoanStatus::Returned) && loan.returned_at.is_none() {
            loan.returned_at = loan.corrected_at;
        }

        tracing::info!(
            loan_id = %loan_id,
            new_status = %new_status,
            reason,
            "Applied loan correction"
        );

        Ok(loan.clone())
    }
}

/// In-memory workflow definition store.
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    reasons: Arc<RwLock<HashMap<ReasonId, ReasonDefinition>>>,
    steps: Arc<RwLock<HashMap<ReasonId, Vec<StepDefinition>>>>,
}

impl InMemoryDefinitionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reason and its ordered steps.
    pub async fn put_reason(&self, reason: ReasonDefinition, mut steps: Vec<StepDefinition>) {
        steps.sort_by_key(|step| step.step_order);
        self.steps.write().await.insert(reason.id, steps);
        self.reasons.write().await.insert(reason.id, reason);
    }
}

#[async_trait]
impl WorkflowDefinitionStore for InMemoryDefinitionStore {
    async fn reason(&self, reason_id: ReasonId) -> Result<Option<ReasonDefinition>> {
        Ok(self.reasons.read().await.get(&reason_id).cloned())
    }

    async fn steps_for_reason(&self, reason_id: ReasonId) -> Result<Vec<StepDefinition>> {
        Ok(self
            .steps
            .read()
            .await
            .get(&reason_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct RecordedNotification {
    /// Severity the core attached.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Structured payload.
    pub payload: serde_json::Value,
}

/// Notification port that records everything it is asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<RecordedNotification>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications delivered so far.
    pub async fn sent(&self) -> Vec<RecordedNotification> {
        self.sent.read().await.clone()
    }

    /// Number of notifications delivered so far.
    pub async fn count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(&self, severity: Severity, message: &str, payload: serde_json::Value) {
        self.sent.write().await.push(RecordedNotification {
            severity,
            message: message.to_string(),
            payload,
        });
    }
}

/// Role resolver over a fixed principal→role table.
#[derive(Debug, Default)]
pub struct StaticRoleResolver {
    roles: Arc<RwLock<HashMap<Uuid, Role>>>,
}

impl StaticRoleResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to a principal.
    pub async fn assign(&self, principal: Uuid, role: Role) {
        self.roles.write().await.insert(principal, role);
    }
}

#[async_trait]
impl RoleResolver for StaticRoleResolver {
    async fn current_role(&self, principal: Uuid) -> Result<Role> {
        self.roles
            .read()
            .await
            .get(&principal)
            .cloned()
            .ok_or_else(|| Error::Permission(format!("Unknown principal: {principal}")))
    }
}

/// Auto-action port that records invocations and can simulate failure.
#[derive(Debug, Default)]
pub struct RecordingActionPort {
    executed: Arc<RwLock<Vec<(LoanId, crate::types::StepId)>>>,
    failing: Arc<RwLock<bool>>,
}

impl RecordingActionPort {
    /// Create a port that succeeds on every invocation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated effect failure.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// Steps executed so far, in invocation order.
    pub async fn executed(&self) -> Vec<(LoanId, crate::types::StepId)> {
        self.executed.read().await.clone()
    }
}

#[async_trait]
impl AutoActionPort for RecordingActionPort {
    async fn execute(&self, loan_id: LoanId, step: &StepDefinition) -> Result<()> {
        if *self.failing.read().await {
            return Err(Error::TransientFetch("auto action backend unavailable".into()));
        }
        self.executed.write().await.push((loan_id, step.id));
        Ok(())
    }
}

/// Inconsistency sink that collects facts for inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    facts: Arc<RwLock<Vec<Inconsistency>>>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Facts received so far.
    pub async fn facts(&self) -> Vec<Inconsistency> {
        self.facts.read().await.clone()
    }
}

#[async_trait]
impl InconsistencySink for CollectingSink {
    async fn on_inconsistency(&self, fact: &Inconsistency) -> Result<()> {
        self.facts.write().await.push(fact.clone());
        Ok(())
    }
}
