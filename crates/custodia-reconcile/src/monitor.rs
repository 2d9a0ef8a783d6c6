//! Consistency monitor: detects divergence between the loan ledger and the
//! inventory ledger.
//!
//! Each poll recomputes the full inconsistency set, diffs it against the
//! previous snapshot by identity, and notifies exactly once per new
//! detection. All state is owned by the monitor instance, so independent
//! scopes can run their own monitors side by side.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use custodia_core::error::Result;
use custodia_core::ports::{LedgerPort, NotificationPort};
use custodia_core::types::{
    Inconsistency, InconsistencyKind, InventoryRecord, InventoryStatus, ItemId, LoanId,
    LoanRecord, LoanStatus, Severity, SeverityThresholds,
};

use crate::history::InconsistencyHistory;

/// Divergence predicate: given a loan and its linked inventory record,
/// decide whether the pair diverges and how. The full rule table is
/// ledger-specific business logic owned by the host.
pub type DivergencePredicate =
    dyn Fn(&LoanRecord, Option<&InventoryRecord>) -> Option<InconsistencyKind> + Send + Sync;

/// Built-in divergence rule table.
///
/// Flags an out-loan whose inventory is not `loaned`, a finished loan whose
/// inventory still says `loaned`, and loans referencing unknown items.
#[must_use]
pub fn default_divergence(
    loan: &LoanRecord,
    inventory: Option<&InventoryRecord>,
) -> Option<InconsistencyKind> {
    let Some(inventory) = inventory else {
        return Some(InconsistencyKind::MissingInventory);
    };

    match loan.status {
        LoanStatus::Active | LoanStatus::Overdue => {
            (inventory.status != InventoryStatus::Loaned)
                .then_some(InconsistencyKind::ActiveLoanNotLoaned)
        }
        LoanStatus::Returned => (inventory.status == InventoryStatus::Loaned)
            .then_some(InconsistencyKind::ReturnedStillLoaned),
        LoanStatus::Sold => {
            (inventory.status != InventoryStatus::Sold).then_some(InconsistencyKind::SoldMismatch)
        }
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Severity tier thresholds.
    #[serde(default)]
    pub thresholds: SeverityThresholds,
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            thresholds: SeverityThresholds::default(),
        }
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone)]
pub struct MonitorReport {
    /// The full inconsistency set observed by this poll.
    pub inconsistencies: Vec<Inconsistency>,
    /// The subset absent from the previous snapshot.
    pub new: Vec<Inconsistency>,
    /// Severity tier for the observed count.
    pub severity: Severity,
    /// When the poll ran.
    pub polled_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MonitorState {
    /// Identities observed by the previous successful poll.
    previous: HashSet<(LoanId, ItemId, InconsistencyKind)>,
    /// Whether the last poll failed, leaving consumers on stale data.
    stale: bool,
    enabled: bool,
}

/// Polls the ledger port and reports ledger divergence.
pub struct ConsistencyMonitor {
    ledger: Arc<dyn LedgerPort>,
    notifier: Arc<dyn NotificationPort>,
    predicate: Box<DivergencePredicate>,
    config: MonitorConfig,
    history: InconsistencyHistory,
    state: RwLock<MonitorState>,
}

impl ConsistencyMonitor {
    /// Create a monitor with the built-in divergence rule table.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerPort>, notifier: Arc<dyn NotificationPort>) -> Self {
        Self::with_predicate(ledger, notifier, Box::new(default_divergence))
    }

    /// Create a monitor with a host-supplied divergence predicate.
    #[must_use]
    pub fn with_predicate(
        ledger: Arc<dyn LedgerPort>,
        notifier: Arc<dyn NotificationPort>,
        predicate: Box<DivergencePredicate>,
    ) -> Self {
        Self {
            ledger,
            notifier,
            predicate,
            config: MonitorConfig::default(),
            history: InconsistencyHistory::new(),
            state: RwLock::new(MonitorState {
                enabled: true,
                ..MonitorState::default()
            }),
        }
    }

    /// Override the configuration.
    #[must_use]
    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Configured poll interval in seconds.
    #[must_use]
    pub fn poll_interval_secs(&self) -> u64 {
        self.config.poll_interval_secs
    }

    /// Enable or disable polling. Disabling drops the previous snapshot, so
    /// a later re-enable reports still-standing inconsistencies as new
    /// again; that re-report is accepted, not corrected.
    pub async fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.write().await;
        if state.enabled && !enabled {
            state.previous.clear();
        }
        state.enabled = enabled;
    }

    /// Whether the last poll failed and consumers are on stale data.
    pub async fn is_stale(&self) -> bool {
        self.state.read().await.stale
    }

    /// The persisted history of detected facts.
    #[must_use]
    pub fn history(&self) -> &InconsistencyHistory {
        &self.history
    }

    /// Run one poll cycle.
    ///
    /// A fetch failure leaves the previous snapshot untouched, marks the
    /// monitor stale, and surfaces the error; it never fires spurious
    /// "resolved" transitions. A disabled monitor reports an empty cycle.
    pub async fn poll(&self) -> Result<MonitorReport> {
        let now = Utc::now();

        if !self.state.read().await.enabled {
            return Ok(MonitorReport {
                inconsistencies: Vec::new(),
                new: Vec::new(),
                severity: Severity::Ok,
                polled_at: now,
            });
        }

        let current = match self.compute_inconsistencies(now).await {
            Ok(current) => current,
            Err(err) => {
                self.state.write().await.stale = true;
                tracing::warn!(error = %err, "Consistency poll failed; keeping previous snapshot");
                return Err(err);
            }
        };

        let severity = self.config.thresholds.classify(current.len());

        let mut state = self.state.write().await;
        state.stale = false;

        let new: Vec<Inconsistency> = current
            .iter()
            .filter(|fact| !state.previous.contains(&fact.identity()))
            .cloned()
            .collect();

        state.previous = current.iter().map(Inconsistency::identity).collect();
        drop(state);

        if !new.is_empty() {
            self.history.append(&new);
            tracing::info!(
                total = current.len(),
                new = new.len(),
                severity = %severity,
                "Detected ledger inconsistencies"
            );
        }

        for fact in &new {
            self.notifier
                .notify(
                    severity,
                    &format!("Ledger inconsistency detected: {}", fact.kind),
                    serde_json::json!({
                        "loan_id": fact.loan_id,
                        "item_id": fact.item_id,
                        "kind": fact.kind,
                        "detected_at": fact.detected_at,
                    }),
                )
                .await;
        }

        Ok(MonitorReport {
            inconsistencies: current,
            new,
            severity,
            polled_at: now,
        })
    }

    async fn compute_inconsistencies(&self, now: DateTime<Utc>) -> Result<Vec<Inconsistency>> {
        let loans = self.ledger.active_loans().await?;

        let mut facts = Vec::new();
        for loan in &loans {
            let inventory = self.ledger.inventory(loan.item_id).await?;
            if let Some(kind) = (self.predicate)(loan, inventory.as_ref()) {
                facts.push(Inconsistency {
                    loan_id: loan.id,
                    item_id: loan.item_id,
                    kind,
                    detected_at: now,
                });
            }
        }

        Ok(facts)
    }
}
