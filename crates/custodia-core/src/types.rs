//! Type definitions for the asset custody domain.
//!
//! Includes newtype wrappers for IDs, status enums for the two ledgers, and
//! the records exchanged between the monitor, the audit subsystem, and the
//! workflow scheduler.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the inner UUID.
            #[must_use]
            pub fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a loan record.
    LoanId
);
uuid_id!(
    /// Unique identifier for a physical asset.
    ItemId
);
uuid_id!(
    /// Unique identifier for an audit session.
    SessionId
);
uuid_id!(
    /// Unique identifier for a workflow instance.
    InstanceId
);
uuid_id!(
    /// Unique identifier for a movement approval.
    ApprovalId
);
uuid_id!(
    /// Unique identifier for an SLA tracking row.
    SlaId
);
uuid_id!(
    /// Unique identifier for a discrepancy reason.
    ReasonId
);
uuid_id!(
    /// Unique identifier for a workflow step definition.
    StepId
);

/// Host-defined role label. Equality is exact; Custodia never interprets the
/// label beyond comparing it to a step's required role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    /// Create a role from a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The role label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Role {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

// ============================================================================
// Ledger records
// ============================================================================

/// Lifecycle status of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Device is out with a borrower.
    Active,
    /// Device came back to the store.
    Returned,
    /// Device was sold and will not return.
    Sold,
    /// Device is out past its due date.
    Overdue,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Returned => write!(f, "returned"),
            Self::Sold => write!(f, "sold"),
            Self::Overdue => write!(f, "overdue"),
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "returned" => Ok(Self::Returned),
            "sold" => Ok(Self::Sold),
            "overdue" => Ok(Self::Overdue),
            other => Err(format!("Invalid loan status: {other}")),
        }
    }
}

impl LoanStatus {
    /// Whether the loan still has the device outside the store.
    #[must_use]
    pub fn is_out(&self) -> bool {
        matches!(self, Self::Active | Self::Overdue)
    }
}

/// A loan ledger row. Owned by the loan subsystem; Custodia reads it and
/// proposes corrections through the ledger port only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Loan identifier.
    pub id: LoanId,
    /// The asset on loan.
    pub item_id: ItemId,
    /// Current loan status.
    pub status: LoanStatus,
    /// When the loan was issued.
    pub issued_at: DateTime<Utc>,
    /// When the device came back, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    /// When an administrative correction was last applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_at: Option<DateTime<Utc>>,
    /// Why the correction was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_reason: Option<String>,
}

/// Location/status of an asset in the inventory ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    /// Physically present in the secure store.
    InStore,
    /// Out on a loan.
    Loaned,
    /// Sold, no longer tracked as stock.
    Sold,
    /// Retired from circulation.
    Archived,
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InStore => write!(f, "in_store"),
            Self::Loaned => write!(f, "loaned"),
            Self::Sold => write!(f, "sold"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for InventoryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "in_store" => Ok(Self::InStore),
            "loaned" => Ok(Self::Loaned),
            "sold" => Ok(Self::Sold),
            "archived" => Ok(Self::Archived),
            other => Err(format!("Invalid inventory status: {other}")),
        }
    }
}

/// An inventory ledger row. `serial` is the identity a physical scan
/// produces (IMEI or serial number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Asset identity.
    pub item_id: ItemId,
    /// IMEI / serial number read by physical scans.
    pub serial: String,
    /// Current location/status.
    pub status: InventoryStatus,
    /// Last time the asset was physically observed.
    pub last_seen_at: DateTime<Utc>,
}

// ============================================================================
// Inconsistencies
// ============================================================================

/// Built-in divergence outcomes between the loan and inventory ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    /// Loan says the device is out, inventory does not say `loaned`.
    ActiveLoanNotLoaned,
    /// Loan was returned but inventory still says `loaned`.
    ReturnedStillLoaned,
    /// Loan was sold but inventory disagrees.
    SoldMismatch,
    /// Loan references an item the inventory ledger does not know.
    MissingInventory,
}

impl fmt::Display for InconsistencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveLoanNotLoaned => write!(f, "active_loan_not_loaned"),
            Self::ReturnedStillLoaned => write!(f, "returned_still_loaned"),
            Self::SoldMismatch => write!(f, "sold_mismatch"),
            Self::MissingInventory => write!(f, "missing_inventory"),
        }
    }
}

/// A derived divergence fact. Exists only as long as the divergence holds;
/// recomputed on every poll, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inconsistency {
    /// The diverging loan.
    pub loan_id: LoanId,
    /// The asset the loan refers to.
    pub item_id: ItemId,
    /// Which divergence rule fired.
    pub kind: InconsistencyKind,
    /// When this poll observed the divergence.
    pub detected_at: DateTime<Utc>,
}

impl Inconsistency {
    /// Identity used for diffing against the previous snapshot. Two facts
    /// for the same pair and kind are the same inconsistency even when
    /// observed at different times.
    #[must_use]
    pub fn identity(&self) -> (LoanId, ItemId, InconsistencyKind) {
        (self.loan_id, self.item_id, self.kind)
    }
}

/// Aggregate severity of a poll result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No inconsistencies.
    Ok,
    /// A small number of inconsistencies.
    Warning,
    /// At or past the critical threshold.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Severity tier thresholds. Configuration, not business fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityThresholds {
    /// Count at which severity becomes `warning`.
    #[serde(default = "default_warning_at")]
    pub warning_at: usize,
    /// Count at which severity becomes `critical`.
    #[serde(default = "default_critical_at")]
    pub critical_at: usize,
}

fn default_warning_at() -> usize {
    1
}

fn default_critical_at() -> usize {
    3
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            warning_at: default_warning_at(),
            critical_at: default_critical_at(),
        }
    }
}

impl SeverityThresholds {
    /// Classify an inconsistency count into a severity tier.
    #[must_use]
    pub fn classify(&self, count: usize) -> Severity {
        if count >= self.critical_at {
            Severity::Critical
        } else if count >= self.warning_at {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

// ============================================================================
// Audit sessions and scans
// ============================================================================

/// Outcome of classifying one physical scan against expected ledger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Expected in store and scanned in store.
    FoundExpected,
    /// Physically present but absent from the inventory ledger.
    UnexpectedPresent,
    /// Same identity already scanned in this session.
    Duplicate,
    /// Ledger status contradicts physical presence.
    StatusIncongruent,
    /// Expected in store, never scanned by session close.
    NotFound,
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FoundExpected => write!(f, "found_expected"),
            Self::UnexpectedPresent => write!(f, "unexpected_present"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::StatusIncongruent => write!(f, "status_incongruent"),
            Self::NotFound => write!(f, "not_found"),
        }
    }
}

/// One classified scan. Immutable once appended; `NotFound` records are
/// appended at session close, not at scan time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// The session this scan belongs to.
    pub session_id: SessionId,
    /// Scanned IMEI / serial.
    pub serial: String,
    /// Classification outcome.
    pub outcome: ScanOutcome,
    /// When the scan was recorded (close time for `NotFound`).
    pub scanned_at: DateTime<Utc>,
}

/// Lifecycle status of an audit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting scans.
    Open,
    /// Frozen; scans are rejected.
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A physical audit session over one store scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSession {
    /// Session identifier.
    pub id: SessionId,
    /// The store scope being counted.
    pub scope: String,
    /// When the session opened.
    pub opened_at: DateTime<Utc>,
    /// When the session closed, once it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Open or closed.
    pub status: SessionStatus,
    /// Number of scan records, including close-time `NotFound` rows.
    pub scan_count: usize,
}

// ============================================================================
// Workflow definitions and instances
// ============================================================================

/// Kind of a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Gated on a role-matched human decision.
    Approval,
    /// Fires a notification and auto-advances.
    Notification,
    /// Invokes an external effect and advances on success.
    AutoAction,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approval => write!(f, "approval"),
            Self::Notification => write!(f, "notification"),
            Self::AutoAction => write!(f, "auto_action"),
        }
    }
}

/// One ordered step of a reason's resolution workflow. Owned by the
/// workflow definition store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step identifier.
    pub id: StepId,
    /// The reason this step belongs to.
    pub reason_id: ReasonId,
    /// 1-indexed position within the workflow.
    pub step_order: u32,
    /// Step kind.
    pub kind: StepKind,
    /// Role required to decide an approval step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_role: Option<Role>,
    /// Approval expiry window in seconds, if the step is time-bounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
    /// Opaque payload handed to notification and auto-action effects.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// A discrepancy reason with its SLA window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonDefinition {
    /// Reason identifier.
    pub id: ReasonId,
    /// Human-readable label ("lost device", "return not booked", ...).
    pub label: String,
    /// SLA window in seconds for resolving a discrepancy of this reason.
    pub sla_timeout_seconds: i64,
}

impl StepDefinition {
    /// Approval expiry window as a chrono duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::seconds)
    }
}

impl ReasonDefinition {
    /// SLA window as a chrono duration.
    #[must_use]
    pub fn sla_timeout(&self) -> Duration {
        Duration::seconds(self.sla_timeout_seconds)
    }
}

/// Lifecycle status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Executing steps.
    Running,
    /// All steps finished.
    Completed,
    /// Terminated without finishing.
    Cancelled,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl InstanceStatus {
    /// Whether the instance can no longer transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A running resolution workflow for one flagged discrepancy.
///
/// `current_step` is 0-indexed; `StepDefinition::step_order` is 1-indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Instance identifier.
    pub id: InstanceId,
    /// The reason whose steps this instance executes.
    pub reason_id: ReasonId,
    /// The loan whose discrepancy is being resolved.
    pub loan_id: LoanId,
    /// Index of the step currently executing or awaited.
    pub current_step: u32,
    /// Lifecycle status.
    pub status: InstanceStatus,
    /// When the instance was created.
    pub created_at: DateTime<Utc>,
    /// When the instance reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// SLA tracking
// ============================================================================

/// Lifecycle status of an SLA tracking row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    /// Inside the deadline window.
    Active,
    /// Resolved explicitly.
    Completed,
    /// Past the deadline, unresolved.
    Overdue,
    /// The owning workflow was cancelled.
    Cancelled,
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Overdue => write!(f, "overdue"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl SlaStatus {
    /// Whether the tracker can no longer transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Deadline clock for one workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaTracking {
    /// Tracker identifier.
    pub id: SlaId,
    /// The loan under resolution.
    pub loan_id: LoanId,
    /// The reason whose SLA window applies.
    pub reason_id: ReasonId,
    /// The workflow instance this clock belongs to.
    pub instance_id: InstanceId,
    /// When the clock started.
    pub sla_start_time: DateTime<Utc>,
    /// Deadline: start + reason SLA window.
    pub estimated_completion: DateTime<Utc>,
    /// Lifecycle status.
    pub status: SlaStatus,
    /// Monotone escalation counter while overdue.
    pub escalation_level: u32,
    /// Last overdue notification, used to gate re-notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notified_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Movement approvals
// ============================================================================

/// Lifecycle status of a movement approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Accepted by a matching role.
    Approved,
    /// Declined by a matching role.
    Rejected,
    /// The decision window elapsed with no action.
    Expired,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl ApprovalStatus {
    /// Whether the approval can no longer transition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Expired)
    }
}

/// The decision a principal can take on a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Accept the gated movement.
    Approve,
    /// Decline the gated movement.
    Reject,
}

impl ApprovalDecision {
    /// The terminal status this decision produces.
    #[must_use]
    pub fn terminal_status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// One role-gated decision record for an approval step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementApproval {
    /// Approval identifier.
    pub id: ApprovalId,
    /// The loan whose movement is gated.
    pub loan_id: LoanId,
    /// The workflow instance awaiting this decision.
    pub instance_id: InstanceId,
    /// The step definition that created this approval.
    pub workflow_step_id: StepId,
    /// Role whose decision is accepted.
    pub required_role: Role,
    /// Lifecycle status.
    pub status: ApprovalStatus,
    /// Principal who decided, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    /// When the decision or expiry happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    /// Time-triggered expiry independent of user action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        let raw = Uuid::new_v4();
        let id = LoanId::from(raw);
        assert_eq!(Uuid::from(id), raw);
        assert_eq!(id.to_string(), raw.to_string());
    }

    #[test]
    fn test_loan_status_parse_round_trip() {
        for status in [
            LoanStatus::Active,
            LoanStatus::Returned,
            LoanStatus::Sold,
            LoanStatus::Overdue,
        ] {
            let parsed: LoanStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("lost".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_inventory_status_parse_round_trip() {
        for status in [
            InventoryStatus::InStore,
            InventoryStatus::Loaned,
            InventoryStatus::Sold,
            InventoryStatus::Archived,
        ] {
            let parsed: InventoryStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_loan_status_is_out() {
        assert!(LoanStatus::Active.is_out());
        assert!(LoanStatus::Overdue.is_out());
        assert!(!LoanStatus::Returned.is_out());
        assert!(!LoanStatus::Sold.is_out());
    }

    #[test]
    fn test_severity_thresholds_defaults() {
        let thresholds = SeverityThresholds::default();
        assert_eq!(thresholds.classify(0), Severity::Ok);
        assert_eq!(thresholds.classify(1), Severity::Warning);
        assert_eq!(thresholds.classify(2), Severity::Warning);
        assert_eq!(thresholds.classify(3), Severity::Critical);
        assert_eq!(thresholds.classify(10), Severity::Critical);
    }

    #[test]
    fn test_severity_thresholds_configurable() {
        let thresholds = SeverityThresholds {
            warning_at: 5,
            critical_at: 20,
        };
        assert_eq!(thresholds.classify(4), Severity::Ok);
        assert_eq!(thresholds.classify(5), Severity::Warning);
        assert_eq!(thresholds.classify(20), Severity::Critical);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!InstanceStatus::Running.is_terminal());
        assert!(InstanceStatus::Completed.is_terminal());
        assert!(InstanceStatus::Cancelled.is_terminal());

        assert!(!SlaStatus::Active.is_terminal());
        assert!(!SlaStatus::Overdue.is_terminal());
        assert!(SlaStatus::Completed.is_terminal());
        assert!(SlaStatus::Cancelled.is_terminal());

        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
        assert!(ApprovalStatus::Expired.is_terminal());
    }

    #[test]
    fn test_decision_terminal_status() {
        assert_eq!(
            ApprovalDecision::Approve.terminal_status(),
            ApprovalStatus::Approved
        );
        assert_eq!(
            ApprovalDecision::Reject.terminal_status(),
            ApprovalStatus::Rejected
        );
    }

    #[test]
    fn test_inconsistency_identity_ignores_detection_time() {
        let loan_id = LoanId::new();
        let item_id = ItemId::new();
        let a = Inconsistency {
            loan_id,
            item_id,
            kind: InconsistencyKind::ActiveLoanNotLoaned,
            detected_at: Utc::now(),
        };
        let b = Inconsistency {
            detected_at: a.detected_at + Duration::hours(1),
            ..a.clone()
        };
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_snake_case_serialization() {
        let json = serde_json::to_string(&ScanOutcome::UnexpectedPresent).unwrap();
        assert_eq!(json, "\"unexpected_present\"");
        let json = serde_json::to_string(&StepKind::AutoAction).unwrap();
        assert_eq!(json, "\"auto_action\"");
        let json = serde_json::to_string(&SlaStatus::Overdue).unwrap();
        assert_eq!(json, "\"overdue\"");
    }
}
