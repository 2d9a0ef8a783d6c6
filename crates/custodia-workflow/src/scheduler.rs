//! Approval scheduling: drives workflow instances through their steps.
//!
//! Notification steps fire and advance; auto-action steps advance only when
//! their effect succeeds; approval steps gate the instance on a role-matched
//! decision with a time-bounded expiry. A rejected or expired gate cancels
//! the instance entirely — hosts wanting a retry start a fresh instance for
//! the same reason.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use custodia_core::error::{Error, Result};
use custodia_core::ports::{
    AutoActionPort, InconsistencySink, NotificationPort, RoleResolver, WorkflowDefinitionStore,
};
use custodia_core::types::{
    ApprovalDecision, ApprovalId, ApprovalStatus, Inconsistency, InconsistencyKind, InstanceId,
    InstanceStatus, LoanId, MovementApproval, ReasonId, Severity, StepDefinition, StepKind,
    WorkflowInstance,
};

use crate::decision::role_permits;
use crate::sla::SlaTracker;
use crate::store::WorkflowStore;

/// Outcome of resolving a movement approval.
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// The decision was applied and the instance advanced or cancelled.
    Resolved {
        /// The approval after the decision.
        approval: MovementApproval,
        /// The owning instance after the decision took effect.
        instance: WorkflowInstance,
    },
    /// The approval was already terminal with the same decision; nothing
    /// changed. Reported for visibility under at-least-once delivery.
    AlreadyResolved,
}

/// Orchestrates workflow step execution and movement approvals.
pub struct ApprovalScheduler {
    definitions: Arc<dyn WorkflowDefinitionStore>,
    store: Arc<dyn WorkflowStore>,
    roles: Arc<dyn RoleResolver>,
    notifier: Arc<dyn NotificationPort>,
    actions: Arc<dyn AutoActionPort>,
    sla: Arc<SlaTracker>,
}

impl ApprovalScheduler {
    /// Create a scheduler over the given ports and store.
    #[must_use]
    pub fn new(
        definitions: Arc<dyn WorkflowDefinitionStore>,
        store: Arc<dyn WorkflowStore>,
        roles: Arc<dyn RoleResolver>,
        notifier: Arc<dyn NotificationPort>,
        actions: Arc<dyn AutoActionPort>,
        sla: Arc<SlaTracker>,
    ) -> Self {
        Self {
            definitions,
            store,
            roles,
            notifier,
            actions,
            sla,
        }
    }

    /// Start a resolution workflow for a flagged discrepancy.
    ///
    /// Creates the instance and its SLA clock, then advances through steps
    /// until the first approval gate, the first failed auto action, or
    /// completion.
    pub async fn start(
        &self,
        reason_id: ReasonId,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> Result<WorkflowInstance> {
        let reason = self
            .definitions
            .reason(reason_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("Unknown reason: {reason_id}")))?;

        let steps = self.definitions.steps_for_reason(reason_id).await?;
        if steps.is_empty() {
            return Err(Error::Validation(format!(
                "Reason {reason_id} has no workflow steps"
            )));
        }

        let instance = WorkflowInstance {
            id: InstanceId::new(),
            reason_id,
            loan_id,
            current_step: 0,
            status: InstanceStatus::Running,
            created_at: now,
            completed_at: None,
        };
        self.store.insert_instance(instance.clone()).await?;
        self.sla.create(loan_id, &reason, instance.id, now).await?;

        tracing::info!(
            instance_id = %instance.id,
            reason_id = %reason_id,
            loan_id = %loan_id,
            steps = steps.len(),
            "Started resolution workflow"
        );

        self.advance_internal(instance, &steps, now).await
    }

    /// Re-drive a running instance through its current step.
    ///
    /// Used to retry a failed auto action; a no-op for instances parked on
    /// a pending approval.
    pub async fn advance(&self, instance_id: InstanceId, now: DateTime<Utc>) -> Result<WorkflowInstance> {
        let instance = self.fetch_instance(instance_id).await?;
        if instance.status.is_terminal() {
            return Err(Error::Conflict(format!(
                "Instance {instance_id} is already {}",
                instance.status
            )));
        }

        let steps = self.definitions.steps_for_reason(instance.reason_id).await?;
        self.advance_internal(instance, &steps, now).await
    }

    /// Apply a principal's decision to a pending approval.
    ///
    /// The decision is accepted only when the principal's current role
    /// matches the approval's required role; mismatches fail with a
    /// permission error and change nothing. Re-resolving a terminal
    /// approval with the same decision is a reported no-op; a conflicting
    /// decision is an error.
    pub async fn resolve_approval(
        &self,
        approval_id: ApprovalId,
        principal: Uuid,
        decision: ApprovalDecision,
        now: DateTime<Utc>,
    ) -> Result<ResolutionOutcome> {
        let mut approval = self
            .store
            .approval(approval_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("Unknown approval: {approval_id}")))?;

        if approval.status.is_terminal() {
            if approval.status == decision.terminal_status() {
                tracing::debug!(
                    approval_id = %approval_id,
                    status = %approval.status,
                    "Approval already resolved"
                );
                return Ok(ResolutionOutcome::AlreadyResolved);
            }
            return Err(Error::Conflict(format!(
                "Approval {approval_id} is already {}",
                approval.status
            )));
        }

        // Expiry is time-triggered and wins over a late decision even when
        // the sweep has not run yet.
        if approval.expires_at.is_some_and(|expiry| now > expiry) {
            self.expire_approval(&mut approval, now).await?;
            return Err(Error::Timeout(format!(
                "Approval {approval_id} expired before the decision arrived"
            )));
        }

        let role = self.roles.current_role(principal).await?;
        if !role_permits(&role, &approval.required_role) {
            return Err(Error::Permission(format!(
                "Role {role} cannot decide an approval requiring {}",
                approval.required_role
            )));
        }

        approval.status = decision.terminal_status();
        approval.approved_by = Some(principal);
        approval.decided_at = Some(now);
        self.store.update_approval(approval.clone()).await?;

        tracing::info!(
            approval_id = %approval_id,
            instance_id = %approval.instance_id,
            decision = %approval.status,
            "Movement approval resolved"
        );

        let instance = match decision {
            ApprovalDecision::Approve => {
                let mut instance = self.fetch_instance(approval.instance_id).await?;
                instance.current_step += 1;
                self.store.update_instance(instance.clone()).await?;

                let steps = self.definitions.steps_for_reason(instance.reason_id).await?;
                self.advance_internal(instance, &steps, now).await?
            }
            ApprovalDecision::Reject => self.cancel_instance(approval.instance_id, now).await?,
        };

        Ok(ResolutionOutcome::Resolved { approval, instance })
    }

    /// Expire every pending approval whose window has elapsed, cancelling
    /// the owning instances. Returns the number of approvals expired.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut expired = 0;

        for approval in self.store.pending_approvals().await? {
            let Some(expiry) = approval.expires_at else {
                continue;
            };
            if now <= expiry {
                continue;
            }

            // Cancelling an instance expires its sibling approvals, so an
            // entry from this snapshot may already be terminal.
            let Some(mut current) = self.store.approval(approval.id).await? else {
                continue;
            };
            if current.status.is_terminal() {
                continue;
            }

            self.expire_approval(&mut current, now).await?;
            expired += 1;
        }

        Ok(expired)
    }

    /// Cancel a running instance: terminal state, cancelled SLA clock, and
    /// expired pending approvals.
    pub async fn cancel_instance(
        &self,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<WorkflowInstance> {
        let mut instance = self.fetch_instance(instance_id).await?;
        if instance.status.is_terminal() {
            return Err(Error::Conflict(format!(
                "Instance {instance_id} is already {}",
                instance.status
            )));
        }

        instance.status = InstanceStatus::Cancelled;
        instance.completed_at = Some(now);
        self.store.update_instance(instance.clone()).await?;

        for mut approval in self
            .store
            .pending_approvals_for_instance(instance_id)
            .await?
        {
            approval.status = ApprovalStatus::Expired;
            approval.decided_at = Some(now);
            self.store.update_approval(approval).await?;
        }

        if let Some(sla) = self.store.sla_for_instance(instance_id).await? {
            if !sla.status.is_terminal() {
                self.sla.cancel(sla.id).await?;
            }
        }

        tracing::info!(instance_id = %instance_id, "Cancelled resolution workflow");
        Ok(instance)
    }

    async fn expire_approval(
        &self,
        approval: &mut MovementApproval,
        now: DateTime<Utc>,
    ) -> Result<()> {
        approval.status = ApprovalStatus::Expired;
        approval.decided_at = Some(now);
        self.store.update_approval(approval.clone()).await?;

        tracing::info!(
            approval_id = %approval.id,
            instance_id = %approval.instance_id,
            "Movement approval expired"
        );

        // The expired gate applies the same policy as rejection.
        let instance = self.fetch_instance(approval.instance_id).await?;
        if !instance.status.is_terminal() {
            self.cancel_instance(approval.instance_id, now).await?;
        }

        Ok(())
    }

    /// Run steps from `current_step` until a gate, a failed effect, or the
    /// end of the workflow.
    async fn advance_internal(
        &self,
        mut instance: WorkflowInstance,
        steps: &[StepDefinition],
        now: DateTime<Utc>,
    ) -> Result<WorkflowInstance> {
        while instance.status == InstanceStatus::Running {
            let Some(step) = steps.get(instance.current_step as usize) else {
                instance.status = InstanceStatus::Completed;
                instance.completed_at = Some(now);
                self.store.update_instance(instance.clone()).await?;

                if let Some(sla) = self.store.sla_for_instance(instance.id).await? {
                    if !sla.status.is_terminal() {
                        self.sla.complete(sla.id).await?;
                    }
                }

                tracing::info!(instance_id = %instance.id, "Resolution workflow completed");
                break;
            };

            match step.kind {
                StepKind::Notification => {
                    self.notifier
                        .notify(
                            Severity::Ok,
                            "Resolution workflow notification step",
                            serde_json::json!({
                                "instance_id": instance.id,
                                "loan_id": instance.loan_id,
                                "step_order": step.step_order,
                                "payload": step.payload,
                            }),
                        )
                        .await;
                    instance.current_step += 1;
                    self.store.update_instance(instance.clone()).await?;
                }
                StepKind::AutoAction => {
                    if let Err(err) = self.actions.execute(instance.loan_id, step).await {
                        // The instance stays on this step; the host retries
                        // by calling advance again.
                        tracing::warn!(
                            instance_id = %instance.id,
                            step_order = step.step_order,
                            error = %err,
                            "Auto action failed; instance remains on step"
                        );
                        return Err(err);
                    }
                    instance.current_step += 1;
                    self.store.update_instance(instance.clone()).await?;
                }
                StepKind::Approval => {
                    let pending = self
                        .store
                        .pending_approvals_for_instance(instance.id)
                        .await?;
                    if pending.iter().any(|a| a.workflow_step_id == step.id) {
                        // Already gated on this step; nothing to do.
                        break;
                    }

                    let required_role = step.required_role.clone().ok_or_else(|| {
                        Error::Validation(format!(
                            "Approval step {} has no required role",
                            step.id
                        ))
                    })?;

                    let approval = MovementApproval {
                        id: ApprovalId::new(),
                        loan_id: instance.loan_id,
                        instance_id: instance.id,
                        workflow_step_id: step.id,
                        required_role,
                        status: ApprovalStatus::Pending,
                        approved_by: None,
                        decided_at: None,
                        expires_at: step.timeout().map(|timeout| now + timeout),
                    };
                    self.store.insert_approval(approval.clone()).await?;

                    tracing::info!(
                        instance_id = %instance.id,
                        approval_id = %approval.id,
                        required_role = %approval.required_role,
                        "Created movement approval"
                    );
                    break;
                }
            }
        }

        Ok(instance)
    }

    async fn fetch_instance(&self, instance_id: InstanceId) -> Result<WorkflowInstance> {
        self.store
            .instance(instance_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("Unknown instance: {instance_id}")))
    }
}

/// Routes newly detected inconsistency facts into resolution workflows.
///
/// Facts whose kind has no configured reason are logged and skipped; the
/// monitor keeps reporting them until either a route is added or the ledger
/// is corrected.
pub struct InconsistencyRouter {
    scheduler: Arc<ApprovalScheduler>,
    routes: HashMap<InconsistencyKind, ReasonId>,
}

impl InconsistencyRouter {
    /// Create a router over a scheduler.
    #[must_use]
    pub fn new(scheduler: Arc<ApprovalScheduler>) -> Self {
        Self {
            scheduler,
            routes: HashMap::new(),
        }
    }

    /// Map an inconsistency kind to the reason whose workflow resolves it.
    #[must_use]
    pub fn route(mut self, kind: InconsistencyKind, reason_id: ReasonId) -> Self {
        self.routes.insert(kind, reason_id);
        self
    }
}

#[async_trait::async_trait]
impl InconsistencySink for InconsistencyRouter {
    async fn on_inconsistency(&self, fact: &Inconsistency) -> Result<()> {
        let Some(reason_id) = self.routes.get(&fact.kind) else {
            tracing::debug!(kind = %fact.kind, "No workflow route for inconsistency kind");
            return Ok(());
        };

        self.scheduler
            .start(*reason_id, fact.loan_id, Utc::now())
            .await?;
        Ok(())
    }
}
