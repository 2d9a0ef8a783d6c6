//! Storage contract for workflow instances, approvals, and SLA rows.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use custodia_core::error::{Error, Result};
use custodia_core::types::{
    ApprovalId, ApprovalStatus, InstanceId, MovementApproval, SlaId, SlaStatus, SlaTracking,
    WorkflowInstance,
};

/// Backing store for the approval scheduler and the SLA tracker.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Persist a new workflow instance.
    async fn insert_instance(&self, instance: WorkflowInstance) -> Result<()>;

    /// Fetch a workflow instance.
    async fn instance(&self, id: InstanceId) -> Result<Option<WorkflowInstance>>;

    /// Replace a workflow instance.
    async fn update_instance(&self, instance: WorkflowInstance) -> Result<()>;

    /// Persist a new movement approval.
    async fn insert_approval(&self, approval: MovementApproval) -> Result<()>;

    /// Fetch a movement approval.
    async fn approval(&self, id: ApprovalId) -> Result<Option<MovementApproval>>;

    /// Replace a movement approval.
    async fn update_approval(&self, approval: MovementApproval) -> Result<()>;

    /// All pending approvals.
    async fn pending_approvals(&self) -> Result<Vec<MovementApproval>>;

    /// Pending approvals belonging to one instance.
    async fn pending_approvals_for_instance(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<MovementApproval>>;

    /// Persist a new SLA tracking row.
    async fn insert_sla(&self, sla: SlaTracking) -> Result<()>;

    /// Fetch an SLA tracking row.
    async fn sla(&self, id: SlaId) -> Result<Option<SlaTracking>>;

    /// The SLA tracking row owned by one instance.
    async fn sla_for_instance(&self, instance_id: InstanceId) -> Result<Option<SlaTracking>>;

    /// Replace an SLA tracking row.
    async fn update_sla(&self, sla: SlaTracking) -> Result<()>;

    /// All SLA rows that still have a running clock (active or overdue).
    async fn open_slas(&self) -> Result<Vec<SlaTracking>>;
}

/// In-memory workflow store.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    instances: Arc<RwLock<HashMap<InstanceId, WorkflowInstance>>>,
    approvals: Arc<RwLock<HashMap<ApprovalId, MovementApproval>>>,
    slas: Arc<RwLock<HashMap<SlaId, SlaTracking>>>,
}

impl InMemoryWorkflowStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances held (for tests).
    pub async fn instance_count(&self) -> usize {
        self.instances.read().await.len()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn insert_instance(&self, instance: WorkflowInstance) -> Result<()> {
        self.instances.write().await.insert(instance.id, instance);
        Ok(())
    }

    async fn instance(&self, id: InstanceId) -> Result<Option<WorkflowInstance>> {
        Ok(self.instances.read().await.get(&id).cloned())
    }

    async fn update_instance(&self, instance: WorkflowInstance) -> Result<()> {
        let mut instances = self.instances.write().await;
        if !instances.contains_key(&instance.id) {
            return Err(Error::Store(format!("Unknown instance: {}", instance.id)));
        }
        instances.insert(instance.id, instance);
        Ok(())
    }

    async fn insert_approval(&self, approval: MovementApproval) -> Result<()> {
        self.approvals.write().await.insert(approval.id, approval);
        Ok(())
    }

    async fn approval(&self, id: ApprovalId) -> Result<Option<MovementApproval>> {
        Ok(self.approvals.read().await.get(&id).cloned())
    }

    async fn update_approval(&self, approval: MovementApproval) -> Result<()> {
        let mut approvals = self.approvals.write().await;
        if !approvals.contains_key(&approval.id) {
            return Err(Error::Store(format!("Unknown approval: {}", approval.id)));
        }
        approvals.insert(approval.id, approval);
        Ok(())
    }

    async fn pending_approvals(&self) -> Result<Vec<MovementApproval>> {
        Ok(self
            .approvals
            .read()
            .await
            .values()
            .filter(|approval| approval.status == ApprovalStatus::Pending)
            .cloned()
            .collect())
    }

    async fn pending_approvals_for_instance(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<MovementApproval>> {
        Ok(self
            .approvals
            .read()
            .await
            .values()
            .filter(|approval| {
                approval.instance_id == instance_id
                    && approval.status == ApprovalStatus::Pending
            })
            .cloned()
            .collect())
    }

    async fn insert_sla(&self, sla: SlaTracking) -> Result<()> {
        self.slas.write().await.insert(sla.id, sla);
        Ok(())
    }

    async fn sla(&self, id: SlaId) -> Result<Option<SlaTracking>> {
        Ok(self.slas.read().await.get(&id).cloned())
    }

    async fn sla_for_instance(&self, instance_id: InstanceId) -> Result<Option<SlaTracking>> {
        Ok(self
            .slas
            .read()
            .await
            .values()
            .find(|sla| sla.instance_id == instance_id)
            .cloned())
    }

    async fn update_sla(&self, sla: SlaTracking) -> Result<()> {
        let mut slas = self.slas.write().await;
        if !slas.contains_key(&sla.id) {
            return Err(Error::Store(format!("Unknown SLA tracker: {}", sla.id)));
        }
        slas.insert(sla.id, sla);
        Ok(())
    }

    async fn open_slas(&self) -> Result<Vec<SlaTracking>> {
        Ok(self
            .slas
            .read()
            .await
            .values()
            .filter(|sla| matches!(sla.status, SlaStatus::Active | SlaStatus::Overdue))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use custodia_core::types::{InstanceStatus, LoanId, ReasonId};

    fn instance() -> WorkflowInstance {
        WorkflowInstance {
            id: InstanceId::new(),
            reason_id: ReasonId::new(),
            loan_id: LoanId::new(),
            current_step: 0,
            status: InstanceStatus::Running,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_instance_round_trip() {
        let store = InMemoryWorkflowStore::new();
        let mut row = instance();
        store.insert_instance(row.clone()).await.unwrap();

        row.current_step = 2;
        store.update_instance(row.clone()).await.unwrap();

        let loaded = store.instance(row.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_step, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_instance_fails() {
        let store = InMemoryWorkflowStore::new();
        let err = store.update_instance(instance()).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_open_slas_excludes_terminal() {
        let store = InMemoryWorkflowStore::new();
        let now = Utc::now();
        for status in [
            SlaStatus::Active,
            SlaStatus::Overdue,
            SlaStatus::Completed,
            SlaStatus::Cancelled,
        ] {
            store
                .insert_sla(SlaTracking {
                    id: SlaId::new(),
                    loan_id: LoanId::new(),
                    reason_id: ReasonId::new(),
                    instance_id: InstanceId::new(),
                    sla_start_time: now,
                    estimated_completion: now,
                    status,
                    escalation_level: 0,
                    last_notified_at: None,
                })
                .await
                .unwrap();
        }

        let open = store.open_slas().await.unwrap();
        assert_eq!(open.len(), 2);
    }
}
