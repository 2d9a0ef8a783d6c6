//! End-to-end deadline scenario: a "lost device" workflow with a 24h SLA
//! and a 48h approval window, driven purely by the escalation job's clock.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use custodia_core::memory::{
    InMemoryDefinitionStore, RecordingActionPort, RecordingNotifier, StaticRoleResolver,
};
use custodia_core::types::{
    ApprovalDecision, InstanceStatus, LoanId, ReasonDefinition, ReasonId, Role, SlaStatus,
    StepDefinition, StepId, StepKind,
};
use custodia_workflow::{
    ApprovalScheduler, EscalationJob, InMemoryWorkflowStore, SlaTracker, WorkflowStore,
};

struct Harness {
    store: Arc<InMemoryWorkflowStore>,
    roles: Arc<StaticRoleResolver>,
    scheduler: Arc<ApprovalScheduler>,
    job: EscalationJob,
    reason_id: ReasonId,
}

async fn harness() -> Harness {
    let definitions = Arc::new(InMemoryDefinitionStore::new());
    let store = Arc::new(InMemoryWorkflowStore::new());
    let roles = Arc::new(StaticRoleResolver::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let actions = Arc::new(RecordingActionPort::new());
    let sla = Arc::new(SlaTracker::new(store.clone(), notifier.clone()));

    let reason_id = ReasonId::new();
    definitions
        .put_reason(
            ReasonDefinition {
                id: reason_id,
                label: "lost device".into(),
                sla_timeout_seconds: 24 * 3600,
            },
            vec![StepDefinition {
                id: StepId::new(),
                reason_id,
                step_order: 1,
                kind: StepKind::Approval,
                required_role: Some(Role::from("store_manager")),
                timeout_seconds: Some(48 * 3600),
                payload: serde_json::Value::Null,
            }],
        )
        .await;

    let scheduler = Arc::new(ApprovalScheduler::new(
        definitions,
        store.clone(),
        roles.clone(),
        notifier,
        actions,
        sla.clone(),
    ));
    let job = EscalationJob::new(scheduler.clone(), sla);

    Harness {
        store,
        roles,
        scheduler,
        job,
        reason_id,
    }
}

#[tokio::test]
async fn lost_device_goes_overdue_then_approval_expires() {
    let h = harness().await;
    let t0 = Utc::now();

    let instance = h
        .scheduler
        .start(h.reason_id, LoanId::new(), t0)
        .await
        .unwrap();

    let sla = h
        .store
        .sla_for_instance(instance.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sla.status, SlaStatus::Active);
    assert_eq!(sla.escalation_level, 0);
    assert_eq!(sla.estimated_completion, t0 + Duration::hours(24));

    // Before the deadline nothing moves.
    let stats = h.job.poll(t0 + Duration::hours(23)).await.unwrap();
    assert_eq!(stats.became_overdue, 0);
    assert_eq!(stats.approvals_expired, 0);

    // T0+24h: the tracker goes overdue and escalation steps 0 -> 1.
    let stats = h
        .job
        .poll(t0 + Duration::hours(24) + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(stats.became_overdue, 1);

    let sla = h.store.sla(sla.id).await.unwrap().unwrap();
    assert_eq!(sla.status, SlaStatus::Overdue);
    assert_eq!(sla.escalation_level, 1);

    // T0+48h: the untouched approval expires with no user action, which
    // cancels the instance and its SLA clock.
    let stats = h
        .job
        .poll(t0 + Duration::hours(48) + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(stats.approvals_expired, 1);

    assert!(h.store.pending_approvals().await.unwrap().is_empty());

    let instance = h.store.instance(instance.id).await.unwrap().unwrap();
    assert_eq!(instance.status, InstanceStatus::Cancelled);

    let sla = h.store.sla(sla.id).await.unwrap().unwrap();
    assert_eq!(sla.status, SlaStatus::Cancelled);
}

#[tokio::test]
async fn escalation_freezes_once_resolved() {
    let h = harness().await;
    let t0 = Utc::now();

    let instance = h
        .scheduler
        .start(h.reason_id, LoanId::new(), t0)
        .await
        .unwrap();

    // Drive well past the deadline, escalating along the way.
    for hours in [25, 26, 27] {
        h.job.poll(t0 + Duration::hours(hours)).await.unwrap();
    }
    let sla = h
        .store
        .sla_for_instance(instance.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sla.status, SlaStatus::Overdue);
    let frozen_level = sla.escalation_level;
    assert!(frozen_level >= 1);

    // A manager approves late but inside the 48h approval window; the
    // workflow completes and the SLA clock resolves despite being overdue.
    let approval = h
        .store
        .pending_approvals_for_instance(instance.id)
        .await
        .unwrap()
        .remove(0);
    let manager = Uuid::new_v4();
    h.roles.assign(manager, Role::from("store_manager")).await;
    h.scheduler
        .resolve_approval(
            approval.id,
            manager,
            ApprovalDecision::Approve,
            t0 + Duration::hours(28),
        )
        .await
        .unwrap();

    let sla = h.store.sla(sla.id).await.unwrap().unwrap();
    assert_eq!(sla.status, SlaStatus::Completed);

    // Later ticks leave the completed tracker untouched.
    h.job.poll(t0 + Duration::hours(30)).await.unwrap();
    let after = h.store.sla(sla.id).await.unwrap().unwrap();
    assert_eq!(after.status, SlaStatus::Completed);
    assert_eq!(after.escalation_level, frozen_level);

    let instance = h.store.instance(instance.id).await.unwrap().unwrap();
    assert_eq!(instance.status, InstanceStatus::Completed);
}
