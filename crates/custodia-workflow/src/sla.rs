//! SLA tracking: deadline clocks, overdue detection, and escalation.
//!
//! Each workflow instance owns one tracker. A background tick re-evaluates
//! every open tracker; explicit completion halts escalation regardless of
//! elapsed time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use custodia_core::error::{Error, Result};
use custodia_core::ports::NotificationPort;
use custodia_core::types::{
    InstanceId, LoanId, ReasonDefinition, Severity, SlaId, SlaStatus, SlaTracking,
};

use crate::store::WorkflowStore;

/// SLA tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaConfig {
    /// Escalation level ceiling.
    #[serde(default = "default_max_escalation_level")]
    pub max_escalation_level: u32,
    /// Minimum seconds between overdue re-notifications.
    #[serde(default = "default_renotify_interval_secs")]
    pub renotify_interval_secs: i64,
}

fn default_max_escalation_level() -> u32 {
    5
}

fn default_renotify_interval_secs() -> i64 {
    3600
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            max_escalation_level: default_max_escalation_level(),
            renotify_interval_secs: default_renotify_interval_secs(),
        }
    }
}

/// Statistics from one SLA tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlaTickStats {
    /// Trackers examined.
    pub checked: usize,
    /// Active trackers that crossed their deadline this tick.
    pub became_overdue: usize,
    /// Escalation level increments applied.
    pub escalated: usize,
    /// Overdue re-notifications sent.
    pub renotified: usize,
    /// Trackers whose update failed.
    pub failed: usize,
}

/// Owns the deadline clock and escalation state of workflow instances.
pub struct SlaTracker {
    store: Arc<dyn WorkflowStore>,
    notifier: Arc<dyn NotificationPort>,
    config: SlaConfig,
}

impl SlaTracker {
    /// Create a tracker with default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn WorkflowStore>, notifier: Arc<dyn NotificationPort>) -> Self {
        Self {
            store,
            notifier,
            config: SlaConfig::default(),
        }
    }

    /// Override the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SlaConfig) -> Self {
        self.config = config;
        self
    }

    /// Start a deadline clock for a new workflow instance.
    pub async fn create(
        &self,
        loan_id: LoanId,
        reason: &ReasonDefinition,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<SlaTracking> {
        let sla = SlaTracking {
            id: SlaId::new(),
            loan_id,
            reason_id: reason.id,
            instance_id,
            sla_start_time: now,
            estimated_completion: now + reason.sla_timeout(),
            status: SlaStatus::Active,
            escalation_level: 0,
            last_notified_at: None,
        };
        self.store.insert_sla(sla.clone()).await?;

        tracing::debug!(
            sla_id = %sla.id,
            loan_id = %loan_id,
            deadline = %sla.estimated_completion,
            "Started SLA clock"
        );

        Ok(sla)
    }

    /// Re-evaluate every open tracker against `now`.
    ///
    /// An active tracker past its deadline becomes overdue and escalates to
    /// level 1; an already-overdue tracker escalates once more per tick up
    /// to the configured ceiling. Re-notification is interval-gated, not
    /// per-tick.
    #[instrument(skip(self))]
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<SlaTickStats> {
        let mut stats = SlaTickStats::default();

        for mut sla in self.store.open_slas().await? {
            stats.checked += 1;

            match sla.status {
                SlaStatus::Active if now > sla.estimated_completion => {
                    sla.status = SlaStatus::Overdue;
                    sla.escalation_level = 1;
                    sla.last_notified_at = Some(now);
                    stats.became_overdue += 1;
                    stats.escalated += 1;

                    tracing::info!(
                        sla_id = %sla.id,
                        loan_id = %sla.loan_id,
                        deadline = %sla.estimated_completion,
                        "SLA deadline breached"
                    );
                    self.notify_overdue(&sla).await;

                    if let Err(err) = self.store.update_sla(sla).await {
                        tracing::error!(error = %err, "Failed to persist SLA breach");
                        stats.failed += 1;
                    }
                }
                SlaStatus::Overdue => {
                    let mut dirty = false;

                    if sla.escalation_level < self.config.max_escalation_level {
                        sla.escalation_level += 1;
                        stats.escalated += 1;
                        dirty = true;
                    }

                    let renotify_due = sla.last_notified_at.is_none_or(|last| {
                        now - last >= Duration::seconds(self.config.renotify_interval_secs)
                    });
                    if renotify_due {
                        sla.last_notified_at = Some(now);
                        stats.renotified += 1;
                        dirty = true;
                        self.notify_overdue(&sla).await;
                    }

                    if dirty {
                        if let Err(err) = self.store.update_sla(sla).await {
                            tracing::error!(error = %err, "Failed to persist SLA escalation");
                            stats.failed += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(stats)
    }

    /// Mark a tracker completed. Valid from `Active` or `Overdue`; halts
    /// escalation regardless of elapsed time.
    pub async fn complete(&self, id: SlaId) -> Result<SlaTracking> {
        self.transition(id, SlaStatus::Completed).await
    }

    /// Mark a tracker cancelled alongside its cancelled instance.
    pub async fn cancel(&self, id: SlaId) -> Result<SlaTracking> {
        self.transition(id, SlaStatus::Cancelled).await
    }

    async fn transition(&self, id: SlaId, target: SlaStatus) -> Result<SlaTracking> {
        let mut sla = self
            .store
            .sla(id)
            .await?
            .ok_or_else(|| Error::Validation(format!("Unknown SLA tracker: {id}")))?;

        if sla.status.is_terminal() {
            return Err(Error::Conflict(format!(
                "SLA tracker {id} is already {}",
                sla.status
            )));
        }

        sla.status = target;
        self.store.update_sla(sla.clone()).await?;

        tracing::info!(sla_id = %id, status = %target, "SLA tracker resolved");
        Ok(sla)
    }

    async fn notify_overdue(&self, sla: &SlaTracking) {
        self.notifier
            .notify(
                Severity::Warning,
                "Resolution workflow is past its SLA deadline",
                serde_json::json!({
                    "sla_id": sla.id,
                    "loan_id": sla.loan_id,
                    "reason_id": sla.reason_id,
                    "escalation_level": sla.escalation_level,
                    "estimated_completion": sla.estimated_completion,
                }),
            )
            .await;
    }
}
