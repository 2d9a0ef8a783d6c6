//! Escalation job: the workflow side's background tick.
//!
//! Each poll cycle expires due approvals and re-evaluates SLA clocks. Runs
//! under a cancellation token on a fixed interval, independent of the
//! consistency monitor's poll loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduler::ApprovalScheduler;
use crate::sla::SlaTracker;

/// Default polling interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Statistics from one escalation poll cycle.
#[derive(Debug, Clone, Default)]
pub struct EscalationStats {
    /// SLA trackers examined.
    pub checked: usize,
    /// Trackers that crossed their deadline this cycle.
    pub became_overdue: usize,
    /// Escalation level increments applied.
    pub escalated: usize,
    /// Overdue re-notifications sent.
    pub renotified: usize,
    /// Movement approvals expired.
    pub approvals_expired: usize,
    /// Failed operations.
    pub failed: usize,
}

impl EscalationStats {
    /// Merge stats from another cycle fragment.
    pub fn merge(&mut self, other: &EscalationStats) {
        self.checked += other.checked;
        self.became_overdue += other.became_overdue;
        self.escalated += other.escalated;
        self.renotified += other.renotified;
        self.approvals_expired += other.approvals_expired;
        self.failed += other.failed;
    }
}

/// Errors from an escalation poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum EscalationJobError {
    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(String),
}

/// Background job expiring approvals and escalating overdue SLAs.
pub struct EscalationJob {
    scheduler: Arc<ApprovalScheduler>,
    sla: Arc<SlaTracker>,
    poll_interval: Duration,
}

impl EscalationJob {
    /// Create a job over the scheduler and SLA tracker.
    #[must_use]
    pub fn new(scheduler: Arc<ApprovalScheduler>, sla: Arc<SlaTracker>) -> Self {
        Self {
            scheduler,
            sla,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Override the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run a single poll cycle against `now`.
    #[instrument(skip(self))]
    pub async fn poll(&self, now: DateTime<Utc>) -> Result<EscalationStats, EscalationJobError> {
        let mut stats = EscalationStats::default();

        // Expired approvals first: their cancellations remove SLA clocks
        // before the tick would escalate them.
        match self.scheduler.expire_due(now).await {
            Ok(expired) => stats.approvals_expired = expired,
            Err(err) => {
                warn!(error = %err, "Approval expiry sweep failed");
                stats.failed += 1;
            }
        }

        let tick = self
            .sla
            .tick(now)
            .await
            .map_err(|err| EscalationJobError::Store(err.to_string()))?;
        stats.merge(&EscalationStats {
            checked: tick.checked,
            became_overdue: tick.became_overdue,
            escalated: tick.escalated,
            renotified: tick.renotified,
            failed: tick.failed,
            ..EscalationStats::default()
        });

        if stats.checked > 0 || stats.approvals_expired > 0 {
            info!(
                checked = stats.checked,
                became_overdue = stats.became_overdue,
                escalated = stats.escalated,
                renotified = stats.renotified,
                approvals_expired = stats.approvals_expired,
                failed = stats.failed,
                "Completed escalation poll cycle"
            );
        } else {
            debug!("No SLA clocks or due approvals to process");
        }

        Ok(stats)
    }

    /// Run the poll loop until cancelled. Spawn via `tokio::spawn`.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Escalation job started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Escalation job cancelled, shutting down");
                    break;
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }

            if let Err(err) = self.poll(Utc::now()).await {
                warn!(error = %err, "Escalation poll cycle failed");
            }
        }
    }

    /// The configured poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_interval() {
        assert_eq!(DEFAULT_POLL_INTERVAL_SECS, 60);
    }

    #[test]
    fn test_stats_merge() {
        let mut a = EscalationStats {
            checked: 5,
            became_overdue: 1,
            escalated: 2,
            renotified: 1,
            approvals_expired: 0,
            failed: 1,
        };
        let b = EscalationStats {
            checked: 3,
            became_overdue: 0,
            escalated: 1,
            renotified: 0,
            approvals_expired: 2,
            failed: 0,
        };
        a.merge(&b);

        assert_eq!(a.checked, 8);
        assert_eq!(a.became_overdue, 1);
        assert_eq!(a.escalated, 3);
        assert_eq!(a.renotified, 1);
        assert_eq!(a.approvals_expired, 2);
        assert_eq!(a.failed, 1);
    }

    #[test]
    fn test_job_error_display() {
        let err = EscalationJobError::Store("update failed".to_string());
        assert!(err.to_string().contains("update failed"));
    }
}
