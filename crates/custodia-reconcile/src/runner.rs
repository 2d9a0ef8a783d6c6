//! Background runner for the consistency monitor.
//!
//! A ticking task that owns its cancellation token, decoupled from any UI
//! lifecycle. Cancelling tears the loop down deterministically: no callback
//! runs after the token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use custodia_core::ports::InconsistencySink;

use crate::monitor::ConsistencyMonitor;

/// Drives [`ConsistencyMonitor::poll`] on a fixed interval.
pub struct MonitorRunner {
    monitor: Arc<ConsistencyMonitor>,
    sink: Option<Arc<dyn InconsistencySink>>,
    token: CancellationToken,
}

impl MonitorRunner {
    /// Create a runner with its own cancellation token.
    #[must_use]
    pub fn new(monitor: Arc<ConsistencyMonitor>) -> Self {
        Self {
            monitor,
            sink: None,
            token: CancellationToken::new(),
        }
    }

    /// Forward each newly detected fact to a sink (typically the workflow
    /// scheduler behind a reason router).
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn InconsistencySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// A token handle for cancelling the loop from outside.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the poll loop until cancelled. Spawn via `tokio::spawn`.
    pub async fn run(self) {
        let interval = Duration::from_secs(self.monitor.poll_interval_secs());
        info!(
            poll_interval_secs = interval.as_secs(),
            "Consistency monitor started"
        );

        loop {
            tokio::select! {
                () = self.token.cancelled() => {
                    info!("Consistency monitor cancelled, shutting down");
                    break;
                }
                () = tokio::time::sleep(interval) => {}
            }

            match self.monitor.poll().await {
                Ok(report) => {
                    if report.new.is_empty() {
                        debug!(total = report.inconsistencies.len(), "Poll cycle clean");
                    }
                    for fact in &report.new {
                        let Some(sink) = self.sink.as_ref() else {
                            continue;
                        };
                        if self.token.is_cancelled() {
                            // Teardown happened mid-cycle; stop mutating state.
                            return;
                        }
                        if let Err(err) = sink.on_inconsistency(fact).await {
                            warn!(
                                loan_id = %fact.loan_id,
                                error = %err,
                                "Inconsistency sink rejected fact"
                            );
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Consistency poll failed");
                }
            }
        }
    }
}
