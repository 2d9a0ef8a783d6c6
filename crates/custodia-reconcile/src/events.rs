//! Realtime audit session events over a tokio broadcast channel.
//!
//! Multiple concurrent operators subscribe to see a consistent live scan
//! list. Publishing is fire-and-forget; a channel with no subscribers is
//! logged at debug and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodia_core::types::{ScanOutcome, SessionId};

/// An event emitted by the audit session manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A scan was classified and appended to the session.
    ScanAppended {
        /// The session the scan belongs to.
        session_id: SessionId,
        /// Scanned serial.
        serial: String,
        /// Classification outcome.
        outcome: ScanOutcome,
        /// When the scan was recorded.
        scanned_at: DateTime<Utc>,
    },
    /// The session was closed and frozen.
    SessionClosed {
        /// The closed session.
        session_id: SessionId,
        /// Total scan records, including close-time `not_found` rows.
        scan_count: usize,
        /// When the session closed.
        closed_at: DateTime<Utc>,
    },
}

/// Publisher fanning session events out to all subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: tokio::sync::broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create a publisher with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers. Fire-and-forget.
    pub fn publish(&self, event: SessionEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("No active audit session subscribers");
        }
    }

    /// Get a new receiver for the broadcast channel. Dropping the receiver
    /// unsubscribes; there is nothing else to tear down.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = SessionEvents::new(8);
        let mut rx = events.subscribe();

        let session_id = SessionId::new();
        events.publish(SessionEvent::SessionClosed {
            session_id,
            scan_count: 3,
            closed_at: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            SessionEvent::SessionClosed {
                session_id: got, ..
            } => assert_eq!(got, session_id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let events = SessionEvents::new(8);
        events.publish(SessionEvent::ScanAppended {
            session_id: SessionId::new(),
            serial: "IMEI-1".into(),
            outcome: ScanOutcome::FoundExpected,
            scanned_at: Utc::now(),
        });
    }

    #[test]
    fn test_event_serialization_tag() {
        let json = serde_json::to_value(SessionEvent::SessionClosed {
            session_id: SessionId::new(),
            scan_count: 0,
            closed_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["event_type"], "session_closed");
    }
}
