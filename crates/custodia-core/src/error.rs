//! Error taxonomy shared by all Custodia crates.
//!
//! Validation and permission failures always surface to the caller and are
//! never retried. Transient fetch failures may be absorbed by read paths
//! (the monitor keeps its previous snapshot and reports staleness) but are
//! always surfaced for writes so the caller can retry explicitly.

use thiserror::Error;

/// Result type for Custodia operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the reconciliation and workflow engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input to a classification or workflow operation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller sequencing bug: the operation contradicts current state
    /// (scanning a closed session, conflicting re-resolution of a terminal
    /// approval, opening a second session in a scope).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The acting principal's role does not permit the decision.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// A ledger read or write could not reach its backing store.
    #[error("Transient fetch failure: {0}")]
    TransientFetch(String),

    /// A deadline elapsed. This is an expected terminal state for SLA and
    /// approval clocks, not an operational failure.
    #[error("Deadline elapsed: {0}")]
    Timeout(String),

    /// A backing store rejected an operation for a non-transient reason.
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether the error may succeed on retry without caller changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFetch(_))
    }

    /// Short machine-readable label for logs and notification payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Permission(_) => "permission",
            Self::TransientFetch(_) => "transient_fetch",
            Self::Timeout(_) => "timeout",
            Self::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::TransientFetch("ledger unreachable".into()).is_retryable());
        assert!(!Error::Validation("bad input".into()).is_retryable());
        assert!(!Error::Permission("role mismatch".into()).is_retryable());
        assert!(!Error::Conflict("already closed".into()).is_retryable());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::Validation(String::new()).kind(), "validation");
        assert_eq!(Error::Timeout(String::new()).kind(), "timeout");
        assert_eq!(Error::Store(String::new()).kind(), "store");
    }

    #[test]
    fn test_display_contains_detail() {
        let err = Error::Conflict("audit session closed".into());
        assert!(err.to_string().contains("audit session closed"));
    }
}
