//! Tagged error kinds (spec §7). Every fallible core operation returns
//! `Result<T>` with this error type; tier-local errors are converted into it
//! at the `Router` boundary.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Tagged, not stringly-typed error kinds (spec §7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Payload fails a schema/range/length check. No state change.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced id does not exist. Most callers treat this as an empty
    /// result rather than an error; this variant is for the few operations
    /// (e.g. `restore`, `validate_relationship`) where a specific id is required.
    #[error("not found: {0}")]
    NotFound(String),

    /// Tier cannot admit the item even after its eviction policy ran.
    #[error("capacity exceeded for tier {tier}: {detail}")]
    CapacityExceeded { tier: String, detail: String },

    /// Operation would violate an invariant.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Snapshot read/write failed. In-memory state remains authoritative;
    /// this is surfaced as a non-fatal event unless the in-memory state
    /// itself is no longer consistent.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// External binding (e.g. graph DB) is unreachable.
    #[error("dependency unavailable: {0}")]
    Dependency(String),

    /// The check-request hook denied the operation.
    #[error("rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    /// Deadline elapsed before the operation completed.
    #[error("cancelled: deadline elapsed")]
    Cancelled,

    /// Unexpected failure; always logged with context, never swallowed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for MemoryError {
    fn from(e: std::io::Error) -> Self {
        MemoryError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(e: serde_json::Error) -> Self {
        MemoryError::Persistence(e.to_string())
    }
}

impl MemoryError {
    /// The `{code, message}` tag the tool-call surface exposes (§7 "User-visible failure").
    pub fn code(&self) -> &'static str {
        match self {
            MemoryError::Validation(_) => "validation",
            MemoryError::NotFound(_) => "not_found",
            MemoryError::CapacityExceeded { .. } => "capacity_exceeded",
            MemoryError::Conflict(_) => "conflict",
            MemoryError::Persistence(_) => "persistence",
            MemoryError::Dependency(_) => "dependency",
            MemoryError::RateLimited { .. } => "rate_limited",
            MemoryError::Cancelled => "cancelled",
            MemoryError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(MemoryError::Validation("x".into()).code(), "validation");
        assert_eq!(
            MemoryError::CapacityExceeded {
                tier: "session".into(),
                detail: "full".into()
            }
            .code(),
            "capacity_exceeded"
        );
        assert_eq!(MemoryError::Cancelled.code(), "cancelled");
    }
}
