//! The check-request hook (spec §5 "Rate limiting / validation / auth").
//!
//! Auth, rate limiting and request validation are supplied by an external
//! middleware; the Router only consults it through this trait before
//! mutating state. The default implementation allows everything, so the
//! core is fully usable standalone.

use serde::Serialize;

/// The operation kind being checked, mirrored for the middleware's benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Store,
    Retrieve,
    Search,
    Update,
    Delete,
    Migrate,
    Cleanup,
}

/// Ambient request context passed to the hook (caller identity, scopes, etc).
/// Left as an opaque JSON bag since the core has no opinion on auth shape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestContext {
    pub caller: Option<String>,
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum GuardDecision {
    Allow,
    Deny { retry_after_ms: Option<u64> },
}

/// Implemented by the excluded auth/rate-limit middleware.
pub trait RequestGuard: Send + Sync {
    fn check_request(
        &self,
        op: Operation,
        context: &RequestContext,
        payload: &serde_json::Value,
    ) -> GuardDecision;
}

/// Allows every request. The Router's default guard when no middleware is configured.
#[derive(Debug, Default)]
pub struct AllowAllGuard;

impl RequestGuard for AllowAllGuard {
    fn check_request(
        &self,
        _op: Operation,
        _context: &RequestContext,
        _payload: &serde_json::Value,
    ) -> GuardDecision {
        GuardDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_always_allows() {
        let guard = AllowAllGuard;
        let decision = guard.check_request(
            Operation::Store,
            &RequestContext::default(),
            &serde_json::json!({}),
        );
        assert!(matches!(decision, GuardDecision::Allow));
    }
}
