//! The pluggable scope-enforcement hook a router consults before invoking
//! a handler (spec.md §4.7 "Role → Scope → Permission"). The router knows
//! nothing about principals or profiles; `conclave-kernel` supplies the
//! concrete checker built on `conclave-identity`, keeping this crate free
//! of an identity dependency.

use conclave_message::Message;

use crate::metadata::RouteMetadata;

/// Denial detail mirroring spec.md's `ScopeDenied(scope, required, got)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenied {
    pub scope: String,
    pub required: String,
    pub got: String,
}

impl std::fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scope {:?} requires {:?}, caller has {:?}",
            self.scope, self.required, self.got
        )
    }
}

/// Checked before a matched handler runs, whenever the matched route
/// carries `{requiredPermission, scope}` metadata.
pub trait PermissionChecker: Send + Sync {
    fn check(
        &self,
        message: &Message,
        caller_id: Option<conclave_message::CallerId>,
        metadata: &RouteMetadata,
    ) -> Result<(), PermissionDenied>;
}

/// Default checker for routes with no scope requirements, or for routers
/// built outside the kernel's protected-send path (e.g. in unit tests).
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn check(
        &self,
        _message: &Message,
        _caller_id: Option<conclave_message::CallerId>,
        _metadata: &RouteMetadata,
    ) -> Result<(), PermissionDenied> {
        Ok(())
    }
}
