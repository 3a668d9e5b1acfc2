use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pkr::{Pkr, PrincipalKind};
use crate::profile::PermissionLevel;

/// Internal record keyed by `pkr.uuid`. Friend principals additionally
/// track an active-connection count; other kinds leave it at zero.
pub struct Principal {
    pkr: Pkr,
    role: Option<String>,
    scopes: HashMap<String, PermissionLevel>,
    active_connections: AtomicU64,
}

impl Principal {
    pub fn new(pkr: Pkr) -> Self {
        Self { pkr, role: None, scopes: HashMap::new(), active_connections: AtomicU64::new(0) }
    }

    pub fn pkr(&self) -> &Pkr {
        &self.pkr
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = Some(role.into());
    }

    /// Records `(scopeId, level)` directly on this principal's metadata, as
    /// distinct from resolving a level indirectly through its role and a
    /// registered profile.
    pub fn set_scope_level(&mut self, scope: impl Into<String>, level: PermissionLevel) {
        self.scopes.insert(scope.into(), level);
    }

    pub fn scope_level(&self, scope: &str) -> Option<PermissionLevel> {
        self.scopes.get(scope).copied()
    }

    pub fn increment_connections(&self) -> u64 {
        debug_assert_eq!(self.pkr.kind, PrincipalKind::Friend, "connection counter is only meaningful for friend principals");
        self.active_connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn decrement_connections(&self) -> u64 {
        self.active_connections.fetch_sub(1, Ordering::SeqCst).saturating_sub(1)
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::SeqCst)
    }
}
