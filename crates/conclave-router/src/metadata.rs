//! Route metadata: the optional `{requiredPermission, scope}` pair that
//! drives scope enforcement (spec.md §3 "Registry entries", §4.7).

use std::sync::Arc;

use conclave_message::Message;

/// The three permission levels a route may demand, in ascending order
/// (mirrors `conclave_identity::PermissionLevel` without creating a
/// dependency cycle; the kernel's checker is the bridge between them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequiredPermission {
    Read,
    Write,
    Grant,
}

impl RequiredPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            RequiredPermission::Read => "read",
            RequiredPermission::Write => "write",
            RequiredPermission::Grant => "grant",
        }
    }
}

/// A scope identifier, either fixed or derived from the message at
/// dispatch time.
#[derive(Clone)]
pub enum Scope {
    Literal(String),
    Dynamic(Arc<dyn Fn(&Message) -> String + Send + Sync>),
}

impl Scope {
    pub fn literal(s: impl Into<String>) -> Self {
        Scope::Literal(s.into())
    }

    pub fn dynamic(f: impl Fn(&Message) -> String + Send + Sync + 'static) -> Self {
        Scope::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self, message: &Message) -> String {
        match self {
            Scope::Literal(s) => s.clone(),
            Scope::Dynamic(f) => f(message),
        }
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Scope::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Per-route metadata consulted by the permission checker before the
/// handler is invoked.
#[derive(Debug, Clone, Default)]
pub struct RouteMetadata {
    pub required_permission: Option<RequiredPermission>,
    pub scope: Option<Scope>,
}

impl RouteMetadata {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn scoped(required_permission: RequiredPermission, scope: Scope) -> Self {
        RouteMetadata {
            required_permission: Some(required_permission),
            scope: Some(scope),
        }
    }
}
