use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Total order `R < RW < RWG`; derived `Ord` relies on declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    R,
    Rw,
    Rwg,
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PermissionLevel::R => "r",
            PermissionLevel::Rw => "rw",
            PermissionLevel::Rwg => "rwg",
        };
        write!(f, "{s}")
    }
}

/// A named map from scope identifier to the permission level it grants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityProfile {
    pub name: String,
    pub scopes: HashMap<String, PermissionLevel>,
}

impl SecurityProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), scopes: HashMap::new() }
    }

    pub fn with_scope(mut self, scope: impl Into<String>, level: PermissionLevel) -> Self {
        self.scopes.insert(scope.into(), level);
        self
    }

    pub fn level_for(&self, scope: &str) -> Option<PermissionLevel> {
        self.scopes.get(scope).copied()
    }
}

/// Role name → [`SecurityProfile`]. Populated via
/// `MessageSystem::initializeProfiles` before traffic begins.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<String, SecurityProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: SecurityProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, role: &str) -> Option<&SecurityProfile> {
        self.profiles.get(role)
    }

    /// Resolves the permission level a `role` holds over `scope`, the
    /// indirection the route-scope check uses (role → profile → scope →
    /// level), distinct from a level applied directly to a principal.
    pub fn resolve_level(&self, role: &str, scope: &str) -> Option<PermissionLevel> {
        self.get(role).and_then(|p| p.level_for(scope))
    }
}
