use conclave_identity::{PermissionLevel, ProfileRegistry, SecurityProfile};
use parking_lot::Mutex;

/// Shared handle around [`ProfileRegistry`] (spec.md §4.7's
/// profile-registry kernel child), populated via
/// `MessageSystem::initialize_profiles` before any traffic and read from
/// every subsystem's [`crate::access_control::ScopeChecker`] afterwards.
#[derive(Default)]
pub struct ProfileRegistryHandle {
    inner: Mutex<ProfileRegistry>,
}

impl ProfileRegistryHandle {
    pub fn new(registry: ProfileRegistry) -> Self {
        Self { inner: Mutex::new(registry) }
    }

    pub fn insert(&self, profile: SecurityProfile) {
        self.inner.lock().insert(profile);
    }

    /// Bulk-populates the registry from `(role, profile)` pairs.
    pub fn initialize(&self, profiles: impl IntoIterator<Item = SecurityProfile>) {
        let mut inner = self.inner.lock();
        for profile in profiles {
            inner.insert(profile);
        }
    }

    pub fn resolve_level(&self, role: &str, scope: &str) -> Option<PermissionLevel> {
        self.inner.lock().resolve_level(role, scope)
    }
}
