use std::sync::Arc;

use conclave_identity::{IdentityError, KernelAnchor, Pkr, PrincipalKind, PrincipalRegistry};
use conclave_message::Message;
use conclave_router::{PermissionChecker, PermissionDenied, RequiredPermission, RouteMetadata};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::profile_registry::ProfileRegistryHandle;

/// Owns the principal registry and RWS table (spec.md §4.7's
/// access-control kernel child). Wrapped in a lock since the scope
/// checker consults it from the router's hot path while registration
/// happens from kernel bootstrap/application code.
pub struct AccessControl {
    registry: Mutex<PrincipalRegistry>,
}

impl AccessControl {
    pub fn new(anchor: KernelAnchor) -> Self {
        Self { registry: Mutex::new(PrincipalRegistry::new(anchor)) }
    }

    pub fn ensure_kernel(&self) -> Pkr {
        self.registry.lock().ensure_kernel()
    }

    pub fn kernel_pkr(&self) -> Option<Pkr> {
        self.registry.lock().kernel_pkr()
    }

    pub fn register(&self, pkr: Pkr) {
        self.registry.lock().register(pkr);
    }

    pub fn set_role(&self, uuid: Uuid, role: impl Into<String>) -> Result<(), IdentityError> {
        let mut registry = self.registry.lock();
        let principal = registry.get_mut(uuid).ok_or(IdentityError::UnknownPrincipal(uuid))?;
        principal.set_role(role);
        Ok(())
    }

    pub fn role_of(&self, uuid: Uuid) -> Option<String> {
        self.registry.lock().role_of(uuid).map(str::to_string)
    }

    pub fn is_registered(&self, uuid: Uuid) -> bool {
        self.registry.lock().get(uuid).is_some()
    }

    pub fn add_reader(&self, actor: Uuid, target: Uuid, reader: Uuid) -> Result<(), IdentityError> {
        let kernel = self.kernel_pkr().map(|pkr| pkr.uuid).unwrap_or_else(Uuid::nil);
        self.registry.lock().rws_mut(target)?.add_reader(actor, kernel, reader)
    }

    pub fn add_writer(&self, actor: Uuid, target: Uuid, writer: Uuid) -> Result<(), IdentityError> {
        let kernel = self.kernel_pkr().map(|pkr| pkr.uuid).unwrap_or_else(Uuid::nil);
        self.registry.lock().rws_mut(target)?.add_writer(actor, kernel, writer)
    }

    pub fn add_granter(&self, actor: Uuid, target: Uuid, granter: Uuid) -> Result<(), IdentityError> {
        let kernel = self.kernel_pkr().map(|pkr| pkr.uuid).unwrap_or_else(Uuid::nil);
        self.registry.lock().rws_mut(target)?.add_granter(actor, kernel, granter)
    }

    pub fn can_read(&self, target: Uuid, pkr: Uuid) -> bool {
        self.registry.lock().rws(target).map(|rws| rws.can_read(pkr)).unwrap_or(false)
    }

    pub fn can_write(&self, target: Uuid, pkr: Uuid) -> bool {
        self.registry.lock().rws(target).map(|rws| rws.can_write(pkr)).unwrap_or(false)
    }

    pub fn can_grant(&self, target: Uuid, pkr: Uuid) -> bool {
        self.registry.lock().rws(target).map(|rws| rws.can_grant(pkr)).unwrap_or(false)
    }
}

/// Bridges [`PermissionChecker`] (owned by `conclave-router`) to the
/// role → profile → scope → level indirection of spec.md §4.7, so every
/// subsystem's router, not just the kernel's, can enforce route scopes
/// against the one shared access-control/profile state.
pub struct ScopeChecker {
    access_control: Arc<AccessControl>,
    profiles: Arc<ProfileRegistryHandle>,
}

impl ScopeChecker {
    pub fn new(access_control: Arc<AccessControl>, profiles: Arc<ProfileRegistryHandle>) -> Self {
        Self { access_control, profiles }
    }
}

impl PermissionChecker for ScopeChecker {
    fn check(
        &self,
        message: &Message,
        caller_id: Option<Uuid>,
        metadata: &RouteMetadata,
    ) -> Result<(), PermissionDenied> {
        let (Some(required), Some(scope)) = (metadata.required_permission, metadata.scope.as_ref()) else {
            return Ok(());
        };
        let scope_name = scope.resolve(message);
        let denied = |got: &str| PermissionDenied {
            scope: scope_name.clone(),
            required: required.as_str().to_string(),
            got: got.to_string(),
        };

        let caller = caller_id.ok_or_else(|| denied("no caller"))?;
        let role = self.access_control.role_of(caller).ok_or_else(|| denied("no role"))?;
        let level = self.profiles.resolve_level(&role, &scope_name).ok_or_else(|| denied("no level"))?;

        let required_level = required_permission_level(required);
        if level >= required_level {
            Ok(())
        } else {
            Err(denied(&level.to_string()))
        }
    }
}

fn required_permission_level(required: RequiredPermission) -> conclave_identity::PermissionLevel {
    use conclave_identity::PermissionLevel;
    match required {
        RequiredPermission::Read => PermissionLevel::R,
        RequiredPermission::Write => PermissionLevel::Rw,
        RequiredPermission::Grant => PermissionLevel::Rwg,
    }
}

/// Mints and registers a fresh non-kernel principal of the given kind.
pub fn mint_principal(access_control: &AccessControl, kind: PrincipalKind) -> Pkr {
    let pkr = Pkr::new(kind);
    access_control.register(pkr.clone());
    pkr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile_registry::ProfileRegistryHandle;
    use conclave_identity::{PermissionLevel, ProfileRegistry, SecurityProfile};
    use conclave_message::{MessageKind, Path};
    use conclave_router::{RequiredPermission as RP, Scope};
    use serde_json::Value;

    fn scope_checker() -> (Arc<AccessControl>, ScopeChecker, Uuid) {
        let anchor = KernelAnchor::new();
        let access_control = Arc::new(AccessControl::new(anchor));
        access_control.ensure_kernel();
        let reader = mint_principal(&access_control, PrincipalKind::Friend);
        access_control.set_role(reader.uuid, "reader").unwrap();

        let mut profiles = ProfileRegistry::new();
        profiles.insert(SecurityProfile::new("reader").with_scope("users:delete", PermissionLevel::R));
        let profiles = Arc::new(ProfileRegistryHandle::new(profiles));

        let checker = ScopeChecker::new(access_control.clone(), profiles);
        (access_control, checker, reader.uuid)
    }

    #[test]
    fn scope_denied_reports_required_and_got_s2() {
        let (_ac, checker, reader) = scope_checker();
        let msg = Message::new(Path::parse("api://users/42/delete").unwrap(), MessageKind::Command, Value::Null);
        let metadata = RouteMetadata::scoped(RP::Write, Scope::literal("users:delete"));
        let err = checker.check(&msg, Some(reader), &metadata).unwrap_err();
        assert_eq!(err.scope, "users:delete");
        assert_eq!(err.required, "write");
        assert_eq!(err.got, "r");
    }

    #[test]
    fn sufficient_level_permits() {
        let anchor = KernelAnchor::new();
        let access_control = Arc::new(AccessControl::new(anchor));
        access_control.ensure_kernel();
        let writer = mint_principal(&access_control, PrincipalKind::Friend);
        access_control.set_role(writer.uuid, "editor").unwrap();
        let mut profiles = ProfileRegistry::new();
        profiles.insert(SecurityProfile::new("editor").with_scope("users:delete", PermissionLevel::Rwg));
        let profiles = Arc::new(ProfileRegistryHandle::new(profiles));
        let checker = ScopeChecker::new(access_control, profiles);

        let msg = Message::new(Path::parse("api://users/42/delete").unwrap(), MessageKind::Command, Value::Null);
        let metadata = RouteMetadata::scoped(RP::Write, Scope::literal("users:delete"));
        assert!(checker.check(&msg, Some(writer.uuid), &metadata).is_ok());
    }

    #[test]
    fn no_metadata_always_permits() {
        let (_ac, checker, reader) = scope_checker();
        let msg = Message::new(Path::parse("api://ping").unwrap(), MessageKind::Query, Value::Null);
        assert!(checker.check(&msg, Some(reader), &RouteMetadata::none()).is_ok());
    }
}
