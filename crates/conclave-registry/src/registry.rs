use std::collections::HashMap;
use std::sync::Arc;

use conclave_subsystem::Subsystem;
use parking_lot::Mutex;
use tracing::info;

use crate::error::RegistryError;

const LOG_TARGET: &str = "conclave_registry";

/// Reserved registration key for the privileged kernel subsystem
/// (spec.md §4.9): it is never reachable through plain `register`/
/// `unregister`, only through [`SubsystemRegistry::register_kernel`].
pub const KERNEL_NAME: &str = "kernel";

/// Process-wide table of built, named subsystems, keyed by their
/// top-level name (which also doubles as the path scheme routed
/// messages are dispatched against).
#[derive(Default)]
pub struct SubsystemRegistry {
    subsystems: Mutex<HashMap<String, Arc<Subsystem>>>,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already-built subsystem under its own name. Rejects
    /// a duplicate name and rejects the reserved kernel name outright;
    /// the kernel is installed only via `register_kernel`.
    pub fn register(&self, subsystem: Subsystem) -> Result<Arc<Subsystem>, RegistryError> {
        let name = subsystem.full_name().to_string();
        if name == KERNEL_NAME {
            return Err(RegistryError::ReservedName(name));
        }
        self.insert(name, subsystem)
    }

    /// Installs the kernel subsystem under its reserved name. Intended
    /// to be called exactly once, by the message-system bootstrap.
    pub fn register_kernel(&self, subsystem: Subsystem) -> Result<Arc<Subsystem>, RegistryError> {
        self.insert(KERNEL_NAME.to_string(), subsystem)
    }

    fn insert(&self, name: String, subsystem: Subsystem) -> Result<Arc<Subsystem>, RegistryError> {
        let mut map = self.subsystems.lock();
        if map.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        let arc = Arc::new(subsystem);
        map.insert(name.clone(), arc.clone());
        info!(target: LOG_TARGET, subsystem = %name, "subsystem registered");
        Ok(arc)
    }

    /// Disposes and removes a non-kernel subsystem.
    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        if name == KERNEL_NAME {
            return Err(RegistryError::ReservedName(name.to_string()));
        }
        let removed = self.subsystems.lock().remove(name);
        match removed {
            Some(subsystem) => {
                subsystem.dispose()?;
                info!(target: LOG_TARGET, subsystem = %name, "subsystem unregistered");
                Ok(())
            }
            None => Err(RegistryError::Unknown(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Subsystem>> {
        self.subsystems.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.subsystems.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.subsystems.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.lock().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.subsystems.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_compose::BuildContext;
    use serde_json::Value;

    fn built(name: &str) -> Subsystem {
        let mut s = Subsystem::root(name, Arc::new(Value::Null));
        for hook in conclave_subsystem::default_hooks(
            8,
            conclave_queue::OverflowPolicy::Reject,
            conclave_queue::SelectionStrategy::Fifo,
            Arc::new(conclave_router::AllowAll),
        ) {
            s.use_hook(hook).unwrap();
        }
        s.build(&BuildContext::new(Arc::new(Value::Null))).unwrap();
        s
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = SubsystemRegistry::new();
        registry.register(built("api")).unwrap();
        assert!(registry.get("api").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = SubsystemRegistry::new();
        registry.register(built("api")).unwrap();
        let err = registry.register(built("api")).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(n) if n == "api"));
    }

    #[test]
    fn kernel_name_is_reserved_from_plain_registration() {
        let registry = SubsystemRegistry::new();
        let err = registry.register(built(KERNEL_NAME)).unwrap_err();
        assert!(matches!(err, RegistryError::ReservedName(_)));
    }

    #[test]
    fn register_kernel_installs_under_the_reserved_key() {
        let registry = SubsystemRegistry::new();
        registry.register_kernel(built("anything")).unwrap();
        assert!(registry.get(KERNEL_NAME).is_some());
    }

    #[test]
    fn kernel_cannot_be_unregistered_through_the_plain_path() {
        let registry = SubsystemRegistry::new();
        registry.register_kernel(built("kernel")).unwrap();
        let err = registry.unregister(KERNEL_NAME).unwrap_err();
        assert!(matches!(err, RegistryError::ReservedName(_)));
    }

    #[test]
    fn unregister_disposes_and_removes() {
        let registry = SubsystemRegistry::new();
        registry.register(built("api")).unwrap();
        registry.unregister("api").unwrap();
        assert!(registry.get("api").is_none());
    }

    #[test]
    fn unregister_unknown_is_reported() {
        let registry = SubsystemRegistry::new();
        let err = registry.unregister("ghost").unwrap_err();
        assert!(matches!(err, RegistryError::Unknown(_)));
    }
}
