use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::pkr::Pkr;
use crate::principal::Principal;
use crate::rws::Rws;

/// Shared cell a kernel identity is anchored to. Several
/// [`PrincipalRegistry`] instances (kernel, access-control, channel-manager,
/// …) can hold the same anchor so that only the first one to call
/// `ensure_kernel` mints a PKR; every later call, anywhere, observes it.
#[derive(Clone, Default)]
pub struct KernelAnchor(Arc<Mutex<Option<Pkr>>>);

impl KernelAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&self) -> Pkr {
        let mut guard = self.0.lock();
        if let Some(pkr) = guard.as_ref() {
            return pkr.clone();
        }
        let pkr = Pkr::new_kernel();
        *guard = Some(pkr.clone());
        pkr
    }

    pub fn get(&self) -> Option<Pkr> {
        self.0.lock().clone()
    }
}

/// Registry of known principals plus their RWS tables, anchored to a
/// single kernel identity shared across every registry built from the
/// same [`KernelAnchor`].
#[derive(Default)]
pub struct PrincipalRegistry {
    anchor: KernelAnchor,
    principals: HashMap<Uuid, Principal>,
    rws: HashMap<Uuid, Rws>,
}

impl PrincipalRegistry {
    pub fn new(anchor: KernelAnchor) -> Self {
        Self { anchor, principals: HashMap::new(), rws: HashMap::new() }
    }

    /// Returns the shared kernel PKR, minting it on first call across every
    /// registry sharing this anchor.
    pub fn ensure_kernel(&mut self) -> Pkr {
        let pkr = self.anchor.ensure();
        self.principals.entry(pkr.uuid).or_insert_with(|| Principal::new(pkr.clone()));
        self.rws.entry(pkr.uuid).or_insert_with(|| Rws::new(pkr.uuid));
        pkr
    }

    pub fn kernel_pkr(&self) -> Option<Pkr> {
        self.anchor.get()
    }

    pub fn register(&mut self, pkr: Pkr) -> &Principal {
        let uuid = pkr.uuid;
        self.rws.entry(uuid).or_insert_with(|| Rws::new(uuid));
        self.principals.entry(uuid).or_insert_with(|| Principal::new(pkr))
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Principal> {
        self.principals.get(&uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Principal> {
        self.principals.get_mut(&uuid)
    }

    pub fn rws(&self, uuid: Uuid) -> Option<&Rws> {
        self.rws.get(&uuid)
    }

    pub fn rws_mut(&mut self, uuid: Uuid) -> Result<&mut Rws, IdentityError> {
        self.rws.get_mut(&uuid).ok_or(IdentityError::UnknownPrincipal(uuid))
    }

    pub fn role_of(&self, uuid: Uuid) -> Option<&str> {
        self.principals.get(&uuid).and_then(|p| p.role())
    }
}
