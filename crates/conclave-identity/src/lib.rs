//! Identity and permission layer (spec.md §4.7): principals, reader/
//! writer/granter sets, and role-mapped security profiles, consumed by
//! routing's scope enforcement and the kernel's protected send.

mod error;
mod pkr;
mod principal;
mod profile;
mod registry;
mod rws;

pub use error::IdentityError;
pub use pkr::{Pkr, PrincipalKind};
pub use principal::Principal;
pub use profile::{PermissionLevel, ProfileRegistry, SecurityProfile};
pub use registry::{KernelAnchor, PrincipalRegistry};
pub use rws::Rws;
