//! The privileged kernel subsystem (spec.md §4.7): identity and RWS,
//! role→scope→permission enforcement, channel ACLs, one-shot
//! request/response correlation, and the protected-send pipeline that
//! only the kernel may use to stamp caller identity.

mod access_control;
mod channel_manager;
mod error;
mod error_manager;
mod kernel;
mod profile_registry;
mod protected;
mod response_manager;

pub use access_control::{mint_principal, AccessControl, ScopeChecker};
pub use channel_manager::{Channel, ChannelManager};
pub use error::KernelError;
pub use error_manager::ErrorManager;
pub use kernel::{Kernel, KernelFacets, FACET_ACCESS_CONTROL, FACET_CHANNEL_MANAGER, FACET_ERROR_MANAGER, FACET_PROFILE_REGISTRY, FACET_RESPONSE_MANAGER};
pub use profile_registry::ProfileRegistryHandle;
pub use protected::{request_protected, send_protected, send_protected_pooled, DEFAULT_RESPONSE_TIMEOUT_MS};
pub use response_manager::{ResponseManager, ResponseOutcome};
