//! `conclave`: a message-driven subsystem runtime. Subsystems are
//! composed from facets installed by hooks, communicate exclusively by
//! path-addressed messages through a kernel-mediated router, and are
//! driven by a cooperative global scheduler (spec.md §1–§2).
//!
//! This crate is the thin top-level orchestrator described in spec.md
//! §4.9/§14 of the dependency order; the actual mechanics live in the
//! focused sub-crates it re-exports below.

mod config;
mod error;
mod system;

pub use config::{Config, PoolConfig, QueueConfig, ResponseConfig, SchedulerConfig};
pub use error::ConclaveError;
pub use system::MessageSystem;

// Re-exported so application code depends on this one crate rather than
// reaching into every sub-crate directly.
pub use conclave_compose::{BuildContext, Contract, Facet, HookSpec};
pub use conclave_identity::{PermissionLevel, Pkr, PrincipalKind, SecurityProfile};
pub use conclave_kernel::{Kernel, KernelError, ResponseOutcome};
pub use conclave_listener::{EmitReport, ListenerHandler, ListenerManager, ListenerPolicy};
pub use conclave_message::{Message, MessageKind, MessagePool, Path, SendOptions};
pub use conclave_queue::{OverflowPolicy, SelectionStrategy};
pub use conclave_registry::{DispatchError, RegistryError, SubsystemRegistry, KERNEL_NAME};
pub use conclave_router::{AllowAll, Handler, PermissionChecker, RequiredPermission, RouteMetadata, Scope};
pub use conclave_scheduler::{GlobalScheduler, SchedulingStrategy};
pub use conclave_subsystem::{default_hooks, Subsystem, SubsystemError};
