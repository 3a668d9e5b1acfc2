//! Subsystem registry and scheme-routed message-system dispatch
//! (spec.md §4.5/§4.9, items 9–10 of the dependency order).

mod dispatch;
mod error;
mod registry;

pub use dispatch::MessageSystemRouter;
pub use error::{DispatchError, RegistryError};
pub use registry::{SubsystemRegistry, KERNEL_NAME};
