//! The unified error taxonomy every public `MessageSystem` entry point
//! returns (spec.md §7), wrapping each sub-crate's error enum via
//! `#[from]` conversions.

use conclave_kernel::KernelError;
use conclave_registry::{DispatchError, RegistryError};
use conclave_subsystem::SubsystemError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConclaveError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Subsystem(#[from] SubsystemError),
}
