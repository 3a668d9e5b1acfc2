use conclave_subsystem::SubsystemError;
use thiserror::Error;

/// Errors raised while registering or looking up subsystems.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a subsystem named `{0}` is already registered")]
    Duplicate(String),

    #[error("`{0}` is a reserved name and cannot be registered or unregistered directly")]
    ReservedName(String),

    #[error("no subsystem named `{0}` is registered")]
    Unknown(String),

    #[error(transparent)]
    Dispose(#[from] SubsystemError),
}

/// Failure modes of scheme-routed dispatch (spec.md §4.5/§4.9).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no subsystem is registered for scheme `{0}`")]
    UnknownSubsystem(String),

    #[error("subsystem `{0}`'s queue is full")]
    QueueFull(String),

    #[error(transparent)]
    Subsystem(#[from] SubsystemError),
}
