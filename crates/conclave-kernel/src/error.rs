use conclave_identity::IdentityError;
use conclave_registry::{DispatchError, RegistryError};
use conclave_router::PermissionDenied;
use conclave_subsystem::SubsystemError;
use thiserror::Error;

/// The kernel's unified error taxonomy (spec.md §4.7 failure modes plus
/// §7's Security and Correlation categories).
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("kernel identity has not been established yet")]
    KernelNotReady,

    #[error("a protected send requires an authenticated caller")]
    CallerRequired,

    #[error("caller is not a participant of this channel")]
    ChannelForbidden,

    #[error("scope {scope:?} requires {required:?}, caller has {got:?}")]
    ScopeDenied { scope: String, required: String, got: String },

    #[error("no route matches this path")]
    RouteNotFound,

    #[error("handler error: {0}")]
    HandlerError(String),

    #[error("request timed out waiting for a response")]
    RequestTimeout,

    #[error("the response manager has been shut down")]
    ResponseManagerClosed,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Subsystem(#[from] SubsystemError),
}

impl From<PermissionDenied> for KernelError {
    fn from(denied: PermissionDenied) -> Self {
        KernelError::ScopeDenied {
            scope: denied.scope,
            required: denied.required,
            got: denied.got,
        }
    }
}
