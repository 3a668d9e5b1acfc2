use conclave_compose::CompositionError;
use conclave_queue::QueueError;
use conclave_router::RouteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubsystemError {
    #[error("subsystem `{0}` is not in the configured state and cannot accept further hooks")]
    NotConfigured(String),

    #[error("subsystem `{0}` has not been built yet")]
    NotBuilt(String),

    #[error("subsystem `{0}` has already been disposed")]
    Disposed(String),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("subsystem `{0}` has no facet of kind `{1}`")]
    MissingFacet(String, String),
}
