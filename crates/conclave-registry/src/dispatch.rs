use std::sync::Arc;

use conclave_message::{Message, SendOptions};
use conclave_subsystem::SubsystemError;
use serde_json::Value;
use tracing::trace;

use crate::error::DispatchError;
use crate::registry::SubsystemRegistry;

const LOG_TARGET: &str = "conclave_registry";

/// Extracts the scheme from an outgoing message's path, looks the owning
/// subsystem up in the registry, and dispatches either asynchronously
/// (enqueue) or synchronously (`processImmediately`), depending on
/// `options.immediate` (spec.md §4.5, items 9–10 of the dependency
/// order).
pub struct MessageSystemRouter {
    registry: Arc<SubsystemRegistry>,
}

impl MessageSystemRouter {
    pub fn new(registry: Arc<SubsystemRegistry>) -> Self {
        Self { registry }
    }

    /// Dispatches `message`. Returns `Some(value)` for synchronous sends
    /// (the handler's result), `None` for asynchronous ones (accepted
    /// into the subsystem's queue, result delivered later if at all).
    #[tracing::instrument(level = "trace", skip_all, fields(subsystem = LOG_TARGET))]
    pub fn dispatch(&self, message: Message, mut options: SendOptions) -> Result<Option<Value>, DispatchError> {
        let scheme = message.path().scheme().to_string();
        let subsystem = self
            .registry
            .get(&scheme)
            .ok_or_else(|| DispatchError::UnknownSubsystem(scheme.clone()))?;

        if options.immediate {
            let value = subsystem.process_immediately(&message, &mut options)?;
            trace!(target: LOG_TARGET, scheme = %scheme, "dispatched synchronously");
            Ok(Some(value))
        } else {
            subsystem.accept(message, options).map_err(|err| match err {
                SubsystemError::Queue(conclave_queue::QueueError::Full(_)) => DispatchError::QueueFull(scheme.clone()),
                other => DispatchError::Subsystem(other),
            })?;
            trace!(target: LOG_TARGET, scheme = %scheme, "dispatched asynchronously");
            Ok(None)
        }
    }
}
