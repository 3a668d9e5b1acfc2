use conclave_message::{Message, MessageKind, MessagePool, Path, SendOptions};
use conclave_registry::MessageSystemRouter;
use futures::channel::oneshot;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::KernelError;
use crate::kernel::Kernel;
use crate::response_manager::ResponseOutcome;

const LOG_TARGET: &str = "conclave_kernel::protected";

/// Default deadline for a requires-response send whose message carries no
/// explicit `responseTimeoutMs` (spec.md §6's `response.defaultTimeoutMs`).
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5000;

/// Steps 1–4 of the protected-send pipeline (spec.md §4.7): validate
/// kernel + caller, re-stamp identity on both the message and the
/// options the router will see, then enforce channel ACL. Shared by
/// every protected-send variant.
fn prepare(kernel: &Kernel, caller: Uuid, message: &mut Message, options: &mut SendOptions) -> Result<(), KernelError> {
    let kernel_pkr = kernel.facets.access_control.kernel_pkr().ok_or(KernelError::KernelNotReady)?;
    if !kernel.facets.access_control.is_registered(caller) {
        return Err(KernelError::CallerRequired);
    }

    if options.caller_id.is_some() || options.caller_id_set_by.is_some() {
        debug!(target: LOG_TARGET, "stripping caller identity supplied by the sender");
    }
    options.caller_id = None;
    options.caller_id_set_by = None;
    options.caller_id = Some(caller);
    options.caller_id_set_by = Some(kernel_pkr.uuid);

    message.meta_mut().strip_caller_fields();
    message.meta_mut().set_caller(caller, kernel_pkr.uuid);

    let route = message.path().format();
    if !kernel.facets.channels.is_permitted(&route, caller, kernel_pkr.uuid) {
        return Err(KernelError::ChannelForbidden);
    }

    Ok(())
}

/// A plain protected send: identity stamping, channel ACL, and (when the
/// message is itself a response) resolving the matching pending entry
/// before the message continues on to its destination (spec.md §4.7
/// steps 1-5, 7).
pub fn send_protected(
    kernel: &Kernel,
    router: &MessageSystemRouter,
    caller: Uuid,
    mut message: Message,
    mut options: SendOptions,
) -> Result<Option<Value>, KernelError> {
    prepare(kernel, caller, &mut message, &mut options)?;

    if message.meta().is_response() {
        if let Some(correlation_id) = message.meta().correlation_id() {
            kernel.facets.responses.resolve(correlation_id, message.body().clone());
        }
    }

    Ok(router.dispatch(message, options)?)
}

/// A one-shot request: like [`send_protected`], but additionally
/// registers a pending response keyed by the message's correlation id
/// (generating one, and a `kernel://response/<id>` reply path, if the
/// message doesn't already carry them) before routing (spec.md §4.6,
/// §4.7 step 6). Returns the receiver the caller awaits for the reply,
/// timeout, or disposal outcome.
pub fn request_protected(
    kernel: &Kernel,
    router: &MessageSystemRouter,
    caller: Uuid,
    mut message: Message,
    mut options: SendOptions,
    timeout_ms: Option<u64>,
) -> Result<oneshot::Receiver<ResponseOutcome>, KernelError> {
    prepare(kernel, caller, &mut message, &mut options)?;

    let correlation_id = message.meta().correlation_id().unwrap_or_else(Uuid::new_v4);
    if message.meta().correlation_id().is_none() {
        let reply_to = Path::parse(&format!("kernel://response/{correlation_id}"))
            .expect("kernel response path is always well-formed");
        message.meta_mut().set_correlation(correlation_id, reply_to);
    }
    let timeout_ms = timeout_ms.or(message.meta().response_timeout_ms()).unwrap_or(DEFAULT_RESPONSE_TIMEOUT_MS);

    let rx = kernel.facets.responses.register(correlation_id, timeout_ms);
    router.dispatch(message, options)?;
    Ok(rx)
}

/// The pooled variant of [`send_protected`]: acquires the outgoing
/// message from `pool`, runs the same pipeline, and always releases it
/// back to the pool before returning, on both the success and error
/// paths, so the pool never holds a message still live in the system
/// (spec.md §4.7 "Pooled protected send"). Always dispatches immediately,
/// since a pooled message's completion must be observable synchronously
/// at the call site for the release to be safe.
pub fn send_protected_pooled(
    kernel: &Kernel,
    router: &MessageSystemRouter,
    pool: &MessagePool,
    caller: Uuid,
    path: Path,
    kind: MessageKind,
    body: Value,
    mut options: SendOptions,
) -> Result<Value, KernelError> {
    options.immediate = true;
    let message = pool.acquire(path, kind, body);
    let reusable = message.clone();

    let result = send_protected(kernel, router, caller, message, options);
    pool.release(reusable);

    match result? {
        Some(value) => Ok(value),
        None => Err(KernelError::RouteNotFound),
    }
}
