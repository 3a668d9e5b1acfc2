//! The top-level orchestrator (spec.md §4.9, item 14 of the dependency
//! order): owns the kernel, the subsystem registry, the message-system
//! router, the global scheduler, and the message pool, and is the single
//! entry point application code builds against.

use std::sync::Arc;

use conclave_compose::BuildContext;
use conclave_identity::PrincipalKind;
use conclave_kernel::{mint_principal, Kernel, ResponseOutcome};
use conclave_message::{Message, MessageKind, MessagePool, Path, SendOptions};
use conclave_registry::{MessageSystemRouter, SubsystemRegistry};
use conclave_scheduler::GlobalScheduler;
use conclave_subsystem::Subsystem;
use futures::channel::oneshot;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ConclaveError;

const LOG_TARGET: &str = "conclave::system";

/// Owns every process-wide singleton named in spec.md §4.9: the kernel,
/// the subsystem registry, the message-system router, the global
/// scheduler, and the message pool. There is exactly one of these per
/// running process; it confines the global mutable state spec.md §9
/// calls out instead of reaching for process-wide statics.
pub struct MessageSystem {
    kernel: Kernel,
    registry: Arc<SubsystemRegistry>,
    router: Arc<MessageSystemRouter>,
    scheduler: Arc<GlobalScheduler>,
    pool: Arc<MessagePool>,
    config: Config,
}

impl MessageSystem {
    /// Builds the kernel, then the registry, then the router over that
    /// registry, then the global scheduler, in that order, and emits
    /// `kernel://event/kernel-bootstrapped` (spec.md §4.9). Does not
    /// start the scheduler's worker thread; call [`MessageSystem::start`]
    /// once every subsystem of interest has been registered.
    pub fn bootstrap(config: Config) -> Result<Self, ConclaveError> {
        let registry = Arc::new(SubsystemRegistry::new());
        let ctx = BuildContext::new(Arc::new(Value::Null)).with_debug(config.debug);

        let kernel = Kernel::bootstrap(
            Arc::new(Value::Null),
            config.queue.capacity,
            config.queue.overflow,
            config.queue.selection,
            &ctx,
            &registry,
        )?;

        let router = Arc::new(MessageSystemRouter::new(registry.clone()));
        let scheduler = Arc::new(GlobalScheduler::new(config.scheduler.strategy, config.scheduler.tick_budget_ms));
        scheduler.register(kernel.subsystem.clone());
        kernel.facets.responses.start(1.max(config.scheduler.tick_budget_ms));
        let pool = Arc::new(MessagePool::new(config.pool.capacity));

        let system = MessageSystem { kernel, registry, router, scheduler, pool, config };
        system.emit_kernel_event("kernel-bootstrapped", Value::Null);
        info!(target: LOG_TARGET, "message system bootstrapped");
        Ok(system)
    }

    /// Populates the profile registry from `Config::profiles`, or any
    /// additional profiles supplied afterward. Intended to run before any
    /// traffic (spec.md §4.9's `initializeProfiles`).
    pub fn initialize_profiles(&self, profiles: impl IntoIterator<Item = conclave_identity::SecurityProfile>) {
        self.kernel.facets.profiles.initialize(profiles);
    }

    /// Builds `subsystem` against this system's shared build context,
    /// records it in the registry, subscribes it to the global scheduler,
    /// and emits `kernel://event/subsystem-registered` (spec.md §4.9).
    pub fn register_subsystem(&self, mut subsystem: Subsystem) -> Result<Arc<Subsystem>, ConclaveError> {
        let ctx = BuildContext::new(Arc::new(Value::Null)).with_debug(self.config.debug);
        subsystem.build(&ctx)?;
        let name = subsystem.full_name().to_string();
        let subsystem = self.registry.register(subsystem)?;
        self.scheduler.register(subsystem.clone());
        self.emit_kernel_event("subsystem-registered", json!({ "name": name }));
        info!(target: LOG_TARGET, subsystem = %name, "subsystem registered");
        Ok(subsystem)
    }

    /// The default-hook set for a new subsystem, built from
    /// `Config::queue`'s capacity/overflow/selection, paired with a fresh
    /// [`MessageSystem::checker`], the usual starting point before
    /// registering application-specific routes and handing the result to
    /// [`MessageSystem::register_subsystem`].
    pub fn default_hooks_for(&self, name: impl Into<String>) -> Subsystem {
        let mut subsystem = Subsystem::root(name, Arc::new(Value::Null));
        let hooks = conclave_subsystem::default_hooks(
            self.config.queue.capacity,
            self.config.queue.overflow,
            self.config.queue.selection,
            self.checker(),
        );
        for hook in hooks {
            subsystem.use_hook(hook).expect("default hook set never collides on facet kind");
        }
        subsystem
    }

    /// A permission checker built on this system's shared access-control
    /// and profile state, for a caller building a new subsystem's router
    /// outside the kernel (spec.md §4.7).
    pub fn checker(&self) -> Arc<dyn conclave_router::PermissionChecker> {
        self.kernel.checker()
    }

    /// Mints and registers a fresh non-kernel principal, the way
    /// application code (rather than the kernel itself) introduces a new
    /// caller identity.
    pub fn mint_principal(&self, kind: PrincipalKind) -> conclave_identity::Pkr {
        mint_principal(&self.kernel.facets.access_control, kind)
    }

    /// A fire-and-forget or handler-synchronous send through the
    /// protected pipeline (spec.md §4.7's `sendProtected`).
    pub fn send(&self, caller: Uuid, message: Message, options: SendOptions) -> Result<Option<Value>, ConclaveError> {
        Ok(conclave_kernel::send_protected(&self.kernel, &self.router, caller, message, options)?)
    }

    /// A one-shot request/response send (spec.md §4.6/§4.7's
    /// `requestProtected`); `timeout_ms` overrides the message's own
    /// `responseTimeoutMs`, falling back to `response.defaultTimeoutMs`
    /// when neither is set.
    pub fn request(
        &self,
        caller: Uuid,
        message: Message,
        options: SendOptions,
        timeout_ms: Option<u64>,
    ) -> Result<oneshot::Receiver<ResponseOutcome>, ConclaveError> {
        let timeout_ms = timeout_ms.or(Some(self.config.response.default_timeout_ms));
        Ok(conclave_kernel::request_protected(&self.kernel, &self.router, caller, message, options, timeout_ms)?)
    }

    /// The pooled variant of [`MessageSystem::send`] (spec.md §4.7's
    /// "Pooled protected send").
    pub fn send_pooled(
        &self,
        caller: Uuid,
        path: Path,
        kind: MessageKind,
        body: Value,
        options: SendOptions,
    ) -> Result<Value, ConclaveError> {
        Ok(conclave_kernel::send_protected_pooled(&self.kernel, &self.router, &self.pool, caller, path, kind, body, options)?)
    }

    /// Starts the global scheduler's dedicated worker thread and the
    /// kernel's response sweeper. Idempotent.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Cooperatively stops the global scheduler and the response
    /// sweeper, joining both worker threads.
    pub fn stop(&self) {
        self.scheduler.stop();
        self.kernel.facets.responses.stop();
    }

    pub fn registry(&self) -> &Arc<SubsystemRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<MessageSystemRouter> {
        &self.router
    }

    pub fn pool(&self) -> &Arc<MessagePool> {
        &self.pool
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    fn emit_kernel_event(&self, name: &str, body: Value) {
        let path = Path::parse(&format!("kernel://event/{name}")).expect("kernel event path is always well-formed");
        let message = Message::new(path.clone(), MessageKind::Event, body);
        self.kernel.subsystem.emit(&path, &message);
    }
}

impl Drop for MessageSystem {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_identity::PermissionLevel;
    use conclave_router::RouteMetadata;

    fn system() -> MessageSystem {
        MessageSystem::bootstrap(Config::default()).unwrap()
    }

    #[test]
    fn bootstrap_registers_kernel_and_starts_clean() {
        let system = system();
        assert!(system.registry().contains(conclave_registry::KERNEL_NAME));
        assert_eq!(system.scheduler.registered_count(), 1);
    }

    #[test]
    fn register_subsystem_makes_it_reachable_and_schedulable() {
        let system = system();
        let echo = system.default_hooks_for("echo");
        let echo = system.register_subsystem(echo).unwrap();
        echo.register_route("echo://ping", Arc::new(|_m, _p, _o| Ok(json!({"pong": true}))), RouteMetadata::none())
            .unwrap();
        assert_eq!(system.scheduler.registered_count(), 2);

        let caller = system.mint_principal(PrincipalKind::Friend);
        let msg = Message::new(Path::parse("echo://ping").unwrap(), MessageKind::Query, Value::Null);
        let result = system.send(caller.uuid, msg, SendOptions::new().immediate()).unwrap();
        assert_eq!(result, Some(json!({"pong": true})));
    }

    #[test]
    fn initialize_profiles_feeds_the_scope_checker() {
        let system = system();
        let echo = system.default_hooks_for("echo");
        let echo = system.register_subsystem(echo).unwrap();
        echo.register_route(
            "echo://secret",
            Arc::new(|_m, _p, _o| Ok(json!({"ok": true}))),
            RouteMetadata::scoped(conclave_router::RequiredPermission::Read, conclave_router::Scope::literal("echo:secret")),
        )
        .unwrap();

        let caller = system.mint_principal(PrincipalKind::Friend);
        system.kernel().facets.access_control.set_role(caller.uuid, "reader").unwrap();
        system.initialize_profiles([conclave_identity::SecurityProfile::new("reader").with_scope("echo:secret", PermissionLevel::R)]);

        let msg = Message::new(Path::parse("echo://secret").unwrap(), MessageKind::Query, Value::Null);
        let result = system.send(caller.uuid, msg, SendOptions::new().immediate()).unwrap();
        assert_eq!(result, Some(json!({"ok": true})));
    }

    #[test]
    fn request_resolves_end_to_end() {
        let system = system();
        let worker = system.default_hooks_for("worker");
        let worker = system.register_subsystem(worker).unwrap();
        let router = system.router().clone();
        worker
            .register_route(
                "worker://double",
                Arc::new(move |message, _params, _options| {
                    let v = message.body().get("v").and_then(Value::as_i64).unwrap_or(0);
                    let correlation_id = message.meta().correlation_id().ok_or("missing correlation id")?;
                    let reply_to = message.meta().reply_to().cloned().ok_or("missing reply_to")?;
                    let response = Message::response_to(reply_to, correlation_id, json!({"v": v * 2}));
                    router.dispatch(response, SendOptions::new().immediate()).map_err(|e| e.to_string())?;
                    Ok(Value::Null)
                }),
                RouteMetadata::none(),
            )
            .unwrap();

        let caller = system.mint_principal(PrincipalKind::Friend);
        let msg = Message::new(Path::parse("worker://double").unwrap(), MessageKind::Command, json!({"v": 4}));
        let rx = system.request(caller.uuid, msg, SendOptions::new().immediate(), Some(1000)).unwrap();
        let outcome = futures::executor::block_on(rx).unwrap();
        assert_eq!(outcome, ResponseOutcome::Resolved(json!({"v": 8})));
    }

    #[test]
    fn send_pooled_recycles_the_message() {
        let system = system();
        let worker = system.default_hooks_for("worker");
        let worker = system.register_subsystem(worker).unwrap();
        worker.register_route("worker://ping", Arc::new(|_m, _p, _o| Ok(json!({"pong": true}))), RouteMetadata::none()).unwrap();

        let caller = system.mint_principal(PrincipalKind::Friend);
        let path = Path::parse("worker://ping").unwrap();
        let result = system.send_pooled(caller.uuid, path, MessageKind::Query, Value::Null, SendOptions::new()).unwrap();
        assert_eq!(result, json!({"pong": true}));
        assert_eq!(system.pool().stats().acquired, 1);
    }

    #[test]
    fn start_stop_is_idempotent() {
        let system = system();
        system.start();
        system.start();
        system.stop();
    }
}
