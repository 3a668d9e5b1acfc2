use std::collections::HashMap;
use std::sync::Arc;

use conclave_compose::{BuildContext, Builder, Contract, Facet, GraphCache, HookSpec, SubsystemHandle};
use conclave_listener::{EmitReport, ListenerHandler, ListenerManager, ListenerPolicy};
use conclave_message::{Message, Path, SendOptions};
use conclave_router::{Handler, RouteError, RouteMetadata, Router};
use conclave_scheduler::{SubsystemScheduler, TimeSliced};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SubsystemError;
use crate::facets::{FACET_LISTENERS, FACET_ROUTER, FACET_SCHEDULER};

const LOG_TARGET: &str = "conclave_subsystem";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemState {
    Configured,
    Built,
    Disposed,
}

struct Inner {
    facets: HashMap<String, Facet>,
    install_order: Vec<String>,
    state: SubsystemState,
}

/// Aggregates facets behind a hierarchical name, built through the
/// composition engine and owning its own router, queue-backed scheduler,
/// listener manager, and any child subsystems (spec.md §3/§4.9, item 8 of
/// the dependency order).
///
/// `use_hook`/`add_child`/`build` take `&mut self` and are meant to run
/// before the subsystem is shared (typically before a registry wraps it
/// in an `Arc`). `dispose` and every hot-path accessor take `&self`,
/// guarded by an interior lock, so a registered subsystem can be ticked
/// from the global scheduler and disposed from elsewhere without needing
/// exclusive ownership.
pub struct Subsystem {
    handle: SubsystemHandle,
    full_name: String,
    children: Vec<Subsystem>,
    config: Arc<serde_json::Value>,
    builder: Builder,
    cache: GraphCache,
    inner: Mutex<Inner>,
}

impl Subsystem {
    pub fn root(name: impl Into<String>, config: Arc<serde_json::Value>) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            handle: SubsystemHandle::root(name),
            children: Vec::new(),
            config,
            builder: Builder::new(),
            cache: GraphCache::new(),
            inner: Mutex::new(Inner { facets: HashMap::new(), install_order: Vec::new(), state: SubsystemState::Configured }),
        }
    }

    pub fn child(name: impl Into<String>, parent_full_name: &str, config: Arc<serde_json::Value>) -> Self {
        let name = name.into();
        let full_name = format!("{parent_full_name}/{name}");
        Self {
            handle: SubsystemHandle::child(name, parent_full_name.to_string()),
            full_name,
            children: Vec::new(),
            config,
            builder: Builder::new(),
            cache: GraphCache::new(),
            inner: Mutex::new(Inner { facets: HashMap::new(), install_order: Vec::new(), state: SubsystemState::Configured }),
        }
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    /// `/`-joined name from the root; root names must be unique within
    /// the owning registry.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn state(&self) -> SubsystemState {
        self.inner.lock().state
    }

    pub fn config(&self) -> &Arc<serde_json::Value> {
        &self.config
    }

    fn require_configured(&self) -> Result<(), SubsystemError> {
        match self.inner.lock().state {
            SubsystemState::Configured => Ok(()),
            SubsystemState::Built => Err(SubsystemError::NotConfigured(self.full_name.clone())),
            SubsystemState::Disposed => Err(SubsystemError::Disposed(self.full_name.clone())),
        }
    }

    pub fn use_hook(&mut self, hook: HookSpec) -> Result<(), SubsystemError> {
        self.require_configured()?;
        self.builder.use_hook(hook);
        Ok(())
    }

    pub fn with_contract(&mut self, contract: Contract) -> Result<(), SubsystemError> {
        self.require_configured()?;
        self.builder.with_contract(contract);
        Ok(())
    }

    pub fn add_child(&mut self, child: Subsystem) -> Result<(), SubsystemError> {
        self.require_configured()?;
        self.children.push(child);
        Ok(())
    }

    pub fn children(&self) -> &[Subsystem] {
        &self.children
    }

    pub fn child_by_name(&self, name: &str) -> Option<&Subsystem> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Builds children first (leaves before ancestors, per spec.md
    /// §4.1's build algorithm step 8), then this subsystem's own facets.
    pub fn build(&mut self, ctx: &BuildContext) -> Result<(), SubsystemError> {
        self.require_configured()?;
        for child in &mut self.children {
            child.build(ctx)?;
        }
        let outcome = self.builder.build(ctx, &self.handle, &self.cache)?;
        {
            let mut inner = self.inner.lock();
            inner.facets = outcome.facets;
            inner.install_order = outcome.order;
            inner.state = SubsystemState::Built;
        }
        debug!(target: LOG_TARGET, subsystem = %self.full_name, "subsystem built");
        Ok(())
    }

    /// Returns a clone of the installed facet of this `kind`, if any.
    /// `Facet`'s payload is reference-counted, so cloning is cheap.
    pub fn find(&self, kind: &str) -> Option<Facet> {
        self.inner.lock().facets.get(kind).cloned()
    }

    pub fn router(&self) -> Option<Arc<Mutex<Router>>> {
        self.find(FACET_ROUTER).and_then(|f| f.downcast_api::<Mutex<Router>>())
    }

    pub fn scheduler(&self) -> Option<Arc<SubsystemScheduler>> {
        self.find(FACET_SCHEDULER).and_then(|f| f.downcast_api::<SubsystemScheduler>())
    }

    pub fn listeners(&self) -> Option<Arc<Mutex<ListenerManager>>> {
        self.find(FACET_LISTENERS).and_then(|f| f.downcast_api::<Mutex<ListenerManager>>())
    }

    pub fn register_route(
        &self,
        pattern: &str,
        handler: Handler,
        metadata: RouteMetadata,
    ) -> Result<(), SubsystemError> {
        let router = self
            .router()
            .ok_or_else(|| SubsystemError::MissingFacet(self.full_name.clone(), FACET_ROUTER.to_string()))?;
        router.lock().register(pattern, handler, metadata).map_err(|e| {
            SubsystemError::MissingFacet(self.full_name.clone(), format!("route registration failed: {e}"))
        })
    }

    pub fn on_event(
        &self,
        pattern: &str,
        handler: ListenerHandler,
        policy: ListenerPolicy,
    ) -> Result<(), SubsystemError> {
        let listeners = self
            .listeners()
            .ok_or_else(|| SubsystemError::MissingFacet(self.full_name.clone(), FACET_LISTENERS.to_string()))?;
        listeners.lock().on(pattern, handler, policy).map_err(|e| {
            SubsystemError::MissingFacet(self.full_name.clone(), format!("listener registration failed: {e}"))
        })
    }

    pub fn emit(&self, path: &Path, message: &Message) -> Option<EmitReport> {
        self.listeners().map(|listeners| listeners.lock().emit(path, message))
    }

    /// Enqueues a message for asynchronous processing by this
    /// subsystem's scheduler.
    pub fn accept(&self, message: Message, options: SendOptions) -> Result<(), SubsystemError> {
        let scheduler = self
            .scheduler()
            .ok_or_else(|| SubsystemError::MissingFacet(self.full_name.clone(), FACET_SCHEDULER.to_string()))?;
        scheduler.accept(message, options).map_err(SubsystemError::from)
    }

    /// Routes synchronously, bypassing the queue, used by the kernel's
    /// protected send to avoid trampoline latency (spec.md §4.5).
    pub fn process_immediately(&self, message: &Message, options: &mut SendOptions) -> Result<Value, SubsystemError> {
        let router = self
            .router()
            .ok_or_else(|| SubsystemError::MissingFacet(self.full_name.clone(), FACET_ROUTER.to_string()))?;
        let guard = router.lock();
        guard.route(message, options).map_err(SubsystemError::from)
    }

    pub fn process_tick(&self) -> Option<Result<Value, RouteError>> {
        let router = self.router()?;
        let scheduler = self.scheduler()?;
        let guard = router.lock();
        scheduler.process_tick(&guard)
    }

    pub fn process_slice(&self, budget_ms: u64) -> usize {
        let (Some(router), Some(scheduler)) = (self.router(), self.scheduler()) else {
            return 0;
        };
        let guard = router.lock();
        scheduler.process_slice(&guard, budget_ms)
    }

    pub fn pause(&self) {
        if let Some(scheduler) = self.scheduler() {
            scheduler.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(scheduler) = self.scheduler() {
            scheduler.resume();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler().map(|s| s.is_paused()).unwrap_or(false)
    }

    /// Pauses the scheduler, runs every installed facet's `onDispose` in
    /// reverse build order, then clears the facet map and disposes
    /// children (spec.md §5).
    pub fn dispose(&self) -> Result<(), SubsystemError> {
        {
            if self.inner.lock().state == SubsystemState::Disposed {
                return Ok(());
            }
        }
        self.pause();

        let (facets_snapshot, order) = {
            let mut inner = self.inner.lock();
            let order = std::mem::take(&mut inner.install_order);
            let facets = std::mem::take(&mut inner.facets);
            inner.state = SubsystemState::Disposed;
            (facets, order)
        };

        for kind in order.iter().rev() {
            if let Some(on_dispose) = facets_snapshot.get(kind).and_then(|f| f.on_dispose()) {
                if let Err(reason) = on_dispose() {
                    warn!(target: LOG_TARGET, subsystem = %self.full_name, kind = %kind, reason, "onDispose failed");
                }
            }
        }

        for child in &self.children {
            child.dispose()?;
        }
        Ok(())
    }
}

impl TimeSliced for Subsystem {
    fn name(&self) -> &str {
        &self.handle.name
    }

    fn backlog(&self) -> usize {
        self.scheduler().map(|s| s.queue_size()).unwrap_or(0)
    }

    fn process_slice(&self, budget_ms: u64) -> usize {
        Subsystem::process_slice(self, budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::default_hooks;
    use conclave_message::MessageKind;
    use conclave_queue::{OverflowPolicy, SelectionStrategy};
    use serde_json::json;

    fn ctx() -> BuildContext {
        BuildContext::new(Arc::new(Value::Null))
    }

    fn built_subsystem(name: &str) -> Subsystem {
        let mut subsystem = Subsystem::root(name, Arc::new(Value::Null));
        for hook in default_hooks(8, OverflowPolicy::Reject, SelectionStrategy::Fifo, Arc::new(conclave_router::AllowAll)) {
            subsystem.use_hook(hook).unwrap();
        }
        subsystem.build(&ctx()).unwrap();
        subsystem
    }

    #[test]
    fn basic_route_matches_with_captured_params_s1() {
        let subsystem = built_subsystem("api");
        subsystem
            .register_route(
                "api://users/{id}",
                Arc::new(|_m, params, _o| Ok(json!({"ok": true, "id": params.get("id").cloned()}))),
                RouteMetadata::none(),
            )
            .unwrap();
        let msg = Message::new(Path::parse("api://users/42").unwrap(), MessageKind::Query, Value::Null);
        let mut opts = SendOptions::new();
        let result = subsystem.process_immediately(&msg, &mut opts).unwrap();
        assert_eq!(result, json!({"ok": true, "id": "42"}));
    }

    #[test]
    fn accept_and_process_tick_drains_via_scheduler() {
        let subsystem = built_subsystem("api");
        subsystem
            .register_route("api://ping", Arc::new(|_m, _p, _o| Ok(json!({"pong": true}))), RouteMetadata::none())
            .unwrap();
        let msg = Message::new(Path::parse("api://ping").unwrap(), MessageKind::Query, Value::Null);
        subsystem.accept(msg, SendOptions::new()).unwrap();
        let result = subsystem.process_tick().unwrap();
        assert_eq!(result.unwrap(), json!({"pong": true}));
    }

    #[test]
    fn children_are_built_before_the_parent() {
        let mut parent = Subsystem::root("parent", Arc::new(Value::Null));
        let child = built_subsystem("child");
        assert_eq!(child.state(), SubsystemState::Built);
        parent.add_child(child).unwrap();
        for hook in default_hooks(8, OverflowPolicy::Reject, SelectionStrategy::Fifo, Arc::new(conclave_router::AllowAll)) {
            parent.use_hook(hook).unwrap();
        }
        parent.build(&ctx()).unwrap();
        assert_eq!(parent.state(), SubsystemState::Built);
        assert_eq!(parent.children()[0].state(), SubsystemState::Built);
        assert_eq!(parent.children()[0].full_name(), "child");
    }

    #[test]
    fn dispose_runs_on_dispose_in_reverse_install_order_and_clears_facets() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subsystem = Subsystem::root("svc", Arc::new(Value::Null));
        for hook in default_hooks(8, OverflowPolicy::Reject, SelectionStrategy::Fifo, Arc::new(conclave_router::AllowAll)) {
            subsystem.use_hook(hook).unwrap();
        }
        let order_a = order.clone();
        subsystem
            .use_hook(HookSpec::new(
                "custom-a",
                Arc::new(move |_ctx, _api, _handle| {
                    let order_a = order_a.clone();
                    Ok(Facet::new("custom-a", Arc::new(())).with_on_dispose(Arc::new(move || {
                        order_a.lock().push("a");
                        Ok(())
                    })))
                }),
            ))
            .unwrap();
        let order_b = order.clone();
        subsystem
            .use_hook(HookSpec::new(
                "custom-b",
                Arc::new(move |_ctx, _api, _handle| {
                    let order_b = order_b.clone();
                    Ok(Facet::new("custom-b", Arc::new(())).with_on_dispose(Arc::new(move || {
                        order_b.lock().push("b");
                        Ok(())
                    })))
                }),
            ))
            .unwrap();
        subsystem.build(&ctx()).unwrap();
        subsystem.dispose().unwrap();
        assert_eq!(subsystem.state(), SubsystemState::Disposed);
        assert!(subsystem.find("custom-a").is_none());
        // installed in order [router, scheduler, listeners, custom-a, custom-b];
        // disposed in reverse, so "b" runs before "a".
        assert_eq!(*order.lock(), vec!["b", "a"]);
    }

    #[test]
    fn pause_stops_processing_without_blocking_accept() {
        let subsystem = built_subsystem("api");
        subsystem
            .register_route("api://ping", Arc::new(|_m, _p, _o| Ok(Value::Null)), RouteMetadata::none())
            .unwrap();
        subsystem.pause();
        let msg = Message::new(Path::parse("api://ping").unwrap(), MessageKind::Query, Value::Null);
        subsystem.accept(msg, SendOptions::new()).unwrap();
        assert!(subsystem.process_tick().is_none());
        assert!(subsystem.is_paused());
        subsystem.resume();
        assert!(subsystem.process_tick().is_some());
    }
}
