use std::sync::Arc;

use conclave_compose::{BuildFn, Facet, HookSpec};
use conclave_listener::ListenerManager;
use conclave_queue::{BoundedQueue, OverflowPolicy, SelectionStrategy};
use conclave_router::{PermissionChecker, Router};
use conclave_scheduler::SubsystemScheduler;
use parking_lot::Mutex;

/// Well-known facet kinds. Hot paths resolve these directly; anything
/// else installed via `use_hook` falls back to the generic `find(kind)`
/// extension table (spec.md §9's "tagged variant plus extension table").
pub const FACET_ROUTER: &str = "router";
pub const FACET_SCHEDULER: &str = "scheduler";
pub const FACET_LISTENERS: &str = "listeners";

/// The three hooks every subsystem needs to be addressable at all: a
/// router, a queue-backed scheduler, and a listener manager. Application
/// hooks layer on top via `Subsystem::use_hook`. `checker` is consulted by
/// the router wherever a route carries scope metadata; subsystems built
/// outside the kernel's reach can pass `Arc::new(AllowAll)`.
pub fn default_hooks(
    queue_capacity: usize,
    overflow: OverflowPolicy,
    strategy: SelectionStrategy,
    checker: Arc<dyn PermissionChecker>,
) -> Vec<HookSpec> {
    let router_build: BuildFn = Arc::new(move |_ctx, _api, _handle| {
        Ok(Facet::new(FACET_ROUTER, Arc::new(Mutex::new(Router::with_checker(checker.clone()))))
            .with_methods(["register", "route"]))
    });

    let scheduler_build: BuildFn = Arc::new(move |_ctx, _api, handle| {
        let queue = BoundedQueue::new(queue_capacity, overflow, strategy);
        let scheduler = SubsystemScheduler::new(handle.name.clone(), queue);
        Ok(Facet::new(FACET_SCHEDULER, Arc::new(scheduler))
            .with_methods(["accept", "process_tick", "process_slice", "pause", "resume"]))
    });

    let listeners_build: BuildFn = Arc::new(|_ctx, _api, _handle| {
        Ok(Facet::new(FACET_LISTENERS, Arc::new(Mutex::new(ListenerManager::new())))
            .with_methods(["on", "emit"]))
    });

    vec![
        HookSpec::new(FACET_ROUTER, router_build),
        HookSpec::new(FACET_SCHEDULER, scheduler_build),
        HookSpec::new(FACET_LISTENERS, listeners_build),
    ]
}
