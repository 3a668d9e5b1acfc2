use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use conclave_message::{Message, SendOptions};
use conclave_queue::{BoundedQueue, QueueError, QueueItem, Statistics};
use conclave_router::{RouteError, Router};
use parking_lot::Mutex;
use serde_json::Value;

/// The cooperative per-subsystem loop (spec.md §4.4): drains a bounded
/// queue through a router within a caller-specified time budget. A
/// paused scheduler still accepts but performs no work.
///
/// The router is passed in at each tick rather than captured once, so a
/// router facet replaced via `overwrite` after the initial build is
/// still honored, mirroring §4.2's requirement that the message
/// processor resolve the router at the call site.
pub struct SubsystemScheduler {
    name: String,
    queue: Mutex<BoundedQueue>,
    paused: AtomicBool,
}

impl SubsystemScheduler {
    pub fn new(name: impl Into<String>, queue: BoundedQueue) -> Self {
        Self { name: name.into(), queue: Mutex::new(queue), paused: AtomicBool::new(false) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueues a message; always accepted regardless of pause state.
    pub fn accept(&self, message: Message, options: SendOptions) -> Result<(), QueueError> {
        self.queue.lock().enqueue(QueueItem { message, options })
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn queue_size(&self) -> usize {
        self.queue.lock().size()
    }

    pub fn stats(&self) -> Statistics {
        self.queue.lock().stats().clone()
    }

    /// Dequeues and routes one pair through `router`, recording
    /// statistics. `None` when paused or the queue was empty; no handler
    /// error is ever re-thrown from here, per spec.md §4.4's error
    /// policy.
    pub fn process_tick(&self, router: &Router) -> Option<Result<Value, RouteError>> {
        if self.is_paused() {
            return None;
        }
        let item = self.queue.lock().dequeue()?;
        let start = Instant::now();
        let mut options = item.options;
        let result = router.route(&item.message, &mut options);
        let elapsed = start.elapsed();
        {
            let mut queue = self.queue.lock();
            match &result {
                Ok(_) => queue.record_processed(elapsed),
                Err(_) => queue.record_errored(),
            }
        }
        Some(result)
    }

    /// Repeatedly ticks until the queue empties, the budget elapses, or
    /// the scheduler is paused mid-slice. Returns the count processed.
    pub fn process_slice(&self, router: &Router, budget_ms: u64) -> usize {
        let deadline = Instant::now() + std::time::Duration::from_millis(budget_ms);
        let mut processed = 0usize;
        loop {
            if self.is_paused() || Instant::now() >= deadline {
                break;
            }
            match self.process_tick(router) {
                Some(_) => processed += 1,
                None => break,
            }
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_message::{MessageKind, Path};
    use conclave_queue::{OverflowPolicy, SelectionStrategy};
    use conclave_router::RouteMetadata;
    use serde_json::json;
    use std::sync::Arc;

    fn echo_router() -> Router {
        let mut router = Router::new();
        router
            .register(
                "api://ping",
                Arc::new(|_m, _p, _o| Ok(json!({"ok": true}))),
                RouteMetadata::none(),
            )
            .unwrap();
        router
    }

    fn scheduler() -> SubsystemScheduler {
        let queue = BoundedQueue::new(8, OverflowPolicy::Reject, SelectionStrategy::Fifo);
        SubsystemScheduler::new("api", queue)
    }

    fn ping() -> (Message, SendOptions) {
        (
            Message::new(Path::parse("api://ping").unwrap(), MessageKind::Query, Value::Null),
            SendOptions::new(),
        )
    }

    #[test]
    fn process_tick_is_a_no_op_on_empty_queue() {
        let scheduler = scheduler();
        let router = echo_router();
        assert!(scheduler.process_tick(&router).is_none());
    }

    #[test]
    fn process_tick_routes_and_records_statistics() {
        let scheduler = scheduler();
        let router = echo_router();
        let (msg, opts) = ping();
        scheduler.accept(msg, opts).unwrap();
        let result = scheduler.process_tick(&router).unwrap();
        assert_eq!(result.unwrap(), json!({"ok": true}));
        assert_eq!(scheduler.stats().processed(), 1);
    }

    #[test]
    fn paused_scheduler_still_accepts_but_does_no_work() {
        let scheduler = scheduler();
        let router = echo_router();
        scheduler.pause();
        let (msg, opts) = ping();
        scheduler.accept(msg, opts).unwrap();
        assert_eq!(scheduler.queue_size(), 1);
        assert!(scheduler.process_tick(&router).is_none());
        assert_eq!(scheduler.queue_size(), 1);
    }

    #[test]
    fn process_slice_drains_until_queue_empties() {
        let scheduler = scheduler();
        let router = echo_router();
        for _ in 0..10 {
            let (msg, opts) = ping();
            scheduler.accept(msg, opts).unwrap();
        }
        let processed = scheduler.process_slice(&router, 20);
        assert_eq!(processed, 10);
        assert_eq!(scheduler.queue_size(), 0);
    }

    #[test]
    fn a_router_swapped_in_after_construction_is_honored_next_tick() {
        let scheduler = scheduler();
        let mut router = Router::new();
        router
            .register("api://ping", Arc::new(|_m, _p, _o| Ok(json!({"v": 1}))), RouteMetadata::none())
            .unwrap();
        let (msg, opts) = ping();
        scheduler.accept(msg, opts).unwrap();
        let mut replacement = Router::new();
        replacement
            .register("api://ping", Arc::new(|_m, _p, _o| Ok(json!({"v": 2}))), RouteMetadata::none())
            .unwrap();
        // Nothing captured `router` by reference ahead of time; the
        // caller decides, at each tick, which router instance to pass.
        let result = scheduler.process_tick(&replacement).unwrap();
        assert_eq!(result.unwrap(), json!({"v": 2}));
        let _ = router;
    }
}
