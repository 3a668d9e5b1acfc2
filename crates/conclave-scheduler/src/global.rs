use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

const LOG_TARGET: &str = "conclave_scheduler";

/// Boundary the global scheduler schedules against, so this crate never
/// needs to depend on `conclave-subsystem` (which depends on this crate
/// for [`crate::SubsystemScheduler`]), the same trait-bridge pattern
/// `conclave-router`'s `PermissionChecker` uses to avoid a cycle.
pub trait TimeSliced: Send + Sync {
    fn name(&self) -> &str;
    fn process_slice(&self, budget_ms: u64) -> usize;
    /// Pending work, used only to order the `priority` strategy. Default
    /// of zero makes every implementor usable under round-robin.
    fn backlog(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingStrategy {
    RoundRobin,
    Priority,
}

impl Default for SchedulingStrategy {
    fn default() -> Self {
        SchedulingStrategy::RoundRobin
    }
}

/// Round-robins time slices across every registered subsystem (spec.md
/// §4.5). `start()` launches a dedicated cooperative worker thread;
/// `stop()` requests termination at the next tick boundary without
/// preempting a running slice.
pub struct GlobalScheduler {
    subsystems: Mutex<Vec<Arc<dyn TimeSliced>>>,
    strategy: SchedulingStrategy,
    tick_budget_ms: u64,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl GlobalScheduler {
    pub fn new(strategy: SchedulingStrategy, tick_budget_ms: u64) -> Self {
        Self {
            subsystems: Mutex::new(Vec::new()),
            strategy,
            tick_budget_ms,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn register(&self, subsystem: Arc<dyn TimeSliced>) {
        self.subsystems.lock().push(subsystem);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn registered_count(&self) -> usize {
        self.subsystems.lock().len()
    }

    /// One full pass over every registered subsystem, in the order the
    /// active strategy prescribes. Returns slice-processed counts by
    /// name, for tests and diagnostics.
    pub fn sweep_once(&self) -> HashMap<String, usize> {
        let ordered: Vec<Arc<dyn TimeSliced>> = {
            let subs = self.subsystems.lock();
            let mut ordered: Vec<Arc<dyn TimeSliced>> = subs.clone();
            if self.strategy == SchedulingStrategy::Priority {
                ordered.sort_by(|a, b| b.backlog().cmp(&a.backlog()));
            }
            ordered
        };
        let mut results = HashMap::with_capacity(ordered.len());
        for subsystem in ordered {
            let count = subsystem.process_slice(self.tick_budget_ms);
            results.insert(subsystem.name().to_string(), count);
        }
        results
    }

    /// Starts the dedicated worker thread. A no-op if already running.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        let handle = std::thread::Builder::new()
            .name("conclave-global-scheduler".to_string())
            .spawn(move || {
                debug!(target: LOG_TARGET, "global scheduler loop started");
                while this.running.load(Ordering::SeqCst) {
                    this.sweep_once();
                    std::thread::yield_now();
                }
                debug!(target: LOG_TARGET, "global scheduler loop stopped");
            })
            .expect("failed to spawn global scheduler thread");
        *self.worker.lock() = Some(handle);
    }

    /// Cooperative stop: completes the in-flight sweep, then exits. Blocks
    /// until the worker thread has joined.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for GlobalScheduler {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            self.stop();
        }
    }
}
