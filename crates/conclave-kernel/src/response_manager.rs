use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{trace, warn};
use uuid::Uuid;

const LOG_TARGET: &str = "conclave_kernel::response_manager";

/// How a pending response was ultimately settled (spec.md §4.6's
/// "exactly one of {resolve, reject, discard} fires").
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Resolved(Value),
    TimedOut,
    Disposed,
}

struct PendingEntry {
    deadline: Instant,
    sender: Option<oneshot::Sender<ResponseOutcome>>,
}

/// Map of in-flight request/response correlations plus the late-response
/// counter (spec.md §4.6's response manager). A monotonic sweeper,
/// started via [`ResponseManager::start`], rejects entries past their
/// deadline; `resolve` on an already-swept (or unknown) correlation id is
/// counted as a late response and otherwise discarded.
pub struct ResponseManager {
    pending: Mutex<HashMap<Uuid, PendingEntry>>,
    late_responses: AtomicU64,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ResponseManager {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            late_responses: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }
}

impl ResponseManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending response with an absolute deadline
    /// `timeout_ms` from now, returning the receiver the caller awaits
    /// (typically via `futures::executor::block_on`).
    pub fn register(&self, correlation_id: Uuid, timeout_ms: u64) -> oneshot::Receiver<ResponseOutcome> {
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        self.pending.lock().insert(correlation_id, PendingEntry { deadline, sender: Some(tx) });
        rx
    }

    /// Resolves a pending entry by correlation id. Returns `false` (and
    /// counts a late response) when no matching entry exists, either it
    /// was never registered, or the sweeper already rejected it.
    pub fn resolve(&self, correlation_id: Uuid, value: Value) -> bool {
        let entry = self.pending.lock().remove(&correlation_id);
        match entry {
            Some(mut entry) => {
                if let Some(tx) = entry.sender.take() {
                    let _ = tx.send(ResponseOutcome::Resolved(value));
                }
                true
            }
            None => {
                self.late_responses.fetch_add(1, Ordering::SeqCst);
                warn!(target: LOG_TARGET, correlation_id = %correlation_id, "late or unknown response discarded");
                false
            }
        }
    }

    /// Rejects every entry past `now` with `TimedOut`. Returns the count
    /// swept.
    pub fn sweep(&self, now: Instant) -> usize {
        let expired: Vec<Uuid> = {
            let pending = self.pending.lock();
            pending.iter().filter(|(_, entry)| entry.deadline <= now).map(|(id, _)| *id).collect()
        };
        for id in &expired {
            if let Some(mut entry) = self.pending.lock().remove(id) {
                if let Some(tx) = entry.sender.take() {
                    let _ = tx.send(ResponseOutcome::TimedOut);
                }
            }
        }
        if !expired.is_empty() {
            trace!(target: LOG_TARGET, count = expired.len(), "swept expired pending responses");
        }
        expired.len()
    }

    /// Rejects every still-pending entry with `Disposed`, e.g. when the
    /// owning subsystem is torn down.
    pub fn dispose_all(&self) {
        let mut pending = self.pending.lock();
        for (_, mut entry) in pending.drain() {
            if let Some(tx) = entry.sender.take() {
                let _ = tx.send(ResponseOutcome::Disposed);
            }
        }
    }

    pub fn late_responses(&self) -> u64 {
        self.late_responses.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Starts the monotonic sweeper on a dedicated worker thread, polling
    /// every `interval_ms`. Idempotent.
    pub fn start(self: &Arc<Self>, interval_ms: u64) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let running = self.running.clone();
        let manager = self.clone();
        let handle = std::thread::Builder::new()
            .name("conclave-response-sweeper".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    manager.sweep(Instant::now());
                    std::thread::sleep(Duration::from_millis(interval_ms));
                }
            })
            .expect("failed to spawn response sweeper thread");
        *self.worker.lock() = Some(handle);
    }

    /// Cooperatively stops the sweeper and joins its thread.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ResponseManager {
    fn drop(&mut self) {
        self.stop();
    }
}
