//! A lock-friendly free-list of [`Message`] objects. Acquire pops a reset
//! message (or allocates a fresh one); release pushes it back unless the
//! pool is already at capacity, in which case it is simply discarded
//! (spec.md §5, "Shared-resource policy").

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use crate::message::Message;
use crate::meta::MessageKind;
use crate::path::Path;

const LOG_TARGET: &str = "conclave_message::pool";

/// Point-in-time counters for a [`MessagePool`], useful for tests and
/// debug logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    pub acquired: u64,
    pub released: u64,
    pub allocated: u64,
}

#[derive(Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
    allocated: AtomicU64,
}

/// Thread-safe acquire/release pool of reusable [`Message`]s.
///
/// Never store a pooled message in a long-lived data structure: the pool
/// owner (the kernel's pooled protected-send path) is responsible for
/// releasing it exactly once, on every exit path including errors.
pub struct MessagePool {
    capacity: usize,
    free: Mutex<Vec<Message>>,
    counters: Counters,
}

impl MessagePool {
    pub fn new(capacity: usize) -> Self {
        MessagePool {
            capacity,
            free: Mutex::new(Vec::with_capacity(capacity)),
            counters: Counters::default(),
        }
    }

    /// Pop a reset message from the free list, or allocate a new one if
    /// the pool is currently empty.
    pub fn acquire(&self, path: Path, kind: MessageKind, body: Value) -> Message {
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        let popped = self.free.lock().pop();
        match popped {
            Some(mut msg) => {
                msg.reset(path, kind, body);
                msg
            }
            None => {
                let allocated = self.counters.allocated.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(target: LOG_TARGET, allocated, capacity = self.capacity, "pool miss, allocating fresh message");
                Message::new(path, kind, body)
            }
        }
    }

    /// Return a message to the free list. Discarded silently if the pool
    /// is already at capacity.
    pub fn release(&self, message: Message) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(message);
        }
    }

    /// Current number of idle messages held by the pool.
    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.counters.acquired.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            allocated: self.counters.allocated.load(Ordering::Relaxed),
        }
    }
}
