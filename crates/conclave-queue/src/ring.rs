//! The bounded queue itself: a ring buffer of `(message, options)` pairs
//! (spec.md §4.3).

use std::collections::VecDeque;

use conclave_message::{Message, SendOptions};
use thiserror::Error;
use tracing::{trace, warn};

use crate::policy::{OverflowPolicy, SelectionStrategy};
use crate::stats::Statistics;

const LOG_TARGET: &str = "conclave_queue";

/// A message together with the options it was sent/accepted with.
#[derive(Debug)]
pub struct QueueItem {
    pub message: Message,
    pub options: SendOptions,
}

/// Errors raised by [`BoundedQueue::enqueue`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity and the overflow policy is `reject`.
    #[error("queue is full (capacity {0})")]
    Full(usize),
}

/// Bounded FIFO (or priority) queue of pending messages for one subsystem.
pub struct BoundedQueue {
    capacity: usize,
    overflow: OverflowPolicy,
    strategy: SelectionStrategy,
    items: VecDeque<QueueItem>,
    stats: Statistics,
}

impl BoundedQueue {
    pub fn new(capacity: usize, overflow: OverflowPolicy, strategy: SelectionStrategy) -> Self {
        BoundedQueue {
            capacity,
            overflow,
            strategy,
            items: VecDeque::with_capacity(capacity.min(256)),
            stats: Statistics::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Records a processed-message latency sample. Called by the
    /// scheduler after routing completes; outside `BoundedQueue`'s own
    /// control since routing happens after the item has been dequeued.
    pub fn record_processed(&mut self, elapsed: std::time::Duration) {
        self.stats.record_processed(elapsed);
    }

    /// Records a routing failure for the item just dequeued.
    pub fn record_errored(&mut self) {
        self.stats.record_errored();
    }

    /// Insert a pair at the tail, applying the configured overflow policy
    /// if the queue is already at capacity.
    #[tracing::instrument(level = "trace", skip(self, item), fields(subsystem_queue = LOG_TARGET))]
    pub fn enqueue(&mut self, item: QueueItem) -> Result<(), QueueError> {
        if self.is_full() {
            match self.overflow {
                OverflowPolicy::Reject => {
                    trace!(target: LOG_TARGET, capacity = self.capacity, "rejecting enqueue: queue full");
                    return Err(QueueError::Full(self.capacity));
                }
                OverflowPolicy::DropOldest => {
                    self.items.pop_front();
                    self.stats.record_dropped();
                    warn!(target: LOG_TARGET, "dropped oldest message to make room");
                }
            }
        }
        self.items.push_back(item);
        self.stats.record_accepted();
        Ok(())
    }

    pub fn peek(&self) -> Option<&QueueItem> {
        match self.strategy {
            SelectionStrategy::Fifo => self.items.front(),
            SelectionStrategy::Priority => self.highest_priority_index().map(|i| &self.items[i]),
        }
    }

    /// Remove and return the next item per the configured strategy.
    pub fn dequeue(&mut self) -> Option<QueueItem> {
        match self.strategy {
            SelectionStrategy::Fifo => self.items.pop_front(),
            SelectionStrategy::Priority => {
                let idx = self.highest_priority_index()?;
                self.items.remove(idx)
            }
        }
    }

    /// Index of the earliest item with the maximum `MessageKind` priority;
    /// scanning front-to-back and taking the first strictly-greater
    /// priority preserves FIFO order among ties.
    fn highest_priority_index(&self) -> Option<usize> {
        let mut best: Option<(usize, u8)> = None;
        for (idx, item) in self.items.iter().enumerate() {
            let priority = item.message.meta().kind().priority();
            match best {
                Some((_, best_priority)) if priority <= best_priority => {}
                _ => best = Some((idx, priority)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}
