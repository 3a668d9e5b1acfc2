//! Overflow and selection policy for [`crate::BoundedQueue`] (spec.md §4.3).

use serde::{Deserialize, Serialize};

/// What `enqueue` does when the queue is already at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// `enqueue` fails and leaves the queue untouched; the caller decides
    /// what to do with the rejected item. This is the default.
    Reject,
    /// Evict the head of the queue, then enqueue; records a `dropped`
    /// statistic.
    DropOldest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::Reject
    }
}

/// How `dequeue` picks the next item among those waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Strict arrival order. The default.
    Fifo,
    /// Highest `MessageKind` priority first (response > command > query >
    /// event), ties broken by enqueue order.
    Priority,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        SelectionStrategy::Fifo
    }
}
