//! Bounded, per-subsystem message queue with configurable overflow policy
//! and selection strategy, plus the statistics counters the scheduler and
//! debug tooling read (spec.md §4.3, items 3–4 of the dependency order).

mod policy;
mod ring;
mod stats;

pub use policy::{OverflowPolicy, SelectionStrategy};
pub use ring::{BoundedQueue, QueueError, QueueItem};
pub use stats::{LatencyBuckets, Statistics};
