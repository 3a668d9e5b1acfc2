//! Subsystem and global schedulers (spec.md §4.4–§4.5, items 5 and 11 of
//! the dependency order): the per-subsystem cooperative drain loop, and
//! the round-robin/priority loop that time-slices across subsystems.

mod global;
mod subsystem;

pub use global::{GlobalScheduler, SchedulingStrategy, TimeSliced};
pub use subsystem::SubsystemScheduler;
