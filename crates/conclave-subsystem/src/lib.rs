//! Subsystem aggregate (spec.md §3/§4.9, item 8 of the dependency
//! order): composes a router, queue-backed scheduler, and listener
//! manager behind a hierarchical name, through the composition engine.

mod error;
mod facets;
mod subsystem;

pub use error::SubsystemError;
pub use facets::{default_hooks, FACET_LISTENERS, FACET_ROUTER, FACET_SCHEDULER};
pub use subsystem::{Subsystem, SubsystemState};
