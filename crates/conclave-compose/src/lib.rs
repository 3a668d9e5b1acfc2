//! Facet composition engine (spec.md §4.1, item 7 of the dependency
//! order): hooks declare a facet kind, its dependency edges, and
//! overwrite/attach semantics; `Builder::build` resolves a dependency-
//! ordered install plan and runs it transactionally.

mod builder;
mod context;
mod contract;
mod error;
mod facet;
mod graph;
mod hook;

pub use builder::{BuildOutcome, Builder};
pub use context::{BuildContext, SubsystemHandle};
pub use contract::{Contract, ValidateFn};
pub use error::CompositionError;
pub use facet::{Facet, LifecycleFn};
pub use graph::GraphCache;
pub use hook::{BuildApi, BuildFn, HookSpec};
