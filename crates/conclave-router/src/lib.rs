//! Per-subsystem path router (spec.md §4.2, item 2 of the dependency
//! order): a compiled path table matching an incoming path to a handler
//! plus captured parameters, with a pluggable scope-enforcement checker.

mod checker;
mod metadata;
mod pattern;
mod table;

pub use checker::{AllowAll, PermissionChecker, PermissionDenied};
pub use metadata::{RequiredPermission, RouteMetadata, Scope};
pub use pattern::{CompiledPattern, PatternError, RouteParams};
pub use table::{Handler, RegisterError, RouteError, Router, DEFAULT_CACHE_CAPACITY};
