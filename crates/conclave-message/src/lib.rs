//! Path-addressed message envelopes.
//!
//! This is the leaf crate of the conclave workspace: the [`Message`]
//! envelope, its [`Path`] grammar, and the pooled message free-list that
//! every other crate builds on (spec.md §3, item 1).

mod message;
mod meta;
mod options;
mod path;
mod pool;

pub use message::{Message, MessageId};
pub use meta::{CallerId, CorrelationId, Meta, MessageKind, TraceId};
pub use options::SendOptions;
pub use path::{Path, PathError};
pub use pool::{MessagePool, PoolStats};
