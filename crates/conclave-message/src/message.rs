//! The immutable message envelope (spec.md §3).

use serde_json::Value;
use uuid::Uuid;

use crate::meta::{Meta, MessageKind};
use crate::path::Path;

/// Process-unique message identifier.
pub type MessageId = Uuid;

/// `{id, path, body, meta}`, the envelope every subsystem communicates
/// through. The core never inspects `body`; it is opaque JSON carried for
/// the handler's benefit.
#[derive(Debug, Clone)]
pub struct Message {
    id: MessageId,
    path: Path,
    body: Value,
    meta: Meta,
}

impl Message {
    /// Build a new command/query/event message. Responses are built via
    /// [`Message::response_to`], which fills in the correlation fields.
    pub fn new(path: Path, kind: MessageKind, body: Value) -> Self {
        Message {
            id: Uuid::new_v4(),
            path,
            body,
            meta: Meta::new(kind),
        }
    }

    /// Build a response message addressed at `reply_to`, carrying the
    /// correlation id it answers.
    pub fn response_to(reply_to: Path, correlation_id: Uuid, body: Value) -> Self {
        let mut meta = Meta::new(MessageKind::Response);
        meta.mark_as_response(correlation_id);
        Message {
            id: Uuid::new_v4(),
            path: reply_to,
            body,
            meta,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    /// Reset this message in-place to a fresh `(path, kind, body)`, as
    /// performed by the pool before a message object is reused. The
    /// previous body and meta are dropped and replaced entirely.
    pub(crate) fn reset(&mut self, path: Path, kind: MessageKind, body: Value) {
        self.id = Uuid::new_v4();
        self.path = path;
        self.body = body;
        self.meta = Meta::new(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_carries_correlation() {
        let reply_to = Path::parse("kernel://response/abc").unwrap();
        let correlation_id = Uuid::new_v4();
        let msg = Message::response_to(reply_to.clone(), correlation_id, json!({"v": 42}));
        assert!(msg.meta().is_response());
        assert_eq!(msg.meta().correlation_id(), Some(correlation_id));
        assert_eq!(msg.path(), &reply_to);
    }
}
