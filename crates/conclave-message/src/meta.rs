//! Message metadata: the fixed fields set once at creation, and the
//! kernel-controlled fields that may only be rewritten by the kernel
//! (spec.md §3, invariant on `callerId*`).

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::path::Path;

/// 128-bit trace identifier, propagated end-to-end for observability.
pub type TraceId = Uuid;

/// Correlation identifier linking a request to its response.
pub type CorrelationId = Uuid;

/// Opaque principal reference as seen from the message layer. The identity
/// crate attaches richer semantics (role, kind) to the same uuid.
pub type CallerId = Uuid;

/// The four message kinds named in spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Command,
    Query,
    Event,
    Response,
}

impl MessageKind {
    /// Priority used by the queue's `priority` strategy: response > command
    /// > query > event (spec.md §4.3).
    pub fn priority(self) -> u8 {
        match self {
            MessageKind::Response => 3,
            MessageKind::Command => 2,
            MessageKind::Query => 1,
            MessageKind::Event => 0,
        }
    }
}

/// Message metadata. The `trace_id` / `created_at` / `kind` triple is fixed
/// at construction and never mutated again. The remaining fields are
/// mutated only by the kernel's protected-send path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    trace_id: TraceId,
    created_at_unix_nanos: u128,
    kind: MessageKind,

    caller_id: Option<CallerId>,
    caller_id_set_by: Option<CallerId>,
    is_response: bool,
    correlation_id: Option<CorrelationId>,
    reply_to: Option<Path>,
    requires_response: bool,
    response_timeout_ms: Option<u64>,
}

impl Meta {
    /// Build metadata for a freshly created message. Kernel-controlled
    /// fields start unset; only the kernel's protected-send path may fill
    /// them in.
    pub fn new(kind: MessageKind) -> Self {
        Meta {
            trace_id: Uuid::new_v4(),
            created_at_unix_nanos: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
            kind,
            caller_id: None,
            caller_id_set_by: None,
            is_response: false,
            correlation_id: None,
            reply_to: None,
            requires_response: false,
            response_timeout_ms: None,
        }
    }

    /// Attach a specific trace id instead of generating one (used by
    /// transport adapters bridging an inbound `X-Trace-Id`/`traceparent`).
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn created_at_unix_nanos(&self) -> u128 {
        self.created_at_unix_nanos
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn caller_id(&self) -> Option<CallerId> {
        self.caller_id
    }

    pub fn caller_id_set_by(&self) -> Option<CallerId> {
        self.caller_id_set_by
    }

    pub fn is_response(&self) -> bool {
        self.is_response
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }

    pub fn reply_to(&self) -> Option<&Path> {
        self.reply_to.as_ref()
    }

    pub fn requires_response(&self) -> bool {
        self.requires_response
    }

    pub fn response_timeout_ms(&self) -> Option<u64> {
        self.response_timeout_ms
    }

    /// Stamp the caller identity. Must only be invoked by the kernel;
    /// always wipes any previously present `caller_id`/`caller_id_set_by`
    /// first so a handler never observes a user-supplied value.
    pub fn set_caller(&mut self, caller_id: CallerId, set_by: CallerId) {
        self.caller_id = Some(caller_id);
        self.caller_id_set_by = Some(set_by);
    }

    /// Strip any caller-identity fields a sender may have set before the
    /// kernel re-stamps them (spec.md §3 invariant).
    pub fn strip_caller_fields(&mut self) {
        self.caller_id = None;
        self.caller_id_set_by = None;
    }

    pub fn set_correlation(&mut self, correlation_id: CorrelationId, reply_to: Path) {
        self.correlation_id = Some(correlation_id);
        self.reply_to = Some(reply_to);
    }

    pub fn mark_as_response(&mut self, correlation_id: CorrelationId) {
        self.is_response = true;
        self.correlation_id = Some(correlation_id);
    }

    pub fn request_response(&mut self, timeout_ms: u64) {
        self.requires_response = true;
        self.response_timeout_ms = Some(timeout_ms);
    }
}
