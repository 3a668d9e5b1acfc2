//! Per-send options that travel alongside a [`crate::Message`] but are not
//! part of its envelope: whether delivery should be synchronous, and the
//! caller identity the kernel has stamped (or a handler must never see).

use crate::meta::CallerId;

/// Options accompanying a single send/accept/route call.
///
/// `caller_id_set_by` is stripped by the router before a handler ever
/// observes `SendOptions` (spec.md §4.2, invariant 4 in §8); it exists on
/// the wire only so the kernel can prove it, not so handlers can read it.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub caller_id: Option<CallerId>,
    pub caller_id_set_by: Option<CallerId>,
    /// When `true`, delivery is synchronous (`processImmediately`) rather
    /// than enqueued for the next scheduler tick. Default: async.
    pub immediate: bool,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caller(mut self, caller_id: CallerId, set_by: CallerId) -> Self {
        self.caller_id = Some(caller_id);
        self.caller_id_set_by = Some(set_by);
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    /// Drop `caller_id_set_by` so it is never visible past the router.
    pub fn strip_caller_id_set_by(&mut self) {
        self.caller_id_set_by = None;
    }
}
