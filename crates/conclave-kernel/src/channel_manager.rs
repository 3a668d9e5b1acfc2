use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

/// A pre-created participant list with a stable route (spec.md §3
/// "Channel"). ACL is simple membership: the caller's PKR uuid must be a
/// participant, or the caller must be the kernel.
#[derive(Debug, Clone)]
pub struct Channel {
    pub route: String,
    pub participants: HashSet<Uuid>,
    pub metadata: Value,
}

impl Channel {
    pub fn new(route: impl Into<String>) -> Self {
        Self { route: route.into(), participants: HashSet::new(), metadata: Value::Null }
    }

    pub fn with_participants(mut self, participants: impl IntoIterator<Item = Uuid>) -> Self {
        self.participants.extend(participants);
        self
    }
}

/// Owns every registered channel (spec.md §4.7's channel-manager kernel
/// child). `reply_to` paths under `kernel://response/...` are a one-shot
/// correlation target, not a channel, and bypass this ACL entirely (the
/// Open Question spec.md §9 resolves in that direction).
#[derive(Default)]
pub struct ChannelManager {
    channels: Mutex<HashMap<String, Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, channel: Channel) {
        self.channels.lock().insert(channel.route.clone(), channel);
    }

    pub fn get(&self, route: &str) -> Option<Channel> {
        self.channels.lock().get(route).cloned()
    }

    pub fn add_participant(&self, route: &str, pkr: Uuid) -> bool {
        match self.channels.lock().get_mut(route) {
            Some(channel) => {
                channel.participants.insert(pkr);
                true
            }
            None => false,
        }
    }

    /// `route` is the raw outgoing path (e.g. `chat://room/1/msg`); a
    /// channel is matched by exact route only. Returns `true` when `route`
    /// is not a registered channel at all; non-channel paths are not
    /// subject to this ACL.
    pub fn is_permitted(&self, route: &str, caller: Uuid, kernel: Uuid) -> bool {
        if caller == kernel {
            return true;
        }
        match self.channels.lock().get(route) {
            Some(channel) => channel.participants.contains(&caller),
            None => true,
        }
    }

    pub fn is_channel(&self, route: &str) -> bool {
        self.channels.lock().contains_key(route)
    }
}
