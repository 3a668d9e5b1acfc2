use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::error;
use uuid::Uuid;

const LOG_TARGET: &str = "conclave_kernel::error_manager";

/// Bound on the `recent` ring buffer; older entries are dropped as new
/// ones arrive.
const RECENT_CAPACITY: usize = 100;

/// One recorded failure: its kind and the trace id of the message that
/// carried it, for correlating a `recent` entry back to logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: String,
    pub trace_id: Uuid,
}

/// Per-kind error counters plus a bounded recent-events buffer for the
/// kernel (spec.md §4.7's error-manager kernel child, §6's
/// `kernel://error/query/recent|by-type|summary`). Recording only
/// happens when something explicitly sends a `kernel://error/record/{kind}`
/// message; nothing on the dispatch path records automatically.
#[derive(Default)]
pub struct ErrorManager {
    counts: Mutex<HashMap<String, u64>>,
    recent: Mutex<VecDeque<ErrorRecord>>,
}

impl ErrorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: &str, trace_id: Uuid) {
        *self.counts.lock().entry(kind.to_string()).or_insert(0) += 1;

        let mut recent = self.recent.lock();
        if recent.len() == RECENT_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(ErrorRecord { kind: kind.to_string(), trace_id });

        error!(target: LOG_TARGET, kind, %trace_id, "kernel error recorded");
    }

    pub fn count(&self, kind: &str) -> u64 {
        self.counts.lock().get(kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.lock().values().sum()
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counts.lock().clone()
    }

    /// The `limit` most recently recorded entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ErrorRecord> {
        self.recent.lock().iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_counts_by_kind() {
        let manager = ErrorManager::new();
        manager.record("scope_denied", Uuid::new_v4());
        manager.record("scope_denied", Uuid::new_v4());
        manager.record("route_not_found", Uuid::new_v4());
        assert_eq!(manager.count("scope_denied"), 2);
        assert_eq!(manager.count("route_not_found"), 1);
        assert_eq!(manager.count("unknown"), 0);
        assert_eq!(manager.total(), 3);
    }

    #[test]
    fn recent_returns_newest_first_and_is_bounded() {
        let manager = ErrorManager::new();
        for i in 0..RECENT_CAPACITY + 10 {
            manager.record(&format!("kind-{i}"), Uuid::new_v4());
        }
        let recent = manager.recent(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].kind, format!("kind-{}", RECENT_CAPACITY + 9));
        assert_eq!(manager.recent(RECENT_CAPACITY + 10).len(), RECENT_CAPACITY);
    }
}
