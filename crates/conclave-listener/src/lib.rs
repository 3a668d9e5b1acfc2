//! Listener (pub/sub) manager: pattern-matched subscriptions scoped to a
//! single subsystem (spec.md §4.8, item 6 of the dependency order).

use std::sync::Arc;

use conclave_message::{Message, Path};
use conclave_router::{CompiledPattern, PatternError, RouteParams};
use tracing::warn;

const LOG_TARGET: &str = "conclave_listener";

/// How a subscription behaves across repeated matching events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPolicy {
    /// Stays subscribed indefinitely; many listeners may share a pattern.
    Multiple,
    /// Replaces any prior listener registered at the same pattern.
    Single,
    /// Removed automatically after the first invocation that succeeds.
    OnceSuccess,
    /// Removed automatically after the first invocation that fails.
    OnceFailure,
}

/// A subscribed handler: `(message, captured params) -> Ok(())` on
/// success, `Err(reason)` on failure.
pub type ListenerHandler = Arc<dyn Fn(&Message, &RouteParams) -> Result<(), String> + Send + Sync>;

struct Subscription {
    pattern: CompiledPattern,
    handler: ListenerHandler,
    policy: ListenerPolicy,
}

/// Summary of one `emit` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub matched: usize,
    pub errored: usize,
}

/// Holds every pattern subscription for one subsystem and dispatches
/// events to matching listeners in subscription order.
#[derive(Default)]
pub struct ListenerManager {
    subscriptions: Vec<Subscription>,
}

impl ListenerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to events matching `pattern`. The pattern
    /// grammar is the same as route patterns (literal, `{name}`, `*`),
    /// compiled once and cached for the lifetime of the subscription.
    pub fn on(
        &mut self,
        pattern: &str,
        handler: ListenerHandler,
        policy: ListenerPolicy,
    ) -> Result<(), PatternError> {
        let compiled = CompiledPattern::compile(pattern)?;
        if policy == ListenerPolicy::Single {
            self.subscriptions.retain(|s| s.pattern.raw() != compiled.raw());
        }
        self.subscriptions.push(Subscription {
            pattern: compiled,
            handler,
            policy,
        });
        Ok(())
    }

    /// Number of currently active subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Dispatch `message` (addressed at `path`) to every matching
    /// listener, in subscription order. A panicking or erroring listener
    /// does not prevent the others from running.
    #[tracing::instrument(level = "trace", skip_all, fields(subsystem = LOG_TARGET))]
    pub fn emit(&mut self, path: &Path, message: &Message) -> EmitReport {
        let mut report = EmitReport::default();
        let mut to_remove = Vec::new();

        for (idx, sub) in self.subscriptions.iter().enumerate() {
            let Some(params) = sub.pattern.matches(path) else {
                continue;
            };
            report.matched += 1;

            let handler = sub.handler.clone();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(message, &params)
            }));
            let success = matches!(outcome, Ok(Ok(())));
            if !success {
                report.errored += 1;
                warn!(target: LOG_TARGET, path = %path, "listener failed");
            }

            match sub.policy {
                ListenerPolicy::Multiple | ListenerPolicy::Single => {}
                ListenerPolicy::OnceSuccess if success => to_remove.push(idx),
                ListenerPolicy::OnceFailure if !success => to_remove.push(idx),
                _ => {}
            }
        }

        for idx in to_remove.into_iter().rev() {
            self.subscriptions.remove(idx);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_message::{MessageKind, Path as MsgPath};
    use parking_lot::Mutex;
    use serde_json::Value;

    fn event(path: &str) -> (MsgPath, Message) {
        let p = MsgPath::parse(path).unwrap();
        let m = Message::new(p.clone(), MessageKind::Event, Value::Null);
        (p, m)
    }

    #[test]
    fn dispatches_in_subscription_order() {
        let mut manager = ListenerManager::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = order.clone();
            manager
                .on(
                    "kernel://event/*",
                    Arc::new(move |_m, _p| {
                        order.lock().push(tag);
                        Ok(())
                    }),
                    ListenerPolicy::Multiple,
                )
                .unwrap();
        }
        let (path, msg) = event("kernel://event/kernel-bootstrapped");
        let report = manager.emit(&path, &msg);
        assert_eq!(report.matched, 2);
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[test]
    fn once_success_removes_after_first_success() {
        let mut manager = ListenerManager::new();
        manager
            .on("kernel://event/*", Arc::new(|_m, _p| Ok(())), ListenerPolicy::OnceSuccess)
            .unwrap();
        let (path, msg) = event("kernel://event/x");
        manager.emit(&path, &msg);
        assert!(manager.is_empty());
    }

    #[test]
    fn once_failure_keeps_listener_on_success() {
        let mut manager = ListenerManager::new();
        manager
            .on("kernel://event/*", Arc::new(|_m, _p| Ok(())), ListenerPolicy::OnceFailure)
            .unwrap();
        let (path, msg) = event("kernel://event/x");
        manager.emit(&path, &msg);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn single_policy_replaces_prior_listener_same_pattern() {
        let mut manager = ListenerManager::new();
        manager
            .on("kernel://event/*", Arc::new(|_m, _p| Ok(())), ListenerPolicy::Single)
            .unwrap();
        manager
            .on("kernel://event/*", Arc::new(|_m, _p| Ok(())), ListenerPolicy::Single)
            .unwrap();
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn one_listener_failing_does_not_block_others() {
        let mut manager = ListenerManager::new();
        manager
            .on("kernel://event/*", Arc::new(|_m, _p| Err("boom".to_string())), ListenerPolicy::Multiple)
            .unwrap();
        let ran = Arc::new(Mutex::new(false));
        let ran2 = ran.clone();
        manager
            .on(
                "kernel://event/*",
                Arc::new(move |_m, _p| {
                    *ran2.lock() = true;
                    Ok(())
                }),
                ListenerPolicy::Multiple,
            )
            .unwrap();
        let (path, msg) = event("kernel://event/x");
        let report = manager.emit(&path, &msg);
        assert_eq!(report.matched, 2);
        assert_eq!(report.errored, 1);
        assert!(*ran.lock());
    }
}
