//! Static + dynamic route tables, the positive-match LRU cache, and the
//! `Router` facet itself (spec.md §4.2).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use conclave_message::{Message, Path, SendOptions};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::checker::{AllowAll, PermissionChecker, PermissionDenied};
use crate::metadata::RouteMetadata;
use crate::pattern::{CompiledPattern, PatternError, RouteParams};

const LOG_TARGET: &str = "conclave_router";

/// Default bound on the positive-match LRU cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// A registered route handler. Returns the handler's result body, or an
/// error message (normalized from either an explicit `Err` return or a
/// caught panic, per spec.md §7's "throwing is normalized to
/// `HandlerError`").
pub type Handler = Arc<dyn Fn(&Message, &RouteParams, &SendOptions) -> Result<Value, String> + Send + Sync>;

struct RouteEntry {
    handler: Handler,
    metadata: RouteMetadata,
}

/// Errors raised while registering a pattern.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("pattern {0:?} is not a valid path")]
    InvalidPath(String),
}

/// Errors raised while routing a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route matches this path")]
    NoRoute,
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),
    #[error("handler error: {0}")]
    Handler(String),
}

/// A small bounded LRU keyed by formatted path string, caching positive
/// dynamic matches to avoid re-scanning the pattern list.
struct LruCache {
    capacity: usize,
    order: VecDeque<String>,
    map: HashMap<String, (Arc<RouteEntry>, RouteParams)>,
}

impl LruCache {
    fn new(capacity: usize) -> Self {
        LruCache {
            capacity,
            order: VecDeque::with_capacity(capacity.min(256)),
            map: HashMap::with_capacity(capacity.min(256)),
        }
    }

    fn get(&mut self, key: &str) -> Option<(Arc<RouteEntry>, RouteParams)> {
        let hit = self.map.get(key).cloned();
        if hit.is_some() {
            self.touch(key);
        }
        hit
    }

    fn put(&mut self, key: String, value: (Arc<RouteEntry>, RouteParams)) {
        if !self.map.contains_key(&key) {
            if self.order.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
            self.order.push_back(key.clone());
        } else {
            self.touch(&key);
        }
        self.map.insert(key, value);
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.map.clear();
    }
}

/// Per-subsystem router: a compiled path table mapping registered
/// patterns to handlers, returning `(handler, params)` on match.
///
/// Registration (`register`) mutates the router directly; once installed
/// as a subsystem facet it is typically shared behind an `Arc` and routed
/// through via `route`/`route_mut`, both of which only need `&self`; the
/// match cache is the only interior-mutable state.
pub struct Router {
    static_table: HashMap<String, Arc<RouteEntry>>,
    dynamic_table: Vec<(CompiledPattern, Arc<RouteEntry>)>,
    cache: Mutex<LruCache>,
    checker: Arc<dyn PermissionChecker>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_checker(Arc::new(AllowAll))
    }

    pub fn with_checker(checker: Arc<dyn PermissionChecker>) -> Self {
        Router {
            static_table: HashMap::new(),
            dynamic_table: Vec::new(),
            cache: Mutex::new(LruCache::new(DEFAULT_CACHE_CAPACITY)),
            checker,
        }
    }

    /// Register a pattern. Static patterns (no `{}`/`*`) go in the static
    /// table; dynamic ones are compiled and appended in insertion order.
    /// A duplicate exact pattern replaces the previous entry ("last
    /// writer wins") and emits a warning.
    pub fn register(
        &mut self,
        pattern: &str,
        handler: Handler,
        metadata: RouteMetadata,
    ) -> Result<(), RegisterError> {
        let path = Path::parse(pattern).map_err(|_| RegisterError::InvalidPath(pattern.to_string()))?;
        let entry = Arc::new(RouteEntry { handler, metadata });

        if CompiledPattern::is_dynamic(path.segments()) {
            let compiled = CompiledPattern::compile(pattern)?;
            if let Some(idx) = self
                .dynamic_table
                .iter()
                .position(|(existing, _)| existing.raw() == compiled.raw())
            {
                warn!(target: LOG_TARGET, pattern, "overwriting duplicate dynamic route");
                self.dynamic_table[idx] = (compiled, entry);
            } else {
                self.dynamic_table.push((compiled, entry));
            }
        } else {
            let key = path.format();
            if self.static_table.contains_key(&key) {
                warn!(target: LOG_TARGET, pattern, "overwriting duplicate static route");
            }
            self.static_table.insert(key, entry);
        }
        self.cache.lock().clear();
        Ok(())
    }

    fn match_path(&self, path: &Path) -> Option<(Arc<RouteEntry>, RouteParams)> {
        let key = path.format();
        if let Some(entry) = self.static_table.get(&key) {
            return Some((entry.clone(), RouteParams::new()));
        }

        let mut cache = self.cache.lock();
        if let Some(hit) = cache.get(&key) {
            return Some(hit);
        }

        for (pattern, entry) in &self.dynamic_table {
            if let Some(params) = pattern.matches(path) {
                cache.put(key.clone(), (entry.clone(), params.clone()));
                return Some((entry.clone(), params));
            }
        }
        None
    }

    /// Match `message`'s path, enforce any scope metadata, strip
    /// `caller_id_set_by` from `options`, and invoke the handler.
    #[tracing::instrument(level = "trace", skip_all, fields(subsystem = LOG_TARGET))]
    pub fn route(&self, message: &Message, options: &mut SendOptions) -> Result<Value, RouteError> {
        let (entry, params) = self.match_path(message.path()).ok_or(RouteError::NoRoute)?;

        if entry.metadata.required_permission.is_some() {
            self.checker
                .check(message, options.caller_id, &entry.metadata)?;
        }

        options.strip_caller_id_set_by();

        let handler = entry.handler.clone();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler(message, &params, options)
        }));

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(RouteError::Handler(message)),
            Err(_) => Err(RouteError::Handler("handler panicked".to_string())),
        }
    }

    /// Number of registered static patterns.
    pub fn static_len(&self) -> usize {
        self.static_table.len()
    }

    /// Number of registered dynamic patterns.
    pub fn dynamic_len(&self) -> usize {
        self.dynamic_table.len()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
