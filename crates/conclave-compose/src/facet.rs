use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A lifecycle callback run during `build()` (`onInit`) or during disposal
/// or rollback (`onDispose`). Failure is reported as a reason string; the
/// builder treats it the same as a hook function failure.
pub type LifecycleFn = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// A capability installed into a subsystem's facet table. The `api` is
/// type-erased: callers that know the concrete kind downcast it with
/// [`Facet::downcast_api`].
///
/// `methods`/`properties` are a declared surface used by [`crate::Contract`]
/// checks. Rust has no runtime method reflection, so a hook must state
/// what its facet exposes rather than have it inferred.
pub struct Facet {
    kind: String,
    api: Arc<dyn Any + Send + Sync>,
    methods: Vec<String>,
    properties: Vec<String>,
    pub(crate) on_init: Option<LifecycleFn>,
    pub(crate) on_dispose: Option<LifecycleFn>,
}

impl Facet {
    pub fn new(kind: impl Into<String>, api: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            kind: kind.into(),
            api,
            methods: Vec::new(),
            properties: Vec::new(),
            on_init: None,
            on_dispose: None,
        }
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_properties(mut self, properties: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_on_init(mut self, f: LifecycleFn) -> Self {
        self.on_init = Some(f);
        self
    }

    pub fn with_on_dispose(mut self, f: LifecycleFn) -> Self {
        self.on_dispose = Some(f);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn api(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.api
    }

    pub fn on_init(&self) -> Option<LifecycleFn> {
        self.on_init.clone()
    }

    pub fn on_dispose(&self) -> Option<LifecycleFn> {
        self.on_dispose.clone()
    }

    pub fn downcast_api<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.api.clone().downcast::<T>().ok()
    }
}

impl Clone for Facet {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            api: self.api.clone(),
            methods: self.methods.clone(),
            properties: self.properties.clone(),
            on_init: self.on_init.clone(),
            on_dispose: self.on_dispose.clone(),
        }
    }
}

impl fmt::Debug for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facet")
            .field("kind", &self.kind)
            .field("methods", &self.methods)
            .field("properties", &self.properties)
            .finish()
    }
}
