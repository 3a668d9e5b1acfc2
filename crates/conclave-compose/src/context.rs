use std::sync::Arc;

/// Identity-only view of the subsystem being built. Compose sits below
/// `conclave-subsystem` in the dependency order, so it cannot reference the
/// full subsystem aggregate; hooks that need it look it up later through
/// the facet they themselves install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemHandle {
    pub name: String,
    pub parent: Option<String>,
}

impl SubsystemHandle {
    pub fn root(name: impl Into<String>) -> Self {
        Self { name: name.into(), parent: None }
    }

    pub fn child(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self { name: name.into(), parent: Some(parent.into()) }
    }
}

/// Build-time context handed to every hook function: shared configuration,
/// a debug flag, and the parent subsystem's handle when building a child.
#[derive(Clone)]
pub struct BuildContext {
    pub config: Arc<serde_json::Value>,
    pub debug: bool,
    pub parent: Option<SubsystemHandle>,
}

impl BuildContext {
    pub fn new(config: Arc<serde_json::Value>) -> Self {
        Self { config, debug: false, parent: None }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_parent(mut self, parent: SubsystemHandle) -> Self {
        self.parent = Some(parent);
        self
    }
}
