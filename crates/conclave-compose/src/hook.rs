use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{BuildContext, SubsystemHandle};
use crate::facet::Facet;

/// Read-only view of the facets installed so far during a build; a hook
/// may look up facets its `required[]` already guaranteed are present.
pub struct BuildApi<'a> {
    pub(crate) installed: &'a HashMap<String, Facet>,
    pub(crate) handle: &'a SubsystemHandle,
}

impl<'a> BuildApi<'a> {
    pub fn find(&self, kind: &str) -> Option<&Facet> {
        self.installed.get(kind)
    }

    pub fn handle(&self) -> &SubsystemHandle {
        self.handle
    }
}

pub type BuildFn =
    Arc<dyn Fn(&BuildContext, &BuildApi, &SubsystemHandle) -> Result<Facet, String> + Send + Sync>;

/// Factory metadata for one facet: declares its dependency edges and
/// overwrite/attach semantics up front, separately from the `Facet` value
/// its `build` function eventually produces.
#[derive(Clone)]
pub struct HookSpec {
    pub kind: String,
    pub required: Vec<String>,
    pub attach: bool,
    pub overwrite: bool,
    pub contract: Option<String>,
    pub build: BuildFn,
}

impl HookSpec {
    pub fn new(kind: impl Into<String>, build: BuildFn) -> Self {
        Self {
            kind: kind.into(),
            required: Vec::new(),
            attach: true,
            overwrite: false,
            contract: None,
            build,
        }
    }

    pub fn requires(mut self, kinds: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn attach(mut self, attach: bool) -> Self {
        self.attach = attach;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }
}
