use std::sync::Arc;

use crate::context::{BuildContext, SubsystemHandle};
use crate::facet::Facet;
use crate::hook::BuildApi;

pub type ValidateFn = Arc<
    dyn Fn(&BuildContext, &BuildApi, &SubsystemHandle, &Facet) -> Option<String> + Send + Sync,
>;

/// A named shape a facet must satisfy before it is accepted into the
/// table: a declared method/property surface plus an optional custom
/// predicate for checks the surface alone can't express.
#[derive(Clone)]
pub struct Contract {
    pub name: String,
    pub required_methods: Vec<String>,
    pub required_properties: Vec<String>,
    pub validate: Option<ValidateFn>,
}

impl Contract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_methods: Vec::new(),
            required_properties: Vec::new(),
            validate: None,
        }
    }

    pub fn requires_methods(mut self, methods: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn requires_properties(mut self, properties: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validate(mut self, f: ValidateFn) -> Self {
        self.validate = Some(f);
        self
    }

    pub fn check(
        &self,
        ctx: &BuildContext,
        api: &BuildApi,
        handle: &SubsystemHandle,
        facet: &Facet,
    ) -> Result<(), String> {
        for method in &self.required_methods {
            if !facet.methods().iter().any(|m| m == method) {
                return Err(format!("facet `{}` is missing required method `{}`", facet.kind(), method));
            }
        }
        for property in &self.required_properties {
            if !facet.properties().iter().any(|p| p == property) {
                return Err(format!(
                    "facet `{}` is missing required property `{}`",
                    facet.kind(),
                    property
                ));
            }
        }
        if let Some(validate) = &self.validate {
            if let Some(reason) = validate(ctx, api, handle, facet) {
                return Err(reason);
            }
        }
        Ok(())
    }
}
