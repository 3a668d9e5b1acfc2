use std::collections::HashMap;

use tracing::warn;

use crate::context::{BuildContext, SubsystemHandle};
use crate::error::CompositionError;
use crate::facet::Facet;
use crate::graph::{build_edges, producer_of, topo_sort, GraphCache};
use crate::hook::{BuildApi, HookSpec};
use crate::contract::Contract;

const LOG_TARGET: &str = "conclave_compose";

/// The outcome of a successful `build()`: the full facet table plus the
/// order in which facets were installed (and, for the ones that have an
/// `onInit`, initialized).
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub facets: HashMap<String, Facet>,
    pub order: Vec<String>,
}

/// Accumulates hooks and contracts for one subsystem, then computes a
/// dependency-ordered build plan and executes it transactionally: either
/// every hook installs and initializes, or none of its effects survive.
#[derive(Default)]
pub struct Builder {
    hooks: Vec<HookSpec>,
    contracts: HashMap<String, Contract>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_hook(&mut self, hook: HookSpec) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_contract(&mut self, contract: Contract) -> &mut Self {
        self.contracts.insert(contract.name.clone(), contract);
        self
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Build against an empty base facet table.
    pub fn build(
        &self,
        ctx: &BuildContext,
        handle: &SubsystemHandle,
        cache: &GraphCache,
    ) -> Result<BuildOutcome, CompositionError> {
        self.build_on(ctx, handle, cache, &HashMap::new())
    }

    /// Build on top of a pre-existing facet table (e.g. facets a parent
    /// subsystem already installed, or a previous successful build being
    /// extended). Facets present in `base` satisfy `required[]` without
    /// needing an edge, since they are already installed.
    pub fn build_on(
        &self,
        ctx: &BuildContext,
        handle: &SubsystemHandle,
        cache: &GraphCache,
        base: &HashMap<String, Facet>,
    ) -> Result<BuildOutcome, CompositionError> {
        let n = self.hooks.len();
        let producers = producer_of(&self.hooks);
        let edges = build_edges(&self.hooks, &producers, base)?;

        let cache_key = GraphCache::key_for(&self.hooks);
        let order = match cache.get(&cache_key) {
            Some(order) if order.len() == n => order,
            _ => match topo_sort(n, &edges) {
                Ok(order) => {
                    cache.put(cache_key, order.clone());
                    order
                }
                Err(remaining) => {
                    let kinds = remaining.iter().map(|&i| self.hooks[i].kind.clone()).collect();
                    return Err(CompositionError::CyclicDependency(kinds));
                }
            },
        };

        let mut installed: HashMap<String, Facet> = base.clone();
        let mut install_order: Vec<String> = Vec::new();
        let mut initialized: Vec<String> = Vec::new();

        let result: Result<(), CompositionError> = (|| {
            for &idx in &order {
                let hook = &self.hooks[idx];
                if installed.contains_key(&hook.kind) && !hook.overwrite {
                    return Err(CompositionError::HookFailure(
                        hook.kind.clone(),
                        "a facet of this kind is already installed and overwrite is false".to_string(),
                    ));
                }

                let facet = {
                    let api = BuildApi { installed: &installed, handle };
                    (hook.build)(ctx, &api, handle)
                        .map_err(|cause| CompositionError::HookFailure(hook.kind.clone(), cause))?
                };

                if let Some(contract_name) = &hook.contract {
                    let contract = self.contracts.get(contract_name).ok_or_else(|| {
                        CompositionError::ContractViolation(
                            hook.kind.clone(),
                            contract_name.clone(),
                            "no contract registered under this name".to_string(),
                        )
                    })?;
                    let api = BuildApi { installed: &installed, handle };
                    contract.check(ctx, &api, handle, &facet).map_err(|reason| {
                        CompositionError::ContractViolation(hook.kind.clone(), contract_name.clone(), reason)
                    })?;
                }

                installed.insert(hook.kind.clone(), facet);
                install_order.push(hook.kind.clone());
            }

            for kind in &install_order {
                let on_init = installed.get(kind).and_then(|f| f.on_init.clone());
                if let Some(on_init) = on_init {
                    on_init().map_err(|cause| CompositionError::HookFailure(kind.clone(), cause))?;
                }
                initialized.push(kind.clone());
            }

            Ok(())
        })();

        match result {
            Ok(()) => Ok(BuildOutcome { facets: installed, order: install_order }),
            Err(err) => {
                for kind in initialized.iter().rev() {
                    if let Some(on_dispose) = installed.get(kind).and_then(|f| f.on_dispose.clone()) {
                        if let Err(dispose_err) = on_dispose() {
                            warn!(target: LOG_TARGET, kind = %kind, error = %dispose_err, "onDispose failed during rollback");
                        }
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::BuildFn;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn handle() -> SubsystemHandle {
        SubsystemHandle::root("test-subsystem")
    }

    fn ctx() -> BuildContext {
        BuildContext::new(Arc::new(serde_json::Value::Null))
    }

    fn simple_hook(kind: &str, required: &[&str]) -> HookSpec {
        let kind_owned = kind.to_string();
        let build: BuildFn = Arc::new(move |_ctx, _api, _handle| Ok(Facet::new(kind_owned.clone(), Arc::new(()))));
        HookSpec::new(kind, build).requires(required.iter().copied())
    }

    #[test]
    fn installs_dependents_after_their_producers() {
        let mut builder = Builder::new();
        builder.use_hook(simple_hook("b", &["a"]));
        builder.use_hook(simple_hook("a", &[]));
        let cache = GraphCache::new();
        let outcome = builder.build(&ctx(), &handle(), &cache).unwrap();
        let pos_a = outcome.order.iter().position(|k| k == "a").unwrap();
        let pos_b = outcome.order.iter().position(|k| k == "b").unwrap();
        assert!(pos_a < pos_b);
    }

    #[test]
    fn missing_dependency_is_reported() {
        let mut builder = Builder::new();
        builder.use_hook(simple_hook("b", &["ghost"]));
        let cache = GraphCache::new();
        let err = builder.build(&ctx(), &handle(), &cache).unwrap_err();
        assert!(matches!(err, CompositionError::MissingDependency(k) if k == "ghost"));
    }

    #[test]
    fn cyclic_dependency_is_reported() {
        let mut builder = Builder::new();
        builder.use_hook(simple_hook("a", &["b"]));
        builder.use_hook(simple_hook("b", &["a"]));
        let cache = GraphCache::new();
        let err = builder.build(&ctx(), &handle(), &cache).unwrap_err();
        assert!(matches!(err, CompositionError::CyclicDependency(_)));
    }

    #[test]
    fn failing_hook_rolls_back_already_initialized_facets_s5() {
        let counter = Arc::new(Mutex::new(0i32));

        let make_hook = |kind: &str, counter: Arc<Mutex<i32>>, fail: bool| {
            let kind_owned = kind.to_string();
            let init_counter = counter.clone();
            let dispose_counter = counter.clone();
            let build: BuildFn = Arc::new(move |_ctx, _api, _handle| {
                if fail {
                    return Err("boom".to_string());
                }
                let init_counter = init_counter.clone();
                let dispose_counter = dispose_counter.clone();
                Ok(Facet::new(kind_owned.clone(), Arc::new(()))
                    .with_on_init(Arc::new(move || {
                        *init_counter.lock() += 1;
                        Ok(())
                    }))
                    .with_on_dispose(Arc::new(move || {
                        *dispose_counter.lock() -= 1;
                        Ok(())
                    })))
            });
            HookSpec::new(kind, build)
        };

        let mut builder = Builder::new();
        builder.use_hook(make_hook("a", counter.clone(), false));
        builder.use_hook(make_hook("b", counter.clone(), false));
        builder.use_hook(make_hook("c", counter.clone(), true));

        let cache = GraphCache::new();
        let err = builder.build(&ctx(), &handle(), &cache).unwrap_err();
        assert!(matches!(err, CompositionError::HookFailure(k, _) if k == "c"));
        assert_eq!(*counter.lock(), 0);
    }

    #[test]
    fn overwrite_hook_can_see_previous_facet_via_api() {
        let first: BuildFn = Arc::new(|_ctx, _api, _handle| Ok(Facet::new("slot", Arc::new(1u32))));
        let second: BuildFn = Arc::new(|_ctx, api, _handle| {
            let previous = api.find("slot").and_then(|f| f.downcast_api::<u32>()).map(|v| *v).unwrap_or(0);
            Ok(Facet::new("slot", Arc::new(previous + 1)))
        });

        let mut builder = Builder::new();
        builder.use_hook(HookSpec::new("slot", first));
        builder.use_hook(HookSpec::new("slot", second).overwrite(true));

        let cache = GraphCache::new();
        let outcome = builder.build(&ctx(), &handle(), &cache).unwrap();
        let value = *outcome.facets.get("slot").unwrap().downcast_api::<u32>().unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn duplicate_kind_without_overwrite_is_rejected() {
        let mut builder = Builder::new();
        builder.use_hook(simple_hook("dup", &[]));
        builder.use_hook(simple_hook("dup", &[]));
        let cache = GraphCache::new();
        let err = builder.build(&ctx(), &handle(), &cache).unwrap_err();
        assert!(matches!(err, CompositionError::HookFailure(k, _) if k == "dup"));
    }

    #[test]
    fn contract_violation_is_reported() {
        let build: BuildFn = Arc::new(|_ctx, _api, _handle| Ok(Facet::new("store", Arc::new(()))));
        let mut builder = Builder::new();
        builder.use_hook(HookSpec::new("store", build).with_contract("storeish"));
        builder.with_contract(Contract::new("storeish").requires_methods(["get"]));
        let cache = GraphCache::new();
        let err = builder.build(&ctx(), &handle(), &cache).unwrap_err();
        assert!(matches!(err, CompositionError::ContractViolation(..)));
    }
}
