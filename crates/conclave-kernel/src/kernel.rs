use std::any::Any;
use std::sync::Arc;

use conclave_compose::{BuildContext, Facet, HookSpec};
use conclave_identity::{KernelAnchor, Pkr, ProfileRegistry};
use conclave_queue::{OverflowPolicy, SelectionStrategy};
use conclave_registry::SubsystemRegistry;
use conclave_router::{Handler, PermissionChecker, RouteMetadata};
use conclave_subsystem::{default_hooks, Subsystem};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::access_control::{AccessControl, ScopeChecker};
use crate::channel_manager::ChannelManager;
use crate::error::KernelError;
use crate::error_manager::ErrorManager;
use crate::profile_registry::ProfileRegistryHandle;
use crate::response_manager::ResponseManager;

pub const FACET_ACCESS_CONTROL: &str = "access_control";
pub const FACET_PROFILE_REGISTRY: &str = "profile_registry";
pub const FACET_CHANNEL_MANAGER: &str = "channel_manager";
pub const FACET_RESPONSE_MANAGER: &str = "response_manager";
pub const FACET_ERROR_MANAGER: &str = "error_manager";

/// Entries returned by `kernel://error/query/recent` when no narrower
/// query surface is exposed.
const DEFAULT_RECENT_LIMIT: usize = 20;

/// The five kernel children named in spec.md §4.7, plus the kernel's own
/// stable identity.
pub struct KernelFacets {
    pub access_control: Arc<AccessControl>,
    pub profiles: Arc<ProfileRegistryHandle>,
    pub channels: Arc<ChannelManager>,
    pub responses: Arc<ResponseManager>,
    pub errors: Arc<ErrorManager>,
    pub pkr: Pkr,
}

/// The built, registered kernel subsystem and its children. Only the
/// kernel may stamp `callerId` on a message (spec.md §4.7); every other
/// subsystem's router enforces scopes through the same
/// [`ScopeChecker`], built once here and handed to `default_hooks`.
pub struct Kernel {
    pub subsystem: Arc<Subsystem>,
    pub facets: KernelFacets,
}

impl Kernel {
    pub fn checker(&self) -> Arc<dyn PermissionChecker> {
        Arc::new(ScopeChecker::new(self.facets.access_control.clone(), self.facets.profiles.clone()))
    }

    pub fn pkr(&self) -> &Pkr {
        &self.facets.pkr
    }

    /// Builds the kernel subsystem: its own router/scheduler/listener
    /// triple plus the five identity/channel/response/error children,
    /// then registers the internal `kernel://response/{correlation_id}`
    /// and `kernel://error/record|query/...` routes, then installs it
    /// into `registry` under the reserved kernel name.
    pub fn bootstrap(
        config: Arc<Value>,
        queue_capacity: usize,
        overflow: OverflowPolicy,
        strategy: SelectionStrategy,
        ctx: &BuildContext,
        registry: &SubsystemRegistry,
    ) -> Result<Kernel, KernelError> {
        let anchor = KernelAnchor::new();
        let access_control = Arc::new(AccessControl::new(anchor));
        let pkr = access_control.ensure_kernel();

        let profiles = Arc::new(ProfileRegistryHandle::new(ProfileRegistry::new()));
        let channels = Arc::new(ChannelManager::new());
        let responses = Arc::new(ResponseManager::new());
        let errors = Arc::new(ErrorManager::new());

        let checker: Arc<dyn PermissionChecker> =
            Arc::new(ScopeChecker::new(access_control.clone(), profiles.clone()));

        let mut subsystem = Subsystem::root(conclave_registry::KERNEL_NAME, config);

        for hook in default_hooks(queue_capacity, overflow, strategy, checker) {
            subsystem.use_hook(hook)?;
        }
        subsystem.use_hook(facet_hook(FACET_ACCESS_CONTROL, access_control.clone()))?;
        subsystem.use_hook(facet_hook(FACET_PROFILE_REGISTRY, profiles.clone()))?;
        subsystem.use_hook(facet_hook(FACET_CHANNEL_MANAGER, channels.clone()))?;
        subsystem.use_hook(facet_hook(FACET_RESPONSE_MANAGER, responses.clone()))?;
        subsystem.use_hook(facet_hook(FACET_ERROR_MANAGER, errors.clone()))?;

        subsystem.build(ctx)?;

        subsystem.register_route(
            "kernel://response/{correlation_id}",
            response_route_handler(responses.clone()),
            RouteMetadata::none(),
        )?;
        subsystem.register_route(
            "kernel://error/record/{kind}",
            error_record_handler(errors.clone()),
            RouteMetadata::none(),
        )?;
        subsystem.register_route(
            "kernel://error/query/summary",
            error_summary_handler(errors.clone()),
            RouteMetadata::none(),
        )?;
        subsystem.register_route(
            "kernel://error/query/by-type",
            error_by_type_handler(errors.clone()),
            RouteMetadata::none(),
        )?;
        subsystem.register_route(
            "kernel://error/query/recent",
            error_recent_handler(errors.clone()),
            RouteMetadata::none(),
        )?;

        let subsystem = registry.register_kernel(subsystem)?;

        Ok(Kernel {
            subsystem,
            facets: KernelFacets { access_control, profiles, channels, responses, errors, pkr },
        })
    }
}

fn facet_hook<T: Any + Send + Sync>(kind: &'static str, value: Arc<T>) -> HookSpec {
    HookSpec::new(kind, Arc::new(move |_ctx, _api, _handle| Ok(Facet::new(kind, value.clone()))))
}

fn response_route_handler(responses: Arc<ResponseManager>) -> Handler {
    Arc::new(move |message, params, _options| {
        let raw = params.get("correlation_id").ok_or_else(|| "missing correlation_id".to_string())?;
        let correlation_id = Uuid::parse_str(raw).map_err(|e| e.to_string())?;
        let resolved = responses.resolve(correlation_id, message.body().clone());
        Ok(json!({ "resolved": resolved }))
    })
}

fn error_record_handler(errors: Arc<ErrorManager>) -> Handler {
    Arc::new(move |message, params, _options| {
        let kind = params.get("kind").ok_or_else(|| "missing error kind".to_string())?;
        errors.record(kind, message.meta().trace_id());
        Ok(Value::Null)
    })
}

fn error_summary_handler(errors: Arc<ErrorManager>) -> Handler {
    Arc::new(move |_message, _params, _options| Ok(json!({ "total": errors.total() })))
}

fn error_by_type_handler(errors: Arc<ErrorManager>) -> Handler {
    Arc::new(move |_message, _params, _options| Ok(json!({ "by_kind": errors.snapshot() })))
}

fn error_recent_handler(errors: Arc<ErrorManager>) -> Handler {
    Arc::new(move |_message, _params, _options| {
        let entries: Vec<Value> = errors
            .recent(DEFAULT_RECENT_LIMIT)
            .into_iter()
            .map(|entry| json!({ "kind": entry.kind, "trace_id": entry.trace_id }))
            .collect();
        Ok(json!({ "recent": entries }))
    })
}
