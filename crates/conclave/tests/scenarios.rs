//! The eight literal-input scenarios of spec.md §8, exercised end to end
//! through the public `conclave` API rather than any one crate's
//! internals.

use std::sync::Arc;
use std::time::{Duration, Instant};

use conclave::{
    default_hooks, AllowAll, Config, ConclaveError, KernelError, Message, MessageKind, Path,
    PermissionLevel, PrincipalKind, RequiredPermission, RouteMetadata, Scope, SecurityProfile,
    SendOptions, Subsystem,
};
use conclave_scheduler::{GlobalScheduler, SchedulingStrategy, TimeSliced};
use serde_json::{json, Value};

fn system() -> conclave::MessageSystem {
    conclave::MessageSystem::bootstrap(Config::default()).unwrap()
}

/// S1 Basic route.
#[test]
fn s1_basic_route() {
    let system = system();
    let api = system.default_hooks_for("api");
    let api = system.register_subsystem(api).unwrap();
    api.register_route(
        "api://users/{id}",
        Arc::new(|_m, params, _o| Ok(json!({"ok": true, "id": params.get("id").cloned()}))),
        RouteMetadata::none(),
    )
    .unwrap();

    let caller = system.mint_principal(PrincipalKind::Friend);
    let msg = Message::new(Path::parse("api://users/42").unwrap(), MessageKind::Query, Value::Null);
    let result = system.send(caller.uuid, msg, SendOptions::new().immediate()).unwrap();
    assert_eq!(result, Some(json!({"ok": true, "id": "42"})));
}

/// S2 Scope deny.
#[test]
fn s2_scope_deny() {
    let system = system();
    let api = system.default_hooks_for("api");
    let api = system.register_subsystem(api).unwrap();
    api.register_route(
        "api://users/{id}/delete",
        Arc::new(|_m, _p, _o| Ok(json!({"deleted": true}))),
        RouteMetadata::scoped(RequiredPermission::Write, Scope::literal("users:delete")),
    )
    .unwrap();

    let reader = system.mint_principal(PrincipalKind::Friend);
    system.kernel().facets.access_control.set_role(reader.uuid, "reader").unwrap();
    system.initialize_profiles([SecurityProfile::new("reader").with_scope("users:delete", PermissionLevel::R)]);

    let msg = Message::new(Path::parse("api://users/42/delete").unwrap(), MessageKind::Command, Value::Null);
    let err = system.send(reader.uuid, msg, SendOptions::new().immediate()).unwrap_err();
    match err {
        ConclaveError::Kernel(KernelError::ScopeDenied { scope, required, got }) => {
            assert_eq!(scope, "users:delete");
            assert_eq!(required, "write");
            assert_eq!(got, "r");
        }
        other => panic!("expected ScopeDenied, got {other:?}"),
    }
}

/// S3 One-shot request/response.
#[test]
fn s3_one_shot_request_response() {
    let system = system();
    let worker = system.default_hooks_for("worker");
    let worker = system.register_subsystem(worker).unwrap();
    let router = system.router().clone();
    worker
        .register_route(
            "worker://compute",
            Arc::new(move |message, _params, _options| {
                let body = message.body().get("body").and_then(Value::as_i64).unwrap_or(0);
                let correlation_id = message.meta().correlation_id().ok_or("missing correlation id")?;
                let reply_to = message.meta().reply_to().cloned().ok_or("missing reply_to")?;
                let response = Message::response_to(reply_to, correlation_id, json!({"v": body * 2}));
                router.dispatch(response, SendOptions::new().immediate()).map_err(|e| e.to_string())?;
                Ok(Value::Null)
            }),
            RouteMetadata::none(),
        )
        .unwrap();

    let caller = system.mint_principal(PrincipalKind::Friend);
    let msg = Message::new(Path::parse("worker://compute").unwrap(), MessageKind::Command, json!({"body": 21}));
    let rx = system.request(caller.uuid, msg, SendOptions::new().immediate(), Some(1000)).unwrap();
    let outcome = futures::executor::block_on(rx).unwrap();
    assert_eq!(outcome, conclave::ResponseOutcome::Resolved(json!({"v": 42})));
    assert_eq!(system.kernel().facets.responses.pending_count(), 0);
}

/// S4 Timeout.
#[test]
fn s4_timeout() {
    let system = system();
    let worker = system.default_hooks_for("worker");
    let worker = system.register_subsystem(worker).unwrap();
    worker.register_route("worker://silent", Arc::new(|_m, _p, _o| Ok(Value::Null)), RouteMetadata::none()).unwrap();

    let caller = system.mint_principal(PrincipalKind::Friend);
    let msg = Message::new(Path::parse("worker://silent").unwrap(), MessageKind::Command, Value::Null);
    let rx = system.request(caller.uuid, msg, SendOptions::new().immediate(), Some(50)).unwrap();

    std::thread::sleep(Duration::from_millis(60));
    system.kernel().facets.responses.sweep(Instant::now());
    let outcome = futures::executor::block_on(rx).unwrap();
    assert_eq!(outcome, conclave::ResponseOutcome::TimedOut);

    assert!(!system.kernel().facets.responses.resolve(uuid::Uuid::new_v4(), Value::Null));
    assert_eq!(system.kernel().facets.responses.late_responses(), 1);
}

/// S5 Build rollback.
#[test]
fn s5_build_rollback() {
    use conclave::{BuildContext, Facet, HookSpec};
    use conclave_compose::BuildFn;
    use parking_lot::Mutex;

    let counter = Arc::new(Mutex::new(0i32));
    let make_hook = |kind: &'static str, counter: Arc<Mutex<i32>>, fail: bool| {
        let build: BuildFn = Arc::new(move |_ctx, _api, _handle| {
            if fail {
                return Err("boom".to_string());
            }
            let init_counter = counter.clone();
            let dispose_counter = counter.clone();
            Ok(Facet::new(kind, Arc::new(()))
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

    let mut subsystem = Subsystem::root("rollback", Arc::new(Value::Null));
    subsystem.use_hook(make_hook("a", counter.clone(), false)).unwrap();
    subsystem.use_hook(make_hook("b", counter.clone(), false)).unwrap();
    subsystem.use_hook(make_hook("c", counter.clone(), true)).unwrap();

    let ctx = BuildContext::new(Arc::new(Value::Null));
    let err = subsystem.build(&ctx).unwrap_err();
    assert!(err.to_string().contains('c'));
    assert_eq!(*counter.lock(), 0);
    assert!(subsystem.find("a").is_none());
    assert!(subsystem.find("b").is_none());
    assert!(subsystem.find("c").is_none());
}

/// S6 Channel ACL.
#[test]
fn s6_channel_acl() {
    let system = system();
    let chat = system.default_hooks_for("chat");
    let chat = system.register_subsystem(chat).unwrap();
    chat.register_route("chat://room/1/msg", Arc::new(|_m, _p, _o| Ok(json!({"ok": true}))), RouteMetadata::none())
        .unwrap();

    let alice = system.mint_principal(PrincipalKind::Friend);
    let mallory = system.mint_principal(PrincipalKind::Friend);
    system
        .kernel()
        .facets
        .channels
        .register(conclave_kernel::Channel::new("chat://room/1/msg").with_participants([alice.uuid]));

    let msg = Message::new(Path::parse("chat://room/1/msg").unwrap(), MessageKind::Command, Value::Null);
    let ok = system.send(alice.uuid, msg, SendOptions::new().immediate()).unwrap();
    assert_eq!(ok, Some(json!({"ok": true})));

    let msg = Message::new(Path::parse("chat://room/1/msg").unwrap(), MessageKind::Command, Value::Null);
    let err = system.send(mallory.uuid, msg, SendOptions::new().immediate()).unwrap_err();
    assert!(matches!(err, ConclaveError::Kernel(KernelError::ChannelForbidden)));
}

/// S7 Fair scheduling. Scaled down from spec.md's 1000 no-op messages per
/// subsystem to keep the test fast; the per-sweep fairness bound is
/// asserted after every sweep, not just at the end.
#[test]
fn s7_fair_scheduling() {
    const TOTAL: usize = 200;

    fn noop_subsystem(name: &str) -> Arc<Subsystem> {
        let mut subsystem = Subsystem::root(name, Arc::new(Value::Null));
        for hook in default_hooks(TOTAL + 1, conclave::OverflowPolicy::Reject, conclave::SelectionStrategy::Fifo, Arc::new(AllowAll)) {
            subsystem.use_hook(hook).unwrap();
        }
        subsystem.build(&conclave::BuildContext::new(Arc::new(Value::Null))).unwrap();
        let route = format!("{name}://noop");
        subsystem
            .register_route(
                &route,
                Arc::new(|_m, _p, _o| {
                    // Longer than the scheduler's 1ms tick budget below, so
                    // every `process_slice` call drains exactly one message.
                    std::thread::sleep(Duration::from_millis(2));
                    Ok(Value::Null)
                }),
                RouteMetadata::none(),
            )
            .unwrap();
        for _ in 0..TOTAL {
            let msg = Message::new(Path::parse(&route).unwrap(), MessageKind::Event, Value::Null);
            subsystem.accept(msg, SendOptions::new()).unwrap();
        }
        Arc::new(subsystem)
    }

    let a = noop_subsystem("a");
    let b = noop_subsystem("b");
    let scheduler = GlobalScheduler::new(SchedulingStrategy::RoundRobin, 1);
    scheduler.register(a.clone());
    scheduler.register(b.clone());

    let mut processed_a = 0usize;
    let mut processed_b = 0usize;
    while a.backlog() > 0 || b.backlog() > 0 {
        let results = scheduler.sweep_once();
        processed_a += results.get("a").copied().unwrap_or(0);
        processed_b += results.get("b").copied().unwrap_or(0);
        let diff = processed_a.abs_diff(processed_b);
        assert!(diff <= 1, "processed(a)={processed_a} processed(b)={processed_b} diverged by {diff}");
    }
    assert_eq!(processed_a, TOTAL);
    assert_eq!(processed_b, TOTAL);
}

/// S8 Pool correctness.
#[test]
fn s8_pool_correctness() {
    let system = system();
    let worker = system.default_hooks_for("worker");
    let worker = system.register_subsystem(worker).unwrap();
    worker.register_route("worker://ping", Arc::new(|_m, _p, _o| Ok(json!({"pong": true}))), RouteMetadata::none()).unwrap();

    let caller = system.mint_principal(PrincipalKind::Friend);
    for _ in 0..1000 {
        let path = Path::parse("worker://ping").unwrap();
        let result = system.send_pooled(caller.uuid, path, MessageKind::Command, Value::Null, SendOptions::new()).unwrap();
        assert_eq!(result, json!({"pong": true}));
    }

    let stats = system.pool().stats();
    assert_eq!(stats.acquired, stats.released);
    assert!(stats.allocated <= 2048);
    assert!(system.pool().len() <= system.pool().capacity());
}

/// Kernel error surface: `record` plus all three query routes
/// (spec.md §6's `kernel://error/query/recent|by-type|summary`).
#[test]
fn kernel_error_surface_covers_all_three_queries() {
    let system = system();
    let caller = system.mint_principal(PrincipalKind::Friend);

    for kind in ["route_not_found", "route_not_found", "scope_denied"] {
        let msg = Message::new(
            Path::parse(&format!("kernel://error/record/{kind}")).unwrap(),
            MessageKind::Command,
            Value::Null,
        );
        system.send(caller.uuid, msg, SendOptions::new().immediate()).unwrap();
    }

    let summary = system
        .send(
            caller.uuid,
            Message::new(Path::parse("kernel://error/query/summary").unwrap(), MessageKind::Query, Value::Null),
            SendOptions::new().immediate(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(summary["total"], json!(3));

    let by_type = system
        .send(
            caller.uuid,
            Message::new(Path::parse("kernel://error/query/by-type").unwrap(), MessageKind::Query, Value::Null),
            SendOptions::new().immediate(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(by_type["by_kind"]["route_not_found"], json!(2));
    assert_eq!(by_type["by_kind"]["scope_denied"], json!(1));

    let recent = system
        .send(
            caller.uuid,
            Message::new(Path::parse("kernel://error/query/recent").unwrap(), MessageKind::Query, Value::Null),
            SendOptions::new().immediate(),
        )
        .unwrap()
        .unwrap();
    let entries = recent["recent"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["kind"], json!("scope_denied"));
}
