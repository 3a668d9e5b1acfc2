//! Wires up a `MessageSystem` with two subsystems, exercises a plain
//! protected send and a one-shot request/response, then shuts down
//! cleanly.

use std::sync::Arc;

use conclave::{
    Config, Message, MessageKind, Path, PrincipalKind, RouteMetadata, SendOptions,
};
use serde_json::{json, Value};
use tracing::{info, Level};

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let system = conclave::MessageSystem::bootstrap(Config::default()).expect("bootstrap");

    let greeter = system.default_hooks_for("greeter");
    let greeter = system.register_subsystem(greeter).expect("register greeter");
    greeter
        .register_route(
            "greeter://hello/{name}",
            Arc::new(|_message, params, _options| {
                let name = params.get("name").cloned().unwrap_or_default();
                Ok(json!({ "greeting": format!("hello, {name}") }))
            }),
            RouteMetadata::none(),
        )
        .expect("register route");

    let worker = system.default_hooks_for("worker");
    let worker = system.register_subsystem(worker).expect("register worker");
    let router = system.router().clone();
    worker
        .register_route(
            "worker://double",
            Arc::new(move |message, _params, _options| {
                let v = message.body().get("v").and_then(Value::as_i64).unwrap_or(0);
                let correlation_id = message.meta().correlation_id().ok_or("missing correlation id")?;
                let reply_to = message.meta().reply_to().cloned().ok_or("missing reply_to")?;
                let response = Message::response_to(reply_to, correlation_id, json!({ "v": v * 2 }));
                router.dispatch(response, SendOptions::new().immediate()).map_err(|e| e.to_string())?;
                Ok(Value::Null)
            }),
            RouteMetadata::none(),
        )
        .expect("register route");

    system.start();

    let caller = system.mint_principal(PrincipalKind::Friend);

    let greet = Message::new(Path::parse("greeter://hello/world").unwrap(), MessageKind::Query, Value::Null);
    let result = system.send(caller.uuid, greet, SendOptions::new().immediate()).expect("send");
    info!(?result, "greeter responded");

    let compute = Message::new(Path::parse("worker://double").unwrap(), MessageKind::Command, json!({ "v": 21 }));
    let rx = system.request(caller.uuid, compute, SendOptions::new().immediate(), Some(1000)).expect("request");
    let outcome = futures::executor::block_on(rx).expect("response channel");
    info!(?outcome, "worker responded");

    system.stop();
}
