//! Connection
//!
//! This example drives a persisted connection through a nested graph.
//!
//! Key concepts:
//! - A graph child (Online) that is a composite of two parallel regions
//! - A leaf label bubbling out of the composite to leave it
//! - Re-entering through `history` to resume where the regions were
//! - Persisting snapshots through storage and lock collaborators
//!
//! Run with: RUST_LOG=debug cargo run --example connection

use hierarch::builder::GraphBuilder;
use hierarch::engine::{Bindings, Call, LeafOutcome, Machine};
use hierarch::persistence::{Instance, MemoryLock, MemoryStorage};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let graph = GraphBuilder::new()
        .graph("conn", ["conn:Offline", "conn:Online"])
        .entry_point("conn", "start", "conn:Offline", "start")
        .arrow("conn", "conn:Offline", "connected", "conn:Online", "start")
        .arrow("conn", "conn:Offline", "resumed", "conn:Online", "history")
        .arrow("conn", "conn:Online", "dropped", "conn:Offline", "start")
        .composite("conn:Online", ["conn:Online:Session", "conn:Online:Heartbeat"])
        .graph(
            "conn:Online:Session",
            ["conn:Online:Session:Anonymous", "conn:Online:Session:Authenticated"],
        )
        .entry_point(
            "conn:Online:Session",
            "start",
            "conn:Online:Session:Anonymous",
            "start",
        )
        .arrow(
            "conn:Online:Session",
            "conn:Online:Session:Anonymous",
            "login",
            "conn:Online:Session:Authenticated",
            "start",
        )
        .graph(
            "conn:Online:Heartbeat",
            ["conn:Online:Heartbeat:Healthy", "conn:Online:Heartbeat:Late"],
        )
        .entry_point(
            "conn:Online:Heartbeat",
            "start",
            "conn:Online:Heartbeat:Healthy",
            "start",
        )
        .arrow(
            "conn:Online:Heartbeat",
            "conn:Online:Heartbeat:Healthy",
            "missed",
            "conn:Online:Heartbeat:Late",
            "start",
        )
        .build()?;

    let bindings = Bindings::new()
        .leaf("conn:Offline", |call: &Call, context: Value| {
            Ok(match call.method.as_str() {
                "connect" => LeafOutcome::follow("connected", context),
                "reconnect" => LeafOutcome::follow("resumed", context),
                _ => LeafOutcome::stay(context),
            })
        })
        .leaf("conn:Online:Session:Anonymous", |call: &Call, mut context: Value| {
            if call.method != "login" {
                return Ok(LeafOutcome::stay(context));
            }
            context["user"] = call.params["user"].clone();
            Ok(LeafOutcome::follow("login", context).with_result(json!("welcome")))
        })
        .leaf("conn:Online:Session:Authenticated", |call: &Call, context: Value| {
            let user = context["user"].clone();
            Ok(LeafOutcome::stay(context).with_result(match call.method.as_str() {
                "whoami" => user,
                _ => Value::Null,
            }))
        })
        .leaf("conn:Online:Heartbeat:Healthy", |call: &Call, mut context: Value| {
            Ok(match call.method.as_str() {
                "tick" => {
                    context["misses"] = json!(1);
                    LeafOutcome::follow("missed", context)
                }
                _ => LeafOutcome::stay(context),
            })
        })
        .leaf("conn:Online:Heartbeat:Late", |call: &Call, context: Value| {
            Ok(match call.method.as_str() {
                "tick" => LeafOutcome::follow("dropped", context),
                _ => LeafOutcome::stay(context),
            })
        })
        .compose("conn", |call, context, child| {
            let mut dispatched = child.call(call, context)?;
            let calls = dispatched.context["calls"].as_u64().unwrap_or(0) + 1;
            dispatched.context["calls"] = json!(calls);
            Ok(dispatched)
        });

    let machine = Machine::new(graph, bindings).with_initial_context(json!({"calls": 0}));
    let storage = MemoryStorage::new();
    let instance = Instance::new(&machine, &storage, MemoryLock::new());

    let calls = [
        Call::new("connect"),
        Call::new("login").with_params(json!({"user": "ada"})),
        Call::new("tick"),
        Call::new("tick"),
        Call::new("reconnect"),
        Call::new("whoami"),
    ];

    for call in &calls {
        let step = instance.handle(call)?;
        println!(
            "{:<10} result={:<20} active={}",
            call.method,
            step.result.to_string(),
            serde_json::to_string(step.snapshot.configuration.active())?
        );
    }

    if let Some(snapshot) = instance.load()? {
        println!("context: {}", snapshot.context);
    }

    Ok(())
}
