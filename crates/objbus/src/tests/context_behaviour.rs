//! Behavioural tests for lazy bus connections.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::context::{BusContext, BusKind, ConnectError};
use crate::dispatch::{MessageHandler, MethodCall};
use crate::value::Value;

use super::behaviour::QuotedString;
use super::support::{FakeConnection, RecordingConnector, scratch_config, tagged_table};

type StepResult = Result<(), String>;

struct ContextWorld {
    context: BusContext<RecordingConnector>,
    last: Option<Result<Arc<FakeConnection>, ConnectError>>,
}

impl ContextWorld {
    fn with_connector(connector: RecordingConnector) -> Self {
        Self {
            context: BusContext::new(scratch_config(), connector),
            last: None,
        }
    }
}

#[fixture]
fn world() -> RefCell<ContextWorld> {
    RefCell::new(ContextWorld::with_connector(RecordingConnector::default()))
}

fn parse_bus(name: &str) -> Result<BusKind, String> {
    name.parse::<BusKind>()
        .map_err(|error| format!("invalid bus '{name}': {error}"))
}

#[given("a bus context whose connector succeeds")]
fn given_working_connector(world: &RefCell<ContextWorld>) {
    *world.borrow_mut() = ContextWorld::with_connector(RecordingConnector::default());
}

#[given("a bus context whose connector fails once")]
fn given_flaky_connector(world: &RefCell<ContextWorld>) {
    *world.borrow_mut() = ContextWorld::with_connector(RecordingConnector::failing(1));
}

#[given("{interface} is exported on the session bus at {path}")]
fn given_session_export(
    world: &RefCell<ContextWorld>,
    interface: QuotedString,
    path: QuotedString,
) -> StepResult {
    let label = path.as_str().trim_start_matches('/').to_owned();
    world
        .borrow()
        .context
        .registry(BusKind::Session)
        .register(path.as_str(), interface.as_str(), tagged_table(label), false)
        .map_err(|error| error.to_string())
}

#[when("the {bus} bus is requested")]
fn when_bus_requested(world: &RefCell<ContextWorld>, bus: String) -> StepResult {
    let kind = parse_bus(&bus)?;
    let result = world.borrow().context.get_or_connect(kind);
    world.borrow_mut().last = Some(result);
    Ok(())
}

#[then("the last request failed")]
fn then_request_failed(world: &RefCell<ContextWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.last, Some(Err(_))),
        "expected the last request to fail"
    );
}

#[then("the last request succeeded")]
fn then_request_succeeded(world: &RefCell<ContextWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.last, Some(Ok(_))),
        "expected the last request to succeed"
    );
}

#[then("the connector was dialled {count} times")]
fn then_dialled(world: &RefCell<ContextWorld>, count: usize) -> StepResult {
    let attempts = world.borrow().context.connector().attempts();
    if attempts.len() == count {
        Ok(())
    } else {
        Err(format!("expected {count} attempts, got {attempts:?}"))
    }
}

#[then("the {bus} bus is connected")]
fn then_connected(world: &RefCell<ContextWorld>, bus: String) -> StepResult {
    let kind = parse_bus(&bus)?;
    if world.borrow().context.is_connected(kind) {
        Ok(())
    } else {
        Err(format!("the {kind} bus should be connected"))
    }
}

#[then("the {bus} bus is not connected")]
fn then_not_connected(world: &RefCell<ContextWorld>, bus: String) -> StepResult {
    let kind = parse_bus(&bus)?;
    if world.borrow().context.is_connected(kind) {
        Err(format!("the {kind} bus should not be connected"))
    } else {
        Ok(())
    }
}

#[then("the session connection answers Tag at {path} with {expected}")]
fn then_connection_answers(
    world: &RefCell<ContextWorld>,
    path: QuotedString,
    expected: QuotedString,
) -> StepResult {
    let world = world.borrow();
    let Some(Ok(connection)) = world.last.as_ref() else {
        return Err("no session connection is open".to_owned());
    };
    let reply = connection
        .handler
        .handle_call(MethodCall::new(path.as_str(), "Tag"))
        .map_err(|error| error.to_string())?;
    if reply == [Value::from(expected.as_str())] {
        Ok(())
    } else {
        Err(format!("unexpected reply {reply:?}"))
    }
}

#[scenario(
    path = "tests/features/bus_context.feature",
    name = "Connections open on first use and are reused"
)]
fn connections_are_reused(world: RefCell<ContextWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bus_context.feature",
    name = "Failed connections are retried"
)]
fn failures_are_retried(world: RefCell<ContextWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/bus_context.feature",
    name = "Objects exported before connecting are served"
)]
fn early_exports_are_served(world: RefCell<ContextWorld>) {
    drop(world);
}
