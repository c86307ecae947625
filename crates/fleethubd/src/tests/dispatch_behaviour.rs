//! Behavioural tests for operator command dispatch against live sessions.

use std::cell::RefCell;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{scenario, then, when};

use crate::dispatch::DispatchFailure;

use super::support::{HubWorld, StepResult};

const QUIET_WINDOW: Duration = Duration::from_millis(150);

#[fixture]
fn world() -> RefCell<HubWorld> {
    RefCell::new(HubWorld::new())
}

#[when("the operator sends {command} to {name}")]
fn when_operator_sends(world: &RefCell<HubWorld>, command: String, name: String) -> StepResult {
    world.borrow_mut().dispatch(&name, &command)
}

#[then("the dispatch is sent to {name}")]
fn then_dispatch_sent(world: &RefCell<HubWorld>, name: String) -> StepResult {
    match world.borrow().dispatch_result() {
        Some(Ok(target)) if *target == name => Ok(()),
        other => Err(format!("expected a send to {name}, got {other:?}")),
    }
}

#[then("the dispatch fails with {reason}")]
fn then_dispatch_fails(world: &RefCell<HubWorld>, reason: String) -> StepResult {
    match world.borrow().dispatch_result() {
        Some(Err(failure)) if failure.reason() == reason => Ok(()),
        other => Err(format!("expected a {reason} failure, got {other:?}")),
    }
}

#[then("device {label} reads the command {command}")]
fn then_device_reads(world: &RefCell<HubWorld>, label: String, command: String) -> StepResult {
    let mut world = world.borrow_mut();
    let received = world
        .device(&label)?
        .read_text()
        .map_err(|error| error.to_string())?;
    if received == command {
        Ok(())
    } else {
        Err(format!("{label} read {received:?}, expected {command:?}"))
    }
}

#[then("device {label} hears nothing from the hub")]
fn then_device_hears_nothing(world: &RefCell<HubWorld>, label: String) -> StepResult {
    let mut world = world.borrow_mut();
    let silent = world
        .device(&label)?
        .stays_silent(QUIET_WINDOW)
        .map_err(|error| error.to_string())?;
    if silent {
        Ok(())
    } else {
        Err(format!("{label} received bytes meant for another slot"))
    }
}

#[then("the failure names {name} as the target")]
fn then_failure_names(world: &RefCell<HubWorld>, name: String) -> StepResult {
    match world.borrow().dispatch_result() {
        Some(Err(DispatchFailure::NoSession { name: target })) if *target == name => Ok(()),
        other => Err(format!("expected a no-session failure for {name}, got {other:?}")),
    }
}

#[scenario(path = "tests/features/command_dispatch.feature")]
fn command_dispatch(world: RefCell<HubWorld>) {
    let _ = world;
}
