//! Behavioural tests for the hub bootstrap sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use fleethub_config::DEFAULT_ROSTER;

use super::support::{self, HealthEvent, TestWorld};

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_successful_loader();
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_failing_loader();
}

#[when("the hub bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().bootstrap();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
    assert!(world.hub().is_some(), "hub should have been assembled");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_some(),
        "bootstrap succeeded unexpectedly"
    );
}

#[then("the roster lists the factory devices in order")]
fn then_roster_in_order(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let hub = world.hub().expect("hub should be available");
    let roster = hub.roster();
    assert_eq!(roster.names(), DEFAULT_ROSTER.as_slice());
    assert!(
        roster.snapshot().iter().all(|slot| !slot.connected),
        "no slot may be occupied before devices connect"
    );
}

#[then("the event log file exists and is empty")]
fn then_event_log_empty(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let hub = world.hub().expect("hub should be available");
    let contents = std::fs::read_to_string(hub.config().event_log_path())
        .expect("event log should be readable");
    assert!(contents.is_empty(), "unexpected event log contents: {contents}");
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[scenario(path = "tests/features/hub_bootstrap.feature")]
fn hub_bootstrap(world: RefCell<TestWorld>) {
    let _ = world;
}
