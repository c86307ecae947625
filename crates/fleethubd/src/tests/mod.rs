//! Test suites for the fleethub server.

mod behaviour;
mod dispatch_behaviour;
mod support;
