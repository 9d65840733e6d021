//! Runtime tests driving the CLI against a scripted server.

mod behaviour;
mod support;
