//! BDD step definitions for `rep` behavioural tests.
//!
//! These steps map feature scenarios in `tests/features/rep_cli.feature` to
//! harness operations that drive the CLI against a scripted server.

use super::support::*;

use std::cell::RefCell;

use rstest_bdd_macros::{given, scenario, then, when};

fn unquote(text: &str) -> String {
    text.trim_matches('"').replace("\\n", "\n")
}

#[given("a server that prints {output} and returns {value}")]
fn given_greeting_server(world: &RefCell<TestWorld>, output: String, value: String) {
    let printed = unquote(&output);
    let result = unquote(&value);
    world
        .borrow_mut()
        .start_session(
            "s1",
            vec![
                reply(&[("out", printed.as_str())]),
                reply(&[("value", result.as_str())]),
                status_reply(&["done"]),
            ],
        )
        .expect("failed to start fake server");
}

#[given("a server that raises {message}")]
fn given_raising_server(world: &RefCell<TestWorld>, message: String) {
    let error_output = unquote(&message);
    world
        .borrow_mut()
        .start_session(
            "s1",
            vec![
                reply(&[("ex", "class java.lang.ArithmeticException")]),
                reply(&[("err", error_output.as_str())]),
                status_reply(&["eval-error"]),
                status_reply(&["done"]),
            ],
        )
        .expect("failed to start fake server");
}

#[given("a server that cannot find the namespace")]
fn given_missing_namespace_server(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .start_session(
            "s1",
            vec![status_reply(&["done", "error", "namespace-not-found"])],
        )
        .expect("failed to start fake server");
}

#[given("the server port is advertised in an ancestor port file")]
fn given_port_file(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .advertise_port_in_file()
        .expect("failed to write port file");
}

#[when("the operator runs {command}")]
fn when_operator_runs(world: &RefCell<TestWorld>, command: String) {
    world
        .borrow_mut()
        .run(&command)
        .expect("failed to run CLI");
}

#[then("stdout is {expected}")]
fn then_stdout_is(world: &RefCell<TestWorld>, expected: String) {
    let world = world.borrow();
    let stdout = world.stdout_text().expect("stdout utf8");
    assert_eq!(stdout, unquote(&expected));
}

#[then("stderr is {expected}")]
fn then_stderr_is(world: &RefCell<TestWorld>, expected: String) {
    let world = world.borrow();
    let stderr = world.stderr_text().expect("stderr utf8");
    assert_eq!(stderr, unquote(&expected));
}

#[then("stderr contains {snippet}")]
fn then_stderr_contains(world: &RefCell<TestWorld>, snippet: String) {
    let world = world.borrow();
    let stderr = world.stderr_text().expect("stderr utf8");
    let snippet = unquote(&snippet);
    assert!(
        stderr.contains(&snippet),
        "stderr {stderr:?} did not contain {snippet:?}"
    );
}

#[then("the CLI exits with code {status}")]
fn then_exit_code(world: &RefCell<TestWorld>, status: u8) {
    world
        .borrow()
        .assert_exit_code(status)
        .expect("exit code mismatch");
}

#[then("the server receives {ops}")]
fn then_server_receives(world: &RefCell<TestWorld>, ops: String) {
    let expected: Vec<String> = unquote(&ops)
        .split(',')
        .map(|op| op.trim().to_owned())
        .filter(|op| !op.is_empty())
        .collect();
    assert_eq!(world.borrow().request_ops(), expected);
}

#[then("the evaluation request sets {key} to {value}")]
fn then_evaluation_field(world: &RefCell<TestWorld>, key: String, value: String) {
    let actual = world
        .borrow()
        .evaluation_field(&unquote(&key))
        .expect("evaluation field");
    assert_eq!(actual, unquote(&value));
}

#[scenario(
    path = "tests/features/rep_cli.feature",
    name = "Evaluating code prints output and the value"
)]
fn evaluating_prints_output(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rep_cli.feature",
    name = "An exception exits with status 1"
)]
fn exception_exits_with_one(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rep_cli.feature",
    name = "A missing namespace is reported"
)]
fn missing_namespace_reported(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rep_cli.feature",
    name = "The port is discovered from an ancestor directory"
)]
fn port_file_discovered(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rep_cli.feature",
    name = "Custom print filters replace the defaults"
)]
fn custom_print_filters(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/rep_cli.feature",
    name = "An invalid line reference is fatal"
)]
fn invalid_line_fatal(world: RefCell<TestWorld>) {
    let _ = world;
}
