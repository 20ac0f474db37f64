//! Test helpers for sandbox tests
//!
//! Common utilities for normalizing sources and running them

use crate::executor::env::{Binding, Env};
use crate::executor::history::HistoryBuilder;
use crate::executor::statements;
use crate::executor::vm::VM;
use crate::normalizer::Program;
use crate::types::{RunOutcome, Step, UpdateStep, Value, Variables};

/// Normalize source and round-trip the tree through JSON
///
/// Keeps the syntax tree serializable: whatever runs here has been through serde.
pub fn parse_program(source: &str) -> Program {
    let program = crate::normalizer::normalize(source).expect("Normalize failed");
    let json = serde_json::to_string(&program).expect("Program serialization failed");
    serde_json::from_str(&json).expect("Program deserialization failed")
}

/// Run source through the sandbox on the round-tripped tree
pub fn run_source(source: &str, variables: Variables) -> RunOutcome {
    let program = parse_program(source);
    crate::executor::execute_program(&program, &variables)
}

/// Run source that is expected to succeed and return its history
pub fn run_ok(source: &str, variables: Variables) -> Vec<Step> {
    match run_source(source, variables) {
        RunOutcome::Success { history } => history,
        RunOutcome::Failure { error } => panic!("Expected success, got failure: {}", error),
    }
}

/// Run source that is expected to fail and return the error message
pub fn run_err(source: &str, variables: Variables) -> String {
    match crate::executor::execute(source, &variables) {
        RunOutcome::Failure { error } => error,
        RunOutcome::Success { history } => {
            panic!("Expected failure, got success with {} steps", history.len())
        }
    }
}

/// Run source directly on a VM and keep the final environment for inspection
pub fn run_with_env(source: &str, variables: Variables) -> (Env, Vec<Step>) {
    let program = parse_program(source);
    let env = super::super::bind_variables(&variables).expect("Binding failed");

    let mut history = HistoryBuilder::new();
    let mut vm = VM::new(env, &mut history);
    statements::run_program(&mut vm, &program.body).expect("Execution failed");

    let env = vm.env;
    (env, history.drain())
}

pub fn scalar(env: &Env, name: &str) -> i64 {
    match env.lookup(name) {
        Ok(Binding::Scalar(v)) => *v,
        other => panic!("Expected scalar '{}', got {:?}", name, other),
    }
}

pub fn container(env: &Env, name: &str) -> Value {
    match env.lookup(name) {
        Ok(Binding::Container(c)) => c.snapshot(),
        other => panic!("Expected container '{}', got {:?}", name, other),
    }
}

pub fn updates(steps: &[Step]) -> Vec<&UpdateStep> {
    steps.iter().filter_map(Step::as_update).collect()
}

/// Compact description of each step, e.g. `"Loop started"` or `"arr[2]"`
pub fn outline(steps: &[Step]) -> Vec<String> {
    steps
        .iter()
        .map(|step| match step {
            Step::Log(log) => log.message.clone(),
            Step::Update(update) => match update.changed_position {
                Some(pos) => format!("{}{}", update.variable, pos),
                None => update.variable.clone(),
            },
        })
        .collect()
}
