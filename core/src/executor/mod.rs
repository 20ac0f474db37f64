//! Execution sandbox
//!
//! One run: normalize the source, bind the caller's variables (deep copies),
//! interpret the program against a fresh [`HistoryBuilder`], and turn whatever
//! happened into a [`RunOutcome`]. Every fault, whether from the grammar, the
//! bindings or the interpreter, comes out as `Failure` with no partial history.

use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::normalizer::{self, Program};
use crate::types::{RunOutcome, Step, Value, VarKind, Variable, Variables};

pub mod container;
pub mod env;
pub mod errors;
pub mod expressions;
pub mod history;
pub mod statements;
pub mod types;
pub mod vm;

pub use container::TrackedContainer;
pub use env::{Binding, Env};
pub use errors::{EngineError, ErrorKind, RuntimeError};
pub use history::{HistoryBuilder, PendingStep};
pub use types::{Control, Val};
pub use vm::VM;

#[cfg(test)]
mod tests;

/// Where a sandbox is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Normalizing,
    Binding,
    Executing,
    Completed,
    Failed,
}

/// Isolated single-shot execution context
///
/// A sandbox may be reused; every run starts from fresh bindings and an empty history.
#[derive(Debug)]
pub struct Sandbox {
    phase: RunPhase,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Normalize and run source text
    pub fn run(&mut self, source: &str, variables: &Variables) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        let _enter = span.enter();

        let result = self.normalize(source).and_then(|program| self.execute(&program, variables));
        self.finish(result)
    }

    /// Run an already normalized program
    pub fn run_program(&mut self, program: &Program, variables: &Variables) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        let _enter = span.enter();

        let result = self.execute(program, variables);
        self.finish(result)
    }

    fn normalize(&mut self, source: &str) -> Result<Program, EngineError> {
        self.phase = RunPhase::Normalizing;
        let program = normalizer::normalize(source)?;
        debug!(statements = program.body.len(), "normalized source");
        Ok(program)
    }

    fn execute(&mut self, program: &Program, variables: &Variables) -> Result<Vec<Step>, EngineError> {
        self.phase = RunPhase::Binding;
        let env = bind_variables(variables)?;
        debug!(variables = variables.len(), "bound variables");

        self.phase = RunPhase::Executing;
        let mut history = HistoryBuilder::new();
        let mut vm = VM::new(env, &mut history);
        statements::run_program(&mut vm, &program.body)?;

        let steps = history.drain();
        debug!(steps = steps.len(), "execution finished");
        Ok(steps)
    }

    fn finish(&mut self, result: Result<Vec<Step>, EngineError>) -> RunOutcome {
        match result {
            Ok(history) => {
                self.phase = RunPhase::Completed;
                RunOutcome::Success { history }
            }
            Err(err) => {
                self.phase = RunPhase::Failed;
                warn!(error = %err, "run failed");
                RunOutcome::Failure {
                    error: err.to_string(),
                }
            }
        }
    }
}

/// Normalize and run `source` in a fresh sandbox
pub fn execute(source: &str, variables: &Variables) -> RunOutcome {
    Sandbox::new().run(source, variables)
}

/// Run an already normalized program in a fresh sandbox
pub fn execute_program(program: &Program, variables: &Variables) -> RunOutcome {
    Sandbox::new().run_program(program, variables)
}

/* ===================== Binding ===================== */

/// Build the outermost scope from the caller's variables
///
/// The caller's values are cloned; nothing the program does reaches them.
fn bind_variables(variables: &Variables) -> Result<Env, EngineError> {
    let mut env = Env::new();

    for (name, variable) in variables {
        if !normalizer::is_valid_identifier(name) {
            return Err(binding_error(name, "not a valid identifier"));
        }

        let binding = bind_one(name, variable)?;
        env.declare(name, binding)
            .map_err(|kind| binding_error(name, &kind.to_string()))?;
    }

    Ok(env)
}

fn bind_one(name: &str, variable: &Variable) -> Result<Binding, EngineError> {
    let binding = match (variable.kind, &variable.value) {
        (VarKind::Scalar, Value::Scalar(v)) => Binding::Scalar(*v),
        (VarKind::Vector1D, Value::Vector(items)) => {
            Binding::Container(TrackedContainer::vector(name, items.clone()))
        }
        (VarKind::Vector2D, Value::Matrix(rows)) => {
            Binding::Container(TrackedContainer::matrix(name, rows.clone()))
        }
        (VarKind::Vector2D, Value::Vector(items)) if items.is_empty() => {
            Binding::Container(TrackedContainer::matrix(name, Vec::new()))
        }
        (kind, value) => {
            return Err(binding_error(
                name,
                &format!("declared as {} but the value is {}", kind, value.kind()),
            ))
        }
    };
    Ok(binding)
}

fn binding_error(name: &str, reason: &str) -> EngineError {
    EngineError::Binding {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
