//! Virtual Machine state
//!
//! The VM holds everything one run mutates:
//! - env: Scopes of scalar and container bindings
//! - history: The trace every container write and log marker lands in
//! - loop_depth: How many loops enclose the current statement
//! - depth: How many statements and expressions are being evaluated right now

use super::env::Env;
use super::errors::{ErrorKind, RuntimeError};
use super::history::HistoryBuilder;
use super::types::ast::{Span, MAX_NESTING_DEPTH};

/* ===================== VM ===================== */

/// Virtual Machine state
///
/// The history builder is borrowed, not owned: the caller decides what happens
/// to the trace once the run ends.
#[derive(Debug)]
pub struct VM<'h> {
    pub env: Env,
    pub history: &'h mut HistoryBuilder,
    pub loop_depth: usize,
    pub depth: usize,
}

impl<'h> VM<'h> {
    pub fn new(env: Env, history: &'h mut HistoryBuilder) -> Self {
        VM {
            env,
            history,
            loop_depth: 0,
            depth: 0,
        }
    }

    /// Step one level into a statement or expression
    pub fn enter(&mut self, span: Span) -> Result<(), RuntimeError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH).at(span));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth -= 1;
    }
}
