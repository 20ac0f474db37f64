//! Loop progress markers
//!
//! Every C-style `for` loop gets a "Loop started" marker right before it and a
//! "Loop iteration" marker as the first statement of its body. Nested loops and
//! loops written without braces are handled the same way. `while` loops are left alone.

use super::Program;
use crate::executor::types::ast::Stmt;

pub const LOOP_STARTED: &str = "Loop started";
pub const LOOP_ITERATION: &str = "Loop iteration";

pub fn instrument_program(program: Program) -> Program {
    Program {
        body: instrument_list(program.body),
        span: program.span,
    }
}

fn instrument_list(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        out.extend(instrument_stmt(stmt));
    }
    out
}

/// A statement may expand to two (marker + loop)
fn instrument_stmt(stmt: Stmt) -> Vec<Stmt> {
    match stmt {
        Stmt::For {
            init,
            test,
            update,
            body,
            span,
        } => {
            let body_span = body.span();
            let mut inner = vec![Stmt::Log {
                message: LOOP_ITERATION.to_string(),
                span: body_span,
            }];
            match *body {
                Stmt::Block { body, .. } => inner.extend(instrument_list(body)),
                other => inner.extend(instrument_stmt(other)),
            }

            vec![
                Stmt::Log {
                    message: LOOP_STARTED.to_string(),
                    span,
                },
                Stmt::For {
                    init,
                    test,
                    update,
                    body: Box::new(Stmt::Block {
                        body: inner,
                        span: body_span,
                    }),
                    span,
                },
            ]
        }
        Stmt::Block { body, span } => vec![Stmt::Block {
            body: instrument_list(body),
            span,
        }],
        Stmt::If {
            test,
            then_s,
            else_s,
            span,
        } => vec![Stmt::If {
            test,
            then_s: Box::new(instrument_single(*then_s)),
            else_s: else_s.map(|s| Box::new(instrument_single(*s))),
            span,
        }],
        Stmt::While { test, body, span } => vec![Stmt::While {
            test,
            body: Box::new(instrument_single(*body)),
            span,
        }],
        other => vec![other],
    }
}

/// Instrument a statement that sits in a single-statement position
/// (`if` branch, `while` body). Two resulting statements are wrapped in a block.
fn instrument_single(stmt: Stmt) -> Stmt {
    let span = stmt.span();
    let mut stmts = instrument_stmt(stmt);
    if stmts.len() == 1 {
        if let Some(only) = stmts.pop() {
            return only;
        }
    }
    Stmt::Block { body: stmts, span }
}
