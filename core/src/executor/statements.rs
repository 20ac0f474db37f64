//! Statement execution
//!
//! Each statement runs to completion and reports how control leaves it. Blocks,
//! loop bodies, `if` branches and `for` headers each open a scope.

use super::env::Binding;
use super::container::TrackedContainer;
use super::errors::{ErrorKind, RuntimeError};
use super::expressions::eval_expr;
use super::types::ast::{DeclType, Declarator, Expr, Span};
use super::types::{Control, Stmt};
use super::vm::VM;

pub type ExecResult = Result<Control, RuntimeError>;

/// Run a program's top-level statements in the outermost scope
///
/// `return` ends the program early and successfully.
pub fn run_program(vm: &mut VM, body: &[Stmt]) -> Result<(), RuntimeError> {
    for stmt in body {
        match exec_stmt(vm, stmt)? {
            Control::None => {}
            Control::Return => return Ok(()),
            Control::Break => return Err(ErrorKind::StrayControl("break").at(stmt.span())),
            Control::Continue => {
                return Err(ErrorKind::StrayControl("continue").at(stmt.span()))
            }
        }
    }
    Ok(())
}

pub fn exec_stmt(vm: &mut VM, stmt: &Stmt) -> ExecResult {
    vm.enter(stmt.span())?;
    let result = exec_node(vm, stmt);
    vm.leave();
    result
}

fn exec_node(vm: &mut VM, stmt: &Stmt) -> ExecResult {
    match stmt {
        Stmt::Block { body, .. } => {
            vm.env.push_scope();
            let result = exec_block(vm, body);
            vm.env.pop_scope();
            result
        }

        Stmt::Declare {
            ty, declarators, ..
        } => {
            for declarator in declarators {
                execute_declarator(vm, *ty, declarator)?;
            }
            Ok(Control::None)
        }

        Stmt::Expr { expr, .. } => {
            eval_expr(vm, expr)?;
            Ok(Control::None)
        }

        Stmt::If {
            test,
            then_s,
            else_s,
            ..
        } => {
            if eval_condition(vm, test)? {
                exec_scoped(vm, then_s)
            } else if let Some(else_s) = else_s {
                exec_scoped(vm, else_s)
            } else {
                Ok(Control::None)
            }
        }

        Stmt::While { test, body, .. } => {
            vm.loop_depth += 1;
            let result = execute_while(vm, test, body);
            vm.loop_depth -= 1;
            result
        }

        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            vm.env.push_scope();
            vm.loop_depth += 1;
            let result = execute_for(vm, init.as_deref(), test.as_ref(), update.as_ref(), body);
            vm.loop_depth -= 1;
            vm.env.pop_scope();
            result
        }

        Stmt::Return { value, .. } => {
            // Evaluated for its side effects; the program has no caller to hand it to
            if let Some(value) = value {
                eval_expr(vm, value)?;
            }
            Ok(Control::Return)
        }

        Stmt::Break { span } => loop_control(vm, Control::Break, "break", *span),

        Stmt::Continue { span } => loop_control(vm, Control::Continue, "continue", *span),

        Stmt::Log { message, .. } => {
            vm.history.log(message.clone());
            Ok(Control::None)
        }
    }
}

fn exec_block(vm: &mut VM, body: &[Stmt]) -> ExecResult {
    for stmt in body {
        let control = exec_stmt(vm, stmt)?;
        if control != Control::None {
            return Ok(control);
        }
    }
    Ok(Control::None)
}

/// Run a statement that sits in a single-statement position in its own scope
fn exec_scoped(vm: &mut VM, stmt: &Stmt) -> ExecResult {
    if matches!(stmt, Stmt::Block { .. }) {
        return exec_stmt(vm, stmt);
    }
    vm.env.push_scope();
    let result = exec_stmt(vm, stmt);
    vm.env.pop_scope();
    result
}

fn execute_while(vm: &mut VM, test: &Expr, body: &Stmt) -> ExecResult {
    while eval_condition(vm, test)? {
        match exec_scoped(vm, body)? {
            Control::Break => break,
            Control::Return => return Ok(Control::Return),
            Control::Continue | Control::None => {}
        }
    }
    Ok(Control::None)
}

fn execute_for(
    vm: &mut VM,
    init: Option<&Stmt>,
    test: Option<&Expr>,
    update: Option<&Expr>,
    body: &Stmt,
) -> ExecResult {
    if let Some(init) = init {
        exec_stmt(vm, init)?;
    }

    loop {
        if let Some(test) = test {
            if !eval_condition(vm, test)? {
                break;
            }
        }

        match exec_scoped(vm, body)? {
            Control::Break => break,
            Control::Return => return Ok(Control::Return),
            Control::Continue | Control::None => {}
        }

        if let Some(update) = update {
            eval_expr(vm, update)?;
        }
    }

    Ok(Control::None)
}

fn loop_control(vm: &VM, control: Control, keyword: &'static str, span: Span) -> ExecResult {
    if vm.loop_depth == 0 {
        return Err(ErrorKind::StrayControl(keyword).at(span));
    }
    Ok(control)
}

fn eval_condition(vm: &mut VM, test: &Expr) -> Result<bool, RuntimeError> {
    eval_expr(vm, test)?
        .is_truthy()
        .map_err(|kind| kind.at(test.span()))
}

/// Bind one declared name. Declarations record no step, even for containers.
fn execute_declarator(vm: &mut VM, ty: DeclType, declarator: &Declarator) -> Result<(), RuntimeError> {
    let init = match &declarator.init {
        Some(expr) => Some(eval_expr(vm, expr)?),
        None => None,
    };

    let name = declarator.name.as_str();
    let binding = match ty {
        DeclType::Int => Binding::Scalar(match init {
            Some(val) => val.as_int(),
            None => Ok(0),
        }
        .map_err(|kind| kind.at(declarator.span))?),
        DeclType::Vector => {
            let items = match init {
                Some(val) => val.into_row().map_err(|kind| kind.at(declarator.span))?,
                None => Vec::new(),
            };
            Binding::Container(TrackedContainer::vector(name, items))
        }
        DeclType::Matrix => {
            let rows = match init {
                Some(val) => val.into_matrix().map_err(|kind| kind.at(declarator.span))?,
                None => Vec::new(),
            };
            Binding::Container(TrackedContainer::matrix(name, rows))
        }
    };

    vm.env
        .declare(name, binding)
        .map_err(|kind| kind.at(declarator.span))
}
