//! Expression evaluation
//!
//! Reads go through the environment without recording anything. Every write to
//! an element of a named array is resolved to a [`Place`] and handed to the
//! owning [`TrackedContainer`], which reports it to the history.

use super::container::TrackedContainer;
use super::env::Binding;
use super::errors::{ErrorKind, RuntimeError};
use super::types::ast::{BinaryOp, Method, Span, UnaryOp, UpdateOp};
use super::types::{Expr, Val};
use super::vm::VM;
use crate::types::VarKind;

pub type EvalResult = Result<Val, RuntimeError>;

/// Evaluate an expression to a value
pub fn eval_expr(vm: &mut VM, expr: &Expr) -> EvalResult {
    vm.enter(expr.span())?;
    let result = eval_node(vm, expr);
    vm.leave();
    result
}

fn eval_node(vm: &mut VM, expr: &Expr) -> EvalResult {
    let span = expr.span();

    match expr {
        Expr::LitInt { v, .. } => Ok(Val::Int(*v)),

        Expr::LitBool { v, .. } => Ok(Val::Bool(*v)),

        Expr::LitList { elements, .. } => eval_list(vm, elements, span),

        Expr::Ident { name, .. } => match vm.env.lookup(name).map_err(|k| k.at(span))? {
            Binding::Scalar(v) => Ok(Val::Int(*v)),
            Binding::Container(container) => Ok(container.to_val()),
        },

        Expr::Index { object, index, .. } => {
            if is_place(expr) {
                let place = resolve_place(vm, expr)?;
                return read_place(vm, &place).map_err(|k| k.at(span));
            }
            let value = eval_expr(vm, object)?;
            let i = eval_int(vm, index)?;
            index_temporary(value, i).map_err(|k| k.at(span))
        }

        Expr::Member { property, .. } => {
            Err(ErrorKind::Unsupported(format!("member access '.{}'", property)).at(span))
        }

        Expr::MethodCall {
            object,
            method,
            args,
            ..
        } => eval_method_call(vm, object, method, args, span),

        Expr::Call { callee, .. } => {
            let name = match callee.as_ref() {
                Expr::Ident { name, .. } => name.as_str(),
                _ => "<expression>",
            };
            Err(ErrorKind::Unsupported(format!("function call '{}(...)'", name)).at(span))
        }

        Expr::Unary { op, operand, .. } => {
            let value = eval_expr(vm, operand)?;
            let result = match op {
                UnaryOp::Neg => value
                    .as_int()
                    .and_then(|v| v.checked_neg().ok_or(ErrorKind::Overflow))
                    .map(Val::Int),
                UnaryOp::Not => value.is_truthy().map(|b| Val::Bool(!b)),
            };
            result.map_err(|k| k.at(span))
        }

        Expr::Binary {
            op: BinaryOp::And,
            left,
            right,
            ..
        } => {
            if !eval_truthy(vm, left)? {
                return Ok(Val::Bool(false));
            }
            Ok(Val::Bool(eval_truthy(vm, right)?))
        }

        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
            ..
        } => {
            if eval_truthy(vm, left)? {
                return Ok(Val::Bool(true));
            }
            Ok(Val::Bool(eval_truthy(vm, right)?))
        }

        Expr::Binary {
            op, left, right, ..
        } => {
            let l = eval_expr(vm, left)?;
            let r = eval_expr(vm, right)?;
            apply_binary(*op, &l, &r).map_err(|k| k.at(span))
        }

        Expr::Ternary {
            condition,
            consequent,
            alternate,
            ..
        } => {
            if eval_truthy(vm, condition)? {
                eval_expr(vm, consequent)
            } else {
                eval_expr(vm, alternate)
            }
        }

        Expr::Assign {
            op, target, value, ..
        } => {
            let place = resolve_place(vm, target)?;
            let rhs = eval_expr(vm, value)?;
            let new_value = match op.binary() {
                None => rhs,
                Some(bin) => {
                    let current = read_place(vm, &place).map_err(|k| k.at(span))?;
                    apply_binary(bin, &current, &rhs).map_err(|k| k.at(span))?
                }
            };
            write_place(vm, &place, new_value.clone()).map_err(|k| k.at(span))?;
            Ok(new_value)
        }

        Expr::Update {
            op, prefix, target, ..
        } => {
            let place = resolve_place(vm, target)?;
            let old = read_place(vm, &place)
                .and_then(|v| v.as_int())
                .map_err(|k| k.at(span))?;
            let new = match op {
                UpdateOp::Inc => old.checked_add(1),
                UpdateOp::Dec => old.checked_sub(1),
            }
            .ok_or_else(|| ErrorKind::Overflow.at(span))?;
            write_place(vm, &place, Val::Int(new)).map_err(|k| k.at(span))?;
            Ok(Val::Int(if *prefix { new } else { old }))
        }
    }
}

fn eval_int(vm: &mut VM, expr: &Expr) -> Result<i64, RuntimeError> {
    eval_expr(vm, expr)?
        .as_int()
        .map_err(|k| k.at(expr.span()))
}

fn eval_truthy(vm: &mut VM, expr: &Expr) -> Result<bool, RuntimeError> {
    eval_expr(vm, expr)?
        .is_truthy()
        .map_err(|k| k.at(expr.span()))
}

/// `{1, 2}` is a vector, `{{1}, {2}}` a matrix, `{}` an empty vector
fn eval_list(vm: &mut VM, elements: &[Expr], span: Span) -> EvalResult {
    let values = elements
        .iter()
        .map(|element| eval_expr(vm, element))
        .collect::<Result<Vec<_>, _>>()?;

    if values.iter().all(|v| matches!(v, Val::Int(_) | Val::Bool(_))) {
        let items = values
            .iter()
            .map(Val::as_int)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|k| k.at(span))?;
        return Ok(Val::Vector(items));
    }

    if values.iter().all(|v| matches!(v, Val::Vector(_))) {
        let rows = values
            .into_iter()
            .map(Val::into_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|k| k.at(span))?;
        return Ok(Val::Matrix(rows));
    }

    Err(ErrorKind::Type(
        "initializer list mixes integers and lists, or nests too deeply".to_string(),
    )
    .at(span))
}

/* ===================== Operators ===================== */

fn apply_binary(op: BinaryOp, l: &Val, r: &Val) -> Result<Val, ErrorKind> {
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (l, r) {
                (Val::Vector(a), Val::Vector(b)) => a == b,
                (Val::Matrix(a), Val::Matrix(b)) => a == b,
                _ => l.as_int()? == r.as_int()?,
            };
            Ok(Val::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt => Ok(Val::Bool(l.as_int()? < r.as_int()?)),
        BinaryOp::Lte => Ok(Val::Bool(l.as_int()? <= r.as_int()?)),
        BinaryOp::Gt => Ok(Val::Bool(l.as_int()? > r.as_int()?)),
        BinaryOp::Gte => Ok(Val::Bool(l.as_int()? >= r.as_int()?)),
        BinaryOp::And => Ok(Val::Bool(l.is_truthy()? && r.is_truthy()?)),
        BinaryOp::Or => Ok(Val::Bool(l.is_truthy()? || r.is_truthy()?)),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, l.as_int()?, r.as_int()?).map(Val::Int)
        }
    }
}

/// Checked 64-bit arithmetic; `/` and `%` truncate toward zero
fn arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<i64, ErrorKind> {
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
        return Err(ErrorKind::DivisionByZero);
    }
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod => a.checked_rem(b),
        _ => return Err(ErrorKind::Type(format!("{:?} is not arithmetic", op))),
    };
    result.ok_or(ErrorKind::Overflow)
}

/* ===================== Methods ===================== */

fn eval_method_call(
    vm: &mut VM,
    object: &Expr,
    method: &Method,
    args: &[Expr],
    span: Span,
) -> EvalResult {
    match method {
        Method::Len => {
            expect_args("size", args, 0, span)?;
            // Named arrays are measured in place, not copied out
            let len = if is_place(object) {
                let place = resolve_place(vm, object)?;
                place_len(vm, &place)
            } else {
                let target = eval_expr(vm, object)?;
                value_len(&target)
            }
            .map_err(|k| k.at(span))?;
            i64::try_from(len)
                .map(Val::Int)
                .map_err(|_| ErrorKind::Overflow.at(span))
        }

        Method::Push => {
            expect_args("push_back", args, 1, span)?;
            if !is_place(object) {
                return Err(ErrorKind::InvalidTarget.at(span));
            }
            let place = resolve_place(vm, object)?;
            let value = eval_expr(vm, &args[0])?;
            push_place(vm, &place, value).map_err(|k| k.at(span))?;
            Ok(Val::Int(0))
        }

        Method::Other(name) => {
            Err(ErrorKind::Unsupported(format!("method '{}'", name)).at(span))
        }
    }
}

fn value_len(value: &Val) -> Result<usize, ErrorKind> {
    match value {
        Val::Vector(items) => Ok(items.len()),
        Val::Matrix(rows) => Ok(rows.len()),
        other => Err(ErrorKind::Type(format!(
            "size() called on {}",
            other.type_name()
        ))),
    }
}

fn expect_args(method: &str, args: &[Expr], count: usize, span: Span) -> Result<(), RuntimeError> {
    if args.len() != count {
        return Err(ErrorKind::Type(format!(
            "{}() takes {} argument(s), got {}",
            method,
            count,
            args.len()
        ))
        .at(span));
    }
    Ok(())
}

/* ===================== Places ===================== */

/// A named variable plus the indices applied to it, e.g. `m[1][2]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub name: String,
    pub indices: Vec<i64>,
}

/// True for a variable or an index chain rooted at one
fn is_place(expr: &Expr) -> bool {
    match expr {
        Expr::Ident { .. } => true,
        Expr::Index { object, .. } => is_place(object),
        _ => false,
    }
}

/// Resolve an assignable expression, evaluating its indices left to right
pub fn resolve_place(vm: &mut VM, expr: &Expr) -> Result<Place, RuntimeError> {
    match expr {
        Expr::Ident { name, .. } => Ok(Place {
            name: name.clone(),
            indices: Vec::new(),
        }),
        Expr::Index { object, index, .. } => {
            let mut place = resolve_place(vm, object)?;
            place.indices.push(eval_int(vm, index)?);
            Ok(place)
        }
        other => Err(ErrorKind::InvalidTarget.at(other.span())),
    }
}

pub fn read_place(vm: &VM, place: &Place) -> Result<Val, ErrorKind> {
    match (vm.env.lookup(&place.name)?, place.indices.as_slice()) {
        (Binding::Scalar(v), []) => Ok(Val::Int(*v)),
        (Binding::Scalar(_), _) => Err(not_indexable(&place.name)),
        (Binding::Container(c), []) => Ok(c.to_val()),
        (Binding::Container(c), [i]) => c.get(*i),
        (Binding::Container(c), [r, col]) => c.get_cell(*r, *col).map(Val::Int),
        (Binding::Container(_), _) => Err(too_many_indices(&place.name)),
    }
}

fn place_len(vm: &VM, place: &Place) -> Result<usize, ErrorKind> {
    match (vm.env.lookup(&place.name)?, place.indices.as_slice()) {
        (Binding::Scalar(v), []) => value_len(&Val::Int(*v)),
        (Binding::Scalar(_), _) => Err(not_indexable(&place.name)),
        (Binding::Container(c), []) => Ok(c.len()),
        (Binding::Container(c), [r]) => match c.kind() {
            VarKind::Vector2D => c.row_len(*r),
            _ => c.get(*r).and_then(|element| value_len(&element)),
        },
        (Binding::Container(c), [r, col]) => c
            .get_cell(*r, *col)
            .and_then(|cell| value_len(&Val::Int(cell))),
        (Binding::Container(_), _) => Err(too_many_indices(&place.name)),
    }
}

pub fn write_place(vm: &mut VM, place: &Place, value: Val) -> Result<(), ErrorKind> {
    let history = &mut *vm.history;
    match (vm.env.lookup_mut(&place.name)?, place.indices.as_slice()) {
        (Binding::Scalar(v), []) => {
            *v = value.as_int()?;
            Ok(())
        }
        (Binding::Scalar(_), _) => Err(not_indexable(&place.name)),
        (Binding::Container(c), []) => c.replace(value),
        (Binding::Container(c), [i]) => c.set(*i, value, history),
        (Binding::Container(c), [r, col]) => c.set_cell(*r, *col, value.as_int()?, history),
        (Binding::Container(_), _) => Err(too_many_indices(&place.name)),
    }
}

fn push_place(vm: &mut VM, place: &Place, value: Val) -> Result<(), ErrorKind> {
    let history = &mut *vm.history;
    match (vm.env.lookup_mut(&place.name)?, place.indices.as_slice()) {
        (Binding::Container(c), []) => c.push(value, history),
        (Binding::Container(c), [r]) => c.push_to_row(*r, value.as_int()?, history),
        (Binding::Container(_), _) => Err(ErrorKind::Type(format!(
            "push_back() on an element of '{}'",
            place.name
        ))),
        (Binding::Scalar(_), _) => Err(ErrorKind::Type(format!(
            "push_back() called on int '{}'",
            place.name
        ))),
    }
}

/// Index into a value with no variable behind it, e.g. `{1, 2}[0]` or `(a + b)[0]`
fn index_temporary(value: Val, index: i64) -> Result<Val, ErrorKind> {
    match value {
        Val::Vector(items) => TrackedContainer::vector("value", items).get(index),
        Val::Matrix(rows) => TrackedContainer::matrix("value", rows).get(index),
        scalar => Err(ErrorKind::Type(format!(
            "{} cannot be indexed",
            scalar.type_name()
        ))),
    }
}

fn not_indexable(name: &str) -> ErrorKind {
    ErrorKind::Type(format!("'{}' is an int and cannot be indexed", name))
}

fn too_many_indices(name: &str) -> ErrorKind {
    ErrorKind::Type(format!("too many indices for '{}'", name))
}
