//! Grammar normalizer - PEST-based parser for the restricted C++-like language
//!
//! Turns source text into the syntax tree the executor walks, renaming container
//! methods on the way (`push_back` / `size`), then injects loop progress markers
//! (see [`instrument`]).
//!
//! Only the grammar below is understood. Constructs that still parse but have no
//! meaning here (free function calls, unknown methods, member access) are kept in
//! the tree as-is and rejected by the executor when reached.

use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

use crate::executor::types::ast::{
    nesting_depth, AssignOp, BinaryOp, DeclType, Declarator, Expr, Method, Span, Stmt, UnaryOp,
    UpdateOp, MAX_NESTING_DEPTH,
};

pub mod instrument;

pub use instrument::{LOOP_ITERATION, LOOP_STARTED};

#[cfg(test)]
mod tests;

/* ===================== Program ===================== */

/// A parsed program: the top-level statement list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "normalizer/grammar.pest"]
struct SourceParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    PestError(String, Option<Span>),
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span() {
            Some(span) => write!(
                f,
                "syntax error at line {}, column {}: {}",
                span.start_line + 1,
                span.start_col + 1,
                self.message()
            ),
            None => write!(f, "syntax error: {}", self.message()),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Some(Span {
                start: 0,
                end: 0,
                start_line: line.saturating_sub(1),
                start_col: col.saturating_sub(1),
                end_line: line.saturating_sub(1),
                end_col: col,
            }),
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                Some(Span {
                    start: 0,
                    end: 0,
                    start_line: start_line.saturating_sub(1),
                    start_col: start_col.saturating_sub(1),
                    end_line: end_line.saturating_sub(1),
                    end_col: end_col.saturating_sub(1),
                })
            }
        };
        let err = err.renamed_rules(rule_display_name);
        ParseError::PestError(err.variant.message().into_owned(), span)
    }
}

/// Human-facing names for the rules pest reports as "expected ..."
fn rule_display_name(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input",
        Rule::statement => "statement",
        Rule::expression | Rule::assignment | Rule::ternary | Rule::unary | Rule::postfix => {
            "expression"
        }
        Rule::identifier => "identifier",
        Rule::number => "number",
        Rule::declarator => "variable name",
        Rule::assign_op => "assignment operator",
        Rule::index_suffix => "'['",
        Rule::method_suffix | Rule::member_suffix => "'.'",
        Rule::call_suffix => "'('",
        other => return format!("{:?}", other),
    }
    .to_string()
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &pest::iterators::Pair<Rule>, source: &str) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = offset_to_line_col(source, start);
    let (end_line, end_col) = offset_to_line_col(source, end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/// Convert byte offset to (line, column) - 0-indexed
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    let mut current_offset = 0;

    for ch in source.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

/* ===================== Nesting Limits ===================== */

/// Deepest `(` / `[` / `{` nesting handed to the grammar
const MAX_BRACKET_DEPTH: usize = 32;

/// Deepest grammar rule nesting the tree builder descends into
const MAX_RULE_DEPTH: usize = 256;

fn nesting_error(what: &str, limit: usize, span: Span) -> ParseError {
    ParseError::BuildError(
        format!("{} nested too deeply (more than {} levels)", what, limit),
        Some(span),
    )
}

fn point_span(source: &str, offset: usize) -> Span {
    let (line, col) = offset_to_line_col(source, offset);
    Span::new(offset, offset + 1, line, col, line, col + 1)
}

/// Bracket nesting outside comments
fn check_bracket_depth(source: &str) -> ParseResult<()> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = source[i..].find('\n').map_or(bytes.len(), |end| i + end);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = source[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |end| i + 2 + end + 2);
                continue;
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                if depth > MAX_BRACKET_DEPTH {
                    return Err(nesting_error(
                        "brackets",
                        MAX_BRACKET_DEPTH,
                        point_span(source, i),
                    ));
                }
            }
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }

    Ok(())
}

/// Parse tree depth, measured without recursion
fn check_rule_depth(root: &Pair, source: &str) -> ParseResult<()> {
    let mut pending = vec![(root.clone(), 1usize)];

    while let Some((pair, depth)) = pending.pop() {
        if depth > MAX_RULE_DEPTH {
            return Err(nesting_error(
                "syntax",
                MAX_RULE_DEPTH,
                pair_to_span(&pair, source),
            ));
        }
        pending.extend(pair.into_inner().map(|child| (child, depth + 1)));
    }

    Ok(())
}

/// Statement and expression nesting the executor will walk
fn check_nesting(body: &[Stmt]) -> ParseResult<()> {
    for stmt in body {
        if nesting_depth(std::slice::from_ref(stmt)) > MAX_NESTING_DEPTH {
            return Err(nesting_error("statement", MAX_NESTING_DEPTH, stmt.span()));
        }
    }
    Ok(())
}

/* ===================== Public API ===================== */

/// Normalize source text into an instrumented, executable program
///
/// Parses the source, renames container methods and injects the
/// "Loop started" / "Loop iteration" markers around every `for` loop.
pub fn normalize(source: &str) -> ParseResult<Program> {
    let program = instrument::instrument_program(parse(source)?);
    check_nesting(&program.body)?;
    Ok(program)
}

/// Parse source text without injecting loop markers
pub fn parse(source: &str) -> ParseResult<Program> {
    check_bracket_depth(source)?;

    let mut pairs = SourceParser::parse(Rule::program, source)?;
    let program = pairs
        .next()
        .ok_or_else(|| ParseError::BuildError("empty parse result".to_string(), None))?;
    check_rule_depth(&program, source)?;
    let span = pair_to_span(&program, source);

    let body = program
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::statement)
        .map(|pair| build_statement(pair, source))
        .collect::<ParseResult<Vec<_>>>()?;
    check_nesting(&body)?;

    Ok(Program { body, span })
}

/// True when `name` can be bound as a variable (identifier, not a keyword)
pub fn is_valid_identifier(name: &str) -> bool {
    match SourceParser::parse(Rule::identifier, name) {
        Ok(mut pairs) => pairs
            .next()
            .map(|pair| pair.as_str().len() == name.len())
            .unwrap_or(false),
        Err(_) => false,
    }
}

/* ===================== AST Builder ===================== */

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/// Take the next child of a pair whose grammar guarantees it exists
fn next_child<'i>(
    inner: &mut pest::iterators::Pairs<'i, Rule>,
    parent: Span,
    what: &str,
) -> ParseResult<Pair<'i>> {
    inner
        .next()
        .ok_or_else(|| ParseError::BuildError(format!("missing {}", what), Some(parent)))
}

fn build_statement(pair: Pair, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::statement => {
            let inner = next_child(&mut pair.into_inner(), span, "statement")?;
            build_statement(inner, source)
        }
        Rule::block => build_block(pair, source),
        Rule::for_stmt => build_for_stmt(pair, source),
        Rule::while_stmt => {
            let mut inner = pair.into_inner();
            let test = build_expression(next_child(&mut inner, span, "condition")?, source)?;
            let body = build_statement(next_child(&mut inner, span, "loop body")?, source)?;
            Ok(Stmt::While {
                test,
                body: Box::new(body),
                span,
            })
        }
        Rule::if_stmt => build_if_stmt(pair, source),
        Rule::return_stmt => {
            let value = match pair.into_inner().next() {
                Some(expr_pair) => Some(build_expression(expr_pair, source)?),
                None => None,
            };
            Ok(Stmt::Return { value, span })
        }
        Rule::break_stmt => Ok(Stmt::Break { span }),
        Rule::continue_stmt => Ok(Stmt::Continue { span }),
        Rule::decl_stmt => {
            let inner = next_child(&mut pair.into_inner(), span, "declaration")?;
            build_declaration(inner, source)
        }
        Rule::empty_stmt => Ok(Stmt::Block { body: vec![], span }),
        Rule::expr_stmt => {
            let expr_pair = next_child(&mut pair.into_inner(), span, "expression")?;
            let expr = build_expression(expr_pair, source)?;
            Ok(Stmt::Expr { expr, span })
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected statement rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_block(pair: Pair, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let statements: Result<Vec<Stmt>, ParseError> = pair
        .into_inner()
        .map(|stmt_pair| build_statement(stmt_pair, source))
        .collect();

    Ok(Stmt::Block {
        body: statements?,
        span,
    })
}

fn build_for_stmt(pair: Pair, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    // for_init / for_test / for_update always exist, possibly empty
    let init_pair = next_child(&mut inner, span, "for initializer")?;
    let init = match init_pair.into_inner().next() {
        Some(p) if p.as_rule() == Rule::expression => {
            let expr_span = pair_to_span(&p, source);
            Some(Box::new(Stmt::Expr {
                expr: build_expression(p, source)?,
                span: expr_span,
            }))
        }
        Some(p) => Some(Box::new(build_declaration(p, source)?)),
        None => None,
    };

    let test = match next_child(&mut inner, span, "for condition")?.into_inner().next() {
        Some(p) => Some(build_expression(p, source)?),
        None => None,
    };

    let update = match next_child(&mut inner, span, "for update")?.into_inner().next() {
        Some(p) => Some(build_expression(p, source)?),
        None => None,
    };

    let body = build_statement(next_child(&mut inner, span, "loop body")?, source)?;

    Ok(Stmt::For {
        init,
        test,
        update,
        body: Box::new(body),
        span,
    })
}

fn build_if_stmt(pair: Pair, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let test = build_expression(next_child(&mut inner, span, "condition")?, source)?;
    let then_s = build_statement(next_child(&mut inner, span, "if body")?, source)?;

    let else_s = if let Some(else_clause_pair) = inner.next() {
        let else_span = pair_to_span(&else_clause_pair, source);
        let else_inner = next_child(&mut else_clause_pair.into_inner(), else_span, "else body")?;
        Some(Box::new(build_statement(else_inner, source)?))
    } else {
        None
    };

    Ok(Stmt::If {
        test,
        then_s: Box::new(then_s),
        else_s,
        span,
    })
}

fn build_declaration(pair: Pair, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let ty = match pair.as_rule() {
        Rule::scalar_decl => DeclType::Int,
        Rule::vector_decl => DeclType::Vector,
        Rule::matrix_decl => DeclType::Matrix,
        other => {
            return Err(ParseError::BuildError(
                format!("Unexpected declaration rule: {:?}", other),
                Some(span),
            ))
        }
    };

    let declarators = pair
        .into_inner()
        .map(|declarator_pair| build_declarator(declarator_pair, source))
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Stmt::Declare {
        ty,
        declarators,
        span,
    })
}

fn build_declarator(pair: Pair, source: &str) -> ParseResult<Declarator> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let name = next_child(&mut inner, span, "variable name")?
        .as_str()
        .to_string();
    let init = match inner.next() {
        Some(expr_pair) => Some(build_expression(expr_pair, source)?),
        None => None,
    };

    Ok(Declarator { name, init, span })
}

fn binary_op_for(rule: Rule) -> Option<BinaryOp> {
    let op = match rule {
        Rule::op_or => BinaryOp::Or,
        Rule::op_and => BinaryOp::And,
        Rule::op_eq => BinaryOp::Eq,
        Rule::op_ne => BinaryOp::Ne,
        Rule::op_lt => BinaryOp::Lt,
        Rule::op_lte => BinaryOp::Lte,
        Rule::op_gt => BinaryOp::Gt,
        Rule::op_gte => BinaryOp::Gte,
        Rule::op_add => BinaryOp::Add,
        Rule::op_sub => BinaryOp::Sub,
        Rule::op_mul => BinaryOp::Mul,
        Rule::op_div => BinaryOp::Div,
        Rule::op_mod => BinaryOp::Mod,
        _ => return None,
    };
    Some(op)
}

fn build_binary_expr(pair: Pair, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let first = next_child(&mut inner, span, "operand")?;
    let mut left = build_expression(first, source)?;
    // Operator chains fold left without recursing, so bound the tree here
    let mut depth = None;

    while let Some(op_pair) = inner.next() {
        let op = binary_op_for(op_pair.as_rule()).ok_or_else(|| {
            ParseError::BuildError(
                format!("Expected operator, got {:?}", op_pair.as_rule()),
                Some(span),
            )
        })?;

        let right_pair = inner.next().ok_or_else(|| {
            ParseError::BuildError(
                "Missing right operand after operator".to_string(),
                Some(span),
            )
        })?;
        let right = build_expression(right_pair, source)?;
        let new_span = left.span().merge(&right.span());

        let current = depth.unwrap_or_else(|| left.depth());
        let next = 1 + current.max(right.depth());
        if next > MAX_NESTING_DEPTH {
            return Err(nesting_error("expression", MAX_NESTING_DEPTH, new_span));
        }
        depth = Some(next);

        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: new_span,
        };
    }

    Ok(left)
}

fn build_assignment(pair: Pair, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let target = build_expression(next_child(&mut inner, span, "expression")?, source)?;
    let Some(op_pair) = inner.next() else {
        return Ok(target);
    };

    let op = match op_pair.as_str() {
        "=" => AssignOp::Set,
        "+=" => AssignOp::Add,
        "-=" => AssignOp::Sub,
        "*=" => AssignOp::Mul,
        "/=" => AssignOp::Div,
        "%=" => AssignOp::Mod,
        other => {
            return Err(ParseError::BuildError(
                format!("Unknown assignment operator '{}'", other),
                Some(pair_to_span(&op_pair, source)),
            ))
        }
    };
    let value = build_expression(next_child(&mut inner, span, "assigned value")?, source)?;

    Ok(Expr::Assign {
        op,
        target: Box::new(target),
        value: Box::new(value),
        span,
    })
}

fn build_unary(pair: Pair, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    let first = next_child(&mut inner, span, "expression")?;

    let rule = first.as_rule();
    if rule == Rule::postfix {
        return build_expression(first, source);
    }

    let operand = Box::new(build_expression(
        next_child(&mut inner, span, "operand")?,
        source,
    )?);
    let expr = match rule {
        Rule::op_neg => Expr::Unary {
            op: UnaryOp::Neg,
            operand,
            span,
        },
        Rule::op_not => Expr::Unary {
            op: UnaryOp::Not,
            operand,
            span,
        },
        Rule::op_pre_inc => Expr::Update {
            op: UpdateOp::Inc,
            prefix: true,
            target: operand,
            span,
        },
        Rule::op_pre_dec => Expr::Update {
            op: UpdateOp::Dec,
            prefix: true,
            target: operand,
            span,
        },
        other => {
            return Err(ParseError::BuildError(
                format!("Unexpected unary operator {:?}", other),
                Some(span),
            ))
        }
    };
    Ok(expr)
}

fn build_postfix(pair: Pair, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let primary = next_child(&mut inner, span, "expression")?;
    let mut expr = build_expression(primary, source)?;

    for suffix in inner {
        let suffix_span = pair_to_span(&suffix, source);
        let new_span = expr.span().merge(&suffix_span);

        expr = match suffix.as_rule() {
            Rule::index_suffix => {
                let index_pair = next_child(&mut suffix.into_inner(), suffix_span, "index")?;
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(build_expression(index_pair, source)?),
                    span: new_span,
                }
            }
            Rule::method_suffix => {
                let mut suffix_inner = suffix.into_inner();
                let name = next_child(&mut suffix_inner, suffix_span, "method name")?;
                let args = match suffix_inner.next() {
                    Some(arg_list) => build_arg_list(arg_list, source)?,
                    None => vec![],
                };
                Expr::MethodCall {
                    object: Box::new(expr),
                    method: Method::from_source_name(name.as_str()),
                    args,
                    span: new_span,
                }
            }
            Rule::member_suffix => {
                let name = next_child(&mut suffix.into_inner(), suffix_span, "member name")?;
                Expr::Member {
                    object: Box::new(expr),
                    property: name.as_str().to_string(),
                    span: new_span,
                }
            }
            Rule::call_suffix => {
                let args = match suffix.into_inner().next() {
                    Some(arg_list) => build_arg_list(arg_list, source)?,
                    None => vec![],
                };
                Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span: new_span,
                }
            }
            Rule::op_post_inc | Rule::op_post_dec => Expr::Update {
                op: if suffix.as_rule() == Rule::op_post_inc {
                    UpdateOp::Inc
                } else {
                    UpdateOp::Dec
                },
                prefix: false,
                target: Box::new(expr),
                span: new_span,
            },
            other => {
                return Err(ParseError::BuildError(
                    format!("Unexpected postfix rule: {:?}", other),
                    Some(suffix_span),
                ))
            }
        };
    }

    Ok(expr)
}

fn build_expression(pair: Pair, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::expression => {
            let inner = next_child(&mut pair.into_inner(), span, "expression")?;
            build_expression(inner, source)
        }
        Rule::assignment => build_assignment(pair, source),
        Rule::ternary => {
            let mut inner = pair.into_inner();
            let condition = build_expression(next_child(&mut inner, span, "condition")?, source)?;

            if let Some(consequent_pair) = inner.next() {
                let consequent = build_expression(consequent_pair, source)?;
                let alternate =
                    build_expression(next_child(&mut inner, span, "':' branch")?, source)?;
                Ok(Expr::Ternary {
                    condition: Box::new(condition),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                    span,
                })
            } else {
                Ok(condition)
            }
        }
        Rule::logical_or
        | Rule::logical_and
        | Rule::equality
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative => build_binary_expr(pair, source),
        Rule::unary => build_unary(pair, source),
        Rule::postfix => build_postfix(pair, source),
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
            span,
        }),
        Rule::number => {
            let num_str = pair.as_str();
            let value = num_str.parse::<i64>().map_err(|e| {
                ParseError::BuildError(
                    format!("Failed to parse number '{}': {}", num_str, e),
                    Some(span),
                )
            })?;
            Ok(Expr::LitInt { v: value, span })
        }
        Rule::boolean => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
            span,
        }),
        Rule::list_lit => {
            let elements = pair
                .into_inner()
                .map(|element| build_expression(element, source))
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::LitList { elements, span })
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected expression rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_arg_list(pair: Pair, source: &str) -> ParseResult<Vec<Expr>> {
    pair.into_inner()
        .map(|expr_pair| build_expression(expr_pair, source))
        .collect()
}
