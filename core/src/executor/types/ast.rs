//! Abstract Syntax Tree node types

use serde::{Deserialize, Serialize};

/// Deepest nesting of statements and expressions a program may have
pub const MAX_NESTING_DEPTH: usize = 64;

/// Source location span for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Start line (0-indexed)
    pub start_line: usize,
    /// Start column (0-indexed)
    pub start_col: usize,
    /// End line (0-indexed)
    pub end_line: usize,
    /// End column (0-indexed)
    pub end_col: usize,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span that covers both self and other
    pub fn merge(&self, other: &Span) -> Span {
        let (start_line, start_col) = if self.start <= other.start {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) = if self.end >= other.end {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };

        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

/// Declared element type of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclType {
    /// `int`
    Int,
    /// `vector<int>`
    Vector,
    /// `vector<vector<int>>`
    Matrix,
}

/// One `name [= init]` entry of a declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

/// Container method after renaming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "name")]
pub enum Method {
    /// `push_back`
    Push,
    /// `size`
    Len,
    /// Anything else, kept by name and rejected at run time
    Other(String),
}

impl Method {
    pub fn from_source_name(name: &str) -> Self {
        match name {
            "push_back" => Method::Push,
            "size" => Method::Len,
            other => Method::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Short-circuit `&&`
    And,
    /// Short-circuit `||`
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// `=` or a compound assignment operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    /// The arithmetic operator applied by a compound assignment
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Inc,
    Dec,
}

/// Statement AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    Block {
        body: Vec<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Declare {
        ty: DeclType,
        declarators: Vec<Declarator>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Expr {
        expr: Expr,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    If {
        test: Expr,
        then_s: Box<Stmt>,
        else_s: Option<Box<Stmt>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Return {
        value: Option<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Break {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Continue {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// Progress marker injected by the normalizer
    Log {
        message: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Stmt {
    /// Get the span of this statement
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block { span, .. } => *span,
            Stmt::Declare { span, .. } => *span,
            Stmt::Expr { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::For { span, .. } => *span,
            Stmt::Return { span, .. } => *span,
            Stmt::Break { span } => *span,
            Stmt::Continue { span } => *span,
            Stmt::Log { span, .. } => *span,
        }
    }
}

/// Expression AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    LitInt {
        v: i64,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    LitBool {
        v: bool,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// Brace (or bracket) initializer list
    LitList {
        elements: Vec<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Ident {
        name: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// Property access without a call, e.g. `v.length`
    Member {
        object: Box<Expr>,
        property: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    MethodCall {
        object: Box<Expr>,
        method: Method,
        args: Vec<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// Free function call
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Ternary {
        condition: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// `++x`, `x++`, `--x`, `x--`
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Expr {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::LitInt { span, .. } => *span,
            Expr::LitBool { span, .. } => *span,
            Expr::LitList { span, .. } => *span,
            Expr::Ident { span, .. } => *span,
            Expr::Index { span, .. } => *span,
            Expr::Member { span, .. } => *span,
            Expr::MethodCall { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Ternary { span, .. } => *span,
            Expr::Assign { span, .. } => *span,
            Expr::Update { span, .. } => *span,
        }
    }
}

impl Stmt {
    fn push_children<'a>(&'a self, stmts: &mut Vec<&'a Stmt>, exprs: &mut Vec<&'a Expr>) {
        match self {
            Stmt::Block { body, .. } => stmts.extend(body),
            Stmt::Declare { declarators, .. } => {
                exprs.extend(declarators.iter().filter_map(|d| d.init.as_ref()))
            }
            Stmt::Expr { expr, .. } => exprs.push(expr),
            Stmt::If {
                test,
                then_s,
                else_s,
                ..
            } => {
                exprs.push(test);
                stmts.push(then_s.as_ref());
                stmts.extend(else_s.as_deref());
            }
            Stmt::While { test, body, .. } => {
                exprs.push(test);
                stmts.push(body.as_ref());
            }
            Stmt::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                stmts.extend(init.as_deref());
                exprs.extend(test.iter().chain(update.iter()));
                stmts.push(body.as_ref());
            }
            Stmt::Return { value, .. } => exprs.extend(value.iter()),
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Log { .. } => {}
        }
    }
}

impl Expr {
    fn push_children<'a>(&'a self, exprs: &mut Vec<&'a Expr>) {
        match self {
            Expr::LitInt { .. } | Expr::LitBool { .. } | Expr::Ident { .. } => {}
            Expr::LitList { elements, .. } => exprs.extend(elements),
            Expr::Index { object, index, .. } => exprs.extend([object.as_ref(), index.as_ref()]),
            Expr::Member { object, .. } => exprs.push(object.as_ref()),
            Expr::MethodCall { object, args, .. } => {
                exprs.push(object.as_ref());
                exprs.extend(args);
            }
            Expr::Call { callee, args, .. } => {
                exprs.push(callee.as_ref());
                exprs.extend(args);
            }
            Expr::Unary { operand, .. } => exprs.push(operand.as_ref()),
            Expr::Binary { left, right, .. } => exprs.extend([left.as_ref(), right.as_ref()]),
            Expr::Ternary {
                condition,
                consequent,
                alternate,
                ..
            } => exprs.extend([condition.as_ref(), consequent.as_ref(), alternate.as_ref()]),
            Expr::Assign { target, value, .. } => exprs.extend([target.as_ref(), value.as_ref()]),
            Expr::Update { target, .. } => exprs.push(target.as_ref()),
        }
    }

    /// Number of nodes on the longest path from this node to a leaf
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        let mut children = Vec::new();

        while let Some((expr, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            expr.push_children(&mut children);
            pending.extend(children.drain(..).map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// Number of statement and expression nodes on the longest path through `body`
///
/// Walks with an explicit stack so arbitrarily deep trees can be measured.
pub fn nesting_depth(body: &[Stmt]) -> usize {
    enum Node<'a> {
        Stmt(&'a Stmt),
        Expr(&'a Expr),
    }

    let mut deepest = 0;
    let mut pending: Vec<(Node, usize)> = body.iter().map(|stmt| (Node::Stmt(stmt), 1)).collect();
    let mut stmts = Vec::new();
    let mut exprs = Vec::new();

    while let Some((node, depth)) = pending.pop() {
        deepest = deepest.max(depth);
        match node {
            Node::Stmt(stmt) => stmt.push_children(&mut stmts, &mut exprs),
            Node::Expr(expr) => expr.push_children(&mut exprs),
        }
        pending.extend(stmts.drain(..).map(|s| (Node::Stmt(s), depth + 1)));
        pending.extend(exprs.drain(..).map(|e| (Node::Expr(e), depth + 1)));
    }
    deepest
}

/// Helper function for serde to skip serializing default spans
fn is_default_span(span: &Span) -> bool {
    *span == Span::default()
}
