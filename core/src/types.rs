use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/* ===================== Variables ===================== */

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    #[serde(alias = "int")]
    Scalar,
    #[serde(alias = "vector<int>")]
    Vector1D,
    #[serde(alias = "vector<vector<int>>")]
    Vector2D,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Scalar => write!(f, "int"),
            VarKind::Vector1D => write!(f, "vector<int>"),
            VarKind::Vector2D => write!(f, "vector<vector<int>>"),
        }
    }
}

/// A plain integer value as it crosses the engine boundary.
///
/// Used both for caller-supplied initial values and for recorded snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(i64),
    Vector(Vec<i64>),
    Matrix(Vec<Vec<i64>>),
}

impl Value {
    /// The kind this value naturally has. An empty list reads as 1-D.
    pub fn kind(&self) -> VarKind {
        match self {
            Value::Scalar(_) => VarKind::Scalar,
            Value::Vector(_) => VarKind::Vector1D,
            Value::Matrix(_) => VarKind::Vector2D,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn row(f: &mut fmt::Formatter<'_>, items: &[i64]) -> fmt::Result {
            write!(f, "[")?;
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            write!(f, "]")
        }

        match self {
            Value::Scalar(v) => write!(f, "{}", v),
            Value::Vector(items) => row(f, items),
            Value::Matrix(rows) => {
                write!(f, "[")?;
                for (i, r) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    row(f, r)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A named initial variable supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub kind: VarKind,
    pub value: Value,
}

impl Variable {
    pub fn scalar(v: i64) -> Self {
        Self {
            kind: VarKind::Scalar,
            value: Value::Scalar(v),
        }
    }

    pub fn vector(items: Vec<i64>) -> Self {
        Self {
            kind: VarKind::Vector1D,
            value: Value::Vector(items),
        }
    }

    pub fn matrix(rows: Vec<Vec<i64>>) -> Self {
        Self {
            kind: VarKind::Vector2D,
            value: Value::Matrix(rows),
        }
    }

    /// Build a variable from a JSON literal, inferring the kind from nesting depth
    ///
    /// `5` is a scalar, `[1, 2]` (or `[]`) a 1-D vector, `[[1], [2]]` a 2-D vector.
    pub fn from_literal(literal: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(literal)?;
        Ok(Self {
            kind: value.kind(),
            value,
        })
    }
}

/// Initial bindings for a run, keyed by variable name
pub type Variables = BTreeMap<String, Variable>;

/* ===================== Steps ===================== */

/// Position of a recorded write inside its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangedPosition {
    Index(usize),
    Cell(usize, usize),
}

impl fmt::Display for ChangedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangedPosition::Index(i) => write!(f, "[{}]", i),
            ChangedPosition::Cell(r, c) => write!(f, "[{}][{}]", r, c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogStep {
    pub index: u64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStep {
    pub index: u64,
    pub variable: String,
    /// Full value of the variable right after the write
    pub snapshot: Value,
    pub changed_position: Option<ChangedPosition>,
    pub timestamp: DateTime<Utc>,
}

/// One entry of the execution trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    Log(LogStep),
    Update(UpdateStep),
}

impl Step {
    pub fn index(&self) -> u64 {
        match self {
            Step::Log(s) => s.index,
            Step::Update(s) => s.index,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Step::Log(s) => s.timestamp,
            Step::Update(s) => s.timestamp,
        }
    }

    pub fn as_update(&self) -> Option<&UpdateStep> {
        match self {
            Step::Update(s) => Some(s),
            Step::Log(_) => None,
        }
    }

    pub fn as_log(&self) -> Option<&LogStep> {
        match self {
            Step::Log(s) => Some(s),
            Step::Update(_) => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Log(s) => write!(f, "#{} log    {}", s.index, s.message),
            Step::Update(s) => {
                write!(f, "#{} update {}", s.index, s.variable)?;
                if let Some(pos) = s.changed_position {
                    write!(f, "{}", pos)?;
                }
                write!(f, " -> {}", s.snapshot)
            }
        }
    }
}

/* ===================== Run Outcome ===================== */

/// Result of one run, handed to the visualization layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Success { history: Vec<Step> },
    Failure { error: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    pub fn history(&self) -> Option<&[Step]> {
        match self {
            RunOutcome::Success { history } => Some(history),
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failure { error } => Some(error),
        }
    }
}
