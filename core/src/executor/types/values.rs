//! Runtime value types

use super::super::errors::ErrorKind;
use crate::types::Value;

/// Runtime value type
///
/// Containers are plain data here. Tracking happens only for values stored in a
/// named container binding, see [`crate::executor::container`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Val {
    Int(i64),
    Bool(bool),
    Vector(Vec<i64>),
    Matrix(Vec<Vec<i64>>),
}

impl Val {
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Int(_) => "int",
            Val::Bool(_) => "bool",
            Val::Vector(_) => "vector<int>",
            Val::Matrix(_) => "vector<vector<int>>",
        }
    }

    /// Integer view of a scalar; booleans read as 0 / 1
    pub fn as_int(&self) -> Result<i64, ErrorKind> {
        match self {
            Val::Int(v) => Ok(*v),
            Val::Bool(b) => Ok(i64::from(*b)),
            other => Err(ErrorKind::Type(format!(
                "expected an integer, found {}",
                other.type_name()
            ))),
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> Result<bool, ErrorKind> {
        match self {
            Val::Bool(b) => Ok(*b),
            Val::Int(v) => Ok(*v != 0),
            other => Err(ErrorKind::Type(format!(
                "{} cannot be used as a condition",
                other.type_name()
            ))),
        }
    }

    /// Take this value as a 1-D row
    pub fn into_row(self) -> Result<Vec<i64>, ErrorKind> {
        match self {
            Val::Vector(items) => Ok(items),
            other => Err(ErrorKind::Type(format!(
                "expected vector<int>, found {}",
                other.type_name()
            ))),
        }
    }

    /// Take this value as a 2-D grid; an empty list literal counts as an empty grid
    pub fn into_matrix(self) -> Result<Vec<Vec<i64>>, ErrorKind> {
        match self {
            Val::Matrix(rows) => Ok(rows),
            Val::Vector(items) if items.is_empty() => Ok(Vec::new()),
            other => Err(ErrorKind::Type(format!(
                "expected vector<vector<int>>, found {}",
                other.type_name()
            ))),
        }
    }
}

impl From<Value> for Val {
    fn from(value: Value) -> Self {
        match value {
            Value::Scalar(v) => Val::Int(v),
            Value::Vector(items) => Val::Vector(items),
            Value::Matrix(rows) => Val::Matrix(rows),
        }
    }
}

impl From<Val> for Value {
    fn from(val: Val) -> Self {
        match val {
            Val::Int(v) => Value::Scalar(v),
            Val::Bool(b) => Value::Scalar(i64::from(b)),
            Val::Vector(items) => Value::Vector(items),
            Val::Matrix(rows) => Value::Matrix(rows),
        }
    }
}
