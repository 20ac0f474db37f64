//! Tracked containers
//!
//! A named 1-D or 2-D integer array whose element writes are reported to the
//! [`HistoryBuilder`]. Every indexed write in a program resolves to one of the
//! `set*` / `push*` calls below; reads never record anything.
//!
//! Replacing the whole array (`v = {...}`) is not tracked, but the container stays
//! tracked for later element writes.

use super::errors::ErrorKind;
use super::history::{HistoryBuilder, PendingStep};
use super::types::Val;
use crate::types::{ChangedPosition, Value, VarKind};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Data {
    Vector(Vec<i64>),
    Matrix(Vec<Vec<i64>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedContainer {
    name: String,
    data: Data,
}

impl TrackedContainer {
    pub fn vector(name: impl Into<String>, items: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            data: Data::Vector(items),
        }
    }

    pub fn matrix(name: impl Into<String>, rows: Vec<Vec<i64>>) -> Self {
        Self {
            name: name.into(),
            data: Data::Matrix(rows),
        }
    }

    pub fn kind(&self) -> VarKind {
        match self.data {
            Data::Vector(_) => VarKind::Vector1D,
            Data::Matrix(_) => VarKind::Vector2D,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            Data::Vector(items) => items.len(),
            Data::Matrix(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full current value, copied
    pub fn snapshot(&self) -> Value {
        match &self.data {
            Data::Vector(items) => Value::Vector(items.clone()),
            Data::Matrix(rows) => Value::Matrix(rows.clone()),
        }
    }

    pub fn to_val(&self) -> Val {
        self.snapshot().into()
    }

    /* ===================== Reads ===================== */

    /// Element `i` of a vector, or a copy of row `i` of a matrix
    pub fn get(&self, index: i64) -> Result<Val, ErrorKind> {
        let i = self.check_index(index)?;
        match &self.data {
            Data::Vector(items) => Ok(Val::Int(items[i])),
            Data::Matrix(rows) => Ok(Val::Vector(rows[i].clone())),
        }
    }

    pub fn get_cell(&self, row: i64, col: i64) -> Result<i64, ErrorKind> {
        let (r, c) = self.check_cell(row, col)?;
        let rows = self.rows()?;
        Ok(rows[r][c])
    }

    pub fn row_len(&self, row: i64) -> Result<usize, ErrorKind> {
        let r = self.check_index(row)?;
        let rows = self.rows()?;
        Ok(rows[r].len())
    }

    /* ===================== Writes ===================== */

    /// Overwrite element `i` (vector) or row `i` (matrix)
    pub fn set(
        &mut self,
        index: i64,
        value: Val,
        history: &mut HistoryBuilder,
    ) -> Result<(), ErrorKind> {
        let i = self.check_index(index)?;
        match &mut self.data {
            Data::Vector(items) => items[i] = value.as_int()?,
            Data::Matrix(rows) => rows[i] = value.into_row()?,
        }
        self.record(history, Some(ChangedPosition::Index(i)));
        Ok(())
    }

    pub fn set_cell(
        &mut self,
        row: i64,
        col: i64,
        value: i64,
        history: &mut HistoryBuilder,
    ) -> Result<(), ErrorKind> {
        let (r, c) = self.check_cell(row, col)?;
        if let Data::Matrix(rows) = &mut self.data {
            rows[r][c] = value;
        }
        self.record(history, Some(ChangedPosition::Cell(r, c)));
        Ok(())
    }

    /// Append an element (vector) or a row (matrix)
    pub fn push(&mut self, value: Val, history: &mut HistoryBuilder) -> Result<(), ErrorKind> {
        let last = match &mut self.data {
            Data::Vector(items) => {
                items.push(value.as_int()?);
                items.len() - 1
            }
            Data::Matrix(rows) => {
                rows.push(value.into_row()?);
                rows.len() - 1
            }
        };
        self.record(history, Some(ChangedPosition::Index(last)));
        Ok(())
    }

    pub fn push_to_row(
        &mut self,
        row: i64,
        value: i64,
        history: &mut HistoryBuilder,
    ) -> Result<(), ErrorKind> {
        let r = self.check_index(row)?;
        let Data::Matrix(rows) = &mut self.data else {
            return Err(self.not_a_matrix());
        };
        rows[r].push(value);
        let last = rows[r].len() - 1;
        self.record(history, Some(ChangedPosition::Cell(r, last)));
        Ok(())
    }

    /// Whole-array reassignment. Records nothing.
    pub fn replace(&mut self, value: Val) -> Result<(), ErrorKind> {
        self.data = match &self.data {
            Data::Vector(_) => Data::Vector(value.into_row()?),
            Data::Matrix(_) => Data::Matrix(value.into_matrix()?),
        };
        Ok(())
    }

    /* ===================== Helpers ===================== */

    fn record(&self, history: &mut HistoryBuilder, changed_position: Option<ChangedPosition>) {
        history.append(PendingStep::Update {
            variable: self.name.clone(),
            snapshot: self.snapshot(),
            changed_position,
        });
    }

    fn rows(&self) -> Result<&Vec<Vec<i64>>, ErrorKind> {
        match &self.data {
            Data::Matrix(rows) => Ok(rows),
            Data::Vector(_) => Err(self.not_a_matrix()),
        }
    }

    fn not_a_matrix(&self) -> ErrorKind {
        ErrorKind::Type(format!("'{}[..]' is an int, not a vector", self.name))
    }

    fn check_index(&self, index: i64) -> Result<usize, ErrorKind> {
        bounded(&self.name, index, self.len())
    }

    fn check_cell(&self, row: i64, col: i64) -> Result<(usize, usize), ErrorKind> {
        let r = self.check_index(row)?;
        let rows = self.rows()?;
        let c = bounded(&format!("{}[{}]", self.name, r), col, rows[r].len())?;
        Ok((r, c))
    }
}

fn bounded(name: &str, index: i64, len: usize) -> Result<usize, ErrorKind> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| ErrorKind::IndexOutOfRange {
            name: name.to_string(),
            index,
            len,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Step;

    fn updates(history: &mut HistoryBuilder) -> Vec<crate::types::UpdateStep> {
        history
            .drain()
            .into_iter()
            .filter_map(|step| match step {
                Step::Update(update) => Some(update),
                Step::Log(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_reads_return_copies() {
        let m = TrackedContainer::matrix("m", vec![vec![1, 2], vec![3, 4]]);

        assert_eq!(m.get(1), Ok(Val::Vector(vec![3, 4])));
        assert_eq!(m.get_cell(0, 1), Ok(2));
        assert_eq!(m.row_len(0), Ok(2));
        assert_eq!(m.len(), 2);
        assert_eq!(m.kind(), VarKind::Vector2D);
    }

    #[test]
    fn test_set_records_index_and_full_snapshot() {
        let mut history = HistoryBuilder::new();
        let mut v = TrackedContainer::vector("arr", vec![1, 2, 3]);

        v.set(2, Val::Int(30), &mut history).expect("set failed");

        let steps = updates(&mut history);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].variable, "arr");
        assert_eq!(steps[0].snapshot, Value::Vector(vec![1, 2, 30]));
        assert_eq!(steps[0].changed_position, Some(ChangedPosition::Index(2)));
    }

    #[test]
    fn test_set_cell_records_row_and_column() {
        let mut history = HistoryBuilder::new();
        let mut m = TrackedContainer::matrix("m", vec![vec![1, 2], vec![3, 4]]);

        m.set_cell(0, 1, 9, &mut history).expect("set_cell failed");

        let steps = updates(&mut history);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].snapshot, Value::Matrix(vec![vec![1, 9], vec![3, 4]]));
        assert_eq!(steps[0].changed_position, Some(ChangedPosition::Cell(0, 1)));
    }

    #[test]
    fn test_row_assignment_records_row_index() {
        let mut history = HistoryBuilder::new();
        let mut m = TrackedContainer::matrix("m", vec![vec![1, 2], vec![3, 4]]);

        m.set(1, Val::Vector(vec![7]), &mut history)
            .expect("row set failed");

        let steps = updates(&mut history);
        assert_eq!(steps[0].snapshot, Value::Matrix(vec![vec![1, 2], vec![7]]));
        assert_eq!(steps[0].changed_position, Some(ChangedPosition::Index(1)));
    }

    #[test]
    fn test_push_records_new_last_position() {
        let mut history = HistoryBuilder::new();
        let mut v = TrackedContainer::vector("v", vec![]);
        let mut m = TrackedContainer::matrix("m", vec![vec![1]]);

        v.push(Val::Int(5), &mut history).expect("push failed");
        v.push(Val::Int(6), &mut history).expect("push failed");
        m.push_to_row(0, 2, &mut history).expect("row push failed");
        m.push(Val::Vector(vec![]), &mut history)
            .expect("matrix push failed");

        let positions: Vec<_> = updates(&mut history)
            .into_iter()
            .map(|u| u.changed_position)
            .collect();
        assert_eq!(
            positions,
            vec![
                Some(ChangedPosition::Index(0)),
                Some(ChangedPosition::Index(1)),
                Some(ChangedPosition::Cell(0, 1)),
                Some(ChangedPosition::Index(1)),
            ]
        );
    }

    #[test]
    fn test_replace_is_untracked_and_keeps_tracking() {
        let mut history = HistoryBuilder::new();
        let mut v = TrackedContainer::vector("v", vec![1, 2]);

        v.replace(Val::Vector(vec![4, 5, 6])).expect("replace failed");
        assert!(history.is_empty());

        v.set(0, Val::Int(0), &mut history).expect("set failed");
        let steps = updates(&mut history);
        assert_eq!(steps[0].snapshot, Value::Vector(vec![0, 5, 6]));
    }

    #[test]
    fn test_out_of_range_and_negative_indices_fail_without_recording() {
        let mut history = HistoryBuilder::new();
        let mut v = TrackedContainer::vector("v", vec![1, 2]);

        let err = v.set(2, Val::Int(0), &mut history).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::IndexOutOfRange {
                name: "v".to_string(),
                index: 2,
                len: 2
            }
        );
        assert!(v.get(-1).is_err());
        assert!(history.is_empty());
        assert_eq!(v.snapshot(), Value::Vector(vec![1, 2]));
    }

    #[test]
    fn test_cell_access_on_vector_is_a_type_error() {
        let v = TrackedContainer::vector("v", vec![1, 2]);
        let err = v.get_cell(0, 0).unwrap_err();
        assert_eq!(err.code(), crate::executor::errors::TYPE_ERROR);
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut history = HistoryBuilder::new();
        let mut v = TrackedContainer::vector("v", vec![1]);

        v.set(0, Val::Int(2), &mut history).expect("set failed");
        v.set(0, Val::Int(3), &mut history).expect("set failed");

        let steps = updates(&mut history);
        assert_eq!(steps[0].snapshot, Value::Vector(vec![2]));
        assert_eq!(steps[1].snapshot, Value::Vector(vec![3]));
    }
}
