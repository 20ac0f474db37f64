//! Step history builder
//!
//! The single append-only trace shared by container writes and the log markers.
//! Callers hand in a step without an index; the builder numbers it (starting at 1,
//! no gaps) and stamps the time.

use chrono::Utc;
use tracing::trace;

use crate::types::{ChangedPosition, LogStep, Step, UpdateStep, Value};

/// A step as produced by its source, before numbering
#[derive(Debug, Clone, PartialEq)]
pub enum PendingStep {
    Log {
        message: String,
    },
    Update {
        variable: String,
        snapshot: Value,
        changed_position: Option<ChangedPosition>,
    },
}

#[derive(Debug)]
pub struct HistoryBuilder {
    steps: Vec<Step>,
    next_index: u64,
}

impl Default for HistoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuilder {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            next_index: 1,
        }
    }

    /// Number and store a step
    pub fn append(&mut self, pending: PendingStep) {
        let index = self.next_index;
        self.next_index += 1;
        let timestamp = Utc::now();

        let step = match pending {
            PendingStep::Log { message } => Step::Log(LogStep {
                index,
                message,
                timestamp,
            }),
            PendingStep::Update {
                variable,
                snapshot,
                changed_position,
            } => Step::Update(UpdateStep {
                index,
                variable,
                snapshot,
                changed_position,
                timestamp,
            }),
        };

        trace!(step = %step, "recorded step");
        self.steps.push(step);
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.append(PendingStep::Log {
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps recorded since the last drain
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Take the recorded steps, in order
    ///
    /// Numbering continues where it left off, so indices stay unique across drains.
    pub fn drain(&mut self) -> Vec<Step> {
        std::mem::take(&mut self.steps)
    }
}
